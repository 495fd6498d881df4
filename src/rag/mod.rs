// Grounded question answering over a search index
//
// Stages run in order for every request:
// - Retrieval: hybrid keyword + vector search
// - Context: numbered source blocks and the source map
// - Generation: grounded, cited answer
// - Citations / Recommendations: what the answer used, what else is related
// - Evaluation: forensic grading of the answer against the context

pub mod embedding;
pub mod retrieval;
pub mod context;
pub mod generator;
pub mod citations;
pub mod recommend;
pub mod evaluator;
pub mod pipeline;

// Re-export key types
pub use embedding::{cosine_similarity, EmbeddingClient};
pub use retrieval::{KnowledgeRetriever, SearchParams};
pub use context::{ContextComposer, ContextConfig, PreparedContext};
pub use generator::{AnswerGenerator, GenerationConfig};
pub use citations::{cited_sources, has_citations};
pub use recommend::{RecommendConfig, Recommender};
pub use evaluator::{parse_evaluation, EvaluationConfig, Evaluator};
pub use pipeline::{RAGConfig, RAGPipeline, ServiceHandles};
