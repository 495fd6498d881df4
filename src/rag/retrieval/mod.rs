// Knowledge retrieval
pub mod engine;

pub use engine::{KnowledgeRetriever, SearchParams, DEFAULT_SIMILARITY_THRESHOLD, MAX_TOP_K};
