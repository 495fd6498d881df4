//! Type definitions module
//!
//! Request-scoped records, evaluation verdicts, and the response shape.

pub mod records;
pub mod evaluation;
pub mod response;

// Re-export commonly used types
pub use records::{
    CitedSource, Recommendation, SearchResult, SourceEntry, SourceId, SourceMap,
};
pub use evaluation::{ContextMatch, Evaluation, EvaluationReport};
pub use response::{ChatOutcome, RagResponse};
