//! Error types for RagBuddy
//!
//! Service clients return these errors; the pipeline stages turn them into
//! soft-failure values so that only input validation and startup problems
//! ever reach a caller.

use thiserror::Error;

/// Main error type for the RagBuddy pipeline and its service clients
#[derive(Error, Debug)]
pub enum RagError {
    /// Query was empty or whitespace only
    #[error("No query provided")]
    EmptyQuery,

    /// Embedding service errors
    #[error("Embedding error ({provider}): {message}")]
    Embedding { provider: String, message: String },

    /// Search backend errors
    #[error("Search error ({backend}): {message}")]
    Search { backend: String, message: String },

    /// Chat completion errors
    #[error("Chat completion error ({provider}): {message}")]
    Chat { provider: String, message: String },

    /// Evaluation output did not match the verdict schema
    #[error("Failed to parse evaluation JSON: {0}")]
    EvaluationParse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

impl RagError {
    pub fn embedding(provider: &str, message: impl Into<String>) -> Self {
        RagError::Embedding {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn search(backend: &str, message: impl Into<String>) -> Self {
        RagError::Search {
            backend: backend.to_string(),
            message: message.into(),
        }
    }

    pub fn chat(provider: &str, message: impl Into<String>) -> Self {
        RagError::Chat {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

/// Convert anyhow errors to RagError
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_message() {
        assert_eq!(RagError::EmptyQuery.to_string(), "No query provided");
    }

    #[test]
    fn test_service_error_display() {
        let err = RagError::search("azure", "401 Unauthorized");
        assert!(err.to_string().contains("azure"));
        assert!(err.to_string().contains("401"));

        let err = RagError::chat("ollama", "connection refused");
        assert!(err.to_string().starts_with("Chat completion error (ollama)"));
    }

    #[test]
    fn test_from_anyhow() {
        let err: RagError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}
