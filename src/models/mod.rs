//! Model provider clients
//!
//! Each client implements both [`ChatService`](crate::services::ChatService)
//! and [`EmbeddingService`](crate::services::EmbeddingService):
//! - Azure OpenAI deployments
//! - a local Ollama server

pub mod azure;
pub mod ollama;
pub mod types;

use reqwest::Client;
use std::time::Duration;

use crate::errors::Result;

// Re-export key types for convenience
pub use azure::AzureOpenAiClient;
pub use ollama::OllamaClient;
pub use types::ModelInfo;

/// Shared HTTP client; one per process, cloned into every service client
pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("ragbuddy/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
