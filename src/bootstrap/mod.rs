//! Bootstrap for RagBuddy
//!
//! Builds the shared HTTP client, the provider and search clients, and the
//! pipeline exactly once from a validated configuration.

use std::sync::Arc;
use tracing::info;

use crate::config::{Config, ModelProvider, SearchBackendKind, ENV_KEYS};
use crate::errors::Result;
use crate::models::{build_http_client, AzureOpenAiClient, OllamaClient};
use crate::rag::{RAGPipeline, ServiceHandles};
use crate::search::{AzureSearchBackend, QdrantSearchBackend};
use crate::services::{ChatService, EmbeddingService, SearchService};

/// Exit code for setup needed
pub const EXIT_CODE_SETUP_NEEDED: i32 = 2;

/// Construct the service clients described by `config`
pub fn build_services(config: &Config) -> Result<ServiceHandles> {
    let http = build_http_client(config.http.timeout_secs)?;

    let (chat, embeddings): (Arc<dyn ChatService>, Arc<dyn EmbeddingService>) =
        match config.provider {
            ModelProvider::Azure => {
                let client = Arc::new(AzureOpenAiClient::new(
                    http.clone(),
                    &config.azure_openai.endpoint,
                    &config.azure_openai.api_key,
                    &config.azure_openai.api_version,
                )?);
                (client.clone(), client)
            }
            ModelProvider::Ollama => {
                let client = Arc::new(OllamaClient::new(http.clone(), config.ollama_url()));
                (client.clone(), client)
            }
        };

    let search: Arc<dyn SearchService> = match config.search.backend {
        SearchBackendKind::Azure => Arc::new(AzureSearchBackend::new(
            http,
            config.search_url(),
            &config.search.index,
            &config.search.api_key,
            &config.search.api_version,
            config.search.fields.clone(),
        )?),
        SearchBackendKind::Qdrant => Arc::new(QdrantSearchBackend::new(
            &config.search.qdrant_url,
            &config.search.collection,
            config.search.fields.clone(),
        )?),
    };

    info!(
        provider = chat.provider(),
        backend = search.backend(),
        chat_model = config.chat_model(),
        embedding_model = config.embedding_model(),
        "services ready"
    );

    Ok(ServiceHandles {
        chat,
        embeddings,
        search,
        chat_model: config.chat_model().to_string(),
        embedding_model: config.embedding_model().to_string(),
    })
}

/// Validate `config` and build the pipeline
pub fn build_pipeline(config: &Config) -> Result<RAGPipeline> {
    config.validate()?;
    let services = build_services(config)?;
    Ok(RAGPipeline::with_config(services, config.rag_config()))
}

/// Display what needs to be configured before the first run
pub fn show_setup_instructions(reason: &str) {
    eprintln!("\n❌ RagBuddy is not configured: {}", reason);
    eprintln!("\nSet these in the environment or a .env file:");
    for key in ENV_KEYS {
        eprintln!("   {}", key);
    }
    eprintln!("\nOr write a config file and edit it:");
    eprintln!("   ragbuddy config --init");
    eprintln!("\nFor a fully local setup set provider = \"ollama\" and");
    eprintln!("search.backend = \"qdrant\" in the config file.");
    eprintln!();
}
