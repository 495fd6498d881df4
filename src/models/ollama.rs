//! Ollama client
//!
//! Non-streaming chat via POST /api/chat and embeddings via
//! POST /api/embeddings against a local Ollama server.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

use crate::errors::{RagError, Result};
use crate::models::types::{
    ModelInfo, ModelsResponse, OllamaChatRequest, OllamaChatResponse, OllamaEmbeddingRequest,
    OllamaEmbeddingResponse, OllamaOptions,
};
use crate::services::{ChatRequest, ChatService, EmbeddingService};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

const PROVIDER: &str = "ollama";

/// Probe timeout for health checks
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Ollama chat + embedding client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// List installed models
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| RagError::chat(PROVIDER, format!("Failed to list models: {}", e)))?;

        if !response.status().is_success() {
            return Err(RagError::chat(
                PROVIDER,
                format!("Failed to retrieve model list: HTTP {}", response.status()),
            ));
        }

        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| RagError::chat(PROVIDER, format!("Failed to parse models: {}", e)))?;
        Ok(models.models)
    }

    /// True when `model` (with or without the `:latest` tag) is installed
    pub async fn has_model(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| model_matches(&m.name, model)))
    }

    async fn error_text(response: reqwest::Response) -> String {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        format!("HTTP {}: {}", status, text)
    }
}

fn model_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted || installed.strip_suffix(":latest") == Some(wanted)
}

#[async_trait]
impl ChatService for OllamaClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        debug!(provider = PROVIDER, model = %request.model, "chat completion");

        let body = OllamaChatRequest {
            model: &request.model,
            messages: request.messages(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::chat(PROVIDER, format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let message = Self::error_text(response).await;
            error!(provider = PROVIDER, error = %message, "chat request failed");
            return Err(RagError::chat(PROVIDER, message));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| RagError::chat(PROVIDER, format!("Failed to parse response: {}", e)))?;
        Ok(parsed.message.content)
    }

    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(self.url("/api/version"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

#[async_trait]
impl EmbeddingService for OllamaClient {
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, model = %model, text_len = text.len(), "embedding text");

        let response = self
            .client
            .post(self.url("/api/embeddings"))
            .json(&OllamaEmbeddingRequest { model, prompt: text })
            .send()
            .await
            .map_err(|e| RagError::embedding(PROVIDER, format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let message = Self::error_text(response).await;
            error!(provider = PROVIDER, error = %message, "embedding request failed");
            return Err(RagError::embedding(PROVIDER, message));
        }

        let parsed: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
            RagError::embedding(PROVIDER, format!("Failed to parse response: {}", e))
        })?;
        Ok(parsed.embedding)
    }

    fn provider(&self) -> &str {
        PROVIDER
    }
}
