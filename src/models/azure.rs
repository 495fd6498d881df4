//! Azure OpenAI client
//!
//! Calls deployment-scoped REST endpoints:
//! `{endpoint}/openai/deployments/{deployment}/{operation}?api-version=...`
//! with the key in the `api-key` header.

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, error};

use crate::errors::{RagError, Result};
use crate::models::types::{
    error_detail, ChatCompletionRequest, ChatCompletionResponse, EmbeddingRequest,
    EmbeddingResponse,
};
use crate::services::{ChatRequest, ChatService, EmbeddingService};

const PROVIDER: &str = "azure-openai";

/// Chat and embedding client for one Azure OpenAI resource
#[derive(Debug, Clone)]
pub struct AzureOpenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
}

impl AzureOpenAiClient {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Result<Self> {
        let endpoint = endpoint.into().trim().trim_end_matches('/').to_string();
        let api_key = api_key.into();
        if endpoint.is_empty() {
            return Err(RagError::Config("Azure OpenAI endpoint must not be empty".into()));
        }
        if api_key.is_empty() {
            return Err(RagError::Config("Azure OpenAI API key must not be empty".into()));
        }

        Ok(Self {
            client,
            endpoint,
            api_key,
            api_version: api_version.into(),
        })
    }

    /// URL for an operation on a deployment
    pub fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint, deployment, operation, self.api_version
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<T: serde::Serialize>(&self, url: &str, body: &T) -> std::result::Result<Response, String> {
        let response = self
            .client
            .post(url)
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API returned {}: {}", status, error_detail(body)));
        }
        Ok(response)
    }
}

/// First choice's text; a filtered (null) completion reads as empty
fn first_choice(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| RagError::chat(PROVIDER, "API returned no choices"))
}

fn first_embedding(response: EmbeddingResponse) -> Result<Vec<f32>> {
    response
        .data
        .into_iter()
        .next()
        .map(|data| data.embedding)
        .ok_or_else(|| RagError::embedding(PROVIDER, "API returned empty response"))
}

#[async_trait]
impl EmbeddingService for AzureOpenAiClient {
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, deployment = %model, text_len = text.len(), "embedding text");

        let url = self.deployment_url(model, "embeddings");
        let response = self
            .post(&url, &EmbeddingRequest { input: vec![text] })
            .await
            .map_err(|message| {
                error!(provider = PROVIDER, error = %message, "embedding request failed");
                RagError::embedding(PROVIDER, message)
            })?;

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            RagError::embedding(PROVIDER, format!("failed to parse response: {}", e))
        })?;
        first_embedding(parsed)
    }

    fn provider(&self) -> &str {
        PROVIDER
    }
}

#[async_trait]
impl ChatService for AzureOpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        debug!(
            provider = PROVIDER,
            deployment = %request.model,
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            "chat completion"
        );

        let url = self.deployment_url(&request.model, "chat/completions");
        let body = ChatCompletionRequest {
            messages: request.messages(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let response = self.post(&url, &body).await.map_err(|message| {
            error!(provider = PROVIDER, error = %message, "chat request failed");
            RagError::chat(PROVIDER, message)
        })?;

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| RagError::chat(PROVIDER, format!("failed to parse response: {}", e)))?;
        first_choice(parsed)
    }

    fn provider(&self) -> &str {
        PROVIDER
    }

    /// Lists the resource's models; any 2xx means the key and endpoint work
    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/openai/models?api-version={}", self.endpoint, self.api_version);
        match self
            .client
            .get(&url)
            .header("api-key", &self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}
