//! Wire types for the model providers
//!
//! Azure OpenAI speaks the OpenAI REST shapes; Ollama has its own.

use serde::{Deserialize, Serialize};

use crate::services::ChatMessage;

// ── Azure OpenAI ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct EmbeddingRequest<'a> {
    pub input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingData {
    pub embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    /// Null when the completion was filtered
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub message: String,
}

/// Prefer the structured `error.message`, else the raw body
pub(crate) fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

// ── Ollama ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct OllamaChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: OllamaOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct OllamaOptions {
    pub temperature: f32,
    /// Ollama's name for max_tokens
    pub num_predict: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OllamaChatResponse {
    pub message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OllamaMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OllamaEmbeddingRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OllamaEmbeddingResponse {
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// Response from Ollama /api/tags endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// Information about an installed Ollama model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name (e.g., "llama3.1:8b")
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Role;

    #[test]
    fn test_error_detail_prefers_structured_message() {
        let body = r#"{"error": {"code": "401", "message": "Access denied due to invalid subscription key."}}"#;
        assert_eq!(
            error_detail(body.to_string()),
            "Access denied due to invalid subscription key."
        );
        assert_eq!(error_detail("Bad Gateway".to_string()), "Bad Gateway");
    }

    #[test]
    fn test_chat_completion_with_filtered_content() {
        let body = r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": null}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[test]
    fn test_ollama_chat_request_shape() {
        let request = OllamaChatRequest {
            model: "qwen2.5:7b-instruct",
            messages: vec![ChatMessage {
                role: Role::User,
                content: "hi".to_string(),
            }],
            stream: false,
            options: OllamaOptions {
                temperature: 0.5,
                num_predict: 800,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_predict"], 800);
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_models_response_parsing() {
        let body = r#"{"models": [{"name": "nomic-embed-text:latest", "size": 274302450, "digest": "abc"}]}"#;
        let parsed: ModelsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.models[0].name, "nomic-embed-text:latest");
    }
}
