//! External service contracts
//!
//! The pipeline talks to three remote collaborators. Each is a trait so that
//! providers can be swapped (Azure, Ollama, Qdrant, in-memory fakes in tests)
//! without touching the stages that call them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Turns text into a fixed-length vector
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed a single text with the given model or deployment
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>>;

    /// Provider name for logs
    fn provider(&self) -> &str;
}

/// Hybrid lexical + vector search over a document index
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Run one query. Hits come back in backend rank order.
    async fn search(&self, query: &HybridQuery) -> Result<Vec<SearchHit>>;

    /// Backend name for logs
    fn backend(&self) -> &str;
}

/// Single-turn chat completion
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Provider name for logs
    fn provider(&self) -> &str;

    /// Cheap reachability probe
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Vector half of a hybrid query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub k_nearest_neighbors: usize,
    pub field: String,
}

/// One hybrid search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridQuery {
    pub text: String,
    pub vector: VectorQuery,
    pub top: usize,
    /// Index fields to return
    pub select: Vec<String>,
}

/// A candidate record from the index, already mapped to logical fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub category: Option<String>,
    /// Backend score, informational only
    pub score: Option<f64>,
}

/// System + user prompt pair sent to a chat model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Chat roles used on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatRequest {
    /// Messages in wire order, both prompts trimmed
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: Role::System,
                content: self.system_prompt.trim().to_string(),
            },
            ChatMessage {
                role: Role::User,
                content: self.user_prompt.trim().to_string(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_messages_are_trimmed() {
        let request = ChatRequest {
            system_prompt: "\n  be factual \n".to_string(),
            user_prompt: "  question  ".to_string(),
            model: "m".to_string(),
            temperature: 0.2,
            max_tokens: 800,
        };
        let messages = request.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "be factual");
        assert_eq!(messages[1].content, "question");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let message = ChatMessage {
            role: Role::Assistant,
            content: "hi".to_string(),
        };
        let value = serde_json::to_value(message).unwrap();
        assert_eq!(value["role"], "assistant");
    }
}
