//! Doctor command for backend diagnostics
//!
//! Checks that the configuration is usable and that every remote service the
//! pipeline depends on answers a minimal request.

use colored::Colorize;

use crate::bootstrap::build_services;
use crate::config::{Config, ModelProvider};
use crate::models::{build_http_client, OllamaClient};
use crate::rag::retrieval::engine::SELECT_FIELDS;
use crate::rag::ServiceHandles;
use crate::services::{HybridQuery, VectorQuery};

/// Text embedded and searched by the probes
const PROBE_TEXT: &str = "health check";

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Pass,
        }
    }

    fn warn(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Warn(message.into()),
        }
    }

    fn fail(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Fail(message.into()),
        }
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    config: Config,
}

impl Doctor {
    /// Create a new doctor instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let mut checks = vec![self.check_config()];

        match build_services(&self.config) {
            Ok(services) => checks.extend(
                Self::check_services(&services, &self.config.search.vector_field).await,
            ),
            Err(e) => checks.push(HealthCheck::fail("Service Clients", e.to_string())),
        }

        if self.config.provider == ModelProvider::Ollama {
            checks.push(self.check_ollama_models().await);
        }

        checks
    }

    /// Check 1: configuration validity
    fn check_config(&self) -> HealthCheck {
        match self.config.validate() {
            Ok(()) => HealthCheck::pass("Configuration"),
            Err(e) => HealthCheck::fail("Configuration", e.to_string()),
        }
    }

    /// Checks 2-4: chat reachable, embedding returns a vector, search answers a probe
    pub async fn check_services(services: &ServiceHandles, vector_field: &str) -> Vec<HealthCheck> {
        let mut checks = Vec::new();

        checks.push(match services.chat.health_check().await {
            Ok(true) => HealthCheck::pass("Chat Model"),
            Ok(false) => HealthCheck::fail(
                "Chat Model",
                format!("{} not reachable", services.chat.provider()),
            ),
            Err(e) => HealthCheck::fail("Chat Model", e.to_string()),
        });

        let vector = match services
            .embeddings
            .embed(PROBE_TEXT, &services.embedding_model)
            .await
        {
            Ok(vector) if !vector.is_empty() => {
                checks.push(HealthCheck::pass("Embeddings"));
                Some(vector)
            }
            Ok(_) => {
                checks.push(HealthCheck::fail("Embeddings", "empty vector returned"));
                None
            }
            Err(e) => {
                checks.push(HealthCheck::fail("Embeddings", e.to_string()));
                None
            }
        };

        checks.push(match vector {
            Some(vector) => {
                let probe = HybridQuery {
                    text: PROBE_TEXT.to_string(),
                    vector: VectorQuery {
                        vector,
                        k_nearest_neighbors: 1,
                        field: vector_field.to_string(),
                    },
                    top: 1,
                    select: SELECT_FIELDS.iter().map(|f| f.to_string()).collect(),
                };
                match services.search.search(&probe).await {
                    Ok(hits) if hits.is_empty() => {
                        HealthCheck::warn("Search Index", "index answered but returned no documents")
                    }
                    Ok(_) => HealthCheck::pass("Search Index"),
                    Err(e) => HealthCheck::fail("Search Index", e.to_string()),
                }
            }
            None => HealthCheck::warn("Search Index", "skipped, no embedding for the probe"),
        });

        checks
    }

    /// Check 5: configured Ollama models are installed
    async fn check_ollama_models(&self) -> HealthCheck {
        let client = match build_http_client(self.config.http.timeout_secs) {
            Ok(http) => OllamaClient::new(http, self.config.ollama_url()),
            Err(e) => return HealthCheck::fail("Ollama Models", e.to_string()),
        };

        let wanted = [&self.config.ollama.chat_model, &self.config.ollama.embedding_model];
        let mut missing = Vec::new();
        for model in wanted {
            match client.has_model(model).await {
                Ok(true) => {}
                Ok(false) => missing.push(model.as_str()),
                Err(e) => return HealthCheck::fail("Ollama Models", e.to_string()),
            }
        }

        if missing.is_empty() {
            HealthCheck::pass("Ollama Models")
        } else {
            HealthCheck::fail(
                "Ollama Models",
                format!("not installed: {} (run: ollama pull <model>)", missing.join(", ")),
            )
        }
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n🔍 RagBuddy Diagnostics\n");
        println!("{:<20} Status", "Check");
        println!("{}", "=".repeat(50));

        for check in checks {
            let status = match &check.status {
                HealthStatus::Pass => "✅ PASS".green().to_string(),
                HealthStatus::Warn(msg) => format!("⚠️  WARN: {}", msg).yellow().to_string(),
                HealthStatus::Fail(msg) => format!("❌ FAIL: {}", msg).red().to_string(),
            };
            println!("{:<20} {}", check.name, status);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{RagError, Result};
    use crate::services::{
        ChatRequest, ChatService, EmbeddingService, SearchHit, SearchService,
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Stub {
        healthy: bool,
        vector: Vec<f32>,
        hits: usize,
    }

    #[async_trait]
    impl ChatService for Stub {
        async fn complete(&self, _request: &ChatRequest) -> Result<String> {
            Ok(String::new())
        }
        fn provider(&self) -> &str {
            "stub"
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(self.healthy)
        }
    }

    #[async_trait]
    impl EmbeddingService for Stub {
        async fn embed(&self, _text: &str, _model: &str) -> Result<Vec<f32>> {
            if self.vector.is_empty() {
                Err(RagError::embedding("stub", "401"))
            } else {
                Ok(self.vector.clone())
            }
        }
        fn provider(&self) -> &str {
            "stub"
        }
    }

    #[async_trait]
    impl SearchService for Stub {
        async fn search(&self, _query: &HybridQuery) -> Result<Vec<SearchHit>> {
            Ok(vec![SearchHit::default(); self.hits])
        }
        fn backend(&self) -> &str {
            "stub"
        }
    }

    fn services(stub: Stub) -> ServiceHandles {
        let stub = Arc::new(stub);
        ServiceHandles {
            chat: stub.clone(),
            embeddings: stub.clone(),
            search: stub,
            chat_model: "chat".to_string(),
            embedding_model: "embed".to_string(),
        }
    }

    #[test]
    fn test_health_status_equality() {
        assert_eq!(HealthStatus::Pass, HealthStatus::Pass);
        assert_eq!(
            HealthStatus::Warn("test".to_string()),
            HealthStatus::Warn("test".to_string())
        );
    }

    #[test]
    fn test_overall_status() {
        let checks = vec![HealthCheck::pass("a"), HealthCheck::warn("b", "w")];
        assert!(Doctor::overall_status(&checks));

        let checks = vec![HealthCheck::pass("a"), HealthCheck::fail("b", "f")];
        assert!(!Doctor::overall_status(&checks));
    }

    #[tokio::test]
    async fn test_all_services_healthy() {
        let checks = Doctor::check_services(&services(Stub {
            healthy: true,
            vector: vec![1.0, 0.0],
            hits: 1,
        }), "text_vector")
        .await;
        assert_eq!(checks.len(), 3);
        assert!(checks.iter().all(|c| c.status == HealthStatus::Pass));
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_search() {
        let checks = Doctor::check_services(&services(Stub {
            healthy: false,
            vector: Vec::new(),
            hits: 1,
        }), "text_vector")
        .await;
        assert!(matches!(checks[0].status, HealthStatus::Fail(_)));
        assert!(matches!(checks[1].status, HealthStatus::Fail(_)));
        assert!(matches!(checks[2].status, HealthStatus::Warn(_)));
    }

    #[tokio::test]
    async fn test_empty_index_warns() {
        let checks = Doctor::check_services(&services(Stub {
            healthy: true,
            vector: vec![1.0],
            hits: 0,
        }), "text_vector")
        .await;
        assert!(matches!(checks[2].status, HealthStatus::Warn(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_defaults_fail() {
        let checks = Doctor::new(Config::default()).run_diagnostics().await;
        assert_eq!(checks[0].name, "Configuration");
        assert!(!Doctor::overall_status(&checks));
    }
}
