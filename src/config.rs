//! Configuration management for RagBuddy
//!
//! Layers, lowest precedence first: built-in defaults, a TOML file
//! (`--config PATH` or `~/.ragbuddy/config.toml`), then `.env` and the
//! process environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{RagError, Result};
use crate::rag::context::{ContextConfig, MAX_CONTEXT_SOURCES};
use crate::rag::evaluator::EvaluationConfig;
use crate::rag::generator::GenerationConfig;
use crate::rag::recommend::{RecommendConfig, MAX_RECOMMENDATIONS};
use crate::rag::retrieval::{SearchParams, MAX_TOP_K};
use crate::rag::RAGConfig;
use crate::search::FieldMappings;

/// Directory under the home directory holding the default config file
pub const CONFIG_DIR: &str = ".ragbuddy";

/// Environment variables read on top of the file
pub const ENV_KEYS: [&str; 8] = [
    "OPENAI_ENDPOINT",
    "OPENAI_KEY",
    "EMBEDDING_DEPLOYMENT",
    "CHAT_DEPLOYMENT",
    "SEARCH_ENDPOINT",
    "SEARCH_INDEX",
    "SEARCH_KEY",
    "VECTOR_FIELD",
];

/// Complete configuration for RagBuddy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ModelProvider,
    pub azure_openai: AzureOpenAiConfig,
    pub ollama: OllamaConfig,
    pub search: SearchConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub evaluation: EvaluationConfig,
    pub context: ContextConfig,
    pub recommendations: RecommendConfig,
    pub http: HttpConfig,
}

/// Which provider serves chat and embeddings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    Azure,
    Ollama,
}

/// Which backend serves hybrid search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackendKind {
    #[default]
    Azure,
    Qdrant,
}

/// Azure OpenAI connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub embedding_deployment: String,
    pub chat_deployment: String,
}

/// Ollama connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
    pub chat_model: String,
    pub embedding_model: String,
}

/// Search backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub backend: SearchBackendKind,
    /// Full URL or bare Azure service name
    pub endpoint: String,
    pub index: String,
    pub api_key: String,
    pub api_version: String,
    pub vector_field: String,
    pub top_k: usize,
    pub qdrant_url: String,
    pub collection: String,
    /// Logical field -> index field names
    pub fields: FieldMappings,
}

/// Local re-filtering of retrieved candidates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Keep only results whose cosine similarity to the query exceeds this
    pub similarity_threshold: Option<f64>,
}

/// Shared HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for AzureOpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_version: "2024-12-01-preview".to_string(),
            embedding_deployment: "embedding01".to_string(),
            chat_deployment: "deployment02".to_string(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11434,
            chat_model: "qwen2.5:7b-instruct".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackendKind::Azure,
            endpoint: String::new(),
            index: String::new(),
            api_key: String::new(),
            api_version: "2023-11-01".to_string(),
            vector_field: "text_vector".to_string(),
            top_k: MAX_TOP_K,
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "knowledge".to_string(),
            fields: FieldMappings::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

impl Config {
    /// Load every layer. Does not validate; callers decide when to.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!(path = %env_file.display(), "loaded .env");
        }

        let mut config = match path {
            Some(config_path) => Self::load_from_file(&config_path)?,
            None => Self::load_default()?,
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML file; missing keys take their defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RagError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents)
            .map_err(|e| RagError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load `~/.ragbuddy/config.toml` if it exists, else built-in defaults
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(config_path) if config_path.exists() => Self::load_from_file(&config_path),
            _ => Ok(Config::default()),
        }
    }

    /// Standard config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR).join("config.toml"))
    }

    /// Overlay values found by `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(v) = get("OPENAI_ENDPOINT") {
            self.azure_openai.endpoint = v;
        }
        if let Some(v) = get("OPENAI_KEY") {
            self.azure_openai.api_key = v;
        }
        if let Some(v) = get("EMBEDDING_DEPLOYMENT") {
            self.azure_openai.embedding_deployment = v;
        }
        if let Some(v) = get("CHAT_DEPLOYMENT") {
            self.azure_openai.chat_deployment = v;
        }
        if let Some(v) = get("SEARCH_ENDPOINT") {
            self.search.endpoint = v;
        }
        if let Some(v) = get("SEARCH_INDEX") {
            self.search.index = v;
        }
        if let Some(v) = get("SEARCH_KEY") {
            self.search.api_key = v;
        }
        if let Some(v) = get("VECTOR_FIELD") {
            self.search.vector_field = v;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.context.max_sources == 0 || self.context.max_sources > MAX_CONTEXT_SOURCES {
            return Err(RagError::Config(format!(
                "context.max_sources must be between 1 and {}",
                MAX_CONTEXT_SOURCES
            )));
        }

        if self.search.top_k == 0 || self.search.top_k > MAX_TOP_K {
            return Err(RagError::Config(format!(
                "search.top_k must be between 1 and {}",
                MAX_TOP_K
            )));
        }

        if self.search.vector_field.trim().is_empty() {
            return Err(RagError::Config(
                "search.vector_field must not be empty".to_string(),
            ));
        }

        for (name, temperature) in [
            ("generation.temperature", self.generation.temperature),
            ("evaluation.temperature", self.evaluation.temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(RagError::Config(format!(
                    "{} must be between 0.0 and 2.0",
                    name
                )));
            }
        }

        if self.generation.max_tokens == 0 || self.evaluation.max_tokens == 0 {
            return Err(RagError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if let Some(threshold) = self.retrieval.similarity_threshold {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(RagError::Config(
                    "retrieval.similarity_threshold must be between -1.0 and 1.0".to_string(),
                ));
            }
        }

        if self.recommendations.max_items > MAX_RECOMMENDATIONS {
            return Err(RagError::Config(format!(
                "recommendations.max_items must be at most {}",
                MAX_RECOMMENDATIONS
            )));
        }

        if self.http.timeout_secs == 0 {
            return Err(RagError::Config(
                "http.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.provider == ModelProvider::Azure {
            require("azure_openai.endpoint (OPENAI_ENDPOINT)", &self.azure_openai.endpoint)?;
            require("azure_openai.api_key (OPENAI_KEY)", &self.azure_openai.api_key)?;
        }

        match self.search.backend {
            SearchBackendKind::Azure => {
                require("search.endpoint (SEARCH_ENDPOINT)", &self.search.endpoint)?;
                require("search.index (SEARCH_INDEX)", &self.search.index)?;
                require("search.api_key (SEARCH_KEY)", &self.search.api_key)?;
            }
            SearchBackendKind::Qdrant => {
                require("search.qdrant_url", &self.search.qdrant_url)?;
                require("search.collection", &self.search.collection)?;
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RagError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RagError::Config(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| RagError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Azure Search base URL; a bare service name expands to its public endpoint
    pub fn search_url(&self) -> String {
        let endpoint = self.search.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() || endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("https://{}.search.windows.net", endpoint)
        }
    }

    /// Get Ollama base URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// Chat model or deployment for the selected provider
    pub fn chat_model(&self) -> &str {
        match self.provider {
            ModelProvider::Azure => &self.azure_openai.chat_deployment,
            ModelProvider::Ollama => &self.ollama.chat_model,
        }
    }

    /// Embedding model or deployment for the selected provider
    pub fn embedding_model(&self) -> &str {
        match self.provider {
            ModelProvider::Azure => &self.azure_openai.embedding_deployment,
            ModelProvider::Ollama => &self.ollama.embedding_model,
        }
    }

    /// Stage settings for the pipeline
    pub fn rag_config(&self) -> RAGConfig {
        RAGConfig {
            retrieval: SearchParams {
                top_k: self.search.top_k,
                vector_field: self.search.vector_field.clone(),
                similarity_threshold: self.retrieval.similarity_threshold,
            },
            context: self.context.clone(),
            generation: self.generation.clone(),
            evaluation: self.evaluation.clone(),
            recommendations: self.recommendations.clone(),
        }
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(RagError::Config(format!("{} is required", name)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn azure_config() -> Config {
        let mut config = Config::default();
        config.azure_openai.endpoint = "https://example.openai.azure.com/".to_string();
        config.azure_openai.api_key = "key".to_string();
        config.search.endpoint = "example-search".to_string();
        config.search.index = "docs".to_string();
        config.search.api_key = "search-key".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider, ModelProvider::Azure);
        assert_eq!(config.azure_openai.api_version, "2024-12-01-preview");
        assert_eq!(config.azure_openai.embedding_deployment, "embedding01");
        assert_eq!(config.azure_openai.chat_deployment, "deployment02");
        assert_eq!(config.search.vector_field, "text_vector");
        assert_eq!(config.search.top_k, 10);
        assert_eq!(config.search.fields.content, "chunk");
        assert_eq!(config.context.max_sources, 5);
        assert_eq!(config.generation.max_tokens, 800);
        assert!(config.retrieval.similarity_threshold.is_none());
    }

    #[test]
    fn test_defaults_need_credentials() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("OPENAI_ENDPOINT"));
        assert!(azure_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_ranges() {
        let mut config = azure_config();
        config.context.max_sources = 6;
        assert!(config.validate().is_err());

        let mut config = azure_config();
        config.search.top_k = 11;
        assert!(config.validate().is_err());

        let mut config = azure_config();
        config.generation.temperature = 2.5;
        assert!(config.validate().is_err());

        let mut config = azure_config();
        config.evaluation.max_tokens = 0;
        assert!(config.validate().is_err());

        let mut config = azure_config();
        config.retrieval.similarity_threshold = Some(1.5);
        assert!(config.validate().is_err());

        let mut config = azure_config();
        config.recommendations.max_items = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ollama_and_qdrant_need_no_keys() {
        let mut config = Config::default();
        config.provider = ModelProvider::Ollama;
        config.search.backend = SearchBackendKind::Qdrant;
        assert!(config.validate().is_ok());
        assert_eq!(config.chat_model(), "qwen2.5:7b-instruct");
        assert_eq!(config.ollama_url(), "http://127.0.0.1:11434");
    }

    #[test]
    fn test_apply_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_ENDPOINT", "https://env.openai.azure.com"),
            ("OPENAI_KEY", "env-key"),
            ("CHAT_DEPLOYMENT", "gpt-env"),
            ("SEARCH_INDEX", "env-index"),
            ("VECTOR_FIELD", "contentVector"),
            ("SEARCH_KEY", "   "),
        ]
        .into_iter()
        .collect();

        let mut config = azure_config();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.azure_openai.endpoint, "https://env.openai.azure.com");
        assert_eq!(config.azure_openai.api_key, "env-key");
        assert_eq!(config.chat_model(), "gpt-env");
        assert_eq!(config.embedding_model(), "embedding01");
        assert_eq!(config.search.index, "env-index");
        assert_eq!(config.search.vector_field, "contentVector");
        // blank values do not clobber the file layer
        assert_eq!(config.search.api_key, "search-key");
    }

    #[test]
    fn test_search_url_expansion() {
        let mut config = Config::default();
        config.search.endpoint = "my-search".to_string();
        assert_eq!(config.search_url(), "https://my-search.search.windows.net");

        config.search.endpoint = "https://custom.example.com/".to_string();
        assert_eq!(config.search_url(), "https://custom.example.com");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = azure_config();
        config.retrieval.similarity_threshold = Some(0.7);
        config.search.fields.url = Some("source_url".to_string());
        config.save(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "provider = \"ollama\"\n\n[search]\nbackend = \"qdrant\"\ncollection = \"manuals\"\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.provider, ModelProvider::Ollama);
        assert_eq!(config.search.backend, SearchBackendKind::Qdrant);
        assert_eq!(config.search.collection, "manuals");
        assert_eq!(config.search.top_k, 10);
        assert_eq!(config.evaluation.temperature, 0.1);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "provider = [").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(RagError::Config(_))
        ));
    }

    #[test]
    fn test_rag_config_mapping() {
        let mut config = azure_config();
        config.search.top_k = 7;
        config.retrieval.similarity_threshold = Some(0.5);
        let rag = config.rag_config();
        assert_eq!(rag.retrieval.top_k, 7);
        assert_eq!(rag.retrieval.vector_field, "text_vector");
        assert_eq!(rag.retrieval.similarity_threshold, Some(0.5));
        assert_eq!(rag.context.max_sources, 5);
    }
}
