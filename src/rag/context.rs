// Context composer: numbered source blocks for grounded prompts
use serde::{Deserialize, Serialize};

use crate::types::records::{DEFAULT_SOURCE_CATEGORY, DEFAULT_SOURCE_URL};
use crate::types::{SearchResult, SourceEntry, SourceId, SourceMap};

/// Hard ceiling on sources placed in one context window
pub const MAX_CONTEXT_SOURCES: usize = 5;

/// Context assembly configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Number of leading results considered, capped at [`MAX_CONTEXT_SOURCES`]
    pub max_sources: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_sources: MAX_CONTEXT_SOURCES,
        }
    }
}

/// Composed context and the lookup map behind its citation identifiers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreparedContext {
    pub text: String,
    pub source_map: SourceMap,
}

/// Deterministic context composer.
///
/// Identifiers follow retrieval position: the result at position `i` (1-indexed)
/// is always `Source_i`. A result whose chunk is empty after trimming is skipped
/// and its identifier is not reused, so the map may have gaps (`Source_1`,
/// `Source_3`, ...).
#[derive(Debug, Clone, Default)]
pub struct ContextComposer {
    config: ContextConfig,
}

impl ContextComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn prepare(&self, results: &[SearchResult]) -> PreparedContext {
        let limit = self.config.max_sources.min(MAX_CONTEXT_SOURCES);
        let mut entries = Vec::new();
        let mut source_map = SourceMap::new();

        for (position, result) in results.iter().take(limit).enumerate() {
            let id = SourceId::new(position + 1);
            let chunk = result.chunk.trim();
            if chunk.is_empty() {
                continue;
            }

            entries.push(format!("{}: {}", id, chunk));
            source_map.insert(
                id,
                SourceEntry {
                    title: if result.title.trim().is_empty() {
                        format!("Document {}", id.ordinal())
                    } else {
                        result.title.clone()
                    },
                    content: chunk.to_string(),
                    url: result
                        .url
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
                    category: result
                        .category
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SOURCE_CATEGORY.to_string()),
                },
            );
        }

        PreparedContext {
            text: entries.join("\n\n"),
            source_map,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ContextConfig) {
        self.config = config;
    }
}
