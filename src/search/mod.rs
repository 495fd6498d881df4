//! Search backends
//!
//! Both implement [`SearchService`](crate::services::SearchService) and map
//! index-specific field names back to the logical record fields.

pub mod azure;
pub mod qdrant;

use serde::{Deserialize, Serialize};

pub use self::azure::AzureSearchBackend;
pub use self::qdrant::QdrantSearchBackend;

/// Logical field -> index field names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMappings {
    pub id: String,
    pub content: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Default for FieldMappings {
    fn default() -> Self {
        Self {
            id: "chunk_id".to_string(),
            content: "chunk".to_string(),
            title: "title".to_string(),
            url: None,
            category: None,
        }
    }
}

impl FieldMappings {
    /// Index field for a logical field name; unknown names pass through
    pub fn index_field<'a>(&'a self, logical: &'a str) -> &'a str {
        match logical {
            "id" => &self.id,
            "content" => &self.content,
            "title" => &self.title,
            "url" => self.url.as_deref().unwrap_or(logical),
            "category" => self.category.as_deref().unwrap_or(logical),
            other => other,
        }
    }

    /// Index fields to request: the mapped `select` list plus any mapped
    /// url/category fields
    pub fn select_fields(&self, select: &[String]) -> Vec<String> {
        let mut fields: Vec<String> = select
            .iter()
            .map(|logical| self.index_field(logical).to_string())
            .collect();
        for extra in [&self.url, &self.category].into_iter().flatten() {
            if !fields.contains(extra) {
                fields.push(extra.clone());
            }
        }
        fields
    }
}
