//! Azure AI Search hybrid query over REST
//!
//! POST `{endpoint}/indexes/{index}/docs/search?api-version=...` with a
//! keyword `search` string and one vector query on the same request.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::errors::{RagError, Result};
use crate::search::FieldMappings;
use crate::services::{HybridQuery, SearchHit, SearchService};

const BACKEND: &str = "azure-search";
const SCORE_FIELD: &str = "@search.score";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    search: &'a str,
    vector_queries: Vec<VectorQueryBody<'a>>,
    top: usize,
    select: String,
}

#[derive(Debug, Serialize)]
struct VectorQueryBody<'a> {
    kind: &'static str,
    vector: &'a [f32],
    k: usize,
    fields: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<Map<String, Value>>,
}

/// Hybrid search against one Azure AI Search index
#[derive(Debug, Clone)]
pub struct AzureSearchBackend {
    client: Client,
    endpoint: String,
    index: String,
    api_key: String,
    api_version: String,
    fields: FieldMappings,
}

impl AzureSearchBackend {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        index: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
        fields: FieldMappings,
    ) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let index = index.into();
        let api_key = api_key.into();
        if endpoint.is_empty() || index.is_empty() || api_key.is_empty() {
            return Err(RagError::Config(
                "Azure Search needs an endpoint, an index and an API key".to_string(),
            ));
        }

        Ok(Self {
            client,
            endpoint,
            index,
            api_key,
            api_version: api_version.into(),
            fields,
        })
    }

    pub fn search_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint, self.index, self.api_version
        )
    }

    fn request_body<'a>(&self, query: &'a HybridQuery) -> SearchRequest<'a> {
        SearchRequest {
            search: &query.text,
            vector_queries: vec![VectorQueryBody {
                kind: "vector",
                vector: &query.vector.vector,
                k: query.vector.k_nearest_neighbors,
                fields: &query.vector.field,
            }],
            top: query.top,
            select: self.fields.select_fields(&query.select).join(","),
        }
    }

    /// Map one returned document onto logical fields
    fn to_hit(&self, document: &Map<String, Value>) -> SearchHit {
        let text = |field: &str| {
            document
                .get(field)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        SearchHit {
            content: text(&self.fields.content),
            title: text(&self.fields.title),
            url: self.fields.url.as_deref().and_then(text),
            category: self.fields.category.as_deref().and_then(text),
            score: document.get(SCORE_FIELD).and_then(Value::as_f64),
        }
    }
}

#[async_trait]
impl SearchService for AzureSearchBackend {
    async fn search(&self, query: &HybridQuery) -> Result<Vec<SearchHit>> {
        debug!(
            backend = BACKEND,
            index = %self.index,
            top = query.top,
            k = query.vector.k_nearest_neighbors,
            "hybrid search"
        );

        let response = self
            .client
            .post(self.search_url())
            .header("api-key", &self.api_key)
            .json(&self.request_body(query))
            .send()
            .await
            .map_err(|e| RagError::search(BACKEND, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(backend = BACKEND, %status, "search API error");
            return Err(RagError::search(
                BACKEND,
                format!("API returned {}: {}", status, body),
            ));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| RagError::search(BACKEND, format!("failed to parse response: {}", e)))?;

        Ok(parsed.value.iter().map(|doc| self.to_hit(doc)).collect())
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::VectorQuery;

    fn backend(fields: FieldMappings) -> AzureSearchBackend {
        AzureSearchBackend::new(
            Client::new(),
            "https://my-search.search.windows.net/",
            "docs-index",
            "key",
            "2023-11-01",
            fields,
        )
        .unwrap()
    }

    fn query() -> HybridQuery {
        HybridQuery {
            text: "Is 2.8 supported?".to_string(),
            vector: VectorQuery {
                vector: vec![0.5, -0.5],
                k_nearest_neighbors: 10,
                field: "text_vector".to_string(),
            },
            top: 10,
            select: vec!["content".to_string(), "title".to_string()],
        }
    }

    #[test]
    fn test_search_url() {
        assert_eq!(
            backend(FieldMappings::default()).search_url(),
            "https://my-search.search.windows.net/indexes/docs-index/docs/search?api-version=2023-11-01"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let query = query();
        let backend = backend(FieldMappings::default());
        let body = serde_json::to_value(backend.request_body(&query)).unwrap();

        assert_eq!(body["search"], "Is 2.8 supported?");
        assert_eq!(body["top"], 10);
        assert_eq!(body["select"], "chunk,title");
        assert_eq!(body["vectorQueries"][0]["kind"], "vector");
        assert_eq!(body["vectorQueries"][0]["k"], 10);
        assert_eq!(body["vectorQueries"][0]["fields"], "text_vector");
        assert_eq!(body["vectorQueries"][0]["vector"][1], -0.5);
    }

    #[test]
    fn test_documents_map_to_hits() {
        let backend = backend(FieldMappings {
            url: Some("source_url".to_string()),
            ..Default::default()
        });
        let response: SearchResponse = serde_json::from_str(
            r#"{"value": [
                {"@search.score": 0.032, "chunk": "2.8 reaches end of support in Oct 2025", "title": "Lifecycle", "source_url": "https://docs/lifecycle"},
                {"@search.score": 0.016, "chunk": null, "title": 42}
            ]}"#,
        )
        .unwrap();

        let hits: Vec<_> = response.value.iter().map(|d| backend.to_hit(d)).collect();
        assert_eq!(hits[0].content.as_deref(), Some("2.8 reaches end of support in Oct 2025"));
        assert_eq!(hits[0].title.as_deref(), Some("Lifecycle"));
        assert_eq!(hits[0].url.as_deref(), Some("https://docs/lifecycle"));
        assert_eq!(hits[0].score, Some(0.032));
        assert!(hits[1].content.is_none());
        assert!(hits[1].title.is_none());
    }

    #[test]
    fn test_missing_settings_rejected() {
        assert!(AzureSearchBackend::new(
            Client::new(),
            "https://x",
            "",
            "key",
            "2023-11-01",
            FieldMappings::default()
        )
        .is_err());
    }
}
