// Knowledge retriever: hybrid lexical + vector search over the configured index
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::rag::embedding::{cosine_similarity, EmbeddingClient};
use crate::services::{HybridQuery, SearchHit, SearchService, VectorQuery};
use crate::types::SearchResult;

/// Upper bound on results returned by one search
pub const MAX_TOP_K: usize = 10;

/// Threshold used by [`KnowledgeRetriever::filter_by_similarity`] when none is configured
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Logical fields requested from the index
pub const SELECT_FIELDS: [&str; 2] = ["content", "title"];

/// Search parameters for retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Maximum number of results to retrieve
    pub top_k: usize,
    /// Index field holding chunk embeddings
    pub vector_field: String,
    /// When set, re-rank locally by cosine similarity and drop results at or below it
    pub similarity_threshold: Option<f64>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: MAX_TOP_K,
            vector_field: "text_vector".to_string(),
            similarity_threshold: None,
        }
    }
}

/// Retrieval engine over a [`SearchService`]
pub struct KnowledgeRetriever {
    search: Arc<dyn SearchService>,
    embedder: EmbeddingClient,
    params: SearchParams,
}

impl KnowledgeRetriever {
    pub fn new(search: Arc<dyn SearchService>, embedder: EmbeddingClient) -> Self {
        Self::with_params(search, embedder, SearchParams::default())
    }

    pub fn with_params(
        search: Arc<dyn SearchService>,
        embedder: EmbeddingClient,
        params: SearchParams,
    ) -> Self {
        Self {
            search,
            embedder,
            params,
        }
    }

    /// Retrieve at most `top_k` (never more than 10) results in backend rank order.
    ///
    /// Any failure, including a query that cannot be embedded, yields an empty list.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        let Some(vector) = self.embedder.embed(query).await else {
            warn!("query could not be embedded, skipping search");
            return Vec::new();
        };

        let top = self.params.top_k.clamp(1, MAX_TOP_K);
        let query_vector = self.params.similarity_threshold.map(|_| vector.clone());
        let request = HybridQuery {
            text: query.to_string(),
            vector: VectorQuery {
                vector,
                k_nearest_neighbors: top,
                field: self.params.vector_field.clone(),
            },
            top,
            select: SELECT_FIELDS.iter().map(|f| f.to_string()).collect(),
        };

        let hits = match self.search.search(&request).await {
            Ok(hits) => hits,
            Err(e) => {
                error!(backend = self.search.backend(), error = %e, "Knowledge base search error");
                return Vec::new();
            }
        };

        let mut results: Vec<SearchResult> = hits.into_iter().take(top).map(into_result).collect();
        info!(backend = self.search.backend(), count = results.len(), "retrieved search results");

        if let (Some(threshold), Some(query_vector)) =
            (self.params.similarity_threshold, query_vector)
        {
            results = self.filter_with_vector(results, &query_vector, threshold).await;
        }

        results
    }

    /// Pure-vector local filter for backends without native hybrid scoring.
    ///
    /// Embeds the query and every candidate chunk, keeps results strictly above
    /// `threshold` with relevance set to the similarity, sorted descending.
    pub async fn filter_by_similarity(
        &self,
        results: Vec<SearchResult>,
        query: &str,
        threshold: f64,
    ) -> Vec<SearchResult> {
        let Some(query_vector) = self.embedder.embed(query).await else {
            return Vec::new();
        };
        self.filter_with_vector(results, &query_vector, threshold).await
    }

    async fn filter_with_vector(
        &self,
        results: Vec<SearchResult>,
        query_vector: &[f32],
        threshold: f64,
    ) -> Vec<SearchResult> {
        let mut kept = Vec::with_capacity(results.len());
        for mut result in results {
            let Some(chunk_vector) = self.embedder.embed(&result.chunk).await else {
                continue;
            };
            let similarity = cosine_similarity(query_vector, &chunk_vector);
            if similarity > threshold {
                result.relevance = similarity;
                kept.push(result);
            }
        }

        kept.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        debug!(kept = kept.len(), threshold, "filtered results by similarity");
        kept
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn set_params(&mut self, params: SearchParams) {
        self.params = params;
    }
}

fn into_result(hit: SearchHit) -> SearchResult {
    let mut result = SearchResult::ranked(
        hit.content.as_deref().unwrap_or_default(),
        hit.title.as_deref().unwrap_or_default(),
    );
    result.url = hit.url;
    result.category = hit.category;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{RagError, Result};
    use crate::services::EmbeddingService;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Embeds by keyword: texts mentioning "support" point one way, others another
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingService for KeywordEmbedder {
        async fn embed(&self, text: &str, _model: &str) -> Result<Vec<f32>> {
            if text.contains("unembeddable") {
                return Err(RagError::embedding("keyword", "refused"));
            }
            if text.contains("support") {
                Ok(vec![1.0, 0.1])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }

        fn provider(&self) -> &str {
            "keyword"
        }
    }

    struct FixedSearch {
        hits: Vec<SearchHit>,
        fail: bool,
        seen: Mutex<Option<HybridQuery>>,
    }

    #[async_trait]
    impl SearchService for FixedSearch {
        async fn search(&self, query: &HybridQuery) -> Result<Vec<SearchHit>> {
            *self.seen.lock().unwrap() = Some(query.clone());
            if self.fail {
                return Err(RagError::search("fixed", "403 Forbidden"));
            }
            Ok(self.hits.clone())
        }

        fn backend(&self) -> &str {
            "fixed"
        }
    }

    fn hit(content: &str, title: Option<&str>) -> SearchHit {
        SearchHit {
            content: Some(content.to_string()),
            title: title.map(str::to_string),
            score: Some(3.2),
            ..Default::default()
        }
    }

    fn retriever(hits: Vec<SearchHit>, fail: bool) -> (KnowledgeRetriever, Arc<FixedSearch>) {
        let search = Arc::new(FixedSearch {
            hits,
            fail,
            seen: Mutex::new(None),
        });
        let embedder = EmbeddingClient::new(Arc::new(KeywordEmbedder), "embedding01");
        (KnowledgeRetriever::new(search.clone(), embedder), search)
    }

    #[test]
    fn test_search_params_default() {
        let params = SearchParams::default();
        assert_eq!(params.top_k, 10);
        assert_eq!(params.vector_field, "text_vector");
        assert!(params.similarity_threshold.is_none());
    }

    #[tokio::test]
    async fn test_search_builds_hybrid_query() {
        let (retriever, search) = retriever(vec![hit("a", Some("A"))], false);
        retriever.search("support dates").await;

        let seen = search.seen.lock().unwrap().clone().expect("query sent");
        assert_eq!(seen.text, "support dates");
        assert_eq!(seen.top, 10);
        assert_eq!(seen.vector.k_nearest_neighbors, 10);
        assert_eq!(seen.vector.field, "text_vector");
        assert_eq!(seen.vector.vector, vec![1.0, 0.1]);
        assert_eq!(seen.select, vec!["content", "title"]);
    }

    #[tokio::test]
    async fn test_search_trims_and_fixes_relevance() {
        let (retriever, _) = retriever(
            vec![hit("  first chunk  ", Some(" Guide ")), hit("second", None)],
            false,
        );
        let results = retriever.search("q").await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk, "first chunk");
        assert_eq!(results[0].title, "Guide");
        assert_eq!(results[1].title, "Untitled Document");
        assert!(results.iter().all(|r| r.relevance == 1.0));
    }

    #[tokio::test]
    async fn test_search_caps_at_ten() {
        let hits = (0..15).map(|i| hit(&format!("chunk {}", i), None)).collect();
        let (retriever, _) = retriever(hits, false);
        assert_eq!(retriever.search("q").await.len(), 10);
    }

    #[tokio::test]
    async fn test_backend_error_yields_empty() {
        let (retriever, _) = retriever(vec![hit("a", None)], true);
        assert!(retriever.search("q").await.is_empty());
    }

    #[tokio::test]
    async fn test_unembeddable_query_yields_empty() {
        let (retriever, search) = retriever(vec![hit("a", None)], false);
        assert!(retriever.search("unembeddable").await.is_empty());
        assert!(search.seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filter_by_similarity_keeps_and_sorts() {
        let (retriever, _) = retriever(Vec::new(), false);
        let candidates = vec![
            SearchResult::ranked("weather report", "W"),
            SearchResult::ranked("support ends 2026", "S"),
            SearchResult::ranked("unembeddable chunk", "U"),
        ];

        let kept = retriever
            .filter_by_similarity(candidates, "support status", DEFAULT_SIMILARITY_THRESHOLD)
            .await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "S");
        assert!((kept[0].relevance - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_filter_by_similarity_unembeddable_query() {
        let (retriever, _) = retriever(Vec::new(), false);
        let kept = retriever
            .filter_by_similarity(vec![SearchResult::ranked("support", "S")], "unembeddable", 0.0)
            .await;
        assert!(kept.is_empty());
    }
}
