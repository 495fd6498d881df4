// Qdrant search backend: vector search with a lexical keyword filter
//
// Qdrant has no native hybrid ranking, so the keyword half of a query becomes
// a `should` filter of full-text matches on the content field. When no point
// matches any keyword the query falls back to pure vector search.

use async_trait::async_trait;
use qdrant_client::qdrant::{
    value::Kind, Condition, Filter, ScoredPoint, SearchPoints, SearchPointsBuilder,
    Value as QdrantValue,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};

use crate::errors::{RagError, Result};
use crate::search::FieldMappings;
use crate::services::{HybridQuery, SearchHit, SearchService};

const BACKEND: &str = "qdrant";

/// Keywords shorter than this are ignored
const MIN_TERM_CHARS: usize = 3;

/// Upper bound on keyword conditions per query
const MAX_TERMS: usize = 16;

/// Hybrid-ish search over one Qdrant collection
pub struct QdrantSearchBackend {
    client: Qdrant,
    collection: String,
    fields: FieldMappings,
}

impl QdrantSearchBackend {
    pub fn new(url: &str, collection: impl Into<String>, fields: FieldMappings) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| RagError::search(BACKEND, format!("Failed to create Qdrant client: {}", e)))?;

        Ok(Self {
            client,
            collection: collection.into(),
            fields,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn request(&self, query: &HybridQuery, filter: Option<Filter>) -> SearchPoints {
        let builder = SearchPointsBuilder::new(
            self.collection.clone(),
            query.vector.vector.clone(),
            query.top as u64,
        )
        .with_payload(true);

        match filter {
            Some(filter) => builder.filter(filter).build(),
            None => builder.build(),
        }
    }

    async fn search_points(&self, request: SearchPoints) -> Result<Vec<ScoredPoint>> {
        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| RagError::search(BACKEND, format!("Failed to search points: {}", e)))?;
        Ok(response.result)
    }

    fn to_hit(&self, point: ScoredPoint) -> SearchHit {
        let payload = point.payload;
        let text = |field: &str| payload.get(field).and_then(qdrant_value_to_string);

        SearchHit {
            content: text(&self.fields.content),
            title: text(&self.fields.title),
            url: self.fields.url.as_deref().and_then(text),
            category: self.fields.category.as_deref().and_then(text),
            score: Some(point.score as f64),
        }
    }
}

#[async_trait]
impl SearchService for QdrantSearchBackend {
    async fn search(&self, query: &HybridQuery) -> Result<Vec<SearchHit>> {
        let terms = lexical_terms(&query.text);
        debug!(
            backend = BACKEND,
            collection = %self.collection,
            top = query.top,
            terms = terms.len(),
            "hybrid search"
        );

        let mut points = Vec::new();
        if let Some(filter) = keyword_filter(&self.fields.content, &terms) {
            points = self.search_points(self.request(query, Some(filter))).await?;
        }
        if points.is_empty() {
            if !terms.is_empty() {
                info!(backend = BACKEND, "no keyword matches, falling back to vector search");
            }
            points = self.search_points(self.request(query, None)).await?;
        }

        Ok(points.into_iter().map(|p| self.to_hit(p)).collect())
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}

/// Distinct lowercase keywords of at least three characters, in query order
pub fn lexical_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric() && c != '.') {
        let word = word.trim_matches('.').to_lowercase();
        if word.chars().count() >= MIN_TERM_CHARS && !terms.contains(&word) {
            terms.push(word);
        }
        if terms.len() == MAX_TERMS {
            break;
        }
    }
    terms
}

/// Any-of full-text match on the content payload field
fn keyword_filter(content_field: &str, terms: &[String]) -> Option<Filter> {
    if terms.is_empty() {
        return None;
    }

    Some(Filter::should(
        terms
            .iter()
            .map(|term| Condition::matches_text(content_field, term.clone())),
    ))
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(s.clone()),
        Kind::IntegerValue(i) => Some(i.to_string()),
        Kind::DoubleValue(f) => Some(f.to_string()),
        _ => None,
    })
}
