//! Embedding client and vector similarity
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::services::EmbeddingService;

/// Soft-failing wrapper around an [`EmbeddingService`]
#[derive(Clone)]
pub struct EmbeddingClient {
    service: Arc<dyn EmbeddingService>,
    model: String,
}

impl EmbeddingClient {
    pub fn new(service: Arc<dyn EmbeddingService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
        }
    }

    /// Embed trimmed text. Returns `None` for empty input or on any service error.
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            warn!("Empty text provided for embedding generation");
            return None;
        }

        match self.service.embed(text, &self.model).await {
            Ok(vector) if vector.is_empty() => {
                warn!(provider = self.service.provider(), "embedding service returned an empty vector");
                None
            }
            Ok(vector) => {
                debug!(dimensions = vector.len(), text_len = text.len(), "embedded text");
                Some(vector)
            }
            Err(e) => {
                error!(provider = self.service.provider(), error = %e, "Embedding generation error");
                None
            }
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Cosine similarity in [-1, 1].
///
/// Mismatched dimensions and zero-magnitude vectors yield 0.0, meaning
/// "no similarity", instead of an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        warn!(left = a.len(), right = b.len(), "cosine similarity on vectors of different dimension");
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return 0.0;
    }

    (dot / magnitude).clamp(-1.0, 1.0)
}
