// Related-item recommendations from the retrieval list
use serde::{Deserialize, Serialize};

use crate::types::{Recommendation, SearchResult};

/// Recommendations never exceed this many items
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Characters kept from a chunk before the ellipsis
pub const SNIPPET_CHARS: usize = 150;

const ELLIPSIS: &str = "...";

/// Recommendation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    pub max_items: usize,
    pub snippet_chars: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            max_items: MAX_RECOMMENDATIONS,
            snippet_chars: SNIPPET_CHARS,
        }
    }
}

/// Derives related items from results ranked 2 through 6; the top hit is
/// already covered by the answer.
#[derive(Debug, Clone, Default)]
pub struct Recommender {
    config: RecommendConfig,
}

impl Recommender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RecommendConfig) -> Self {
        Self { config }
    }

    pub fn recommend(&self, results: &[SearchResult]) -> Vec<Recommendation> {
        let snippet_chars = self.config.snippet_chars.min(SNIPPET_CHARS);
        results
            .iter()
            .skip(1)
            .take(self.config.max_items.min(MAX_RECOMMENDATIONS))
            .map(|result| Recommendation {
                title: result.title.clone(),
                snippet: snippet(&result.chunk, snippet_chars),
                score: round2(result.relevance * 10.0),
            })
            .collect()
    }

    pub fn config(&self) -> &RecommendConfig {
        &self.config
    }
}

/// First `max_chars` characters followed by "..."
fn snippet(chunk: &str, max_chars: usize) -> String {
    let mut snippet: String = chunk.chars().take(max_chars).collect();
    snippet.push_str(ELLIPSIS);
    snippet
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, chunk: &str, relevance: f64) -> SearchResult {
        SearchResult {
            chunk: chunk.to_string(),
            title: title.to_string(),
            relevance,
            url: None,
            category: None,
        }
    }

    #[test]
    fn test_skips_top_hit_and_caps_at_five() {
        let results: Vec<_> = (0..10).map(|i| result(&format!("T{}", i), "c", 1.0)).collect();
        let recs = Recommender::new().recommend(&results);
        let titles: Vec<_> = recs.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["T1", "T2", "T3", "T4", "T5"]);
    }

    #[test]
    fn test_single_or_no_result_gives_nothing() {
        assert!(Recommender::new().recommend(&[]).is_empty());
        assert!(Recommender::new().recommend(&[result("only", "c", 1.0)]).is_empty());
    }

    #[test]
    fn test_snippet_truncation() {
        let long = "x".repeat(400);
        let recs = Recommender::new().recommend(&[result("a", "", 1.0), result("b", &long, 1.0)]);
        assert_eq!(recs[0].snippet.chars().count(), 153);
        assert!(recs[0].snippet.ends_with("..."));

        let recs = Recommender::new().recommend(&[result("a", "", 1.0), result("b", "short", 1.0)]);
        assert_eq!(recs[0].snippet, "short...");
    }

    #[test]
    fn test_snippet_counts_characters_not_bytes() {
        let text = "é".repeat(200);
        let recs = Recommender::new().recommend(&[result("a", "", 1.0), result("b", &text, 1.0)]);
        assert_eq!(recs[0].snippet.chars().count(), 153);
    }

    #[test]
    fn test_score_scaling() {
        let recs = Recommender::new().recommend(&[
            result("a", "", 1.0),
            result("b", "", 1.0),
            result("c", "", 0.87654),
        ]);
        assert_eq!(recs[0].score, 10.0);
        assert_eq!(recs[1].score, 8.77);
    }
}
