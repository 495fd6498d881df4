//! Citation detection
//!
//! An answer cites a source by containing its literal `[Source_N]` token.
//! All matching goes through [`is_cited`] so the strategy can be hardened in
//! one place.

use std::collections::HashSet;

use crate::types::{CitedSource, SourceId, SourceMap};

/// True when `answer` contains the bracketed token for `id`
pub fn is_cited(answer: &str, id: SourceId) -> bool {
    answer.contains(&id.citation_token())
}

/// Identifiers from the map that the answer cites, in map order
pub fn cited_ids(answer: &str, source_map: &SourceMap) -> Vec<SourceId> {
    source_map
        .iter()
        .filter(|(id, _)| is_cited(answer, **id))
        .map(|(id, _)| *id)
        .collect()
}

/// True when the answer cites at least one source in the map
pub fn has_citations(answer: &str, source_map: &SourceMap) -> bool {
    source_map.iter().any(|(id, _)| is_cited(answer, *id))
}

/// Sources actually cited by the answer, deduplicated by title (first wins),
/// in map order
pub fn cited_sources(answer: &str, source_map: &SourceMap) -> Vec<CitedSource> {
    let mut seen_titles = HashSet::new();
    source_map
        .iter()
        .filter(|(id, _)| is_cited(answer, **id))
        .filter(|(_, entry)| !entry.title.is_empty() && seen_titles.insert(entry.title.clone()))
        .map(|(_, entry)| entry.clone())
        .collect()
}
