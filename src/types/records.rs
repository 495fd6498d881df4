//! Records flowing through one retrieval-augmented request
//!
//! Everything here is request scoped: a fresh [`SourceMap`] is built for
//! every query and nothing is shared between requests.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Title used when the index returns a chunk without one
pub const UNTITLED_DOCUMENT: &str = "Untitled Document";

/// Default url for a source the index does not link anywhere
pub const DEFAULT_SOURCE_URL: &str = "#";

/// Default category for a source without one
pub const DEFAULT_SOURCE_CATEGORY: &str = "Uncategorized";

/// One retrieved chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: String,
    pub title: String,
    pub relevance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl SearchResult {
    /// Backend-ranked result: chunk and title trimmed, relevance fixed at 1.0
    pub fn ranked(chunk: &str, title: &str) -> Self {
        let title = title.trim();
        Self {
            chunk: chunk.trim().to_string(),
            title: if title.is_empty() {
                UNTITLED_DOCUMENT.to_string()
            } else {
                title.to_string()
            },
            relevance: 1.0,
            url: None,
            category: None,
        }
    }
}

/// Citation identifier `Source_N`, 1-indexed by retrieval position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(usize);

impl SourceId {
    pub fn new(ordinal: usize) -> Self {
        Self(ordinal)
    }

    pub fn ordinal(&self) -> usize {
        self.0
    }

    /// The literal token a model answer must contain to cite this source
    pub fn citation_token(&self) -> String {
        format!("[{}]", self)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source_{}", self.0)
    }
}

impl Serialize for SourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Source metadata looked up by citation identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub title: String,
    pub content: String,
    pub url: String,
    pub category: String,
}

/// A source the answer actually cited
pub type CitedSource = SourceEntry;

/// Insertion-ordered mapping from citation identifier to source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap {
    entries: Vec<(SourceId, SourceEntry)>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. Identifiers are assigned by the composer and never repeat.
    pub(crate) fn insert(&mut self, id: SourceId, entry: SourceEntry) {
        debug_assert!(self.get(id).is_none(), "duplicate source id {}", id);
        self.entries.push((id, entry));
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceEntry> {
        self.entries
            .iter()
            .find(|(key, _)| *key == id)
            .map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceId, &SourceEntry)> {
        self.entries.iter().map(|(id, entry)| (id, entry))
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SourceMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, entry) in &self.entries {
            map.serialize_entry(&id.to_string(), entry)?;
        }
        map.end()
    }
}

/// Related item drawn from the retrieval results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub snippet: String,
    pub score: f64,
}
