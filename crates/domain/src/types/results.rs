//! Query results and write change kinds.

use serde::{Deserialize, Serialize};

/// One page of results plus the shape flags the store reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult<T> {
    pub items: Vec<T>,
    /// Total rows matching the query across all pages.
    pub total_count: u64,
    #[serde(default)]
    pub is_sorted: bool,
    #[serde(default)]
    pub is_filtered: bool,
    #[serde(default)]
    pub is_search: bool,
}

impl<T> QueryResult<T> {
    /// Result page with all shape flags cleared.
    #[must_use]
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self { items, total_count, is_sorted: false, is_filtered: false, is_search: false }
    }

    /// Empty page is never worth caching.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for QueryResult<T> {
    fn default() -> Self {
        Self::new(Vec::new(), 0)
    }
}

/// What kind of change a save represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Updated,
}
