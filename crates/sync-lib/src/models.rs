//! Core data models for the repository synchronizer

use serde::Serialize;
use serde_json::{Map, Value};

/// Upstream fields that survive the projection
pub const REPO_FIELDS: [&str; 9] = [
    "id",
    "name",
    "description",
    "pushed_at",
    "git_url",
    "stargazers_count",
    "forks_count",
    "open_issues_count",
    "forks",
];

/// A repository object as served by the upstream API
pub type RawRecord = Value;

/// Reduced repository record forwarded to the destination API
///
/// Holds at most the keys in [`REPO_FIELDS`]. A key absent upstream stays
/// absent; a key present with `null` stays `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RepoRecord(Map<String, Value>);

impl RepoRecord {
    /// Project an upstream object onto [`REPO_FIELDS`]
    ///
    /// Returns `None` when the record is not a JSON object.
    pub fn project(raw: &RawRecord) -> Option<Self> {
        let object = raw.as_object()?;
        let fields = REPO_FIELDS
            .iter()
            .filter_map(|&key| object.get(key).map(|v| (key.to_string(), v.clone())))
            .collect();
        Some(Self(fields))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 1-indexed upstream page offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor(u32);

impl PageCursor {
    pub fn new() -> Self {
        Self(1)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Move to the next page, returning the page that was current
    pub fn advance(&mut self) -> u32 {
        let current = self.0;
        self.0 = self.0.saturating_add(1);
        current
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one synchronization run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// Cursor value after the last fetch
    pub final_cursor: u32,
    pub pages_forwarded: u32,
    pub records_forwarded: usize,
    /// False when the run stopped on a shutdown signal
    pub completed: bool,
}
