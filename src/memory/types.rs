//! Core record and options types.
//!
//! [`Memory`] mirrors the `memories` table one-to-one. The options structs
//! are the inputs to search and list; the remaining types are result shapes
//! serialized for external callers.

use serde::{Deserialize, Serialize};

/// A memory record, matching the `memories` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// SHA-256 hex digest of `content` — unique across the store.
    pub hash: String,
    /// The full text content of the memory.
    pub content: String,
    /// Short summary shown in search results. Defaults to `content`.
    pub digest: String,
    /// Tag set. Deduplicated on write; stored order is display-only.
    pub tags: Vec<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-modification timestamp.
    pub updated_at: String,
    /// Number of times this memory has been fetched by id.
    pub access_count: u32,
}

/// Canonical column list for SELECTs that hydrate a full [`Memory`].
pub(crate) const MEMORY_COLUMNS: &str =
    "id, hash, content, digest, tags, created_at, updated_at, access_count";

impl Memory {
    /// Map a row selected with [`MEMORY_COLUMNS`] into a `Memory`.
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let tags_json: String = row.get(4)?;
        Ok(Self {
            id: row.get(0)?,
            hash: row.get(1)?,
            content: row.get(2)?,
            digest: row.get(3)?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            access_count: row.get(7)?,
        })
    }
}

/// Input to [`store::add_memory`](crate::memory::store::add_memory).
#[derive(Debug, Clone, Default)]
pub struct AddInput {
    pub content: String,
    /// Optional short summary; falls back to `content`.
    pub digest: Option<String>,
    pub tags: Vec<String>,
}

/// Partial update. `None` fields keep their prior value.
#[derive(Debug, Clone, Default)]
pub struct UpdatePatch {
    pub content: Option<String>,
    pub digest: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// A single search hit — digest-level, not full content.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub digest: String,
    pub tags: Vec<String>,
    /// Fused RRF score (higher is better).
    pub score: f64,
    pub created_at: String,
}

/// Search options. Post-filters apply after rank fusion.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Require ALL of these tags (AND semantics).
    pub tags: Vec<String>,
    /// Inclusive lower bound on `created_at` (ISO 8601).
    pub after: Option<String>,
    /// Inclusive upper bound on `created_at` (ISO 8601).
    pub before: Option<String>,
    pub limit: Option<usize>,
}

/// Sort order for `list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Newest first (`created_at DESC`).
    #[default]
    Time,
    /// Most-fetched first (`access_count DESC`).
    Access,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Access => "access",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(Self::Time),
            "access" => Ok(Self::Access),
            _ => Err(format!("unknown sort key: {s} (expected time|access)")),
        }
    }
}

/// Browse options for `list`.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Require ALL of these tags (AND semantics).
    pub tags: Vec<String>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub sort: SortKey,
}

/// One page of `list` results.
#[derive(Debug, Serialize)]
pub struct ListPage {
    pub memories: Vec<Memory>,
    /// True when the page is full — more rows may exist past `offset + limit`.
    pub has_more: bool,
}

/// A tag with its usage count.
#[derive(Debug, Clone, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Vector index coverage.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    /// Number of records with a vector entry (0 when the backend is absent).
    pub indexed: u64,
    /// Total records in the store.
    pub total: u64,
    /// Embedding model the index was built with, if ever indexed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Store-wide statistics.
#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub total_memories: u64,
    pub total_tags: u64,
    pub storage_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_status: Option<IndexStatus>,
}
