// Storage module
// Canonical SQLite chat archive and LanceDB vector index

pub mod lancedb;
pub mod sqlite;

use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::RecallError;

/// One embedded chunk as stored in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    /// Globally unique chunk key, `"{parent_id}_{chunk_index}"`.
    pub id: String,
    pub vector: Vec<f32>,
    /// The chunk text itself, returned verbatim from queries.
    pub document: String,
    pub metadata: ChunkMetadata,
}

/// Metadata stored alongside each embedding, linking back to the chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub parent_id: i64,
    pub title: String,
    pub url: String,
    pub chunk_index: u32,
    pub collection: String,
}

/// A ranked similarity match. Lower cosine distance means more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

/// Equality constraints over metadata fields. Records that do not match are
/// excluded from consideration entirely, not merely reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    clauses: Vec<(String, String)>,
}

impl MetadataFilter {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    #[inline]
    pub fn clauses(&self) -> &[(String, String)] {
        &self.clauses
    }

    /// Render as a SQL-style predicate for backends with string filters.
    /// Values have embedded quotes doubled; field names come from code, not
    /// user input.
    #[inline]
    pub fn to_sql_predicate(&self) -> Option<String> {
        if self.clauses.is_empty() {
            return None;
        }
        Some(
            self.clauses
                .iter()
                .map(|(field, value)| format!("{} = '{}'", field, value.replace('\'', "''")))
                .join(" AND "),
        )
    }
}

/// Persistent approximate-nearest-neighbor store keyed by an opaque string id.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Batched insert-or-replace. Replacing an existing id overwrites vector,
    /// document, and metadata together.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), RecallError>;

    /// Up to `top_k` nearest records by cosine distance, ascending. Ordering
    /// among exact-tie distances is backend-defined.
    async fn query(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchHit>, RecallError>;
}
