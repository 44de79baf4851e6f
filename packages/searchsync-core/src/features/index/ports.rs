//! Index Client Port
//!
//! The full-text index is an external collaborator: it ranks, the engine
//! reconciles. Index calls are blocking; the tantivy backend is synchronous.

use std::sync::Arc;
use std::time::Duration;

use searchsync_storage::{Fields, PrimaryKey};

/// Suffix of every index name: a collection `articles` is indexed as `articles.index`
pub const INDEX_SUFFIX: &str = ".index";

/// Index name of a searchable base name
pub fn index_name(searchable_as: &str) -> String {
    format!("{}{}", searchable_as, INDEX_SUFFIX)
}

/// Outcome of one index query.
///
/// `ids` are in rank order and capped by the query limit; `hits` is the number
/// of matching documents the index reports, so `ids.len() <= hits` does not hold
/// in general once entries go stale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResult {
    pub ids: Vec<PrimaryKey>,
    pub hits: usize,
    pub execution_time: Duration,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The named index has no storage artifact
    NotFound(String),
    InvalidInput(String),
    Internal(String),
    Unsupported(String),
}

impl IndexError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::NotFound(_))
    }
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::NotFound(msg) => write!(f, "Index not found: {}", msg),
            IndexError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            IndexError::Internal(msg) => write!(f, "Internal error: {}", msg),
            IndexError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
        }
    }
}

impl std::error::Error for IndexError {}

/// Client over a directory of named indexes
pub trait IndexClient: Send + Sync {
    /// Reported in search events
    fn driver_name(&self) -> &'static str;

    /// Whether the storage artifact of `name` exists
    fn index_exists(&self, name: &str) -> bool;

    /// Create an empty index. Creating an existing index is a no-op.
    fn create_index(&self, name: &str) -> Result<(), IndexError>;

    /// Open an existing index; `IndexError::NotFound` when absent
    fn select_index(&self, name: &str) -> Result<Arc<dyn IndexHandle>, IndexError>;

    /// Remove the storage artifact. Returns false when there was none.
    fn drop_index(&self, name: &str) -> Result<bool, IndexError>;
}

/// One selected index.
///
/// Outside a transaction every write is immediately visible to searches.
pub trait IndexHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Relevance search: any token may match
    fn search(&self, query: &str, limit: usize) -> Result<SearchResult, IndexError>;

    /// Boolean search: tokens are required, `OR` separates alternatives,
    /// `-token` excludes
    fn search_boolean(&self, query: &str, limit: usize) -> Result<SearchResult, IndexError>;

    /// Index a projection without a key (never returned as an id)
    fn insert(&self, fields: &Fields) -> Result<(), IndexError>;

    /// Replace the entry of `key`
    fn update(&self, key: &PrimaryKey, fields: &Fields) -> Result<(), IndexError>;

    /// Remove the entry of `key`; absent entries are a no-op
    fn delete(&self, key: &PrimaryKey) -> Result<(), IndexError>;

    fn supports_transactions(&self) -> bool;

    fn begin_transaction(&self) -> Result<(), IndexError>;

    fn commit_transaction(&self) -> Result<(), IndexError>;

    fn rollback_transaction(&self) -> Result<(), IndexError>;

    /// Committed documents, keyless ones included
    fn document_count(&self) -> Result<u64, IndexError>;
}

/// Concatenated text of a projection, ordered by column name
pub fn projection_text(fields: &Fields) -> String {
    fields
        .values()
        .filter_map(|value| value.to_index_text())
        .collect::<Vec<_>>()
        .join(" ")
}
