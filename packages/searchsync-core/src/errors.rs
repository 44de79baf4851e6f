//! Error types for searchsync-core

use thiserror::Error;

use crate::config::ConfigError;
use crate::features::index::IndexError;
use searchsync_storage::StorageError;

/// Engine-level error
#[derive(Debug, Error)]
pub enum SearchError {
    /// The index has no storage artifact (recovered by the read path)
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Index error: {0}")]
    Index(IndexError),

    #[error("Store error: {0}")]
    Store(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A constraint names a field the record type does not have
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<IndexError> for SearchError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::NotFound(name) => SearchError::IndexNotFound(name),
            other => SearchError::Index(other),
        }
    }
}

impl SearchError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        SearchError::Configuration(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        SearchError::InvalidInput(msg.into())
    }

    pub fn is_index_not_found(&self) -> bool {
        matches!(self, SearchError::IndexNotFound(_))
    }

    /// Configuration problems are fatal wherever they surface
    pub fn is_configuration(&self) -> bool {
        match self {
            SearchError::Configuration(_) | SearchError::Config(_) => true,
            SearchError::Store(err) => err.is_configuration(),
            _ => false,
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, SearchError>;
