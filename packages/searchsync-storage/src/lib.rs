//! searchsync-storage: the system of record behind a search index
//!
//! The full-text index is approximate and lags behind writes; this crate is the
//! authoritative side. It defines the records, schemas and queries the search
//! engine reconciles index hits against.
//!
//! ## Layout
//!
//! - `domain/`: models (`Record`, `RecordSchema`, `PrimaryKey`, `Value`), query
//!   vocabulary (`Constraint`, `RecordQuery`, `SoftDeleteMode`) and the
//!   `RecordStore` port
//! - `infrastructure/`: `SqliteRecordStore` (feature `sqlite`) and
//!   `InMemoryRecordStore`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use searchsync_storage::{Record, RecordSchema, RecordStore, SqliteRecordStore};
//!
//! let schema = RecordSchema::new("Article", "articles").columns(["title", "author_id"]);
//! let store = SqliteRecordStore::in_memory()?;
//! store.prepare(&schema).await?;
//! let saved = store.save(&schema, &Record::new().set("title", "Rust")).await?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{
    Comparison, Constraint, Direction, Fields, KeyType, OrderBy, Predicate, PrimaryKey, Record,
    RecordQuery, RecordSchema, RecordStore, SoftDeleteMode, Value, DELETED_AT_COLUMN,
};

pub use infrastructure::InMemoryRecordStore;
#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteRecordStore;
