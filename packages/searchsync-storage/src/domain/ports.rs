//! Record Store Port (Trait Interface)
//!
//! Port/Adapter pattern for backend flexibility:
//! - Development & production: SQLite (zero-config)
//! - Testing: InMemory (fast unit tests)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{PrimaryKey, Record, RecordSchema};
use super::query::{RecordQuery, SoftDeleteMode};
use crate::error::Result;

/// Record Store Port (system of record)
///
/// Every method takes the record type's schema; stores never guess columns.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Collection Management
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Create the backing collection if it does not exist
    async fn prepare(&self, schema: &RecordSchema) -> Result<()>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Record CRUD
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Insert or replace a record, returning it with its key assigned.
    ///
    /// Integer-keyed records without a key get the next key; text-keyed
    /// records must carry one.
    async fn save(&self, schema: &RecordSchema, record: &Record) -> Result<Record>;

    /// Point lookup by primary key (soft-deleted rows included)
    async fn find(&self, schema: &RecordSchema, key: &PrimaryKey) -> Result<Option<Record>>;

    /// Set the soft-delete marker. Returns false when no row has `key`.
    async fn soft_delete(
        &self,
        schema: &RecordSchema,
        key: &PrimaryKey,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Physically remove a row. Returns false when no row has `key`.
    async fn delete(&self, schema: &RecordSchema, key: &PrimaryKey) -> Result<bool>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Bulk Queries
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Rows whose key is in `query.keys` and that satisfy the query, in one
    /// round trip. Without orders the store's native order is returned.
    async fn fetch(&self, schema: &RecordSchema, query: &RecordQuery) -> Result<Vec<Record>>;

    /// Anti-join: the keys of `query.keys` with no row satisfying the query
    /// (including keys with no row at all), in one round trip.
    async fn missing_keys(
        &self,
        schema: &RecordSchema,
        query: &RecordQuery,
    ) -> Result<Vec<PrimaryKey>>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Collection Scans
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Number of rows visible under `mode`
    async fn count(&self, schema: &RecordSchema, mode: SoftDeleteMode) -> Result<u64>;

    /// Keyset page in ascending key order, starting after `after`
    async fn scan(
        &self,
        schema: &RecordSchema,
        mode: SoftDeleteMode,
        after: Option<&PrimaryKey>,
        limit: usize,
    ) -> Result<Vec<Record>>;
}
