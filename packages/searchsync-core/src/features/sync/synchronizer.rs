//! Synchronizer
//!
//! Pushes record changes into the index, one transaction per batch. When the
//! index cannot do transactions the batch degrades to one write per record: a
//! failure stops the batch but earlier writes stay applied.

use std::sync::Arc;
use tracing::{debug, info, warn};

use searchsync_storage::{Record, RecordSchema};

use crate::errors::{Result, SearchError};
use crate::features::index::{index_name, IndexClient, IndexError, IndexHandle};

/// Outcome of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Index writes issued
    pub applied: usize,
    /// Records with nothing to write (empty projection or no key)
    pub skipped: usize,
}

pub struct Synchronizer {
    client: Arc<dyn IndexClient>,
}

impl Synchronizer {
    pub fn new(client: Arc<dyn IndexClient>) -> Self {
        Self { client }
    }

    /// Create the index of `schema` when its storage is absent, then select it.
    /// Idempotent.
    pub fn ensure_index_exists(&self, schema: &RecordSchema) -> Result<Arc<dyn IndexHandle>> {
        let name = index_name(schema.searchable_as());
        if !self.client.index_exists(&name) {
            self.client.create_index(&name)?;
            info!("Initialized index {} for {}", name, schema.record_type);
        }
        Ok(self.client.select_index(&name)?)
    }

    /// Index every record: keyed records replace their entry, keyless ones are
    /// inserted. Records with an empty searchable projection are skipped.
    pub fn upsert(&self, schema: &RecordSchema, records: &[Record]) -> Result<SyncReport> {
        if records.is_empty() {
            return Err(SearchError::invalid_input("upsert requires at least one record"));
        }
        let index = self.ensure_index_exists(schema)?;

        let report = self.in_batch(index.as_ref(), |index, report| {
            for record in records {
                let projection = record.searchable_projection(schema);
                if projection.is_empty() {
                    report.skipped += 1;
                    continue;
                }
                match &record.key {
                    Some(key) => index.update(key, &projection)?,
                    None => index.insert(&projection)?,
                }
                report.applied += 1;
            }
            Ok(())
        })?;

        debug!(
            "Upserted {} records into {} ({} skipped)",
            report.applied,
            index.name(),
            report.skipped
        );
        Ok(report)
    }

    /// Remove the entries of every keyed record. Missing entries are a no-op.
    pub fn remove(&self, schema: &RecordSchema, records: &[Record]) -> Result<SyncReport> {
        if records.is_empty() {
            return Err(SearchError::invalid_input("remove requires at least one record"));
        }
        let index = self.ensure_index_exists(schema)?;

        let report = self.in_batch(index.as_ref(), |index, report| {
            for record in records {
                match &record.key {
                    Some(key) => {
                        index.delete(key)?;
                        report.applied += 1;
                    }
                    None => report.skipped += 1,
                }
            }
            Ok(())
        })?;

        debug!("Removed {} records from {}", report.applied, index.name());
        Ok(report)
    }

    /// Run `writes` inside one index transaction, rolling back on failure.
    fn in_batch<F>(&self, index: &dyn IndexHandle, writes: F) -> Result<SyncReport>
    where
        F: FnOnce(&dyn IndexHandle, &mut SyncReport) -> std::result::Result<(), IndexError>,
    {
        let mut report = SyncReport::default();

        if !index.supports_transactions() {
            warn!(
                "{} does not support transactions; applying writes one by one",
                index.name()
            );
            writes(index, &mut report)?;
            return Ok(report);
        }

        index.begin_transaction()?;
        if let Err(err) = writes(index, &mut report) {
            if let Err(rollback_err) = index.rollback_transaction() {
                warn!("Rollback of {} failed: {}", index.name(), rollback_err);
            }
            return Err(err.into());
        }
        index.commit_transaction()?;
        Ok(report)
    }
}
