//! Bulk import and index status

use serde::Serialize;
use tracing::{debug, info};

use searchsync_storage::{RecordSchema, SoftDeleteMode};

use super::search_engine::SearchEngine;
use crate::errors::{Result, SearchError};
use crate::features::index::index_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ImportReport {
    pub chunks: usize,
    pub imported: usize,
    pub skipped: usize,
}

impl ImportReport {
    pub fn is_empty(&self) -> bool {
        self.chunks == 0
    }
}

/// Index vs. store population of one record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStatus {
    pub record_type: String,
    pub index_name: String,
    pub indexed_columns: Vec<String>,
    pub index_documents: u64,
    pub store_records: u64,
}

impl IndexStatus {
    /// Store records minus index documents; negative when the index holds
    /// stale entries
    pub fn difference(&self) -> i64 {
        self.store_records as i64 - self.index_documents as i64
    }

    pub fn is_synchronized(&self) -> bool {
        self.difference() == 0
    }
}

impl SearchEngine {
    /// Index every record of `schema`, soft-deleted ones included, scanning the
    /// store in key order. One index transaction per chunk.
    pub async fn import(&self, schema: &RecordSchema, chunk_size: usize) -> Result<ImportReport> {
        if chunk_size == 0 {
            return Err(SearchError::invalid_input("chunk_size must be at least 1"));
        }

        let mut report = ImportReport::default();
        let mut after = None;
        loop {
            let chunk = self
                .store
                .scan(schema, SoftDeleteMode::IncludeAll, after.as_ref(), chunk_size)
                .await?;
            if chunk.is_empty() {
                break;
            }

            let sync = self.synchronizer.upsert(schema, &chunk)?;
            report.chunks += 1;
            report.imported += sync.applied;
            report.skipped += sync.skipped;
            debug!(
                "Imported chunk {} of {} ({} records)",
                report.chunks,
                schema.record_type,
                chunk.len()
            );

            if chunk.len() < chunk_size {
                break;
            }
            after = chunk.last().and_then(|record| record.key.clone());
            if after.is_none() {
                break;
            }
        }

        if report.is_empty() {
            info!("Nothing to import for {}", schema.record_type);
        } else {
            info!(
                "Imported {} {} records in {} chunks",
                report.imported, schema.record_type, report.chunks
            );
        }
        Ok(report)
    }

    /// Compare index documents with store records for every schema.
    /// A missing index counts zero documents.
    pub async fn status(&self, schemas: &[RecordSchema]) -> Result<Vec<IndexStatus>> {
        let mut statuses = Vec::with_capacity(schemas.len());
        for schema in schemas {
            let name = index_name(schema.searchable_as());
            let index_documents = if self.client.index_exists(&name) {
                self.client.select_index(&name)?.document_count()?
            } else {
                0
            };
            let store_records = self.store.count(schema, SoftDeleteMode::IncludeAll).await?;

            statuses.push(IndexStatus {
                record_type: schema.record_type.clone(),
                index_name: name,
                indexed_columns: schema.searchable_columns().to_vec(),
                index_documents,
                store_records,
            });
        }
        Ok(statuses)
    }
}
