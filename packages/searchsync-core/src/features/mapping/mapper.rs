//! Result Mapper
//!
//! Loads the records behind a final id list in one bulk fetch. Without an
//! explicit ordering the index rank wins; ids whose record vanished between
//! reconciliation and loading are dropped silently.

use std::collections::HashMap;
use std::sync::Arc;

use searchsync_storage::{Constraint, PrimaryKey, Record, RecordSchema, RecordStore};

use crate::errors::Result;
use crate::features::reconcile::constraints::{apply_constraints, unique_keys};

pub struct ResultMapper {
    store: Arc<dyn RecordStore>,
    soft_delete_enabled: bool,
}

impl ResultMapper {
    pub fn new(store: Arc<dyn RecordStore>, soft_delete_enabled: bool) -> Self {
        Self {
            store,
            soft_delete_enabled,
        }
    }

    pub async fn map(
        &self,
        schema: &RecordSchema,
        ordered_ids: &[PrimaryKey],
        constraint: &Constraint,
    ) -> Result<Vec<Record>> {
        if ordered_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = apply_constraints(
            schema,
            constraint,
            unique_keys(ordered_ids),
            self.soft_delete_enabled,
        )?;
        let records = self.store.fetch(schema, &query).await?;

        // Caller ordering: the store already sorted
        if !constraint.orders.is_empty() {
            return Ok(records);
        }

        let by_key: HashMap<PrimaryKey, Record> = records
            .into_iter()
            .filter_map(|record| record.key.clone().map(|key| (key, record)))
            .collect();

        // Index rank; ids without a record are dropped
        let ranked: Vec<Record> = ordered_ids
            .iter()
            .filter_map(|id| by_key.get(id).cloned())
            .collect();
        Ok(ranked)
    }
}
