//! Result Reconciler
//!
//! Index hits go stale: records get deleted, soft-deleted or stop matching the
//! caller's predicates. Discarded ids are found with one anti-join against the
//! store, since constraints usually remove only a few hits.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use searchsync_storage::{Constraint, PrimaryKey, RecordSchema, RecordStore};

use super::constraints::{apply_constraints, unique_keys};
use crate::errors::Result;

/// Valid ids in index order and the corrected hit count
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    pub ids: Vec<PrimaryKey>,
    pub hits: usize,
}

pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    soft_delete_enabled: bool,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>, soft_delete_enabled: bool) -> Self {
        Self {
            store,
            soft_delete_enabled,
        }
    }

    /// Drop the ids of `raw_ids` with no row satisfying `constraint`.
    ///
    /// Order and duplicates of `raw_ids` are preserved; the hit count is the
    /// number of ids kept.
    pub async fn reconcile(
        &self,
        schema: &RecordSchema,
        raw_ids: &[PrimaryKey],
        constraint: &Constraint,
    ) -> Result<Reconciliation> {
        let query = apply_constraints(
            schema,
            constraint,
            unique_keys(raw_ids),
            self.soft_delete_enabled,
        )?;
        if raw_ids.is_empty() {
            return Ok(Reconciliation::default());
        }

        let discard: HashSet<PrimaryKey> = self
            .store
            .missing_keys(schema, &query)
            .await?
            .into_iter()
            .collect();

        let ids: Vec<PrimaryKey> = raw_ids
            .iter()
            .filter(|id| !discard.contains(*id))
            .cloned()
            .collect();

        debug!(
            "Reconciled {} hits for {}: {} kept, {} discarded",
            raw_ids.len(),
            schema.record_type,
            ids.len(),
            discard.len()
        );
        Ok(Reconciliation {
            hits: ids.len(),
            ids,
        })
    }
}
