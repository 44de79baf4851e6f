//! Turning a caller's `Constraint` into the `RecordQuery` a store executes
//!
//! The reconciler and the mapper both go through here, so the ids that survive
//! reconciliation are exactly the ids the mapper can load.

use searchsync_storage::{Constraint, PrimaryKey, RecordQuery, RecordSchema, SoftDeleteMode};

use crate::errors::{Result, SearchError};

/// Build the key-restricted query for `constraint`.
///
/// Fails with a configuration error when a predicate or ordering names a
/// field `schema` does not declare.
pub fn apply_constraints(
    schema: &RecordSchema,
    constraint: &Constraint,
    keys: Vec<PrimaryKey>,
    soft_delete_enabled: bool,
) -> Result<RecordQuery> {
    if let Some(field) = constraint
        .referenced_fields()
        .find(|field| !schema.has_column(field))
    {
        return Err(SearchError::configuration(format!(
            "Unknown field '{}' for {}",
            field, schema.record_type
        )));
    }

    let mode = SoftDeleteMode::resolve(
        schema.soft_deletes,
        soft_delete_enabled,
        constraint.soft_deleted,
    );

    Ok(RecordQuery::for_keys(keys)
        .with_soft_delete(mode)
        .with_predicates(constraint.predicates.clone())
        .with_orders(constraint.orders.clone()))
}

/// First occurrence of every key, order kept
pub fn unique_keys(ids: &[PrimaryKey]) -> Vec<PrimaryKey> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().filter(|id| seen.insert(*id)).cloned().collect()
}
