//! Property-based tests for reconciliation
//!
//! - Soundness: output ids are a subsequence of the input, and each one has a
//!   stored row satisfying the constraint
//! - Completeness: no input id with a satisfying row is dropped
//! - Hit count equals the number of output ids

use proptest::prelude::*;
use searchsync_core::Reconciler;
use searchsync_storage::{
    Constraint, InMemoryRecordStore, PrimaryKey, Record, RecordSchema, RecordStore,
};
use std::collections::HashMap;
use std::sync::Arc;

fn schema() -> RecordSchema {
    RecordSchema::new("Article", "articles").columns(["author_id"])
}

fn is_subsequence(needle: &[PrimaryKey], haystack: &[PrimaryKey]) -> bool {
    let mut rest = haystack.iter();
    needle.iter().all(|id| rest.any(|candidate| candidate == id))
}

proptest! {
    #[test]
    fn prop_reconciliation_is_sound_and_complete(
        stored in prop::collection::hash_map(0i64..40, 0i64..3, 0..30),
        raw in prop::collection::vec(0i64..50, 0..40),
        author in 0i64..3,
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(InMemoryRecordStore::new());
        let authors: HashMap<i64, i64> = stored;
        runtime.block_on(async {
            for (id, author_id) in &authors {
                store
                    .save(&schema(), &Record::with_key(*id).set("author_id", *author_id))
                    .await
                    .unwrap();
            }
        });

        let raw_ids: Vec<PrimaryKey> = raw.iter().map(|id| PrimaryKey::Int(*id)).collect();
        let constraint = Constraint::new().where_eq("author_id", author);
        let reconciler = Reconciler::new(store, true);
        let result = runtime
            .block_on(reconciler.reconcile(&schema(), &raw_ids, &constraint))
            .unwrap();

        let expected: Vec<PrimaryKey> = raw
            .iter()
            .filter(|id| authors.get(id) == Some(&author))
            .map(|id| PrimaryKey::Int(*id))
            .collect();

        prop_assert!(is_subsequence(&result.ids, &raw_ids));
        prop_assert_eq!(result.hits, result.ids.len());
        prop_assert_eq!(result.ids, expected);
    }
}
