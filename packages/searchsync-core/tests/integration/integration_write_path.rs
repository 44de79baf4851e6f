//! Write path: synchronizer batches, bulk import, index status

#[path = "../common/mod.rs"]
mod common;

use chrono::Utc;
use common::*;
use pretty_assertions::assert_eq;
use searchsync_core::{
    InMemoryIndexClient, SearchConfig, SearchEngine, SearchError, SearchRequest, SyncReport,
};
use searchsync_storage::{KeyType, PrimaryKey, Record, RecordSchema, RecordStore};
use std::sync::Arc;

#[tokio::test]
async fn test_update_is_idempotent() {
    let schema = article_schema();
    let records = scenario_articles();
    let store = store_with(&schema, &records).await;
    let engine = memory_engine(SearchConfig::default(), store);

    engine.update(&schema, &records).unwrap();
    engine.update(&schema, &records).unwrap();

    let status = engine.status(&[schema.clone()]).await.unwrap();
    assert_eq!(status[0].index_documents, 5);
    assert!(status[0].is_synchronized());
}

#[tokio::test]
async fn test_update_replaces_projection() {
    let (engine, _) = scenario_engine(SearchConfig::default()).await;
    let schema = article_schema();

    engine
        .update(&schema, &[article(1, "zig comptime", 7, 5)])
        .unwrap();

    let rust = engine.search(&schema, &SearchRequest::new("ownership")).unwrap();
    assert!(rust.is_empty());
    let zig = engine.search(&schema, &SearchRequest::new("zig")).unwrap();
    assert_eq!(zig.ids, ids(&[1]));
}

#[tokio::test]
async fn test_delete_removes_entries() {
    let (engine, _) = scenario_engine(SearchConfig::default()).await;
    let schema = article_schema();

    let report = engine
        .delete(&schema, &[Record::with_key(3), Record::with_key(42), Record::new()])
        .unwrap();
    assert_eq!(report, SyncReport { applied: 2, skipped: 1 });

    let result = engine.search(&schema, &SearchRequest::new("rust")).unwrap();
    assert_eq!(result.ids, ids(&[5, 1, 2, 4]));
}

#[tokio::test]
async fn test_empty_batches_rejected() {
    let (engine, _) = scenario_engine(SearchConfig::default()).await;
    let schema = article_schema();
    assert!(matches!(
        engine.update(&schema, &[]),
        Err(SearchError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.delete(&schema, &[]),
        Err(SearchError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_keyless_records_are_indexed_but_never_returned() {
    let schema = article_schema();
    let store = store_with(&schema, &[]).await;
    let engine = memory_engine(SearchConfig::default(), store);

    engine
        .update(&schema, &[Record::new().set("title", "draft rust")])
        .unwrap();

    let result = engine.search(&schema, &SearchRequest::new("rust")).unwrap();
    assert!(result.ids.is_empty());
    assert_eq!(result.hits, 1);
}

#[tokio::test]
async fn test_failed_batch_leaves_index_untouched() {
    let schema = article_schema();
    let config = SearchConfig::default();
    let client = Arc::new(InMemoryIndexClient::new(&config));
    client.fail_writes_for(3);
    let engine = SearchEngine::builder(config)
        .index_client(client)
        .record_store(store_with(&schema, &[]).await)
        .build()
        .unwrap();

    assert!(engine.update(&schema, &scenario_articles()).is_err());
    let status = engine.status(&[schema]).await.unwrap();
    assert_eq!(status[0].index_documents, 0);
}

#[tokio::test]
async fn test_degraded_batch_keeps_earlier_writes() {
    let schema = article_schema();
    let config = SearchConfig::default();
    let client = Arc::new(InMemoryIndexClient::new(&config).without_transactions());
    client.fail_writes_for(1);
    let engine = SearchEngine::builder(config)
        .index_client(client)
        .record_store(store_with(&schema, &[]).await)
        .build()
        .unwrap();

    // 5 and 3 precede 1 in the batch
    assert!(engine.update(&schema, &scenario_articles()).is_err());
    let result = engine.search(&schema, &SearchRequest::new("rust")).unwrap();
    assert_eq!(result.ids, ids(&[5, 3]));
}

#[tokio::test]
async fn test_import_indexes_soft_deleted_records() {
    let schema = article_schema();
    let store = store_with(&schema, &scenario_articles()).await;
    store
        .soft_delete(&schema, &PrimaryKey::Int(2), Utc::now())
        .await
        .unwrap();
    let engine = memory_engine(SearchConfig::default(), store);

    let report = engine.import(&schema, 2).await.unwrap();
    assert_eq!(report.imported, 5);
    assert_eq!(report.chunks, 3);

    let trashed = SearchRequest::new("lifetimes").soft_deleted(true);
    let result = engine.paginate(&schema, &trashed, 10, 1).await.unwrap();
    assert_eq!(result.ids, ids(&[2]));

    let live = SearchRequest::new("lifetimes");
    let result = engine.paginate(&schema, &live, 10, 1).await.unwrap();
    assert!(result.ids.is_empty());
}

#[tokio::test]
async fn test_status_reports_drift_per_type() {
    let articles = article_schema();
    let tags = RecordSchema::new("Tag", "tags")
        .with_key("slug", KeyType::Text)
        .columns(["label"]);

    let store = store_with(&articles, &scenario_articles()).await;
    store.prepare(&tags).await.unwrap();
    store
        .save(&tags, &Record::with_key("rust").set("label", "Rust"))
        .await
        .unwrap();
    let engine = memory_engine(SearchConfig::default(), store.clone());
    engine.import(&articles, 100).await.unwrap();
    store.delete(&articles, &PrimaryKey::Int(5)).await.unwrap();

    let status = engine.status(&[articles, tags]).await.unwrap();
    assert_eq!(status[0].store_records, 4);
    assert_eq!(status[0].index_documents, 5);
    assert_eq!(status[0].difference(), -1);

    assert_eq!(status[1].index_name, "tags.index");
    assert_eq!(status[1].indexed_columns, vec!["label".to_string()]);
    assert_eq!(status[1].difference(), 1);
}

#[tokio::test]
async fn test_text_keys_round_trip_through_index() {
    let tags = RecordSchema::new("Tag", "tags")
        .with_key("slug", KeyType::Text)
        .columns(["label"]);
    let records = vec![
        Record::with_key("rust-lang").set("label", "Rust language"),
        Record::with_key("go-lang").set("label", "Go language"),
    ];
    let store = store_with(&tags, &records).await;
    let engine = memory_engine(SearchConfig::default(), store);
    engine.update(&tags, &records).unwrap();

    let page = engine
        .get(&tags, &SearchRequest::new("language"), 1, Some(10))
        .await
        .unwrap();
    assert_eq!(
        keys(&page.records),
        vec![PrimaryKey::from("rust-lang"), PrimaryKey::from("go-lang")]
    );
}

#[tokio::test]
async fn test_custom_index_name() {
    let schema = article_schema().index_as("posts");
    let records = scenario_articles();
    let store = store_with(&schema, &records).await;
    let engine = memory_engine(SearchConfig::default(), store);
    engine.update(&schema, &records).unwrap();

    let status = engine.status(&[schema.clone()]).await.unwrap();
    assert_eq!(status[0].index_name, "posts.index");
    assert!(engine.flush(&schema).unwrap());

    let request = SearchRequest::new("rust").within("posts.index");
    assert!(engine.search(&schema, &request).unwrap().is_empty());
}
