//! End to end over the on-disk tantivy index (the default index client)

#[path = "../common/mod.rs"]
mod common;

use common::*;
use pretty_assertions::assert_eq;
use searchsync_core::{SearchConfig, SearchEngine, SearchError, SearchRequest};
use searchsync_storage::{InMemoryRecordStore, PrimaryKey};
use std::sync::Arc;
use tempfile::TempDir;

fn tantivy_engine(config: SearchConfig, store: Arc<InMemoryRecordStore>) -> SearchEngine {
    SearchEngine::builder(config)
        .record_store(store)
        .build()
        .unwrap()
}

fn sorted(mut ids: Vec<PrimaryKey>) -> Vec<PrimaryKey> {
    ids.sort();
    ids
}

#[tokio::test]
async fn test_articles_scenario_on_disk() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let schema = article_schema();
    let records = scenario_articles();
    let engine = tantivy_engine(SearchConfig::new(dir.path()), store_with(&schema, &records).await);
    assert_eq!(engine.driver_name(), "tantivy");

    engine.update(&schema, &records).unwrap();
    assert!(dir.path().join("articles.index").join("meta.json").exists());

    let request = SearchRequest::new("rust").where_eq("author_id", 7);
    let first = engine.paginate(&schema, &request, 10, 1).await.unwrap();
    assert_eq!(sorted(first.ids.clone()), ids(&[1, 3]));
    assert_eq!(first.hits, 2);

    let second = engine.paginate(&schema, &request, 1, 2).await.unwrap();
    assert_eq!(second.ids.len(), 1);
    let records = engine.map(&schema, &request, &second).await.unwrap();
    assert_eq!(keys(&records), second.ids);
}

#[tokio::test]
async fn test_index_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let schema = article_schema();
    let records = scenario_articles();
    let store = store_with(&schema, &records).await;

    {
        let engine = tantivy_engine(SearchConfig::new(dir.path()), store.clone());
        engine.update(&schema, &records).unwrap();
    }

    let reopened = tantivy_engine(SearchConfig::new(dir.path()), store);
    let result = reopened
        .search(&schema, &SearchRequest::new("lifetimes"))
        .unwrap();
    assert_eq!(result.ids, ids(&[2]));

    let status = reopened.status(&[schema]).await.unwrap();
    assert_eq!(status[0].index_documents, 5);
    assert!(status[0].is_synchronized());
}

#[tokio::test]
async fn test_delete_then_search() {
    let dir = TempDir::new().unwrap();
    let schema = article_schema();
    let records = scenario_articles();
    let engine = tantivy_engine(SearchConfig::new(dir.path()), store_with(&schema, &records).await);
    engine.update(&schema, &records).unwrap();

    engine.delete(&schema, &[records[0].clone()]).unwrap();
    let result = engine.search(&schema, &SearchRequest::new("async")).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.hits, 0);
}

#[tokio::test]
async fn test_query_modes() {
    let schema = article_schema();
    let records = scenario_articles();

    let dir = TempDir::new().unwrap();
    let config = SearchConfig::new(dir.path()).boolean_search(true);
    let engine = tantivy_engine(config, store_with(&schema, &records).await);
    engine.update(&schema, &records).unwrap();
    let result = engine
        .search(&schema, &SearchRequest::new("rust -macros"))
        .unwrap();
    assert_eq!(sorted(result.ids), ids(&[1, 2, 3, 5]));

    let dir = TempDir::new().unwrap();
    let config = SearchConfig::new(dir.path()).fuzziness(true);
    let engine = tantivy_engine(config, store_with(&schema, &records).await);
    engine.update(&schema, &records).unwrap();
    let result = engine.search(&schema, &SearchRequest::new("ownrship")).unwrap();
    assert_eq!(result.ids, ids(&[1]));

    let dir = TempDir::new().unwrap();
    let config = SearchConfig::new(dir.path()).as_you_type(true);
    let engine = tantivy_engine(config, store_with(&schema, &records).await);
    engine.update(&schema, &records).unwrap();
    let result = engine.search(&schema, &SearchRequest::new("lifet")).unwrap();
    assert_eq!(result.ids, ids(&[2]));
}

#[tokio::test]
async fn test_import_flush_and_lifecycle() {
    let dir = TempDir::new().unwrap();
    let schema = article_schema();
    let engine = tantivy_engine(
        SearchConfig::new(dir.path()),
        store_with(&schema, &scenario_articles()).await,
    );

    let report = engine.import(&schema, 2).await.unwrap();
    assert_eq!(report.imported, 5);

    assert!(engine.flush(&schema).unwrap());
    assert!(!dir.path().join("articles.index").exists());

    let err = engine.delete_index("articles.index").unwrap_err();
    assert!(matches!(err, SearchError::UnsupportedOperation(_)));
    assert!(err.to_string().contains("articles.index manually"));
    assert!(engine.create_index("articles.index").is_err());
}
