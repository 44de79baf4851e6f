use std::sync::Arc;

use searchsync_core::{InMemoryIndexClient, SearchConfig, SearchEngine};
use searchsync_storage::{InMemoryRecordStore, PrimaryKey, Record, RecordSchema, RecordStore};

/// Articles: searchable title, soft-deletable
pub fn article_schema() -> RecordSchema {
    RecordSchema::new("Article", "articles")
        .columns(["title", "author_id", "rank"])
        .searchable(["title"])
        .with_soft_deletes()
}

pub fn article(id: i64, title: &str, author_id: i64, rank: i64) -> Record {
    Record::with_key(id)
        .set("title", title)
        .set("author_id", author_id)
        .set("rank", rank)
}

/// Indexed in rank order 5, 3, 1, 2, 4; author 7 wrote 1 and 3
pub fn scenario_articles() -> Vec<Record> {
    vec![
        article(5, "rust async", 9, 1),
        article(3, "rust traits", 7, 2),
        article(1, "rust ownership", 7, 5),
        article(2, "rust lifetimes", 8, 4),
        article(4, "rust macros", 8, 3),
    ]
}

pub fn ids(raw: &[i64]) -> Vec<PrimaryKey> {
    raw.iter().map(|id| PrimaryKey::Int(*id)).collect()
}

pub fn keys(records: &[Record]) -> Vec<PrimaryKey> {
    records.iter().filter_map(|r| r.key.clone()).collect()
}

/// Save `records` to a fresh in-memory store
pub async fn store_with(schema: &RecordSchema, records: &[Record]) -> Arc<InMemoryRecordStore> {
    let store = Arc::new(InMemoryRecordStore::new());
    store.prepare(schema).await.unwrap();
    for record in records {
        store.save(schema, record).await.unwrap();
    }
    store
}

/// Engine over an in-memory index and `store`
pub fn memory_engine(config: SearchConfig, store: Arc<InMemoryRecordStore>) -> SearchEngine {
    SearchEngine::builder(config.clone())
        .index_client(Arc::new(InMemoryIndexClient::new(&config)))
        .record_store(store)
        .build()
        .unwrap()
}

/// Stored and indexed articles of the ranking scenario
pub async fn scenario_engine(config: SearchConfig) -> (SearchEngine, Arc<InMemoryRecordStore>) {
    let schema = article_schema();
    let records = scenario_articles();
    let store = store_with(&schema, &records).await;
    let engine = memory_engine(config, store.clone());
    engine.update(&schema, &records).unwrap();
    (engine, store)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
