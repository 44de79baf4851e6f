//! Read path: index query → reconciliation → page → mapped records

#[path = "../common/mod.rs"]
mod common;

use chrono::Utc;
use common::*;
use pretty_assertions::assert_eq;
use searchsync_core::{PageOverflow, SearchConfig, SearchRequest};
use searchsync_storage::{Direction, PrimaryKey, RecordStore, SqliteRecordStore};
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════════
// Ranking scenario
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_raw_search_returns_index_rank() {
    init_tracing();
    let (engine, _) = scenario_engine(SearchConfig::default()).await;

    let result = engine
        .search(&article_schema(), &SearchRequest::new("rust"))
        .unwrap();
    assert_eq!(result.ids, ids(&[5, 3, 1, 2, 4]));
    assert_eq!(result.hits, 5);
}

#[tokio::test]
async fn test_articles_scenario() {
    let (engine, _) = scenario_engine(SearchConfig::default()).await;
    let schema = article_schema();
    let request = SearchRequest::new("rust").where_eq("author_id", 7);

    let first = engine.paginate(&schema, &request, 10, 1).await.unwrap();
    assert_eq!(first.ids, ids(&[3, 1]));
    assert_eq!(engine.total_count(&first), 2);

    let second = engine.paginate(&schema, &request, 1, 2).await.unwrap();
    assert_eq!(engine.map_ids(&second), ids(&[1]));
    assert_eq!(second.hits, 2);

    let records = engine.map(&schema, &request, &second).await.unwrap();
    assert_eq!(keys(&records), ids(&[1]));
    assert_eq!(records[0].get("title"), Some(&"rust ownership".into()));
}

#[tokio::test]
async fn test_get_returns_page_of_records() {
    let (engine, _) = scenario_engine(SearchConfig::default()).await;
    let request = SearchRequest::new("rust").where_eq("author_id", 7);

    let page = engine
        .get(&article_schema(), &request, 2, Some(1))
        .await
        .unwrap();
    assert_eq!(keys(&page.records), ids(&[1]));
    assert_eq!(page.total, 2);
    assert_eq!(page.page, 2);
    assert_eq!(page.per_page, 1);
    assert_eq!(page.page_count(), 2);
}

#[tokio::test]
async fn test_get_uses_default_page_size() {
    let config = SearchConfig::default().default_page_size(2);
    let (engine, _) = scenario_engine(config).await;

    let page = engine
        .get(&article_schema(), &SearchRequest::new("rust"), 1, None)
        .await
        .unwrap();
    assert_eq!(keys(&page.records), ids(&[5, 3]));
    assert_eq!(page.total, 5);
    assert_eq!(page.per_page, 2);
}

#[tokio::test]
async fn test_caller_ordering_overrides_rank() {
    let (engine, _) = scenario_engine(SearchConfig::default()).await;
    let request = SearchRequest::new("rust").order_by("rank", Direction::Asc);

    let page = engine
        .get(&article_schema(), &request, 1, Some(10))
        .await
        .unwrap();
    assert_eq!(keys(&page.records), ids(&[5, 3, 4, 2, 1]));
}

#[tokio::test]
async fn test_take_caps_index_query() {
    let (engine, _) = scenario_engine(SearchConfig::default()).await;
    let request = SearchRequest::new("rust").where_eq("author_id", 7).take(2);

    let result = engine
        .paginate(&article_schema(), &request, 10, 1)
        .await
        .unwrap();
    assert_eq!(result.ids, ids(&[3]));
    assert_eq!(result.hits, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Stale index entries
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_deleted_records_are_discarded() {
    let (engine, store) = scenario_engine(SearchConfig::default()).await;
    let schema = article_schema();
    store.delete(&schema, &PrimaryKey::Int(2)).await.unwrap();

    let result = engine
        .paginate(&schema, &SearchRequest::new("rust"), 10, 1)
        .await
        .unwrap();
    assert_eq!(result.ids, ids(&[5, 3, 1, 4]));
    assert_eq!(result.hits, 4);
}

#[tokio::test]
async fn test_soft_deleted_visibility() {
    let (engine, store) = scenario_engine(SearchConfig::default()).await;
    let schema = article_schema();
    store
        .soft_delete(&schema, &PrimaryKey::Int(3), Utc::now())
        .await
        .unwrap();

    let live = SearchRequest::new("rust").where_eq("author_id", 7);
    let result = engine.paginate(&schema, &live, 10, 1).await.unwrap();
    assert_eq!(result.ids, ids(&[1]));

    let explicit_live = live.clone().soft_deleted(false);
    let result = engine.paginate(&schema, &explicit_live, 10, 1).await.unwrap();
    assert_eq!(result.ids, ids(&[1]));

    let trashed = live.soft_deleted(true);
    let page = engine.get(&schema, &trashed, 1, Some(10)).await.unwrap();
    assert_eq!(keys(&page.records), ids(&[3]));
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_soft_delete_switch_off_shows_everything() {
    let config = SearchConfig::default().soft_delete_enabled(false);
    let (engine, store) = scenario_engine(config).await;
    let schema = article_schema();
    store
        .soft_delete(&schema, &PrimaryKey::Int(3), Utc::now())
        .await
        .unwrap();

    let request = SearchRequest::new("rust")
        .where_eq("author_id", 7)
        .soft_deleted(true);
    let result = engine.paginate(&schema, &request, 10, 1).await.unwrap();
    assert_eq!(result.ids, ids(&[3, 1]));
}

// ═══════════════════════════════════════════════════════════════════════════
// Paging policy
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_page_past_the_end() {
    let schema = article_schema();
    let request = SearchRequest::new("rust").where_eq("author_id", 7);

    let (engine, _) = scenario_engine(SearchConfig::default()).await;
    let result = engine.paginate(&schema, &request, 1, 9).await.unwrap();
    assert!(result.ids.is_empty());
    assert_eq!(result.hits, 2);

    let config = SearchConfig::default().page_overflow(PageOverflow::LastPage);
    let (engine, _) = scenario_engine(config).await;
    let result = engine.paginate(&schema, &request, 1, 9).await.unwrap();
    assert_eq!(result.ids, ids(&[1]));
}

#[tokio::test]
async fn test_clamped_page_reports_its_number() {
    let config = SearchConfig::default().page_overflow(PageOverflow::LastPage);
    let (engine, _) = scenario_engine(config).await;

    let page = engine
        .get(&article_schema(), &SearchRequest::new("rust"), 9, Some(2))
        .await
        .unwrap();
    assert_eq!(page.page, 3);
    assert_eq!(page.page_count(), 3);
    assert_eq!(keys(&page.records), ids(&[4]));
    assert_eq!(page.total, 5);
}

#[tokio::test]
async fn test_zero_page_arguments_rejected() {
    let (engine, _) = scenario_engine(SearchConfig::default()).await;
    let request = SearchRequest::new("rust");
    assert!(engine.paginate(&article_schema(), &request, 0, 1).await.is_err());
    assert!(engine.paginate(&article_schema(), &request, 10, 0).await.is_err());
}

// ═══════════════════════════════════════════════════════════════════════════
// Errors and recovery
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_missing_index_yields_empty_page() {
    let schema = article_schema();
    let store = store_with(&schema, &scenario_articles()).await;
    let engine = memory_engine(SearchConfig::default(), store);

    let page = engine
        .get(&schema, &SearchRequest::new("rust"), 1, None)
        .await
        .unwrap();
    assert!(page.records.is_empty());
    assert_eq!(page.total, 0);

    let status = engine.status(&[schema]).await.unwrap();
    assert_eq!(status[0].index_documents, 0);
}

#[tokio::test]
async fn test_unknown_constraint_field_is_fatal() {
    let schema = article_schema();
    let store = store_with(&schema, &[]).await;
    let engine = memory_engine(SearchConfig::default(), store);

    let request = SearchRequest::new("rust").where_eq("autor_id", 7);
    let err = engine.paginate(&schema, &request, 10, 1).await.unwrap_err();
    assert!(err.is_configuration());
}

// ═══════════════════════════════════════════════════════════════════════════
// Query modes
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_boolean_search_excludes_terms() {
    let config = SearchConfig::default().boolean_search(true);
    let (engine, _) = scenario_engine(config).await;

    let result = engine
        .paginate(&article_schema(), &SearchRequest::new("rust -macros"), 10, 1)
        .await
        .unwrap();
    assert_eq!(result.ids, ids(&[5, 3, 1, 2]));
}

#[tokio::test]
async fn test_fuzzy_and_as_you_type() {
    let schema = article_schema();

    let (fuzzy, _) = scenario_engine(SearchConfig::default().fuzziness(true)).await;
    let result = fuzzy
        .search(&schema, &SearchRequest::new("ownrship"))
        .unwrap();
    assert_eq!(result.ids, ids(&[1]));

    let (typing, _) = scenario_engine(SearchConfig::default().as_you_type(true)).await;
    let result = typing.search(&schema, &SearchRequest::new("own")).unwrap();
    assert_eq!(result.ids, ids(&[1]));

    let (exact, _) = scenario_engine(SearchConfig::default()).await;
    assert!(exact
        .search(&schema, &SearchRequest::new("own"))
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_custom_callback_feeds_reconciliation() {
    let (engine, _) = scenario_engine(SearchConfig::default()).await;
    let request = SearchRequest::new("anything")
        .where_eq("author_id", 8)
        .using(|_, _, _| {
            Ok(searchsync_core::SearchResult {
                ids: ids(&[4, 9, 2]),
                hits: 3,
                ..Default::default()
            })
        });

    let result = engine
        .paginate(&article_schema(), &request, 10, 1)
        .await
        .unwrap();
    assert_eq!(result.ids, ids(&[4, 2]));
    assert_eq!(result.hits, 2);
}

// ═══════════════════════════════════════════════════════════════════════════
// SQLite system of record
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_articles_scenario_over_sqlite() {
    let schema = article_schema();
    let store = Arc::new(SqliteRecordStore::in_memory().unwrap());
    store.prepare(&schema).await.unwrap();
    let records = scenario_articles();
    for record in &records {
        store.save(&schema, record).await.unwrap();
    }

    let config = SearchConfig::default();
    let engine = searchsync_core::SearchEngine::builder(config.clone())
        .index_client(Arc::new(searchsync_core::InMemoryIndexClient::new(&config)))
        .record_store(store)
        .build()
        .unwrap();
    engine.update(&schema, &records).unwrap();

    let request = SearchRequest::new("rust").where_eq("author_id", 7);
    let page = engine.get(&schema, &request, 2, Some(1)).await.unwrap();
    assert_eq!(keys(&page.records), ids(&[1]));
    assert_eq!(page.total, 2);
}
