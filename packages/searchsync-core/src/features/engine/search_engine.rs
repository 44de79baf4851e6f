//! Search Engine
//!
//! Facade over the write path (synchronizer) and the read path
//! (index query → reconciler → pager → mapper).
//!
//! ```text
//! query ─▶ filters ─▶ IndexHandle::search ─▶ Reconciler ─▶ paginate ─▶ ResultMapper
//!                            │
//!                            └─▶ SearchPerformed ─▶ listeners
//! ```

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use searchsync_storage::{PrimaryKey, Record, RecordSchema, RecordStore};

use super::events::{SearchListener, SearchPerformed};
use super::filters::{QueryFilter, QueryFilters};
use super::request::SearchRequest;
use crate::config::SearchConfig;
use crate::errors::{Result, SearchError};
use crate::features::index::{index_name, IndexClient, SearchResult, TantivyIndexClient};
use crate::features::mapping::ResultMapper;
use crate::features::pagination::paginate;
use crate::features::reconcile::Reconciler;
use crate::features::sync::{SyncReport, Synchronizer};

/// One page of mapped records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub records: Vec<Record>,
    /// Reconciled hit count across all pages
    pub total: usize,
    /// 1-indexed page actually returned
    pub page: usize,
    pub per_page: usize,
}

impl SearchPage {
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.per_page)
    }
}

pub struct SearchEngine {
    pub(super) config: SearchConfig,
    pub(super) client: Arc<dyn IndexClient>,
    pub(super) store: Arc<dyn RecordStore>,
    pub(super) synchronizer: Synchronizer,
    reconciler: Reconciler,
    mapper: ResultMapper,
    filters: QueryFilters,
    listeners: Vec<Arc<dyn SearchListener>>,
}

impl SearchEngine {
    pub fn builder(config: SearchConfig) -> SearchEngineBuilder {
        SearchEngineBuilder::new(config)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn driver_name(&self) -> &'static str {
        self.client.driver_name()
    }

    // ═══════════════════════════════════════════════════════════════
    // Write path
    // ═══════════════════════════════════════════════════════════════

    /// Index `records`, replacing existing entries
    pub fn update(&self, schema: &RecordSchema, records: &[Record]) -> Result<SyncReport> {
        self.synchronizer.upsert(schema, records)
    }

    /// Remove the entries of `records`
    pub fn delete(&self, schema: &RecordSchema, records: &[Record]) -> Result<SyncReport> {
        self.synchronizer.remove(schema, records)
    }

    /// Remove the index storage of `schema`. Returns false when there was none.
    pub fn flush(&self, schema: &RecordSchema) -> Result<bool> {
        let name = index_name(schema.searchable_as());
        let removed = self.client.drop_index(&name)?;
        if removed {
            info!("Flushed index {} of {}", name, schema.record_type);
        }
        Ok(removed)
    }

    /// Indexes are created lazily by the write and read paths
    pub fn create_index(&self, name: &str) -> Result<()> {
        Err(SearchError::UnsupportedOperation(format!(
            "{} is created on first write; explicit index creation is not supported",
            name
        )))
    }

    pub fn delete_index(&self, name: &str) -> Result<()> {
        Err(SearchError::UnsupportedOperation(format!(
            "remove {} manually",
            self.config.index_path(name).display()
        )))
    }

    // ═══════════════════════════════════════════════════════════════
    // Read path
    // ═══════════════════════════════════════════════════════════════

    /// Raw index query: ranked ids and the hit count the index reports.
    ///
    /// A missing index is created and yields an empty result.
    pub fn search(&self, schema: &RecordSchema, request: &SearchRequest) -> Result<SearchResult> {
        let name = request
            .index
            .clone()
            .unwrap_or_else(|| index_name(schema.searchable_as()));

        let index = match self.client.select_index(&name) {
            Ok(index) => index,
            Err(err) if err.is_not_found() => {
                warn!("Index {} not found, creating it", name);
                self.client.create_index(&name)?;
                return Ok(SearchResult::empty());
            }
            Err(err) => return Err(err.into()),
        };

        let query = self.filters.apply(&request.query, &schema.record_type);
        let limit = request.limit_within(self.config.max_docs_per_query);

        if let Some(callback) = &request.callback {
            return Ok(callback(index.as_ref(), &query, limit)?);
        }

        let result = if self.config.boolean_search {
            index.search_boolean(&query, limit)?
        } else {
            index.search(&query, limit)?
        };

        self.emit(SearchPerformed {
            query,
            boolean: self.config.boolean_search,
            index_name: index.name().to_string(),
            record_type: schema.record_type.clone(),
            ids: result.ids.clone(),
            hits: result.hits,
            execution_time: result.execution_time,
            driver: self.client.driver_name().to_string(),
        });
        Ok(result)
    }

    /// Search, reconcile, and cut one page of ids.
    ///
    /// `hits` of the returned result is the reconciled count over all pages.
    pub async fn paginate(
        &self,
        schema: &RecordSchema,
        request: &SearchRequest,
        per_page: usize,
        page: usize,
    ) -> Result<SearchResult> {
        let (_, result) = self.paged(schema, request, per_page, page).await?;
        Ok(result)
    }

    /// `paginate`, plus the number of the page actually cut, which differs from
    /// the requested one when an overflowing request falls back to the last page
    async fn paged(
        &self,
        schema: &RecordSchema,
        request: &SearchRequest,
        per_page: usize,
        page: usize,
    ) -> Result<(usize, SearchResult)> {
        let raw = self.search(schema, request)?;
        let reconciled = self
            .reconciler
            .reconcile(schema, &raw.ids, &request.constraint)
            .await?;
        let page = paginate(&reconciled.ids, per_page, page, self.config.page_overflow)?;

        debug!(
            "Page {} of {} for {}: {} ids",
            page.number,
            page.page_count(),
            schema.record_type,
            page.items.len()
        );
        Ok((
            page.number,
            SearchResult {
                ids: page.items,
                hits: reconciled.hits,
                execution_time: raw.execution_time,
            },
        ))
    }

    /// Load the records behind `result`, in rank or caller order
    pub async fn map(
        &self,
        schema: &RecordSchema,
        request: &SearchRequest,
        result: &SearchResult,
    ) -> Result<Vec<Record>> {
        self.mapper
            .map(schema, &result.ids, &request.constraint)
            .await
    }

    pub fn map_ids(&self, result: &SearchResult) -> Vec<PrimaryKey> {
        result.ids.clone()
    }

    pub fn total_count(&self, result: &SearchResult) -> usize {
        result.hits
    }

    /// Full read path. `per_page` defaults to `default_page_size`.
    pub async fn get(
        &self,
        schema: &RecordSchema,
        request: &SearchRequest,
        page: usize,
        per_page: Option<usize>,
    ) -> Result<SearchPage> {
        let per_page = per_page.unwrap_or(self.config.default_page_size);
        let (page, result) = self.paged(schema, request, per_page, page).await?;
        let records = self.map(schema, request, &result).await?;
        Ok(SearchPage {
            records,
            total: result.hits,
            page,
            per_page,
        })
    }

    fn emit(&self, event: SearchPerformed) {
        info!(
            query = %event.query,
            index = %event.index_name,
            driver = %event.driver,
            hits = event.hits,
            elapsed_ms = event.execution_time.as_millis() as u64,
            "Search performed"
        );
        for listener in &self.listeners {
            listener.search_performed(&event);
        }
    }
}

/// Builder for [`SearchEngine`]. A record store is required; the index client
/// defaults to tantivy under `storage_path`.
pub struct SearchEngineBuilder {
    config: SearchConfig,
    client: Option<Arc<dyn IndexClient>>,
    store: Option<Arc<dyn RecordStore>>,
    filters: Vec<(String, QueryFilter)>,
    listeners: Vec<Arc<dyn SearchListener>>,
}

impl SearchEngineBuilder {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            client: None,
            store: None,
            filters: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn index_client(mut self, client: Arc<dyn IndexClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn record_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.filters.push((name.into(), Arc::new(filter)));
        self
    }

    pub fn listener(mut self, listener: Arc<dyn SearchListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> Result<SearchEngine> {
        self.config.validate()?;

        let store = self
            .store
            .ok_or_else(|| SearchError::configuration("a record store is required"))?;

        let mut filters = QueryFilters::new();
        for (name, filter) in self.filters {
            filters.register(name, filter)?;
        }

        let client: Arc<dyn IndexClient> = match self.client {
            Some(client) => client,
            None => Arc::new(TantivyIndexClient::new(&self.config)),
        };

        let soft_delete_enabled = self.config.soft_delete_enabled;
        info!(
            "Search engine ready (driver: {}, {} filters, {} listeners)",
            client.driver_name(),
            filters.len(),
            self.listeners.len()
        );

        Ok(SearchEngine {
            synchronizer: Synchronizer::new(client.clone()),
            reconciler: Reconciler::new(store.clone(), soft_delete_enabled),
            mapper: ResultMapper::new(store.clone(), soft_delete_enabled),
            config: self.config,
            client,
            store,
            filters,
            listeners: self.listeners,
        })
    }
}
