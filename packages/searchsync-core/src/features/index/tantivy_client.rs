//! Tantivy Index Client
//!
//! # Layout
//!
//! ```text
//! {storage_path}/
//!   articles.index/     ← one tantivy directory per collection
//!   comments.index/
//! ```
//!
//! Each opened index keeps one `IndexWriter` behind a mutex and a reader that is
//! reloaded after every commit. Outside a transaction each write commits on its
//! own; inside one, writes stay invisible until `commit_transaction`. While one
//! thread has a transaction open, other threads' batches and writes queue up.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::Query;
use tantivy::schema::Value as _;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tracing::{debug, info};

use searchsync_storage::{Fields, PrimaryKey};

use super::ports::{projection_text, IndexClient, IndexError, IndexHandle, SearchResult};
use super::query_builder::{boolean_query, relevance_query, tokenize, MatchOptions};
use super::schema::{decode_key, encode_key, SchemaFields};
use super::transaction::{wait_turn, TransactionOwner};
use crate::config::SearchConfig;

/// Writer heap per index (single indexing thread)
const WRITER_HEAP_BYTES: usize = 20_000_000;

fn internal<E: std::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> IndexError {
    move |e| IndexError::Internal(format!("{}: {}", context, e))
}

/// Directory of tantivy indexes
pub struct TantivyIndexClient {
    storage_path: PathBuf,
    options: MatchOptions,
    indexes: DashMap<String, Arc<TantivyIndexHandle>>,
}

impl TantivyIndexClient {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            storage_path: config.storage_path.clone(),
            options: MatchOptions::from(config),
            indexes: DashMap::new(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.storage_path.join(name)
    }

    fn open(&self, name: &str, create: bool) -> Result<Arc<TantivyIndexHandle>, IndexError> {
        match self.indexes.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let path = self.path(name);
                let index = if self.index_exists(name) {
                    Index::open_in_dir(&path).map_err(internal("Failed to open index"))?
                } else if create {
                    std::fs::create_dir_all(&path)
                        .map_err(internal("Failed to create index dir"))?;
                    let index = Index::create_in_dir(&path, SchemaFields::new().schema)
                        .map_err(internal("Failed to create index"))?;
                    info!("Created index {} at {}", name, path.display());
                    index
                } else {
                    return Err(IndexError::NotFound(path.display().to_string()));
                };

                let handle = Arc::new(TantivyIndexHandle::new(name, index, self.options)?);
                entry.insert(handle.clone());
                Ok(handle)
            }
        }
    }
}

impl IndexClient for TantivyIndexClient {
    fn driver_name(&self) -> &'static str {
        "tantivy"
    }

    fn index_exists(&self, name: &str) -> bool {
        self.path(name).join("meta.json").exists()
    }

    fn create_index(&self, name: &str) -> Result<(), IndexError> {
        self.open(name, true).map(|_| ())
    }

    fn select_index(&self, name: &str) -> Result<Arc<dyn IndexHandle>, IndexError> {
        let handle: Arc<dyn IndexHandle> = self.open(name, false)?;
        Ok(handle)
    }

    fn drop_index(&self, name: &str) -> Result<bool, IndexError> {
        self.indexes.remove(name);
        let path = self.path(name);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&path).map_err(internal("Failed to remove index dir"))?;
        info!("Removed index {}", path.display());
        Ok(true)
    }
}

struct WriterState {
    writer: IndexWriter,
    owner: TransactionOwner,
}

/// One opened tantivy index
pub struct TantivyIndexHandle {
    name: String,
    index: Index,
    fields: SchemaFields,
    reader: IndexReader,
    state: Mutex<WriterState>,
    released: Condvar,
    options: MatchOptions,
}

impl TantivyIndexHandle {
    fn new(name: &str, index: Index, options: MatchOptions) -> Result<Self, IndexError> {
        let fields = SchemaFields::from_schema(index.schema())?;
        let writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_HEAP_BYTES)
            .map_err(internal("Failed to create writer"))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(internal("Failed to create reader"))?;

        Ok(Self {
            name: name.to_string(),
            index,
            fields,
            reader,
            state: Mutex::new(WriterState {
                writer,
                owner: TransactionOwner::default(),
            }),
            released: Condvar::new(),
            options,
        })
    }

    fn document(
        &self,
        key: Option<&PrimaryKey>,
        fields: &Fields,
    ) -> Result<TantivyDocument, IndexError> {
        let mut doc = TantivyDocument::new();
        if let Some(key) = key {
            doc.add_text(self.fields.key, encode_key(key)?);
        }
        doc.add_text(self.fields.content, projection_text(fields));
        Ok(doc)
    }

    /// Writer lock, once no other thread's transaction is open
    fn lock_turn(&self) -> MutexGuard<'_, WriterState> {
        let mut state = self.state.lock();
        wait_turn(&mut state, &self.released, |state| &state.owner);
        state
    }

    /// Apply `op` and commit unless this thread has a transaction open
    fn write<F>(&self, op: F) -> Result<(), IndexError>
    where
        F: FnOnce(&IndexWriter) -> Result<(), IndexError>,
    {
        let mut state = self.lock_turn();
        let in_transaction = state.owner.is_mine();
        if let Err(e) = op(&state.writer) {
            if !in_transaction {
                state.writer.rollback().map_err(internal("Failed to roll back"))?;
            }
            return Err(e);
        }
        if !in_transaction {
            self.commit_locked(&mut state)?;
        }
        Ok(())
    }

    fn commit_locked(&self, state: &mut WriterState) -> Result<(), IndexError> {
        state.writer.commit().map_err(internal("Failed to commit"))?;
        self.reader.reload().map_err(internal("Failed to reload reader"))?;
        Ok(())
    }

    fn run(
        &self,
        query: &dyn Query,
        limit: usize,
        started: Instant,
    ) -> Result<SearchResult, IndexError> {
        let searcher = self.reader.searcher();
        let (top_docs, hits) = if limit == 0 {
            let hits = searcher.search(query, &Count).map_err(internal("Search failed"))?;
            (Vec::new(), hits)
        } else {
            searcher
                .search(query, &(TopDocs::with_limit(limit), Count))
                .map_err(internal("Search failed"))?
        };

        let mut ids = Vec::with_capacity(top_docs.len());
        for (_score, address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(internal("Failed to retrieve doc"))?;
            if let Some(raw) = doc.get_first(self.fields.key).and_then(|v| v.as_str()) {
                ids.push(decode_key(raw)?);
            }
        }

        debug!("{}: {} ids of {} hits", self.name, ids.len(), hits);
        Ok(SearchResult {
            ids,
            hits,
            execution_time: started.elapsed(),
        })
    }
}

impl IndexHandle for TantivyIndexHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn search(&self, query: &str, limit: usize) -> Result<SearchResult, IndexError> {
        let started = Instant::now();
        let tokens = tokenize(&self.index, self.fields.content, query)?;
        match relevance_query(self.fields.content, &tokens, &self.options)? {
            Some(query) => self.run(query.as_ref(), limit, started),
            None => Ok(SearchResult {
                execution_time: started.elapsed(),
                ..SearchResult::empty()
            }),
        }
    }

    fn search_boolean(&self, query: &str, limit: usize) -> Result<SearchResult, IndexError> {
        let started = Instant::now();
        match boolean_query(&self.index, self.fields.content, query, &self.options)? {
            Some(query) => self.run(query.as_ref(), limit, started),
            None => Ok(SearchResult {
                execution_time: started.elapsed(),
                ..SearchResult::empty()
            }),
        }
    }

    fn insert(&self, fields: &Fields) -> Result<(), IndexError> {
        let doc = self.document(None, fields)?;
        self.write(|writer| {
            writer
                .add_document(doc)
                .map(|_| ())
                .map_err(internal("Failed to add document"))
        })
    }

    fn update(&self, key: &PrimaryKey, fields: &Fields) -> Result<(), IndexError> {
        let term = self.fields.key_term(key)?;
        let doc = self.document(Some(key), fields)?;
        self.write(|writer| {
            writer.delete_term(term);
            writer
                .add_document(doc)
                .map(|_| ())
                .map_err(internal("Failed to add document"))
        })
    }

    fn delete(&self, key: &PrimaryKey) -> Result<(), IndexError> {
        let term = self.fields.key_term(key)?;
        self.write(|writer| {
            writer.delete_term(term);
            Ok(())
        })
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    fn begin_transaction(&self) -> Result<(), IndexError> {
        let mut state = self.lock_turn();
        state.owner.claim(&self.name)
    }

    fn commit_transaction(&self) -> Result<(), IndexError> {
        let mut state = self.state.lock();
        state.owner.release(&self.name)?;
        self.released.notify_all();
        let committed = self.commit_locked(&mut state);
        if committed.is_err() {
            state.writer.rollback().map_err(internal("Failed to roll back"))?;
        }
        committed
    }

    fn rollback_transaction(&self) -> Result<(), IndexError> {
        let mut state = self.state.lock();
        state.owner.release(&self.name)?;
        self.released.notify_all();
        state.writer.rollback().map_err(internal("Failed to roll back"))?;
        Ok(())
    }

    fn document_count(&self) -> Result<u64, IndexError> {
        Ok(self.reader.searcher().num_docs())
    }
}
