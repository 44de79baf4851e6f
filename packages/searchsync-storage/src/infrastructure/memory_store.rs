//! In-Memory Record Store
//!
//! BTreeMap-backed implementation used by unit tests and by hosts that keep
//! their system of record in process. Query semantics mirror the SQLite store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::models::{KeyType, PrimaryKey, Record, RecordSchema};
use crate::domain::ports::RecordStore;
use crate::domain::query::{RecordQuery, SoftDeleteMode};
use crate::error::{Result, StorageError};

type Collection = BTreeMap<PrimaryKey, Record>;

#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_columns(schema: &RecordSchema, query: &RecordQuery) -> Result<()> {
        let fields = query
            .predicates
            .iter()
            .map(|p| &p.field)
            .chain(query.orders.iter().map(|o| &o.field));
        for field in fields {
            if !schema.has_column(field) {
                return Err(StorageError::configuration(format!(
                    "Unknown column '{}' for {}",
                    field, schema.record_type
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn prepare(&self, schema: &RecordSchema) -> Result<()> {
        schema.validate()?;
        self.collections
            .write()
            .entry(schema.collection.clone())
            .or_default();
        Ok(())
    }

    async fn save(&self, schema: &RecordSchema, record: &Record) -> Result<Record> {
        schema.check_record(record)?;
        let mut collections = self.collections.write();
        let rows = collections.entry(schema.collection.clone()).or_default();

        let key = match &record.key {
            Some(key) => key.clone(),
            None if schema.key_type == KeyType::Integer => {
                let next = rows
                    .keys()
                    .filter_map(|k| match k {
                        PrimaryKey::Int(i) => Some(*i),
                        PrimaryKey::Text(_) => None,
                    })
                    .max()
                    .unwrap_or(0)
                    + 1;
                PrimaryKey::Int(next)
            }
            None => {
                return Err(StorageError::configuration(format!(
                    "{} uses text keys; records must carry a key before saving",
                    schema.record_type
                )))
            }
        };

        let mut saved = record.clone();
        saved.key = Some(key.clone());
        saved.fields = saved
            .fields
            .into_iter()
            .map(|(name, value)| (name, value.into_stored()))
            .collect();
        rows.insert(key, saved.clone());
        Ok(saved)
    }

    async fn find(&self, schema: &RecordSchema, key: &PrimaryKey) -> Result<Option<Record>> {
        Ok(self
            .collections
            .read()
            .get(&schema.collection)
            .and_then(|rows| rows.get(key))
            .cloned())
    }

    async fn soft_delete(
        &self,
        schema: &RecordSchema,
        key: &PrimaryKey,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        if !schema.soft_deletes {
            return Err(StorageError::configuration(format!(
                "{} does not support soft deletes",
                schema.record_type
            )));
        }
        let mut collections = self.collections.write();
        match collections
            .get_mut(&schema.collection)
            .and_then(|rows| rows.get_mut(key))
        {
            Some(record) => {
                record.deleted_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, schema: &RecordSchema, key: &PrimaryKey) -> Result<bool> {
        Ok(self
            .collections
            .write()
            .get_mut(&schema.collection)
            .and_then(|rows| rows.remove(key))
            .is_some())
    }

    async fn fetch(&self, schema: &RecordSchema, query: &RecordQuery) -> Result<Vec<Record>> {
        Self::check_columns(schema, query)?;
        let collections = self.collections.read();
        let Some(rows) = collections.get(&schema.collection) else {
            return Ok(Vec::new());
        };

        let wanted: std::collections::HashSet<&PrimaryKey> = query.keys.iter().collect();
        let mut records: Vec<Record> = rows
            .iter()
            .filter(|(key, record)| wanted.contains(key) && query.admits(schema, record))
            .map(|(_, record)| record.clone())
            .collect();

        if !query.orders.is_empty() {
            records.sort_by(|a, b| query.compare(schema, a, b));
        }
        Ok(records)
    }

    async fn missing_keys(
        &self,
        schema: &RecordSchema,
        query: &RecordQuery,
    ) -> Result<Vec<PrimaryKey>> {
        Self::check_columns(schema, query)?;
        let collections = self.collections.read();
        let rows = collections.get(&schema.collection);

        Ok(query
            .keys
            .iter()
            .filter(|key| {
                !rows
                    .and_then(|rows| rows.get(*key))
                    .is_some_and(|record| query.admits(schema, record))
            })
            .cloned()
            .collect())
    }

    async fn count(&self, schema: &RecordSchema, mode: SoftDeleteMode) -> Result<u64> {
        Ok(self
            .collections
            .read()
            .get(&schema.collection)
            .map(|rows| rows.values().filter(|r| mode.admits(schema, r)).count() as u64)
            .unwrap_or(0))
    }

    async fn scan(
        &self,
        schema: &RecordSchema,
        mode: SoftDeleteMode,
        after: Option<&PrimaryKey>,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let collections = self.collections.read();
        let Some(rows) = collections.get(&schema.collection) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .filter(|(key, _)| after.map_or(true, |after| *key > after))
            .filter(|(_, record)| mode.admits(schema, record))
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }
}
