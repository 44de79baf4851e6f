//! SQLite Record Store
//!
//! File-based persistent system of record. One table per collection; key lists
//! travel as a single JSON parameter expanded with `json_each`, so bulk lookups
//! and the reconciliation anti-join are one statement each regardless of the
//! number of keys.
//!
//! Values are always bound parameters. Identifiers come from the schema, are
//! checked against `[A-Za-z_][A-Za-z0-9_]*` and double-quoted.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::domain::models::{
    is_valid_identifier, KeyType, PrimaryKey, Record, RecordSchema, Value, DELETED_AT_COLUMN,
};
use crate::domain::ports::RecordStore;
use crate::domain::query::{Comparison, Predicate, RecordQuery, SoftDeleteMode};
use crate::error::{Result, StorageError};

/// SQLite-based RecordStore implementation
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open (or create) a database file
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run arbitrary SQL against the underlying connection.
    ///
    /// Hosts use this for fixtures and migrations the port does not cover.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SQL building
// ═══════════════════════════════════════════════════════════════════════════

fn quote_ident(name: &str) -> Result<String> {
    if !is_valid_identifier(name) {
        return Err(StorageError::configuration(format!(
            "Invalid identifier '{}'",
            name
        )));
    }
    Ok(format!("\"{}\"", name))
}

fn column(schema: &RecordSchema, name: &str) -> Result<String> {
    if !schema.has_column(name) {
        return Err(StorageError::configuration(format!(
            "Unknown column '{}' for {}",
            name, schema.record_type
        )));
    }
    quote_ident(name)
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

/// Booleans were written as integers and read back as `Value::Int`
fn from_sql_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Int(i),
        SqlValue::Real(f) => Value::Float(f),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(b) => Value::Text(String::from_utf8_lossy(&b).into_owned()),
    }
}

fn keys_json(keys: &[PrimaryKey]) -> Result<SqlValue> {
    Ok(SqlValue::Text(serde_json::to_string(keys)?))
}

fn key_param(key: &PrimaryKey) -> SqlValue {
    to_sql_value(&key.to_value())
}

/// Soft-delete condition for `mode`, `None` when no condition applies
fn soft_delete_clause(schema: &RecordSchema, mode: SoftDeleteMode) -> Option<String> {
    if !schema.soft_deletes {
        return None;
    }
    match mode {
        SoftDeleteMode::ExcludeDeleted => Some(format!("\"{}\" IS NULL", DELETED_AT_COLUMN)),
        SoftDeleteMode::OnlyDeleted => Some(format!("\"{}\" IS NOT NULL", DELETED_AT_COLUMN)),
        SoftDeleteMode::IncludeAll => None,
    }
}

fn predicate_clause(
    schema: &RecordSchema,
    predicate: &Predicate,
    params: &mut Vec<SqlValue>,
) -> Result<String> {
    let col = column(schema, &predicate.field)?;
    if predicate.value.is_null() {
        return Ok(match predicate.op {
            Comparison::Eq => format!("{} IS NULL", col),
            Comparison::NotEq => format!("{} IS NOT NULL", col),
            _ => "0".to_string(),
        });
    }
    params.push(to_sql_value(&predicate.value));
    Ok(format!("{} {} ?", col, predicate.op.as_sql()))
}

/// Conjunction of soft-delete visibility and every predicate
fn filter_clauses(
    schema: &RecordSchema,
    query: &RecordQuery,
    params: &mut Vec<SqlValue>,
) -> Result<Vec<String>> {
    let mut clauses: Vec<String> = soft_delete_clause(schema, query.soft_delete)
        .into_iter()
        .collect();
    for predicate in &query.predicates {
        clauses.push(predicate_clause(schema, predicate, params)?);
    }
    Ok(clauses)
}

fn select_list(schema: &RecordSchema) -> Result<String> {
    let mut columns = vec![quote_ident(&schema.key_name)?];
    for name in &schema.columns {
        columns.push(quote_ident(name)?);
    }
    if schema.soft_deletes {
        columns.push(quote_ident(DELETED_AT_COLUMN)?);
    }
    Ok(columns.join(", "))
}

fn read_key(schema: &RecordSchema, raw: SqlValue) -> Result<PrimaryKey> {
    match (schema.key_type, raw) {
        (KeyType::Integer, SqlValue::Integer(i)) => Ok(PrimaryKey::Int(i)),
        (KeyType::Text, SqlValue::Text(s)) => Ok(PrimaryKey::Text(s)),
        (_, other) => Err(StorageError::serialization(format!(
            "Unexpected key value {:?} in {}",
            other, schema.collection
        ))),
    }
}

fn read_record(schema: &RecordSchema, row: &Row<'_>) -> Result<Record> {
    let key = read_key(schema, row.get::<_, SqlValue>(0)?)?;
    let mut record = Record::with_key(key);
    for (offset, name) in schema.columns.iter().enumerate() {
        let value = from_sql_value(row.get::<_, SqlValue>(offset + 1)?);
        if !value.is_null() {
            record.fields.insert(name.clone(), value);
        }
    }
    if schema.soft_deletes {
        let millis: Option<i64> = row.get(schema.columns.len() + 1)?;
        record.deleted_at = millis.map(millis_to_datetime).transpose()?;
    }
    Ok(record)
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        StorageError::serialization(format!("Invalid soft-delete timestamp {}", millis))
    })
}

fn query_records(
    conn: &Connection,
    schema: &RecordSchema,
    sql: &str,
    params: Vec<SqlValue>,
) -> Result<Vec<Record>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(params))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(read_record(schema, row)?);
    }
    Ok(records)
}

// ═══════════════════════════════════════════════════════════════════════════
// RecordStore
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn prepare(&self, schema: &RecordSchema) -> Result<()> {
        schema.validate()?;

        let key_decl = match schema.key_type {
            KeyType::Integer => "INTEGER PRIMARY KEY",
            KeyType::Text => "TEXT PRIMARY KEY NOT NULL",
        };
        let mut columns = vec![format!("{} {}", quote_ident(&schema.key_name)?, key_decl)];
        for name in &schema.columns {
            columns.push(quote_ident(name)?);
        }
        if schema.soft_deletes {
            columns.push(format!("{} INTEGER", quote_ident(DELETED_AT_COLUMN)?));
        }

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&schema.collection)?,
            columns.join(", ")
        );
        self.conn.lock().execute(&sql, [])?;
        debug!("Prepared collection {} for {}", schema.collection, schema.record_type);
        Ok(())
    }

    async fn save(&self, schema: &RecordSchema, record: &Record) -> Result<Record> {
        schema.check_record(record)?;

        let mut names = Vec::new();
        let mut params = Vec::new();
        match &record.key {
            Some(key) => {
                names.push(quote_ident(&schema.key_name)?);
                params.push(key_param(key));
            }
            None if schema.key_type == KeyType::Integer => {}
            None => {
                return Err(StorageError::configuration(format!(
                    "{} uses text keys; records must carry a key before saving",
                    schema.record_type
                )))
            }
        }
        for name in &schema.columns {
            names.push(quote_ident(name)?);
            params.push(record.get(name).map(to_sql_value).unwrap_or(SqlValue::Null));
        }
        if schema.soft_deletes {
            names.push(quote_ident(DELETED_AT_COLUMN)?);
            params.push(
                record
                    .deleted_at
                    .map(|at| SqlValue::Integer(at.timestamp_millis()))
                    .unwrap_or(SqlValue::Null),
            );
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = if names.is_empty() {
            format!(
                "INSERT OR REPLACE INTO {} DEFAULT VALUES",
                quote_ident(&schema.collection)?
            )
        } else {
            format!(
                "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
                quote_ident(&schema.collection)?,
                names.join(", "),
                placeholders
            )
        };

        let conn = self.conn.lock();
        conn.execute(&sql, params_from_iter(params))?;

        let mut saved = record.clone();
        if saved.key.is_none() {
            saved.key = Some(PrimaryKey::Int(conn.last_insert_rowid()));
        }
        Ok(saved)
    }

    async fn find(&self, schema: &RecordSchema, key: &PrimaryKey) -> Result<Option<Record>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            select_list(schema)?,
            quote_ident(&schema.collection)?,
            quote_ident(&schema.key_name)?
        );
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let record = stmt
            .query_row([key_param(key)], |row| Ok(read_record(schema, row)))
            .optional()?;
        record.transpose()
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
        let sql = format!(
            "UPDATE {} SET {} = ? WHERE {} = ?",
            quote_ident(&schema.collection)?,
            quote_ident(DELETED_AT_COLUMN)?,
            quote_ident(&schema.key_name)?
        );
        let changed = self.conn.lock().execute(
            &sql,
            params_from_iter([SqlValue::Integer(at.timestamp_millis()), key_param(key)]),
        )?;
        Ok(changed > 0)
    }

    async fn delete(&self, schema: &RecordSchema, key: &PrimaryKey) -> Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_ident(&schema.collection)?,
            quote_ident(&schema.key_name)?
        );
        let changed = self.conn.lock().execute(&sql, [key_param(key)])?;
        Ok(changed > 0)
    }

    async fn fetch(&self, schema: &RecordSchema, query: &RecordQuery) -> Result<Vec<Record>> {
        if query.keys.is_empty() {
            return Ok(Vec::new());
        }
        let key_col = quote_ident(&schema.key_name)?;

        let mut params = vec![keys_json(&query.keys)?];
        let mut clauses = vec![format!("{} IN (SELECT value FROM json_each(?))", key_col)];
        clauses.extend(filter_clauses(schema, query, &mut params)?);

        let mut sql = format!(
            "SELECT {} FROM {} WHERE {}",
            select_list(schema)?,
            quote_ident(&schema.collection)?,
            clauses.join(" AND ")
        );
        if !query.orders.is_empty() {
            let orders = query
                .orders
                .iter()
                .map(|o| Ok(format!("{} {}", column(schema, &o.field)?, o.direction.as_sql())))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        let conn = self.conn.lock();
        query_records(&conn, schema, &sql, params)
    }

    async fn missing_keys(
        &self,
        schema: &RecordSchema,
        query: &RecordQuery,
    ) -> Result<Vec<PrimaryKey>> {
        if query.keys.is_empty() {
            return Ok(Vec::new());
        }
        let key_col = quote_ident(&schema.key_name)?;

        let mut params = vec![keys_json(&query.keys)?];
        let mut clauses = vec![format!("{} IN (SELECT k FROM raw)", key_col)];
        clauses.extend(filter_clauses(schema, query, &mut params)?);

        // Left anti-join of the raw key list against the rows that satisfy the
        // query; raw keys with no partner are the ones to discard.
        let sql = format!(
            "WITH raw(k, pos) AS (SELECT value, key FROM json_each(?)) \
             SELECT raw.k FROM raw \
             LEFT JOIN (SELECT {key} AS sub_key FROM {table} WHERE {filter}) AS sub \
             ON sub.sub_key = raw.k \
             WHERE sub.sub_key IS NULL \
             ORDER BY raw.pos",
            key = key_col,
            table = quote_ident(&schema.collection)?,
            filter = clauses.join(" AND "),
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut missing = Vec::new();
        while let Some(row) = rows.next()? {
            missing.push(read_key(schema, row.get::<_, SqlValue>(0)?)?);
        }
        Ok(missing)
    }

    async fn count(&self, schema: &RecordSchema, mode: SoftDeleteMode) -> Result<u64> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&schema.collection)?);
        if let Some(clause) = soft_delete_clause(schema, mode) {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }
        let count: i64 = self.conn.lock().query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    async fn scan(
        &self,
        schema: &RecordSchema,
        mode: SoftDeleteMode,
        after: Option<&PrimaryKey>,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let key_col = quote_ident(&schema.key_name)?;
        let mut params = Vec::new();
        let mut clauses: Vec<String> = soft_delete_clause(schema, mode).into_iter().collect();
        if let Some(after) = after {
            clauses.push(format!("{} > ?", key_col));
            params.push(key_param(after));
        }
        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        params.push(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} ASC LIMIT ?",
            select_list(schema)?,
            quote_ident(&schema.collection)?,
            filter,
            key_col
        );
        let conn = self.conn.lock();
        query_records(&conn, schema, &sql, params)
    }
}
