//! Record Store domain models
//!
//! - `PrimaryKey`: stable scalar key (integer or text)
//! - `Value`: scalar field value (null, bool, int, float, text)
//! - `Record`: one row of a collection
//! - `RecordSchema`: capability declaration of a record type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, StorageError};

/// Column holding the soft-delete marker for types that declare the capability.
pub const DELETED_AT_COLUMN: &str = "deleted_at";

/// Named field values of a record
pub type Fields = BTreeMap<String, Value>;

// ═══════════════════════════════════════════════════════════════════════════
// Keys & Values
// ═══════════════════════════════════════════════════════════════════════════

/// Primary key of a record.
///
/// Serialized untagged, so `PrimaryKey::Int(5)` is `5` and `PrimaryKey::Text("a")` is `"a"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Int(i64),
    Text(String),
}

impl PrimaryKey {
    pub fn key_type(&self) -> KeyType {
        match self {
            PrimaryKey::Int(_) => KeyType::Integer,
            PrimaryKey::Text(_) => KeyType::Text,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            PrimaryKey::Int(i) => Value::Int(*i),
            PrimaryKey::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKey::Int(i) => write!(f, "{}", i),
            PrimaryKey::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for PrimaryKey {
    fn from(value: i64) -> Self {
        PrimaryKey::Int(value)
    }
}

impl From<i32> for PrimaryKey {
    fn from(value: i32) -> Self {
        PrimaryKey::Int(value.into())
    }
}

impl From<&str> for PrimaryKey {
    fn from(value: &str) -> Self {
        PrimaryKey::Text(value.to_string())
    }
}

impl From<String> for PrimaryKey {
    fn from(value: String) -> Self {
        PrimaryKey::Text(value)
    }
}

/// Declared type of a collection's primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    Integer,
    Text,
}

/// Scalar field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text fed to the full-text index; `None` for null.
    pub fn to_index_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
        }
    }

    /// Value comparison with SQL semantics: anything compared to null is unknown.
    ///
    /// Booleans compare as integers, integers and floats compare numerically,
    /// text only compares with text.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => match (self, other) {
                (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
                _ => None,
            },
        }
    }

    /// Total order used for sorting, matching SQLite: null < numbers < text.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) | Value::Int(_) | Value::Float(_) => 1,
                Value::Text(_) => 2,
            }
        }
        rank(self)
            .cmp(&rank(other))
            .then_with(|| self.compare(other).unwrap_or(Ordering::Equal))
    }

    /// Value as a store reads it back. Booleans persist as 0/1 integers.
    pub fn into_stored(self) -> Value {
        match self {
            Value::Bool(b) => Value::Int(i64::from(b)),
            other => other,
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Record
// ═══════════════════════════════════════════════════════════════════════════

/// One row of a collection.
///
/// `key` is `None` until the record has been persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub key: Option<PrimaryKey>,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Create an unsaved record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record with a known key
    pub fn with_key(key: impl Into<PrimaryKey>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    /// Set a field (builder style)
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Value of `column` as the store sees it: the key column, the soft-delete
    /// marker (milliseconds since epoch) or a plain field.
    pub fn column_value(&self, schema: &RecordSchema, column: &str) -> Option<Value> {
        if column == schema.key_name {
            return self.key.as_ref().map(PrimaryKey::to_value);
        }
        if schema.soft_deletes && column == DELETED_AT_COLUMN {
            return Some(
                self.deleted_at
                    .map(|at| Value::Int(at.timestamp_millis()))
                    .unwrap_or(Value::Null),
            );
        }
        self.fields.get(column).cloned()
    }

    /// Searchable projection of this record.
    ///
    /// Columns the record does not carry are left out, so a record with no
    /// searchable content yields an empty map.
    pub fn searchable_projection(&self, schema: &RecordSchema) -> Fields {
        schema
            .searchable_columns()
            .iter()
            .filter_map(|column| {
                self.column_value(schema, column)
                    .map(|value| (column.clone(), value))
            })
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Schema
// ═══════════════════════════════════════════════════════════════════════════

/// Capability declaration of a record type.
///
/// # Examples
///
/// ```rust
/// use searchsync_storage::domain::RecordSchema;
///
/// let schema = RecordSchema::new("Article", "articles")
///     .columns(["title", "body", "author_id"])
///     .searchable(["title", "body"])
///     .with_soft_deletes();
///
/// assert_eq!(schema.searchable_as(), "articles");
/// assert!(schema.has_column("deleted_at"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Record type identifier (reported in search events and filters)
    pub record_type: String,
    /// Collection (table) name
    pub collection: String,
    /// Primary key column
    pub key_name: String,
    pub key_type: KeyType,
    /// Data columns, key excluded
    pub columns: Vec<String>,
    /// Columns projected into the index; empty means every data column
    #[serde(default)]
    pub searchable: Vec<String>,
    /// Index base name override
    #[serde(default)]
    pub searchable_as: Option<String>,
    /// Whether the type carries a soft-delete marker
    #[serde(default)]
    pub soft_deletes: bool,
}

impl RecordSchema {
    pub fn new(record_type: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            collection: collection.into(),
            key_name: "id".to_string(),
            key_type: KeyType::Integer,
            columns: Vec::new(),
            searchable: Vec::new(),
            searchable_as: None,
            soft_deletes: false,
        }
    }

    pub fn with_key(mut self, name: impl Into<String>, key_type: KeyType) -> Self {
        self.key_name = name.into();
        self.key_type = key_type;
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn searchable<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn index_as(mut self, name: impl Into<String>) -> Self {
        self.searchable_as = Some(name.into());
        self
    }

    pub fn with_soft_deletes(mut self) -> Self {
        self.soft_deletes = true;
        self
    }

    /// Base name of this type's index
    pub fn searchable_as(&self) -> &str {
        self.searchable_as.as_deref().unwrap_or(&self.collection)
    }

    pub fn searchable_columns(&self) -> &[String] {
        if self.searchable.is_empty() {
            &self.columns
        } else {
            &self.searchable
        }
    }

    /// True for the key, every data column and the soft-delete marker when declared.
    pub fn has_column(&self, name: &str) -> bool {
        name == self.key_name
            || self.columns.iter().any(|c| c == name)
            || (self.soft_deletes && name == DELETED_AT_COLUMN)
    }

    /// Reject keys whose type differs from the declared key type
    pub fn check_key(&self, key: &PrimaryKey) -> Result<()> {
        if key.key_type() != self.key_type {
            return Err(StorageError::configuration(format!(
                "Key {} of {} is {:?}, expected {:?}",
                key,
                self.record_type,
                key.key_type(),
                self.key_type
            )));
        }
        Ok(())
    }

    /// Reject records carrying a mistyped key or fields the schema does not declare
    pub fn check_record(&self, record: &Record) -> Result<()> {
        if let Some(key) = &record.key {
            self.check_key(key)?;
        }
        if let Some(unknown) = record.fields.keys().find(|f| !self.columns.contains(f)) {
            return Err(StorageError::configuration(format!(
                "Unknown column '{}' for {}",
                unknown, self.record_type
            )));
        }
        Ok(())
    }

    /// Check identifiers and column declarations
    pub fn validate(&self) -> Result<()> {
        let identifiers = std::iter::once(&self.collection)
            .chain(std::iter::once(&self.key_name))
            .chain(self.columns.iter());
        for ident in identifiers {
            if !is_valid_identifier(ident) {
                return Err(StorageError::configuration(format!(
                    "Invalid identifier '{}' in schema for {}",
                    ident, self.record_type
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for column in &self.columns {
            if column == &self.key_name || (self.soft_deletes && column == DELETED_AT_COLUMN) {
                return Err(StorageError::configuration(format!(
                    "Column '{}' of {} is reserved",
                    column, self.record_type
                )));
            }
            if !seen.insert(column.as_str()) {
                return Err(StorageError::configuration(format!(
                    "Column '{}' declared twice for {}",
                    column, self.record_type
                )));
            }
        }

        if let Some(unknown) = self.searchable.iter().find(|c| !self.has_column(c)) {
            return Err(StorageError::configuration(format!(
                "Searchable column '{}' is not a column of {}",
                unknown, self.record_type
            )));
        }

        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article_schema() -> RecordSchema {
        RecordSchema::new("Article", "articles")
            .columns(["title", "body", "author_id"])
            .searchable(["title", "body"])
            .with_soft_deletes()
    }

    #[test]
    fn test_primary_key_serializes_untagged() {
        assert_eq!(serde_json::to_string(&PrimaryKey::Int(5)).unwrap(), "5");
        assert_eq!(
            serde_json::to_string(&PrimaryKey::from("abc")).unwrap(),
            "\"abc\""
        );
        let back: PrimaryKey = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back, PrimaryKey::Text("abc".to_string()));
    }

    #[test]
    fn test_value_compare_null_is_unknown() {
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
        assert_eq!(Value::Int(1).compare(&Value::Float(1.0)), Some(Ordering::Equal));
        assert_eq!(Value::Text("a".into()).compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_value_sort_order_matches_sqlite() {
        let mut values = vec![
            Value::Text("b".into()),
            Value::Int(3),
            Value::Null,
            Value::Float(1.5),
        ];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Float(1.5),
                Value::Int(3),
                Value::Text("b".into())
            ]
        );
    }

    #[test]
    fn test_searchable_projection_uses_declared_columns() {
        let schema = article_schema();
        let record = Record::with_key(1)
            .set("title", "Rust")
            .set("author_id", 7);

        let projection = record.searchable_projection(&schema);
        assert_eq!(projection.len(), 1);
        assert_eq!(projection.get("title"), Some(&Value::from("Rust")));
    }

    #[test]
    fn test_searchable_projection_empty_without_content() {
        let schema = article_schema();
        let record = Record::with_key(1).set("author_id", 7);
        assert!(record.searchable_projection(&schema).is_empty());
    }

    #[test]
    fn test_column_value_for_key_and_marker() {
        let schema = article_schema();
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut record = Record::with_key(3);
        record.deleted_at = Some(at);

        assert_eq!(record.column_value(&schema, "id"), Some(Value::Int(3)));
        assert_eq!(
            record.column_value(&schema, DELETED_AT_COLUMN),
            Some(Value::Int(1_700_000_000_000))
        );
        assert_eq!(record.column_value(&schema, "title"), None);
    }

    #[test]
    fn test_schema_validation() {
        assert!(article_schema().validate().is_ok());

        let bad_ident = RecordSchema::new("X", "x; DROP TABLE x").columns(["a"]);
        assert!(bad_ident.validate().unwrap_err().is_configuration());

        let dup = RecordSchema::new("X", "x").columns(["a", "a"]);
        assert!(dup.validate().is_err());

        let reserved = RecordSchema::new("X", "x").columns(["id"]);
        assert!(reserved.validate().is_err());

        let unknown_searchable = RecordSchema::new("X", "x").columns(["a"]).searchable(["b"]);
        assert!(unknown_searchable.validate().is_err());
    }

    #[test]
    fn test_searchable_as_override() {
        let schema = RecordSchema::new("Post", "posts").index_as("blog_posts");
        assert_eq!(schema.searchable_as(), "blog_posts");
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_valid_identifier("author_id"));
        assert!(is_valid_identifier("_x1"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier(""));
    }
}
