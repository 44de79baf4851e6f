//! Tantivy Schema Definition
//!
//! 1. `_key` - JSON-encoded primary key (STORED, raw keyword for delete/update)
//! 2. `content` - Concatenated searchable projection (indexed, positions)

use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};
use tantivy::Term;

use searchsync_storage::PrimaryKey;

use super::ports::IndexError;

pub const FIELD_KEY: &str = "_key";
pub const FIELD_CONTENT: &str = "content";

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field(FIELD_KEY, STRING | STORED);
    schema_builder.add_text_field(FIELD_CONTENT, TEXT);
    schema_builder.build()
}

/// Field handles (cached)
#[derive(Debug, Clone)]
pub struct SchemaFields {
    pub schema: Schema,
    pub key: Field,
    pub content: Field,
}

impl SchemaFields {
    pub fn new() -> Self {
        let schema = build_schema();
        Self {
            key: schema.get_field(FIELD_KEY).expect("_key field"),
            content: schema.get_field(FIELD_CONTENT).expect("content field"),
            schema,
        }
    }

    /// Resolve handles against the schema of an index opened from disk
    pub fn from_schema(schema: Schema) -> Result<Self, IndexError> {
        let field = |name: &str| {
            schema.get_field(name).map_err(|_| {
                IndexError::Internal(format!("Index schema lacks the '{}' field", name))
            })
        };
        Ok(Self {
            key: field(FIELD_KEY)?,
            content: field(FIELD_CONTENT)?,
            schema,
        })
    }

    pub fn key_term(&self, key: &PrimaryKey) -> Result<Term, IndexError> {
        Ok(Term::from_field_text(self.key, &encode_key(key)?))
    }
}

impl Default for SchemaFields {
    fn default() -> Self {
        Self::new()
    }
}

/// `5` and `"5"` must not collide, so keys are stored JSON-encoded
pub fn encode_key(key: &PrimaryKey) -> Result<String, IndexError> {
    serde_json::to_string(key).map_err(|e| IndexError::Internal(format!("Key encoding: {}", e)))
}

pub fn decode_key(raw: &str) -> Result<PrimaryKey, IndexError> {
    serde_json::from_str(raw)
        .map_err(|e| IndexError::Internal(format!("Corrupt key '{}' in index: {}", raw, e)))
}
