//! Record Store Domain Layer
//!
//! Port/Adapter pattern for the system of record

pub mod models;
pub mod ports;
pub mod query;

pub use models::{
    is_valid_identifier, Fields, KeyType, PrimaryKey, Record, RecordSchema, Value,
    DELETED_AT_COLUMN,
};
pub use ports::RecordStore;
pub use query::{
    Comparison, Constraint, Direction, OrderBy, Predicate, RecordQuery, SoftDeleteMode,
};
