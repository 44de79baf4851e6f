//! Record Store Infrastructure Layer
//!
//! Storage backends for the `RecordStore` trait

pub mod memory_store;
pub use memory_store::InMemoryRecordStore;

#[cfg(feature = "sqlite")]
pub mod sqlite_store;
#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteRecordStore;
