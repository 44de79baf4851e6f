//! Full-text index boundary
//!
//! ```text
//! SearchEngine ──▶ IndexClient ──select_index──▶ IndexHandle
//!                     │                            ├─ search / search_boolean
//!                     ├─ TantivyIndexClient        ├─ insert / update / delete
//!                     └─ InMemoryIndexClient       └─ begin / commit / rollback
//! ```

pub mod memory_client;
pub mod ports;
pub mod query_builder;
pub mod schema;
pub mod tantivy_client;
mod transaction;

pub use memory_client::InMemoryIndexClient;
pub use ports::{index_name, IndexClient, IndexError, IndexHandle, SearchResult};
pub use tantivy_client::TantivyIndexClient;
