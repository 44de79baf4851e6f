//! Engine facade: write path, read path, maintenance

pub mod events;
pub mod filters;
pub mod maintenance;
pub mod request;
pub mod search_engine;

pub use events::{SearchListener, SearchPerformed};
pub use filters::{QueryFilter, QueryFilters};
pub use maintenance::{ImportReport, IndexStatus};
pub use request::{SearchCallback, SearchRequest};
pub use search_engine::{SearchEngine, SearchEngineBuilder, SearchPage};
