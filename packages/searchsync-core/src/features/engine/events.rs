//! Search events

use serde::Serialize;
use std::time::Duration;

use searchsync_storage::PrimaryKey;

/// Emitted once per index query issued by the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPerformed {
    pub query: String,
    pub boolean: bool,
    pub index_name: String,
    pub record_type: String,
    pub ids: Vec<PrimaryKey>,
    pub hits: usize,
    pub execution_time: Duration,
    pub driver: String,
}

pub trait SearchListener: Send + Sync {
    fn search_performed(&self, event: &SearchPerformed);
}
