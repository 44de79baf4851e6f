//! Query filters
//!
//! Named `(query, record_type) -> query` rewrites applied in registration order
//! before the query reaches the index.

use std::sync::Arc;

use crate::errors::{Result, SearchError};

pub type QueryFilter = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

#[derive(Clone, Default)]
pub struct QueryFilters {
    filters: Vec<(String, QueryFilter)>,
}

impl QueryFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `InvalidFilter` on an empty or already registered name
    pub fn register(&mut self, name: impl Into<String>, filter: QueryFilter) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SearchError::InvalidFilter(
                "filter name must not be empty".to_string(),
            ));
        }
        if self.filters.iter().any(|(existing, _)| *existing == name) {
            return Err(SearchError::InvalidFilter(format!(
                "filter '{}' is already registered",
                name
            )));
        }
        self.filters.push((name, filter));
        Ok(())
    }

    pub fn apply(&self, query: &str, record_type: &str) -> String {
        self.filters
            .iter()
            .fold(query.to_string(), |query, (_, filter)| filter(&query, record_type))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl std::fmt::Debug for QueryFilters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
