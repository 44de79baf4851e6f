//! `SearchRequest`: one query against one record type

use std::fmt;
use std::sync::Arc;

use searchsync_storage::{Comparison, Constraint, Direction, Value};

use crate::features::index::{IndexError, IndexHandle, SearchResult};

/// Replaces the index query of a request.
///
/// Receives the selected index, the filtered query text and the hit limit.
pub type SearchCallback =
    Arc<dyn Fn(&dyn IndexHandle, &str, usize) -> Result<SearchResult, IndexError> + Send + Sync>;

/// Query text plus the constraints its hits are reconciled against.
///
/// ```rust
/// use searchsync_core::SearchRequest;
///
/// let request = SearchRequest::new("rust ownership")
///     .where_eq("author_id", 7)
///     .take(100);
/// assert_eq!(request.constraint.predicates.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    /// Index name overriding `{searchable_as}.index`
    pub index: Option<String>,
    /// Hit cap below `max_docs_per_query`
    pub limit: Option<usize>,
    pub constraint: Constraint,
    pub callback: Option<SearchCallback>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn within(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn take(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraint = self.constraint.where_eq(field, value);
        self
    }

    pub fn where_cmp(
        mut self,
        field: impl Into<String>,
        op: Comparison,
        value: impl Into<Value>,
    ) -> Self {
        self.constraint = self.constraint.where_cmp(field, op, value);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.constraint = self.constraint.order_by(field, direction);
        self
    }

    pub fn soft_deleted(mut self, only_trashed: bool) -> Self {
        self.constraint = self.constraint.soft_deleted(only_trashed);
        self
    }

    pub fn using<F>(mut self, callback: F) -> Self
    where
        F: Fn(&dyn IndexHandle, &str, usize) -> Result<SearchResult, IndexError>
            + Send
            + Sync
            + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Effective hit cap
    pub(crate) fn limit_within(&self, max_docs: usize) -> usize {
        self.limit.map_or(max_docs, |limit| limit.min(max_docs))
    }
}

impl fmt::Debug for SearchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchRequest")
            .field("query", &self.query)
            .field("index", &self.index)
            .field("limit", &self.limit)
            .field("constraint", &self.constraint)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
