//! Pager: fixed-size, 1-indexed pages over a reconciled id sequence

use serde::Serialize;

use crate::config::PageOverflow;
use crate::errors::{Result, SearchError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// 1-indexed page actually returned
    pub number: usize,
    pub size: usize,
    pub items: Vec<T>,
    /// Length of the whole sequence
    pub total: usize,
}

impl<T> Page<T> {
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Slice page `page_number` of size `page_size` out of `items`.
///
/// A page past the end is empty, or the last page under
/// `PageOverflow::LastPage`.
pub fn paginate<T: Clone>(
    items: &[T],
    page_size: usize,
    page_number: usize,
    overflow: PageOverflow,
) -> Result<Page<T>> {
    if page_size == 0 {
        return Err(SearchError::invalid_input("page size must be at least 1"));
    }
    if page_number == 0 {
        return Err(SearchError::invalid_input("page numbers start at 1"));
    }

    let total = items.len();
    let page_count = total.div_ceil(page_size);
    let number = match overflow {
        PageOverflow::LastPage if page_number > page_count && page_count > 0 => page_count,
        _ => page_number,
    };

    let items = items
        .chunks(page_size)
        .nth(number - 1)
        .map(<[T]>::to_vec)
        .unwrap_or_default();

    Ok(Page {
        number,
        size: page_size,
        items,
        total,
    })
}
