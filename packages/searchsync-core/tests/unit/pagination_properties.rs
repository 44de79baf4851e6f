//! Property-based tests for the pager
//!
//! - Completeness: the pages of a list, concatenated, are the list
//! - Bound: no page is longer than the page size
//! - Overflow: `Empty` yields nothing past the end, `LastPage` clamps

use proptest::prelude::*;
use searchsync_core::{paginate, PageOverflow};

proptest! {
    #[test]
    fn prop_pages_concatenate_to_input(
        items in prop::collection::vec(any::<u32>(), 0..200),
        size in 1usize..25,
    ) {
        let first = paginate(&items, size, 1, PageOverflow::Empty).unwrap();
        let mut joined = first.items.clone();
        for number in 2..=first.page_count() {
            let page = paginate(&items, size, number, PageOverflow::Empty).unwrap();
            prop_assert!(page.items.len() <= size);
            prop_assert_eq!(page.total, items.len());
            joined.extend(page.items);
        }
        prop_assert!(first.items.len() <= size);
        prop_assert_eq!(joined, items);
    }

    #[test]
    fn prop_overflow_policy(
        items in prop::collection::vec(any::<u32>(), 1..100),
        size in 1usize..10,
        past in 1usize..5,
    ) {
        let last_number = items.len().div_ceil(size);
        let last = paginate(&items, size, last_number, PageOverflow::Empty).unwrap();

        let empty = paginate(&items, size, last_number + past, PageOverflow::Empty).unwrap();
        prop_assert!(empty.items.is_empty());

        let clamped = paginate(&items, size, last_number + past, PageOverflow::LastPage).unwrap();
        prop_assert_eq!(clamped.items, last.items);
    }
}

#[test]
fn test_zero_arguments_rejected() {
    let items = vec![1, 2, 3];
    assert!(paginate(&items, 0, 1, PageOverflow::Empty).is_err());
    assert!(paginate(&items, 1, 0, PageOverflow::Empty).is_err());
}
