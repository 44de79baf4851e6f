pub mod pager;

pub use pager::{paginate, Page};
