//! Write path: record changes → index

pub mod synchronizer;

pub use synchronizer::{SyncReport, Synchronizer};
