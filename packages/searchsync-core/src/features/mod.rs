//! Feature slices, leaf to root: index → sync → reconcile → pagination → mapping → engine

pub mod engine;
pub mod index;
pub mod mapping;
pub mod pagination;
pub mod reconcile;
pub mod sync;
