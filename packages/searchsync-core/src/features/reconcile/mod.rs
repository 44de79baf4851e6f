//! Read path: index hits → ids that are still valid under the caller's constraints

pub mod constraints;
pub mod reconciler;

pub use constraints::apply_constraints;
pub use reconciler::{Reconciler, Reconciliation};
