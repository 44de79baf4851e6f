/*
 * searchsync-core - Full-text index synchronization and result reconciliation
 *
 * Feature-First Architecture:
 * - config/    : SearchConfig (YAML loadable, validated once)
 * - features/  : Vertical slices (index → sync → reconcile → pagination → mapping → engine)
 * - errors     : SearchError taxonomy
 *
 * Consistency model:
 * - The record store is authoritative, the index is approximate and lags
 * - Every hit is re-checked against the store before it is returned
 */

#![allow(clippy::type_complexity)] // Callback and filter signatures
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Engine configuration
pub mod config;

pub mod errors;

/// Feature modules (vertical slices)
pub mod features;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{ConfigError, PageOverflow, SearchConfig};
pub use errors::{Result, SearchError};

pub use features::engine::{
    ImportReport, IndexStatus, QueryFilters, SearchCallback, SearchEngine, SearchEngineBuilder,
    SearchListener, SearchPage, SearchPerformed, SearchRequest,
};
pub use features::index::{
    index_name, InMemoryIndexClient, IndexClient, IndexError, IndexHandle, SearchResult,
    TantivyIndexClient,
};
pub use features::mapping::ResultMapper;
pub use features::pagination::{paginate, Page};
pub use features::reconcile::{apply_constraints, Reconciler, Reconciliation};
pub use features::sync::{SyncReport, Synchronizer};
