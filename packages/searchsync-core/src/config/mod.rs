//! Search configuration
//!
//! One validated `SearchConfig` value is handed to the engine at construction.
//! Nothing reads configuration from the environment afterwards.

pub mod error;
pub mod search_config;

pub use error::{ConfigError, ConfigResult};
pub use search_config::{PageOverflow, SearchConfig};
