//! `SearchConfig`: fuzziness, search mode, soft-delete switch, storage and paging

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{ConfigError, ConfigResult};

/// What a page request past the last page returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOverflow {
    /// No ids
    #[default]
    Empty,
    /// Clamp to the last page
    LastPage,
}

/// Engine configuration.
///
/// # Example
///
/// ```rust
/// use searchsync_core::config::SearchConfig;
///
/// let config = SearchConfig::from_yaml_str("fuzziness: true\nfuzzy_distance: 1\n").unwrap();
/// assert!(config.fuzziness);
/// assert_eq!(config.fuzzy_prefix_length, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Match query tokens approximately
    pub fuzziness: bool,
    /// Leading characters that must match exactly in fuzzy mode
    pub fuzzy_prefix_length: usize,
    /// Vocabulary terms a fuzzy token may expand to
    pub fuzzy_max_expansions: usize,
    /// Maximum edit distance of a fuzzy match
    pub fuzzy_distance: u8,
    /// Ignore `fuzzy_max_expansions`
    pub fuzzy_no_limit: bool,
    /// Treat the last token as a prefix
    pub as_you_type: bool,
    /// Interpret queries with boolean operators
    pub boolean_search: bool,
    /// Honor soft-delete markers for types that declare them
    pub soft_delete_enabled: bool,
    /// Directory holding one `{name}.index` directory per collection
    pub storage_path: PathBuf,
    /// Hit cap of a single index query
    pub max_docs_per_query: usize,
    pub default_page_size: usize,
    pub page_overflow: PageOverflow,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fuzziness: false,
            fuzzy_prefix_length: 2,
            fuzzy_max_expansions: 50,
            fuzzy_distance: 2,
            fuzzy_no_limit: false,
            as_you_type: false,
            boolean_search: false,
            soft_delete_enabled: true,
            storage_path: PathBuf::from("storage/search"),
            max_docs_per_query: 10_000,
            default_page_size: 15,
            page_overflow: PageOverflow::Empty,
        }
    }
}

impl SearchConfig {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            ..Self::default()
        }
    }

    // Builder methods

    pub fn fuzziness(mut self, enabled: bool) -> Self {
        self.fuzziness = enabled;
        self
    }

    pub fn fuzzy_prefix_length(mut self, length: usize) -> Self {
        self.fuzzy_prefix_length = length;
        self
    }

    pub fn fuzzy_max_expansions(mut self, expansions: usize) -> Self {
        self.fuzzy_max_expansions = expansions;
        self
    }

    pub fn fuzzy_distance(mut self, distance: u8) -> Self {
        self.fuzzy_distance = distance;
        self
    }

    pub fn fuzzy_no_limit(mut self, no_limit: bool) -> Self {
        self.fuzzy_no_limit = no_limit;
        self
    }

    pub fn as_you_type(mut self, enabled: bool) -> Self {
        self.as_you_type = enabled;
        self
    }

    pub fn boolean_search(mut self, enabled: bool) -> Self {
        self.boolean_search = enabled;
        self
    }

    pub fn soft_delete_enabled(mut self, enabled: bool) -> Self {
        self.soft_delete_enabled = enabled;
        self
    }

    pub fn max_docs_per_query(mut self, max_docs: usize) -> Self {
        self.max_docs_per_query = max_docs;
        self
    }

    pub fn default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn page_overflow(mut self, overflow: PageOverflow) -> Self {
        self.page_overflow = overflow;
        self
    }

    /// Path of an index directory: `{storage_path}/{index_name}`
    pub fn index_path(&self, index_name: &str) -> PathBuf {
        self.storage_path.join(index_name)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.fuzzy_distance == 0 || self.fuzzy_distance > 5 {
            return Err(ConfigError::range_with_hint(
                "fuzzy_distance",
                self.fuzzy_distance,
                1,
                5,
                "Edit distance above 5 matches nearly every term",
            ));
        }

        if self.fuzzy_prefix_length > 16 {
            return Err(ConfigError::range_with_hint(
                "fuzzy_prefix_length",
                self.fuzzy_prefix_length,
                0,
                16,
                "Use 0 to disable the exact prefix",
            ));
        }

        if self.fuzzy_max_expansions == 0 || self.fuzzy_max_expansions > 10_000 {
            return Err(ConfigError::range_with_hint(
                "fuzzy_max_expansions",
                self.fuzzy_max_expansions,
                1,
                10_000,
                "Set fuzzy_no_limit instead of a huge expansion cap",
            ));
        }

        if self.max_docs_per_query == 0 || self.max_docs_per_query > 1_000_000 {
            return Err(ConfigError::range_with_hint(
                "max_docs_per_query",
                self.max_docs_per_query,
                1,
                1_000_000,
                "Hit cap must be reasonable",
            ));
        }

        if self.default_page_size == 0 || self.default_page_size > 10_000 {
            return Err(ConfigError::range_with_hint(
                "default_page_size",
                self.default_page_size,
                1,
                10_000,
                "Page size must be at least 1",
            ));
        }

        if self.storage_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and validate YAML
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: SearchConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
