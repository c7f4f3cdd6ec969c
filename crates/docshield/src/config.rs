//! Node configuration.

use docshield_core::query::cache::DEFAULT_MAX_ENTRIES;

/// Default number of cached search responses.
pub const DEFAULT_RESULT_CACHE_ENTRIES: usize = DEFAULT_MAX_ENTRIES;

/// Node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Maximum number of cached search responses. Zero disables caching.
    pub result_cache_entries: usize,
}

impl NodeConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            result_cache_entries: DEFAULT_RESULT_CACHE_ENTRIES,
        }
    }

    /// Set the result cache size.
    pub fn with_result_cache_entries(mut self, entries: usize) -> Self {
        self.result_cache_entries = entries;
        self
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::new()
    }
}
