//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_INDEX_TTL_SECONDS: u64 = 20;
const DEFAULT_MAX_ENTRIES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Serve and store cached pages at all.
    pub enabled: bool,
    /// Lifetime of a stored page.
    pub ttl: Duration,
    /// Maximum number of stored pages before LRU eviction.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(DEFAULT_INDEX_TTL_SECONDS),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl: Duration::from_secs(u64::from(settings.index_ttl_seconds.get())),
            max_entries: settings.max_entries.get() as usize,
        }
    }
}

impl CacheConfig {
    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}
