//! Cache configuration and per-read options.

use std::time::Duration;

use cadence_core::{CadenceResult, ConfigError};
use serde::{Deserialize, Serialize};

/// Configuration for a [`RequestCache`](crate::RequestCache) instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of live entries. Inserting past this evicts the
    /// least-recently-set entry.
    pub max_size: usize,
    /// TTL applied when a read does not specify one.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            default_ttl: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of live entries.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the TTL applied when a read does not specify one.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CadenceResult<()> {
        if self.max_size == 0 {
            return Err(ConfigError::invalid_value(
                "max_size",
                self.max_size,
                "must hold at least one entry",
            )
            .into());
        }
        Ok(())
    }
}

/// Per-read options for [`RequestCache::get`](crate::RequestCache::get).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetOptions {
    /// TTL for the entry written by this read; falls back to
    /// [`CacheConfig::default_ttl`].
    pub ttl: Option<Duration>,
    /// Serve an expired value immediately and refresh it in the background.
    pub stale_while_revalidate: bool,
    /// Bypass a live entry and fetch anew.
    pub force_refresh: bool,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }

    pub fn with_force_refresh(mut self, enabled: bool) -> Self {
        self.force_refresh = enabled;
        self
    }
}
