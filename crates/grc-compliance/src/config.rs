//! Engine Configuration

use grc_common::{GrcError, GrcResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Optional catalog feed; the built-in catalog is used when unset
    pub catalog_path: Option<String>,
    /// Upper bound for one store round-trip
    pub store_timeout_ms: u64,
    /// Critical gaps returned by score reads and reports
    pub critical_gap_limit: usize,
    /// Critical gaps listed in an assessment summary
    pub summary_gap_cap: usize,
    /// Score cache settings
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            store_timeout_ms: 5_000,
            critical_gap_limit: 10,
            summary_gap_cap: 25,
            cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from file
    pub fn load(path: impl AsRef<Path>) -> GrcResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| GrcError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to file
    pub fn save(&self, path: impl AsRef<Path>) -> GrcResult<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| GrcError::ConfigError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> GrcResult<()> {
        if self.store_timeout_ms == 0 {
            return Err(GrcError::ConfigError("store_timeout_ms must be positive".into()));
        }
        if self.cache.capacity == 0 {
            return Err(GrcError::ConfigError("cache.capacity must be positive".into()));
        }
        if self.cache.ttl_secs == 0 {
            return Err(GrcError::ConfigError("cache.ttl_secs must be positive".into()));
        }
        Ok(())
    }

    /// Store timeout as a duration
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Score cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Max tenants with cached scores
    pub capacity: u64,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl_secs: 300,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
