use std::time::Duration;

use thiserror::Error;

use crate::breaker::BreakerSettings;

/// Errors raised when a cache configuration is unusable.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Null cache prefix must not be empty")]
    EmptyNullPrefix,
    #[error("Null cache prefix {0:?} could be mistaken for a JSON value")]
    AmbiguousNullPrefix(String),
    #[error("Breaker failure ratio must be in (0, 1], got {0}")]
    InvalidFailureRatio(f64),
    #[error("Breaker must allow at least one half-open request")]
    ZeroHalfOpenRequests,
}

/// Cache-aside settings, fixed at wiring time.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false the cached repository is a plain pass-through.
    pub enabled: bool,
    /// TTL for cached entities.
    pub ttl: Duration,
    /// Wait before the second invalidation delete after a write.
    pub double_delete_delay: Duration,
    /// TTL for the "confirmed absent" marker.
    pub null_cache_ttl: Duration,
    /// Marker stored for keys the backing store does not have.
    pub null_cache_prefix: String,
    pub breaker: BreakerSettings,
}

impl CacheConfig {
    /// Checks the invariants the cached repository relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = self.null_cache_prefix.as_str();
        if prefix.is_empty() {
            return Err(ConfigError::EmptyNullPrefix);
        }
        if prefix.starts_with(can_start_json) {
            return Err(ConfigError::AmbiguousNullPrefix(prefix.to_string()));
        }

        let ratio = self.breaker.failure_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::InvalidFailureRatio(ratio));
        }
        if self.breaker.max_half_open_requests == 0 {
            return Err(ConfigError::ZeroHalfOpenRequests);
        }

        Ok(())
    }

    /// Returns a copy with caching turned off.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// True for any character a serialized JSON value may begin with.
fn can_start_json(c: char) -> bool {
    matches!(c, '{' | '[' | '"' | '-' | 't' | 'f' | 'n' | ' ' | '\t' | '\n' | '\r')
        || c.is_ascii_digit()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(300),
            double_delete_delay: Duration::from_millis(500),
            null_cache_ttl: Duration::from_secs(60),
            null_cache_prefix: "__null__".to_string(),
            breaker: BreakerSettings::default(),
        }
    }
}
