use std::{env, num::NonZeroUsize, str::FromStr, time::Duration};

use readthrough_core::breaker::BreakerSettings;
use readthrough_core::cache::{CacheConfig, ConfigError};
use readthrough_core::cursor::CursorManager;

const DEFAULT_MAX_ENTRIES: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Whether reads go through the cache at all (default: true)
    pub cache_enabled: bool,
    /// Cache TTL in seconds (default: 300)
    pub cache_ttl_seconds: u64,
    /// Delay before the second invalidation delete in milliseconds (default: 500)
    pub cache_double_delete_delay_ms: u64,
    /// TTL of the "not found" marker in seconds (default: 60)
    pub cache_null_ttl_seconds: u64,
    /// Bytes stored for ids the backing store does not have (default: "__null__")
    pub cache_null_prefix: String,
    /// Maximum number of in-memory cache entries (default: 10,000)
    pub cache_max_entries: NonZeroUsize,
    /// Breaker name used in logs and errors (default: "cache")
    pub breaker_name: String,
    /// Probes allowed while half-open (default: 3)
    pub breaker_max_requests: u32,
    /// Rolling window for failure counts in seconds, 0 never resets (default: 60)
    pub breaker_interval_seconds: u64,
    /// Time spent open before probing in seconds (default: 30)
    pub breaker_timeout_seconds: u64,
    /// Requests in the window before the breaker may trip (default: 10)
    pub breaker_min_requests: u32,
    /// Failure ratio that trips the breaker (default: 0.6)
    pub breaker_failure_ratio: f64,
    /// Validity of minted pagination cursors in seconds (default: 3600)
    pub cursor_ttl_seconds: u64,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    pub redis_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults. Environment
    /// variables:
    /// - `CACHE_ENABLED`, `CACHE_TTL_SECONDS`, `CACHE_DOUBLE_DELETE_DELAY_MS`,
    ///   `CACHE_NULL_TTL_SECONDS`, `CACHE_NULL_PREFIX`, `CACHE_MAX_ENTRIES`
    /// - `BREAKER_NAME`, `BREAKER_MAX_REQUESTS`, `BREAKER_INTERVAL_SECONDS`,
    ///   `BREAKER_TIMEOUT_SECONDS`, `BREAKER_MIN_REQUESTS`,
    ///   `BREAKER_FAILURE_RATIO`
    /// - `CURSOR_TTL_SECONDS`
    /// - `REDIS_URL`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            cache_enabled: lookup("CACHE_ENABLED")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(true),
            cache_ttl_seconds: parse_var(&lookup, "CACHE_TTL_SECONDS").unwrap_or(300),
            cache_double_delete_delay_ms: parse_var(&lookup, "CACHE_DOUBLE_DELETE_DELAY_MS")
                .unwrap_or(500),
            cache_null_ttl_seconds: parse_var(&lookup, "CACHE_NULL_TTL_SECONDS").unwrap_or(60),
            cache_null_prefix: lookup("CACHE_NULL_PREFIX")
                .unwrap_or_else(|| "__null__".to_string()),
            cache_max_entries: parse_var(&lookup, "CACHE_MAX_ENTRIES")
                .unwrap_or(DEFAULT_MAX_ENTRIES),
            breaker_name: lookup("BREAKER_NAME").unwrap_or_else(|| "cache".to_string()),
            breaker_max_requests: parse_var(&lookup, "BREAKER_MAX_REQUESTS").unwrap_or(3),
            breaker_interval_seconds: parse_var(&lookup, "BREAKER_INTERVAL_SECONDS")
                .unwrap_or(60),
            breaker_timeout_seconds: parse_var(&lookup, "BREAKER_TIMEOUT_SECONDS").unwrap_or(30),
            breaker_min_requests: parse_var(&lookup, "BREAKER_MIN_REQUESTS").unwrap_or(10),
            breaker_failure_ratio: parse_var(&lookup, "BREAKER_FAILURE_RATIO").unwrap_or(0.6),
            cursor_ttl_seconds: parse_var(&lookup, "CURSOR_TTL_SECONDS").unwrap_or(3600),
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn breaker_settings(&self) -> BreakerSettings {
        BreakerSettings {
            name: self.breaker_name.clone(),
            max_half_open_requests: self.breaker_max_requests,
            interval: Duration::from_secs(self.breaker_interval_seconds),
            open_timeout: Duration::from_secs(self.breaker_timeout_seconds),
            min_requests: self.breaker_min_requests,
            failure_ratio: self.breaker_failure_ratio,
            on_state_change: None,
        }
    }

    /// Builds the validated cache-aside settings.
    pub fn cache_config(&self) -> Result<CacheConfig, ConfigError> {
        let config = CacheConfig {
            enabled: self.cache_enabled,
            ttl: self.cache_ttl(),
            double_delete_delay: Duration::from_millis(self.cache_double_delete_delay_ms),
            null_cache_ttl: Duration::from_secs(self.cache_null_ttl_seconds),
            null_cache_prefix: self.cache_null_prefix.clone(),
            breaker: self.breaker_settings(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn cursor_manager(&self) -> CursorManager {
        CursorManager::new(Duration::from_secs(self.cursor_ttl_seconds))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse().ok())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
