use thiserror::Error;

use crate::cache::CacheError;

/// Errors returned by a breaker-guarded cache call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BreakerError {
    /// Circuit is open, rejecting all calls.
    #[error("Circuit breaker is open for {name}")]
    Open { name: String },
    /// Circuit is half-open and its probe budget is spent.
    #[error("Too many requests while circuit breaker {name} is half-open")]
    TooManyRequests { name: String },
    /// The call ran and failed.
    #[error(transparent)]
    Operation(#[from] CacheError),
}

impl BreakerError {
    /// Returns true if the breaker refused the call without running it.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::TooManyRequests { .. })
    }
}

/// Result type for breaker-guarded calls.
pub type Result<T> = std::result::Result<T, BreakerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_display() {
        let error = BreakerError::Open {
            name: "cache".to_string(),
        };
        assert_eq!(error.to_string(), "Circuit breaker is open for cache");
        assert!(error.is_rejection());
    }

    #[test]
    fn test_operation_is_transparent() {
        let error = BreakerError::from(CacheError::ConnectionFailed("refused".to_string()));
        assert_eq!(error.to_string(), "Cache connection failed: refused");
        assert!(!error.is_rejection());
    }
}
