//! Redis error mapping to CacheError.

use readthrough_core::cache::CacheError;

/// Maps Redis errors to CacheError.
///
/// Transport problems become `ConnectionFailed`; everything else the server
/// rejected becomes `OperationFailed`. Both count against the breaker.
pub fn map_redis_error(err: redis::RedisError) -> CacheError {
    if err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped() {
        CacheError::ConnectionFailed(err.to_string())
    } else {
        CacheError::OperationFailed(err.to_string())
    }
}
