use std::future::Future;

use async_trait::async_trait;

use crate::cache;

use super::Result;

/// Call-guarding capability placed in front of the cache.
///
/// Implementations own all breaker state; callers only ever hand it an
/// operation to run.
#[async_trait]
pub trait Breaker: Send + Sync {
    /// Runs `operation` if the breaker admits it and records the outcome.
    async fn execute<V, F, Fut>(&self, operation: F) -> Result<V>
    where
        V: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = cache::Result<V>> + Send;
}
