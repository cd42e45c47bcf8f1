//! Cached repository decorator.
//!
//! Wraps a `Repository<T>` implementation with the cache-aside pattern,
//! a null-cache guard for missing ids, and double-delete invalidation.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;

use readthrough_core::breaker::Breaker;
use readthrough_core::cache::{
    decode_cached, key_for, null_marker, serialize_entity, Cache, CacheConfig, CachedValue,
    ConfigError,
};
use readthrough_core::storage::{Entity, FieldUpdates, Repository, RepositoryError, Result};

use crate::breaker::CircuitBreaker;

/// Cached repository decorator.
///
/// Implements the cache-aside pattern:
/// - **Reads**: Check cache first. On a miss, read the repository and
///   populate the cache in the background. Ids the repository does not have
///   are remembered with a short-lived marker.
/// - **Writes**: Persist to repository, delete the cache key, then delete it
///   again after `double_delete_delay` to evict values repopulated by reads
///   that raced the write.
///
/// Every cache call goes through the breaker. When the cache is failing,
/// reads fall through to the repository and invalidations are skipped.
///
/// # Type Parameters
///
/// * `T` - The entity type
/// * `R` - The underlying repository implementation
/// * `C` - The cache implementation
/// * `B` - The breaker guarding the cache
pub struct CachedRepository<T, R, C, B = CircuitBreaker>
where
    T: Entity,
    R: Repository<T>,
    C: Cache,
    B: Breaker,
{
    repository: Arc<R>,
    cache: Arc<C>,
    breaker: Arc<B>,
    config: CacheConfig,
    tasks: TaskTracker,
    _entity: PhantomData<fn() -> T>,
}

impl<T, R, C> CachedRepository<T, R, C, CircuitBreaker>
where
    T: Entity,
    R: Repository<T>,
    C: Cache,
{
    /// Creates a cached repository guarded by a breaker built from
    /// `config.breaker`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `config` fails validation.
    pub fn new(
        repository: Arc<R>,
        cache: Arc<C>,
        config: CacheConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone()));
        Self::with_breaker(repository, cache, breaker, config)
    }
}

impl<T, R, C, B> CachedRepository<T, R, C, B>
where
    T: Entity,
    R: Repository<T>,
    C: Cache,
    B: Breaker,
{
    /// Creates a cached repository with a caller-supplied breaker.
    ///
    /// `config.breaker` is ignored; the breaker carries its own settings.
    pub fn with_breaker(
        repository: Arc<R>,
        cache: Arc<C>,
        breaker: Arc<B>,
        config: CacheConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        tracing::debug!(
            entity_type = T::ENTITY_TYPE,
            enabled = config.enabled,
            ttl_secs = config.ttl.as_secs(),
            double_delete_delay_ms = config.double_delete_delay.as_millis() as u64,
            "Cached repository ready"
        );
        Ok(Self {
            repository,
            cache,
            breaker,
            config,
            tasks: TaskTracker::new(),
            _entity: PhantomData,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn breaker(&self) -> &B {
        &self.breaker
    }

    /// Number of background cache tasks still running.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Waits for all background cache work (populates and delayed deletes).
    ///
    /// Call before the process exits so pending invalidations are not lost.
    /// Writes made afterwards still schedule their delayed delete, and
    /// calling this again waits for those too.
    pub async fn shutdown(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        tracing::debug!(entity_type = T::ENTITY_TYPE, "Background cache tasks drained");
    }
}

impl<T, R, C, B> CachedRepository<T, R, C, B>
where
    T: Entity,
    R: Repository<T>,
    C: Cache + 'static,
    B: Breaker + 'static,
{
    /// Stores `bytes` under `key` without making the caller wait.
    fn spawn_populate(&self, key: String, bytes: Vec<u8>, ttl: Duration) {
        let cache = Arc::clone(&self.cache);
        let breaker = Arc::clone(&self.breaker);

        self.tasks.spawn(async move {
            match breaker
                .execute(|| cache.set(&key, &bytes, Some(ttl)))
                .await
            {
                Ok(()) => tracing::trace!(key = %key, "Cache populated"),
                Err(err) => tracing::warn!(key = %key, error = %err, "Failed to populate cache"),
            }
        });
    }

    /// Deletes `key` now, then again after `double_delete_delay`.
    ///
    /// Both deletes run on a tracked task. The caller waits for the first one
    /// only, and dropping the caller leaves the task running.
    async fn invalidate(&self, key: String) {
        let cache = Arc::clone(&self.cache);
        let breaker = Arc::clone(&self.breaker);
        let delay = self.config.double_delete_delay;
        let (first_done, first_done_rx) = oneshot::channel();

        self.tasks.spawn(async move {
            match breaker.execute(|| cache.delete(&key)).await {
                Ok(()) => tracing::debug!(key = %key, "Cache entry invalidated"),
                Err(err) => tracing::warn!(key = %key, error = %err, "Cache invalidation failed"),
            }
            let _ = first_done.send(());

            tokio::time::sleep(delay).await;
            match breaker.execute(|| cache.delete(&key)).await {
                Ok(()) => tracing::debug!(key = %key, "Delayed cache invalidation done"),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "Delayed cache invalidation failed")
                }
            }
        });

        // Only fails if the task panicked before signalling.
        let _ = first_done_rx.await;
    }
}

#[async_trait]
impl<T, R, C, B> Repository<T> for CachedRepository<T, R, C, B>
where
    T: Entity,
    R: Repository<T> + 'static,
    C: Cache + 'static,
    B: Breaker + 'static,
{
    async fn get_by_id(&self, id: &str) -> Result<T> {
        if !self.config.enabled {
            return self.repository.get_by_id(id).await;
        }

        let key = key_for::<T>(id);
        let prefix = self.config.null_cache_prefix.as_str();

        match self.breaker.execute(|| self.cache.get(&key)).await {
            Ok(Some(bytes)) => match decode_cached::<T>(&bytes, prefix) {
                CachedValue::Present(entity) => {
                    tracing::trace!(key = %key, "Cache hit");
                    return Ok(entity);
                }
                CachedValue::Absent => {
                    tracing::trace!(key = %key, "Null cache hit");
                    return Err(RepositoryError::not_found(T::ENTITY_TYPE, id));
                }
                CachedValue::Corrupt(err) => {
                    tracing::warn!(key = %key, error = %err, "Cached entry unreadable, treating as miss");
                }
            },
            Ok(None) => tracing::trace!(key = %key, "Cache miss"),
            Err(err) => {
                if err.is_rejection() {
                    tracing::debug!(key = %key, error = %err, "Cache skipped, reading through");
                } else {
                    tracing::warn!(key = %key, error = %err, "Cache read failed, reading through");
                }
                return self.repository.get_by_id(id).await;
            }
        }

        match self.repository.get_by_id(id).await {
            Ok(entity) => {
                match serialize_entity(&entity) {
                    Ok(bytes) => self.spawn_populate(key, bytes, self.config.ttl),
                    Err(err) => {
                        tracing::warn!(key = %key, error = %err, "Failed to serialize entity for cache")
                    }
                }
                Ok(entity)
            }
            Err(err) if err.is_not_found() => {
                self.spawn_populate(key, null_marker(prefix), self.config.null_cache_ttl);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn create(&self, entity: &T) -> Result<()> {
        self.repository.create(entity).await?;
        tracing::debug!(entity_type = T::ENTITY_TYPE, id = %entity.id(), "Entity created");
        Ok(())
    }

    async fn update(&self, id: &str, updates: &FieldUpdates) -> Result<()> {
        self.repository.update(id, updates).await?;

        if self.config.enabled {
            self.invalidate(key_for::<T>(id)).await;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.repository.delete(id).await?;

        if self.config.enabled {
            self.invalidate(key_for::<T>(id)).await;
        }
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        match self.get_by_id(id).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}
