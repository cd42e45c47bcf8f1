use async_trait::async_trait;

use super::{Entity, FieldUpdates, Result};

/// Repository for a single entity type keyed by string identifiers.
///
/// A missing entity is reported as `RepositoryError::NotFound` so callers can
/// tell it apart from infrastructure failures.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Gets an entity by its ID.
    async fn get_by_id(&self, id: &str) -> Result<T>;

    /// Creates a new entity.
    async fn create(&self, entity: &T) -> Result<()>;

    /// Applies a partial update to an existing entity.
    async fn update(&self, id: &str, updates: &FieldUpdates) -> Result<()>;

    /// Deletes an entity by its ID.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Returns whether an entity with this ID exists.
    async fn exists(&self, id: &str) -> Result<bool>;
}
