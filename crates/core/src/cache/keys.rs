use crate::storage::Entity;

/// Returns the cache key for a single entity.
///
/// # Examples
///
/// ```
/// use readthrough_core::cache::entity_key;
///
/// assert_eq!(entity_key("Book", "abc"), "Book:abc");
/// ```
pub fn entity_key(entity_type: &str, id: &str) -> String {
    format!("{}:{}", entity_type, id)
}

/// Returns the cache key for an entity of type `T`.
pub fn key_for<T: Entity>(id: &str) -> String {
    entity_key(T::ENTITY_TYPE, id)
}
