//! Pure functions for serializing/deserializing entities to/from cache bytes.
//!
//! Entities are stored as JSON. A key known to be absent from the backing
//! store holds a reserved marker instead, which can never be confused with a
//! JSON document.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during cache serialization/deserialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to serialize a value to bytes.
    #[error("Failed to serialize: {0}")]
    SerializeFailed(String),
    /// Failed to deserialize bytes to a value.
    #[error("Failed to deserialize: {0}")]
    DeserializeFailed(String),
}

/// Result type for serialization operations.
pub type Result<T> = std::result::Result<T, SerializationError>;

/// What a cached payload turned out to contain.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue<T> {
    /// The null marker: the backing store confirmed the key is absent.
    Absent,
    /// A decoded entity.
    Present(T),
    /// Bytes that are neither the marker nor a valid entity.
    Corrupt(SerializationError),
}

/// Serializes an entity to JSON bytes.
pub fn serialize_entity<T: Serialize>(entity: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(entity).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes JSON bytes to an entity.
pub fn deserialize_entity<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

/// Returns the bytes stored for a key confirmed absent.
pub fn null_marker(null_prefix: &str) -> Vec<u8> {
    null_prefix.as_bytes().to_vec()
}

/// Returns true if the payload is the null marker.
pub fn is_null_marker(bytes: &[u8], null_prefix: &str) -> bool {
    !null_prefix.is_empty() && bytes.starts_with(null_prefix.as_bytes())
}

/// Classifies a cached payload.
pub fn decode_cached<T: DeserializeOwned>(bytes: &[u8], null_prefix: &str) -> CachedValue<T> {
    if is_null_marker(bytes, null_prefix) {
        return CachedValue::Absent;
    }
    match deserialize_entity(bytes) {
        Ok(entity) => CachedValue::Present(entity),
        Err(err) => CachedValue::Corrupt(err),
    }
}
