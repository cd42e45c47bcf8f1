mod config;
mod error;
mod keys;
mod serialization;
mod traits;

pub use config::{CacheConfig, ConfigError};
pub use error::{CacheError, Result};
pub use keys::{entity_key, key_for};
pub use serialization::{
    decode_cached, deserialize_entity, is_null_marker, null_marker, serialize_entity, CachedValue,
    SerializationError,
};
pub use traits::Cache;
