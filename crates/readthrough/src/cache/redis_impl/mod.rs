//! Redis cache backend implementation.
//!
//! Shares cached entities between instances of the service. Connections are
//! multiplexed through a `ConnectionManager`, which reconnects on its own.

mod cache;
mod error;

pub use cache::RedisCache;
