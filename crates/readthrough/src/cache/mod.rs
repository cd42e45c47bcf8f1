//! Cache backend implementations.
//!
//! This module provides concrete implementations of the `Cache` trait
//! defined in `readthrough_core::cache`.
//!
//! # Feature Flags
//!
//! - `redis`: adds the Redis backend. The in-memory backend is always built.

pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

pub use memory::MemoryCache;

#[cfg(feature = "redis")]
pub use redis_impl::RedisCache;
