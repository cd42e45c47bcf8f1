//! In-memory cache backend implementation.
//!
//! Single-process cache with TTL support and LRU eviction. Used by default
//! and in tests.

mod cache;

pub use cache::MemoryCache;
