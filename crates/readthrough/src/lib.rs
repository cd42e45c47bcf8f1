//! Cache-aside repository layer.
//!
//! [`storage::CachedRepository`] wraps any `Repository<T>` with a read-through
//! cache guarded by a [`breaker::CircuitBreaker`]. Misses for unknown ids are
//! cached as a short-lived marker, and writes invalidate with a delayed second
//! delete. Pagination cursors live in `readthrough_core::cursor`.

pub mod breaker;
pub mod cache;
pub mod config;
pub mod models;
pub mod storage;

pub use breaker::CircuitBreaker;
pub use config::Config;
