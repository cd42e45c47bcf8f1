//! Storage implementations.
//!
//! Concrete implementations of the `Repository<T>` trait defined in
//! `readthrough_core::storage`: an in-memory backing store and the caching
//! decorator that wraps any backing store.

pub mod cached;
pub mod inmemory;

pub use cached::CachedRepository;
pub use inmemory::InMemoryRepository;
