//! Cached repository decorator.
//!
//! Wraps any `Repository<T>` with caching behavior:
//!
//! - **Reads**: Check cache first, on miss fetch from repository and populate cache
//! - **Writes**: Persist to repository, then invalidate the cache key twice
//!
//! # Example
//!
//! ```ignore
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//!
//! let repo = Arc::new(InMemoryRepository::<Book>::new());
//! let cache = Arc::new(MemoryCache::new(NonZeroUsize::new(10_000).unwrap()));
//!
//! let cached_repo = CachedRepository::new(repo, cache, CacheConfig::default())?;
//! ```

mod repository;

pub use repository::CachedRepository;
