//! In-memory storage backend.
//!
//! Stores records of one entity type in a HashMap wrapped in
//! `Arc<RwLock<_>>`. Used by the demo and by tests, where persistence is not
//! required.
//!
//! # Example
//!
//! ```rust,ignore
//! use readthrough::storage::InMemoryRepository;
//!
//! let repo = InMemoryRepository::<Book>::new();
//! ```

mod repository;

pub use repository::InMemoryRepository;
