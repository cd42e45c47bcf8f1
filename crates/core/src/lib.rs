//! Functional core for the readthrough cache-aside layer.
//!
//! Everything in this crate is free of I/O: traits describing the cache,
//! the backing store and the circuit breaker, the error types they share,
//! pure (de)serialization helpers, the breaker state machine, and the
//! keyset cursor codec. The `readthrough` crate supplies the concrete
//! implementations.

pub mod breaker;
pub mod cache;
pub mod cursor;
pub mod storage;
