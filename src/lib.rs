//! typed-cache - A lightweight in-memory cache with typed values
//!
//! Provides a Redis-like command surface (strings, integer and float
//! counters, list head operations, set membership) with per-key TTL
//! expiration and LRU eviction, behind a single shared handle.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;

mod tasks;

pub use cache::{Cache, CacheBuilder, CacheEntry, CacheStats, CacheStore, Value, ValueRecord};
pub use config::Config;
pub use context::{Canceller, Context};
pub use error::{CacheError, Result};
