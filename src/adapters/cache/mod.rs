//! Caching adapters

mod swr;

pub use swr::{CacheConfig, CacheLookup, CacheState, CacheStats, FetchOptions, SwrCache};
