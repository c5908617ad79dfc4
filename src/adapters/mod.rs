//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Cache: stale-while-revalidate snapshot cache
//! - Market Data: Dexscreener HTTP client and on-disk fixtures
//! - Store: signal / rule persistence (memory, JSON file)
//! - Telemetry: tracing-backed telemetry sink
//! - CLI: Command-line interface handlers

pub mod cache;
pub mod market_data;
pub mod store;
pub mod telemetry;
pub mod cli;

pub use cache::{CacheConfig, FetchOptions, SwrCache};
pub use market_data::{DexscreenerAdapter, FileSnapshotAdapter};
pub use store::{InMemorySignalStore, JsonFileSignalStore};
pub use telemetry::TracingTelemetry;
pub use cli::CliApp;
