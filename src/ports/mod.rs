//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Market data providers (`ProviderAdapter`)
//! - Telemetry sinks
//! - Signal / rule persistence
//! - Heuristic bias sources

pub mod market_data;
pub mod telemetry;
pub mod signal_store;
pub mod heuristics;

pub use market_data::{
    AdapterError, AdapterErrorBody, AdapterResponse, MarketDataUnavailableError, ProviderAdapter,
    ProviderFailure, SnapshotParams,
};
pub use telemetry::{NoopTelemetry, Telemetry, TelemetryAttributes};
#[cfg(test)]
pub use telemetry::MockTelemetry;
pub use signal_store::{RuleQuery, SignalQuery, SignalStore, StoreError};
pub use heuristics::HeuristicsSource;
