//! Domain Layer - Core types and pure checks
//!
//! This module contains pure domain types and logic with no I/O.
//! All external interactions happen through the ports layer.
//!
//! - `snapshot`: normalized provider output
//! - `regime`: trend / volatility / liquidity buckets
//! - `risk`, `rug_detector`, `liquidity_guard`: side-effect-free risk gates
//! - `provider_health`: rolling per-provider health and latency
//! - `signal`, `trade_plan`, `rule`: pipeline outputs and persisted rules

pub mod snapshot;
pub mod regime;
pub mod risk;
pub mod rug_detector;
pub mod liquidity_guard;
pub mod provider_health;
pub mod signal;
pub mod trade_plan;
pub mod rule;

pub use snapshot::{
    MarketSnapshot, TokenRef, PriceInfo, VolumeInfo, LiquidityInfo, SnapshotMetadata, SnapshotError,
};
pub use regime::{MarketRegime, Trend, Volatility, LiquidityTier};
pub use risk::{RiskCheck, RiskFlag, RiskLevel};
pub use rug_detector::{RugRiskChecker, RugRiskConfig, check_rug_risk};
pub use liquidity_guard::{LiquidityGuard, LiquidityGuardConfig, LiquidityCheck, check_liquidity};
pub use provider_health::{ProviderHealthTracker, ProviderHealth, HealthConfig, ProviderId};
pub use signal::{Signal, SignalFeatures, Direction, Bias, Heuristics, EntryZone};
pub use trade_plan::{
    TradePlan, Entry, EntryType, PlanRisk, Target, PlanMetrics, ChecklistItem, PlanStatus,
};
pub use rule::SignalRule;
