//! Strategy Layer - Regime classification, signal scoring and trade planning
//!
//! Pure functions over snapshots and signals:
//! - `regime`: trend / volatility / liquidity buckets from one snapshot
//! - `heuristics`: default range-position bias source
//! - `signal_detector`: regime + bias -> scored `Signal`
//! - `trade_plan`: `Signal` -> sized, tiered `TradePlan`

pub mod regime;
pub mod heuristics;
pub mod signal_detector;
pub mod trade_plan;

pub use regime::{RegimeDetector, RegimeThresholds, detect_regime};
pub use heuristics::{RangePositionHeuristics, RangeHeuristicsConfig, RANGE_POSITION_SOURCE};
pub use signal_detector::{SignalDetector, patterns};
pub use trade_plan::{TradePlanGenerator, PlanConfig, PlanError, VolProfile};
