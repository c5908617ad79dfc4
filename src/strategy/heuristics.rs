//! Range Position Heuristics
//!
//! Default bias source: reads direction from the 24h change and
//! overbought / oversold from where price sits inside the 24h range.

use serde::{Deserialize, Serialize};

use crate::domain::{Bias, EntryZone, Heuristics, MarketSnapshot};
use crate::ports::HeuristicsSource;

pub const RANGE_POSITION_SOURCE: &str = "range_position";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeHeuristicsConfig {
    /// 24h change (percent) needed for a directional bias
    pub bias_threshold_pct: f64,
    /// Range position at or above which price is overbought
    pub overbought_position: f64,
    /// Range position at or below which price is oversold
    pub oversold_position: f64,
    /// Entry zone half-width as a fraction of the range ratio
    pub zone_fraction: f64,
    pub min_zone_pct: f64,
    pub max_zone_pct: f64,
}

impl Default for RangeHeuristicsConfig {
    fn default() -> Self {
        Self {
            bias_threshold_pct: 2.0,
            overbought_position: 0.8,
            oversold_position: 0.2,
            zone_fraction: 0.25,
            min_zone_pct: 0.002,
            max_zone_pct: 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RangePositionHeuristics {
    config: RangeHeuristicsConfig,
}

impl RangePositionHeuristics {
    pub fn new(config: RangeHeuristicsConfig) -> Self {
        Self { config }
    }

    fn bias(&self, change_24h: f64) -> Bias {
        if change_24h > self.config.bias_threshold_pct {
            Bias::Bullish
        } else if change_24h < -self.config.bias_threshold_pct {
            Bias::Bearish
        } else {
            Bias::Neutral
        }
    }

    fn entry_zone(&self, snapshot: &MarketSnapshot, bias: Bias) -> Option<EntryZone> {
        let current = snapshot.price.current;
        let ratio = snapshot.range_ratio();
        if !(current > 0.0) || !ratio.is_finite() {
            return None;
        }

        let zone_pct = (ratio * self.config.zone_fraction)
            .clamp(self.config.min_zone_pct, self.config.max_zone_pct);
        let half = current * zone_pct;

        // Longs buy pullbacks below price, shorts sell bounces above it
        let zone = match bias {
            Bias::Bullish => EntryZone { low: current - half, high: current },
            Bias::Bearish => EntryZone { low: current, high: current + half },
            Bias::Neutral => EntryZone { low: current - half / 2.0, high: current + half / 2.0 },
        };
        Some(zone)
    }
}

impl HeuristicsSource for RangePositionHeuristics {
    fn name(&self) -> &str {
        RANGE_POSITION_SOURCE
    }

    fn evaluate(&self, snapshot: &MarketSnapshot) -> Heuristics {
        let change = snapshot.price.change_24h;
        let bias = self.bias(change);
        let position = snapshot.range_position();

        let strength = if change.is_finite() {
            (change.abs() / 10.0).min(1.0)
        } else {
            0.0
        };
        let confidence = (0.3 + 0.5 * strength) * snapshot.metadata.confidence.clamp(0.0, 1.0);

        let ratio = snapshot.range_ratio();
        Heuristics {
            bias,
            confidence,
            rsi_overbought: position.is_some_and(|p| p >= self.config.overbought_position),
            rsi_oversold: position.is_some_and(|p| p <= self.config.oversold_position),
            range_size: ratio.is_finite().then_some(ratio),
            entry_zone: self.entry_zone(snapshot, bias),
            source: RANGE_POSITION_SOURCE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::fixtures;
    use approx::assert_relative_eq;

    #[test]
    fn test_bullish_bias_near_high_is_overbought() {
        let mut snap = fixtures::snapshot();
        snap.price.change_24h = 6.0;
        snap.price.high_24h = 101.0;
        snap.price.low_24h = 90.0;

        let h = RangePositionHeuristics::default().evaluate(&snap);
        assert_eq!(h.bias, Bias::Bullish);
        assert!(h.rsi_overbought);
        assert!(!h.rsi_oversold);
        assert_relative_eq!(h.confidence, (0.3 + 0.5 * 0.6) * 0.9, epsilon = 1e-12);

        let zone = h.entry_zone.unwrap();
        assert_eq!(zone.high, 100.0);
        assert!(zone.low < 100.0);
    }

    #[test]
    fn test_bearish_bias_zone_above_price() {
        let mut snap = fixtures::snapshot();
        snap.price.change_24h = -4.0;
        let h = RangePositionHeuristics::default().evaluate(&snap);
        assert_eq!(h.bias, Bias::Bearish);
        let zone = h.entry_zone.unwrap();
        assert_eq!(zone.low, 100.0);
        assert!(zone.high > 100.0);
    }

    #[test]
    fn test_flat_range_has_no_position_flags() {
        let mut snap = fixtures::snapshot();
        snap.price.high_24h = 100.0;
        snap.price.low_24h = 100.0;
        let h = RangePositionHeuristics::default().evaluate(&snap);
        assert_eq!(h.bias, Bias::Neutral);
        assert!(!h.rsi_overbought && !h.rsi_oversold);
        assert_eq!(h.range_size, Some(0.0));
    }

    #[test]
    fn test_zero_price_yields_no_zone() {
        let mut snap = fixtures::snapshot();
        snap.price.current = 0.0;
        let h = RangePositionHeuristics::default().evaluate(&snap);
        assert!(h.entry_zone.is_none());
        assert!(h.range_size.is_none());
        assert_eq!(HeuristicsSource::name(&RangePositionHeuristics::default()), "range_position");
    }
}
