//! Market Regime Detection
//!
//! Buckets a single snapshot into trend, volatility and liquidity tiers.
//! No history is kept; each call sees only the snapshot it is given.
//!
//! - trend: 24h change against a symmetric threshold (default ±3%)
//! - vol: (high - low) / current against low / high range thresholds
//! - liquidity: pool depth against low / high USD thresholds

use serde::{Deserialize, Serialize};

use crate::domain::{LiquidityTier, MarketRegime, MarketSnapshot, Trend, Volatility};

/// Default 24h change (percent) beyond which a trend is called
pub const DEFAULT_TREND_THRESHOLD_PCT: f64 = 3.0;
/// Range ratio below which volatility is low
pub const DEFAULT_LOW_VOL_RANGE: f64 = 0.02;
/// Range ratio above which volatility is high
pub const DEFAULT_HIGH_VOL_RANGE: f64 = 0.10;
/// Liquidity (USD) below which a pool is thin
pub const DEFAULT_LOW_LIQUIDITY_USD: f64 = 50_000.0;
/// Liquidity (USD) above which a pool is deep
pub const DEFAULT_HIGH_LIQUIDITY_USD: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    pub trend_threshold_pct: f64,
    pub low_vol_range: f64,
    pub high_vol_range: f64,
    pub low_liquidity_usd: f64,
    pub high_liquidity_usd: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            trend_threshold_pct: DEFAULT_TREND_THRESHOLD_PCT,
            low_vol_range: DEFAULT_LOW_VOL_RANGE,
            high_vol_range: DEFAULT_HIGH_VOL_RANGE,
            low_liquidity_usd: DEFAULT_LOW_LIQUIDITY_USD,
            high_liquidity_usd: DEFAULT_HIGH_LIQUIDITY_USD,
        }
    }
}

impl RegimeThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.trend_threshold_pct > 0.0) {
            return Err(format!(
                "trend_threshold_pct must be > 0, got {}",
                self.trend_threshold_pct
            ));
        }
        if !(self.low_vol_range > 0.0 && self.low_vol_range < self.high_vol_range) {
            return Err(format!(
                "expected 0 < low_vol_range < high_vol_range, got {} / {}",
                self.low_vol_range, self.high_vol_range
            ));
        }
        if !(self.low_liquidity_usd >= 0.0 && self.low_liquidity_usd < self.high_liquidity_usd) {
            return Err(format!(
                "expected 0 <= low_liquidity_usd < high_liquidity_usd, got {} / {}",
                self.low_liquidity_usd, self.high_liquidity_usd
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RegimeDetector {
    thresholds: RegimeThresholds,
}

impl RegimeDetector {
    pub fn new(thresholds: RegimeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RegimeThresholds {
        &self.thresholds
    }

    pub fn detect(&self, snapshot: &MarketSnapshot) -> MarketRegime {
        MarketRegime {
            trend: self.trend(snapshot.price.change_24h),
            vol: self.volatility(snapshot.range_ratio()),
            liquidity: self.liquidity(snapshot.liquidity.total),
        }
    }

    fn trend(&self, change_24h: f64) -> Trend {
        let t = self.thresholds.trend_threshold_pct;
        if change_24h > t {
            Trend::Up
        } else if change_24h < -t {
            Trend::Down
        } else {
            Trend::Side
        }
    }

    fn volatility(&self, range_ratio: f64) -> Volatility {
        // Unknown range (zero price, NaN) is treated as the riskiest bucket
        if !range_ratio.is_finite() || range_ratio > self.thresholds.high_vol_range {
            Volatility::High
        } else if range_ratio < self.thresholds.low_vol_range {
            Volatility::Low
        } else {
            Volatility::Mid
        }
    }

    fn liquidity(&self, total_usd: f64) -> LiquidityTier {
        if !(total_usd >= self.thresholds.low_liquidity_usd) {
            LiquidityTier::Low
        } else if total_usd > self.thresholds.high_liquidity_usd {
            LiquidityTier::High
        } else {
            LiquidityTier::Mid
        }
    }
}

/// Detect with default thresholds
pub fn detect_regime(snapshot: &MarketSnapshot) -> MarketRegime {
    RegimeDetector::default().detect(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::fixtures;

    fn with_change(change: f64) -> MarketSnapshot {
        let mut snap = fixtures::snapshot();
        snap.price.change_24h = change;
        snap
    }

    fn with_range(high: f64, low: f64) -> MarketSnapshot {
        let mut snap = fixtures::snapshot();
        snap.price.high_24h = high;
        snap.price.low_24h = low;
        snap
    }

    #[test]
    fn test_trend_buckets() {
        assert_eq!(detect_regime(&with_change(8.5)).trend, Trend::Up);
        assert_eq!(detect_regime(&with_change(-8.5)).trend, Trend::Down);
        assert_eq!(detect_regime(&with_change(0.5)).trend, Trend::Side);
        assert_eq!(detect_regime(&with_change(3.0)).trend, Trend::Side);
        assert_eq!(detect_regime(&with_change(f64::NAN)).trend, Trend::Side);
    }

    #[test]
    fn test_volatility_buckets() {
        assert_eq!(detect_regime(&with_range(100.5, 99.5)).vol, Volatility::Low);
        assert_eq!(detect_regime(&with_range(102.0, 98.0)).vol, Volatility::Mid);
        assert_eq!(detect_regime(&with_range(113.0, 87.0)).vol, Volatility::High);
    }

    #[test]
    fn test_zero_price_is_high_vol() {
        let mut snap = fixtures::snapshot();
        snap.price.current = 0.0;
        assert_eq!(detect_regime(&snap).vol, Volatility::High);
    }

    #[test]
    fn test_liquidity_buckets() {
        let mut snap = fixtures::snapshot();
        snap.liquidity.total = 12_000.0;
        assert_eq!(detect_regime(&snap).liquidity, LiquidityTier::Low);
        snap.liquidity.total = 250_000.0;
        assert_eq!(detect_regime(&snap).liquidity, LiquidityTier::Mid);
        snap.liquidity.total = 3_000_000.0;
        assert_eq!(detect_regime(&snap).liquidity, LiquidityTier::High);
        snap.liquidity.total = f64::NAN;
        assert_eq!(detect_regime(&snap).liquidity, LiquidityTier::Low);
    }

    #[test]
    fn test_custom_thresholds() {
        let detector = RegimeDetector::new(RegimeThresholds {
            trend_threshold_pct: 0.5,
            ..RegimeThresholds::default()
        });
        assert_eq!(detector.detect(&with_change(1.0)).trend, Trend::Up);
    }

    #[test]
    fn test_thresholds_validation() {
        assert!(RegimeThresholds::default().validate().is_ok());
        let inverted = RegimeThresholds {
            low_vol_range: 0.2,
            high_vol_range: 0.1,
            ..RegimeThresholds::default()
        };
        assert!(inverted.validate().is_err());
    }
}
