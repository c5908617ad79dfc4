//! Liquidity Guard
//!
//! Pre-trade sizing check against pool depth. Callable on its own, without
//! running the rug check first.
//!
//! Slippage is estimated with a constant-product pool model: buying `x` USD
//! against a pool holding `L` USD total (`L / 2` per side) moves the price by
//! roughly `x / (L / 2 + x)`.

use serde::{Deserialize, Serialize};

use super::snapshot::MarketSnapshot;

/// Default share of pool liquidity a single position may take
pub const DEFAULT_MAX_POSITION_PCT_OF_LIQUIDITY: f64 = 0.02;

/// Default slippage above which the check fails
pub const DEFAULT_MAX_SLIPPAGE: f64 = 0.05;

/// Default slippage above which a warning is raised
pub const DEFAULT_SLIPPAGE_WARNING: f64 = 0.01;

/// Configuration for liquidity checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityGuardConfig {
    /// Fraction of `liquidity.total` considered a safe position size
    pub max_position_pct_of_liquidity: f64,
    /// Maximum acceptable estimated slippage (fraction)
    pub max_slippage: f64,
    /// Estimated slippage (fraction) that triggers a warning
    pub slippage_warning: f64,
}

impl Default for LiquidityGuardConfig {
    fn default() -> Self {
        Self {
            max_position_pct_of_liquidity: DEFAULT_MAX_POSITION_PCT_OF_LIQUIDITY,
            max_slippage: DEFAULT_MAX_SLIPPAGE,
            slippage_warning: DEFAULT_SLIPPAGE_WARNING,
        }
    }
}

impl LiquidityGuardConfig {
    /// Conservative config for thin meme pools
    pub fn conservative() -> Self {
        Self {
            max_position_pct_of_liquidity: 0.01,
            max_slippage: 0.03,
            slippage_warning: 0.005,
        }
    }
}

/// Result of a liquidity sizing check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityCheck {
    pub passed: bool,
    /// Largest position in USD the pool can absorb safely
    pub max_safe_size: f64,
    /// Estimated slippage as a fraction (0.01 = 1%)
    pub slippage_estimate: f64,
    pub warnings: Vec<String>,
}

/// Stateless liquidity gate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiquidityGuard {
    pub config: LiquidityGuardConfig,
}

impl LiquidityGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LiquidityGuardConfig) -> Self {
        Self { config }
    }

    /// Estimated slippage for `position_size_usd` against `liquidity_usd`.
    /// Monotonically increasing in `position_size_usd / liquidity_usd`.
    pub fn estimate_slippage(position_size_usd: f64, liquidity_usd: f64) -> f64 {
        if position_size_usd <= 0.0 || !position_size_usd.is_finite() {
            return 0.0;
        }
        if liquidity_usd <= 0.0 || !liquidity_usd.is_finite() {
            return 1.0;
        }
        let per_side = liquidity_usd / 2.0;
        position_size_usd / (per_side + position_size_usd)
    }

    /// Check whether `position_size_usd` fits the snapshot's liquidity
    pub fn check(&self, snapshot: &MarketSnapshot, position_size_usd: f64) -> LiquidityCheck {
        let liquidity = if snapshot.liquidity.total.is_finite() {
            snapshot.liquidity.total.max(0.0)
        } else {
            0.0
        };
        let max_safe_size = liquidity * self.config.max_position_pct_of_liquidity;
        let slippage_estimate = Self::estimate_slippage(position_size_usd, liquidity);
        let mut warnings = Vec::new();
        let mut passed = true;

        if !position_size_usd.is_finite() || position_size_usd < 0.0 {
            passed = false;
            warnings.push(format!("Invalid position size: {}", position_size_usd));
        }

        if liquidity <= 0.0 {
            passed = false;
            warnings.push("No liquidity reported for this pool".to_string());
        }

        if position_size_usd > max_safe_size {
            passed = false;
            warnings.push(format!(
                "Position ${:.2} exceeds max safe size ${:.2} ({:.1}% of ${:.0} liquidity)",
                position_size_usd,
                max_safe_size,
                self.config.max_position_pct_of_liquidity * 100.0,
                liquidity
            ));
        }

        if slippage_estimate > self.config.max_slippage {
            passed = false;
            warnings.push(format!(
                "Estimated slippage {:.2}% exceeds maximum {:.2}%",
                slippage_estimate * 100.0,
                self.config.max_slippage * 100.0
            ));
        } else if slippage_estimate > self.config.slippage_warning {
            warnings.push(format!(
                "Estimated slippage {:.2}% is above {:.2}%",
                slippage_estimate * 100.0,
                self.config.slippage_warning * 100.0
            ));
        }

        tracing::debug!(
            "Liquidity check {}: size ${:.2}, max safe ${:.2}, slippage {:.3}",
            snapshot.token.symbol,
            position_size_usd,
            max_safe_size,
            slippage_estimate
        );

        LiquidityCheck {
            passed,
            max_safe_size,
            slippage_estimate,
            warnings,
        }
    }
}

/// Check a position size with default thresholds
pub fn check_liquidity(snapshot: &MarketSnapshot, position_size_usd: f64) -> LiquidityCheck {
    LiquidityGuard::new().check(snapshot, position_size_usd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::fixtures::snapshot;

    #[test]
    fn test_oversized_position_fails() {
        let mut snap = snapshot();
        snap.liquidity.total = 850_000.0;

        let check = check_liquidity(&snap, 1_000_000.0);
        assert!(!check.passed);
        assert!(!check.warnings.is_empty());
        assert!((check.max_safe_size - 17_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_small_position_passes() {
        let check = check_liquidity(&snapshot(), 1_000.0);
        assert!(check.passed);
        assert!(check.warnings.is_empty());
        assert!(check.slippage_estimate < 0.01);
    }

    #[test]
    fn test_max_safe_size_is_within_slippage_limit() {
        let snap = snapshot();
        let max_safe = snap.liquidity.total * DEFAULT_MAX_POSITION_PCT_OF_LIQUIDITY;
        let check = check_liquidity(&snap, max_safe);
        assert!(check.passed);
        assert!(check.slippage_estimate <= DEFAULT_MAX_SLIPPAGE);
    }

    #[test]
    fn test_slippage_monotonic() {
        let mut last = 0.0;
        for size in [100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0] {
            let s = LiquidityGuard::estimate_slippage(size, 250_000.0);
            assert!(s > last);
            last = s;
        }
        assert!(last < 1.0);
    }

    #[test]
    fn test_zero_liquidity() {
        let mut snap = snapshot();
        snap.liquidity.total = 0.0;
        let check = check_liquidity(&snap, 10.0);
        assert!(!check.passed);
        assert_eq!(check.max_safe_size, 0.0);
        assert_eq!(check.slippage_estimate, 1.0);
    }

    #[test]
    fn test_negative_size_rejected() {
        let check = check_liquidity(&snapshot(), -5.0);
        assert!(!check.passed);
        assert!(check.warnings[0].contains("Invalid position size"));
    }

    #[test]
    fn test_conservative_config() {
        let guard = LiquidityGuard::with_config(LiquidityGuardConfig::conservative());
        let check = guard.check(&snapshot(), 4_000.0);
        // 1% of 250K = 2.5K
        assert!(!check.passed);
        assert!(check_liquidity(&snapshot(), 4_000.0).passed);
    }
}
