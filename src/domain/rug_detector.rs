//! Rug Risk Checker
//!
//! Gates a market snapshot against rug-pull indicators. Liquidity below the
//! floor is the only hard threshold that is always applied; turnover and
//! price-collapse heuristics contribute extra flags, softer findings become
//! warnings.

use serde::{Deserialize, Serialize};

use super::risk::{RiskCheck, RiskFlag};
use super::snapshot::MarketSnapshot;

/// Default minimum liquidity in USD
pub const DEFAULT_MIN_LIQUIDITY_USD: f64 = 10_000.0;

/// Default liquidity considered fully healthy
pub const DEFAULT_HEALTHY_LIQUIDITY_USD: f64 = 250_000.0;

/// Default maximum 24h volume / liquidity ratio before wash trading is suspected
pub const DEFAULT_MAX_TURNOVER: f64 = 50.0;

/// Score deducted per warning
const WARNING_PENALTY: f64 = 0.02;

/// Score deducted per non-liquidity flag
const FLAG_PENALTY: f64 = 0.25;

/// Highest score a flagged snapshot can receive
const FLAGGED_SCORE_CAP: f64 = 0.49;

/// Configuration for rug risk checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RugRiskConfig {
    /// Hard liquidity floor in USD
    pub min_liquidity_usd: f64,
    /// Liquidity at which the liquidity component reaches 1.0
    pub healthy_liquidity_usd: f64,
    /// Volume/liquidity ratio below which trading is considered thin
    pub min_turnover: f64,
    /// Volume/liquidity ratio above which the snapshot is flagged
    pub max_turnover: f64,
    /// 24h drop (percent, positive number) that flags a price collapse
    pub collapse_pct: f64,
    /// 24h move (percent, absolute) that raises a warning
    pub extreme_move_pct: f64,
    /// Provider confidence below which a warning is raised
    pub min_provider_confidence: f64,
}

impl Default for RugRiskConfig {
    fn default() -> Self {
        Self {
            min_liquidity_usd: DEFAULT_MIN_LIQUIDITY_USD,
            healthy_liquidity_usd: DEFAULT_HEALTHY_LIQUIDITY_USD,
            min_turnover: 0.05,
            max_turnover: DEFAULT_MAX_TURNOVER,
            collapse_pct: 70.0,
            extreme_move_pct: 50.0,
            min_provider_confidence: 0.5,
        }
    }
}

impl RugRiskConfig {
    /// Stricter thresholds for larger accounts
    pub fn strict() -> Self {
        Self {
            min_liquidity_usd: 50_000.0,
            healthy_liquidity_usd: 1_000_000.0,
            min_turnover: 0.1,
            max_turnover: 20.0,
            collapse_pct: 50.0,
            extreme_move_pct: 30.0,
            min_provider_confidence: 0.7,
        }
    }

    /// Lenient thresholds for early-stage tokens
    pub fn lenient() -> Self {
        Self {
            min_liquidity_usd: 5_000.0,
            healthy_liquidity_usd: 100_000.0,
            min_turnover: 0.01,
            max_turnover: 100.0,
            collapse_pct: 85.0,
            extreme_move_pct: 80.0,
            min_provider_confidence: 0.3,
        }
    }
}

/// Stateless rug risk gate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RugRiskChecker {
    pub config: RugRiskConfig,
}

impl RugRiskChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RugRiskConfig) -> Self {
        Self { config }
    }

    /// Check a snapshot for rug risk
    pub fn check(&self, snapshot: &MarketSnapshot) -> RiskCheck {
        let cfg = &self.config;
        let mut flags = Vec::new();
        let mut warnings = Vec::new();

        let liquidity = if snapshot.liquidity.total.is_finite() {
            snapshot.liquidity.total.max(0.0)
        } else {
            0.0
        };

        // Liquidity floor
        let liquidity_score = if liquidity < cfg.min_liquidity_usd {
            flags.push(RiskFlag::LowLiquidity {
                liquidity_usd: liquidity,
                minimum_usd: cfg.min_liquidity_usd,
            });
            let ratio = if cfg.min_liquidity_usd > 0.0 {
                liquidity / cfg.min_liquidity_usd
            } else {
                0.0
            };
            0.4 * ratio.clamp(0.0, 1.0)
        } else {
            let span = cfg.healthy_liquidity_usd - cfg.min_liquidity_usd;
            let ramp = if span > 0.0 {
                ((liquidity - cfg.min_liquidity_usd) / span).clamp(0.0, 1.0)
            } else {
                1.0
            };
            if ramp < 1.0 {
                warnings.push(format!(
                    "Liquidity ${:.0} is below the healthy level of ${:.0}",
                    liquidity, cfg.healthy_liquidity_usd
                ));
            }
            0.6 + 0.4 * ramp
        };

        // Turnover
        if liquidity > 0.0 && snapshot.volume.volume_24h.is_finite() {
            let turnover = snapshot.volume.volume_24h / liquidity;
            if turnover > cfg.max_turnover {
                flags.push(RiskFlag::VolumeLiquidityMismatch {
                    ratio: turnover,
                    maximum: cfg.max_turnover,
                });
            } else if turnover < cfg.min_turnover {
                warnings.push(format!(
                    "Thin trading: 24h volume is {:.1}% of liquidity",
                    turnover * 100.0
                ));
            }
        }

        // Price action
        let change = snapshot.price.change_24h;
        if change.is_finite() {
            if change <= -cfg.collapse_pct {
                flags.push(RiskFlag::PriceCollapse { change_24h_pct: change });
            } else if change.abs() >= cfg.extreme_move_pct {
                warnings.push(format!("Extreme 24h move of {:.1}%", change));
            }
        }

        if snapshot.metadata.confidence < cfg.min_provider_confidence {
            warnings.push(format!(
                "Low provider confidence {:.2} from {}",
                snapshot.metadata.confidence, snapshot.metadata.provider
            ));
        }

        let extra_flags = flags
            .iter()
            .filter(|f| !matches!(f, RiskFlag::LowLiquidity { .. }))
            .count();
        let mut score = liquidity_score
            - FLAG_PENALTY * extra_flags as f64
            - WARNING_PENALTY * warnings.len() as f64;
        if !flags.is_empty() {
            score = score.min(FLAGGED_SCORE_CAP);
        }

        let check = RiskCheck::new(score, flags, warnings);
        if !check.passed {
            tracing::warn!(
                "Rug check failed for {} ({}): score {:.2}, flags: {}",
                snapshot.token.symbol,
                snapshot.token.address,
                check.score,
                check
                    .flags
                    .iter()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            );
        }
        check
    }
}

/// Check a snapshot with default thresholds
pub fn check_rug_risk(snapshot: &MarketSnapshot) -> RiskCheck {
    RugRiskChecker::new().check(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::risk::RiskLevel;
    use crate::domain::snapshot::fixtures::snapshot;

    #[test]
    fn test_low_liquidity_fails() {
        let mut snap = snapshot();
        snap.liquidity.total = 5_000.0;
        snap.volume.volume_24h = 2_000.0;

        let check = check_rug_risk(&snap);
        assert!(!check.passed);
        assert!(check.score < 0.5);
        assert!(!check.flags.is_empty());
        assert!(matches!(check.flags[0], RiskFlag::LowLiquidity { .. }));
    }

    #[test]
    fn test_healthy_liquidity_passes() {
        let check = check_rug_risk(&snapshot());
        assert!(check.passed);
        assert!(check.score > 0.5);
        assert!(check.flags.is_empty());
        assert_eq!(check.risk_level(), RiskLevel::Safe);
    }

    #[test]
    fn test_warnings_never_push_healthy_score_below_half() {
        let mut snap = snapshot();
        snap.liquidity.total = DEFAULT_MIN_LIQUIDITY_USD;
        snap.volume.volume_24h = 1.0;
        snap.price.change_24h = 60.0;
        snap.metadata.confidence = 0.1;

        let check = check_rug_risk(&snap);
        assert!(check.passed);
        assert_eq!(check.warnings.len(), 4);
        assert!(check.score > 0.5);
    }

    #[test]
    fn test_wash_trading_flag() {
        let mut snap = snapshot();
        snap.volume.volume_24h = snap.liquidity.total * 80.0;

        let check = check_rug_risk(&snap);
        assert!(!check.passed);
        assert!(check.score < 0.5);
        assert!(check
            .flags
            .iter()
            .any(|f| matches!(f, RiskFlag::VolumeLiquidityMismatch { .. })));
    }

    #[test]
    fn test_price_collapse_flag() {
        let mut snap = snapshot();
        snap.price.change_24h = -82.0;

        let check = check_rug_risk(&snap);
        assert!(!check.passed);
        assert!(check
            .flags
            .iter()
            .any(|f| matches!(f, RiskFlag::PriceCollapse { .. })));
    }

    #[test]
    fn test_strict_config_raises_floor() {
        let mut snap = snapshot();
        snap.liquidity.total = 30_000.0;
        snap.volume.volume_24h = 30_000.0;

        assert!(check_rug_risk(&snap).passed);
        assert!(!RugRiskChecker::with_config(RugRiskConfig::strict()).check(&snap).passed);
        assert!(RugRiskChecker::with_config(RugRiskConfig::lenient()).check(&snap).passed);
    }

    #[test]
    fn test_zero_liquidity_scores_zero() {
        let mut snap = snapshot();
        snap.liquidity.total = 0.0;
        let check = check_rug_risk(&snap);
        assert!(!check.passed);
        assert_eq!(check.score, 0.0);
        assert_eq!(check.risk_level(), RiskLevel::Critical);
    }
}
