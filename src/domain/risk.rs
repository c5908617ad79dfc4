use serde::{Deserialize, Serialize};
use std::fmt;

/// Hard risk findings. Any flag fails the check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RiskFlag {
    /// Pool liquidity under the configured floor
    LowLiquidity { liquidity_usd: f64, minimum_usd: f64 },
    /// 24h volume is an implausible multiple of pool liquidity (wash trading)
    VolumeLiquidityMismatch { ratio: f64, maximum: f64 },
    /// Price collapsed by more than the configured fraction in 24h
    PriceCollapse { change_24h_pct: f64 },
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskFlag::LowLiquidity { liquidity_usd, minimum_usd } => write!(
                f,
                "Low liquidity: ${:.0} < ${:.0} minimum",
                liquidity_usd, minimum_usd
            ),
            RiskFlag::VolumeLiquidityMismatch { ratio, maximum } => write!(
                f,
                "Volume/liquidity {:.1}x exceeds {:.1}x",
                ratio, maximum
            ),
            RiskFlag::PriceCollapse { change_24h_pct } => {
                write!(f, "Price collapse: {:.1}% in 24h", change_24h_pct)
            }
        }
    }
}

/// Risk level derived from a check score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Map a safety score in [0, 1] (1 = safest) to a level
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            RiskLevel::Safe
        } else if score >= 0.7 {
            RiskLevel::Low
        } else if score >= 0.5 {
            RiskLevel::Medium
        } else if score >= 0.25 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    /// Returns a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "Token appears safe based on analyzed metrics",
            RiskLevel::Low => "Minor risk factors detected, proceed with caution",
            RiskLevel::Medium => "Moderate risk factors, consider smaller position",
            RiskLevel::High => "Significant rug pull indicators, avoid if possible",
            RiskLevel::Critical => "Critical risk - likely scam or rug pull",
        }
    }
}

/// Outcome of a risk gate. Failures are data, never errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCheck {
    pub passed: bool,
    /// Safety score in [0, 1]
    pub score: f64,
    pub flags: Vec<RiskFlag>,
    pub warnings: Vec<String>,
}

impl RiskCheck {
    /// Build a check; `passed` is derived from the flags
    pub fn new(score: f64, flags: Vec<RiskFlag>, warnings: Vec<String>) -> Self {
        let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            passed: flags.is_empty(),
            score,
            flags,
            warnings,
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.score)
    }
}
