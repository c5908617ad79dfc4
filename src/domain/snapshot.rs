//! Market Snapshot
//!
//! Normalized point-in-time view of a traded token as returned by any
//! market-data provider. Snapshots are immutable value objects; the only
//! field touched after construction is `metadata.cached`, set by the
//! orchestrator when a value is served from cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Snapshot invariant violations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SnapshotError {
    #[error("Current price must be positive, got {0}")]
    NonPositivePrice(f64),

    #[error("24h high {high} is below 24h low {low}")]
    InvertedRange { high: f64, low: f64 },

    #[error("Non-finite value in field {0}")]
    NonFinite(&'static str),
}

/// Token identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    /// Contract / mint address
    pub address: String,
    /// Ticker symbol
    pub symbol: String,
    /// Chain identifier (e.g. "solana", "ethereum")
    pub chain: String,
    /// Token decimals, when the provider reports them
    #[serde(default)]
    pub decimals: Option<u8>,
}

/// Price block, all values in USD except `change_24h` (percent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceInfo {
    pub current: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    /// 24h change in percent (8.5 = +8.5%)
    pub change_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub volume_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityInfo {
    /// Total pooled liquidity in USD
    pub total: f64,
}

/// Provenance of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Provider that produced the data
    pub provider: String,
    /// When the provider produced the data
    pub timestamp: DateTime<Utc>,
    /// True when the value was served from cache
    pub cached: bool,
    /// Provider-reported confidence in [0, 1]
    pub confidence: f64,
}

/// Normalized market snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub token: TokenRef,
    pub price: PriceInfo,
    pub volume: VolumeInfo,
    pub liquidity: LiquidityInfo,
    pub metadata: SnapshotMetadata,
}

impl MarketSnapshot {
    /// Check the snapshot invariants (`current > 0`, `high >= low`, finite values)
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let fields = [
            ("price.current", self.price.current),
            ("price.high_24h", self.price.high_24h),
            ("price.low_24h", self.price.low_24h),
            ("price.change_24h", self.price.change_24h),
            ("volume.volume_24h", self.volume.volume_24h),
            ("liquidity.total", self.liquidity.total),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(SnapshotError::NonFinite(name));
            }
        }

        if self.price.current <= 0.0 {
            return Err(SnapshotError::NonPositivePrice(self.price.current));
        }

        if self.price.high_24h < self.price.low_24h {
            return Err(SnapshotError::InvertedRange {
                high: self.price.high_24h,
                low: self.price.low_24h,
            });
        }

        Ok(())
    }

    /// Intraday range as a fraction of the current price
    pub fn range_ratio(&self) -> f64 {
        if self.price.current > 0.0 {
            (self.price.high_24h - self.price.low_24h) / self.price.current
        } else {
            f64::INFINITY
        }
    }

    /// Position of the current price inside the 24h range (0 = low, 1 = high)
    pub fn range_position(&self) -> Option<f64> {
        let width = self.price.high_24h - self.price.low_24h;
        if width > 0.0 && width.is_finite() {
            Some(((self.price.current - self.price.low_24h) / width).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    /// Mark as served from cache
    pub fn into_cached(mut self) -> Self {
        self.metadata.cached = true;
        self
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Snapshot with a 4% range, +1% change and $250K liquidity
    pub fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            token: TokenRef {
                address: "So11111111111111111111111111111111111111112".to_string(),
                symbol: "SOL".to_string(),
                chain: "solana".to_string(),
                decimals: Some(9),
            },
            price: PriceInfo {
                current: 100.0,
                high_24h: 102.0,
                low_24h: 98.0,
                change_24h: 1.0,
            },
            volume: VolumeInfo { volume_24h: 400_000.0 },
            liquidity: LiquidityInfo { total: 250_000.0 },
            metadata: SnapshotMetadata {
                provider: "dexscreener".to_string(),
                timestamp: Utc::now(),
                cached: false,
                confidence: 0.9,
            },
        }
    }
}
