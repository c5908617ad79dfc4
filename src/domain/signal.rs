use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::regime::MarketRegime;

/// Prefix of every signal id
pub const SIGNAL_ID_PREFIX: &str = "sig_";

/// Trade direction carried by a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
            Direction::Neutral => write!(f, "neutral"),
        }
    }
}

/// Directional bias reported by a heuristics source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl From<Bias> for Direction {
    fn from(bias: Bias) -> Self {
        match bias {
            Bias::Bullish => Direction::Long,
            Bias::Bearish => Direction::Short,
            Bias::Neutral => Direction::Neutral,
        }
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bias::Bullish => write!(f, "bullish"),
            Bias::Bearish => write!(f, "bearish"),
            Bias::Neutral => write!(f, "neutral"),
        }
    }
}

/// Suggested entry price band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryZone {
    pub low: f64,
    pub high: f64,
}

impl EntryZone {
    /// Midpoint of the zone, `None` when the zone is not a usable price band
    pub fn midpoint(&self) -> Option<f64> {
        let mid = (self.low + self.high) / 2.0;
        (self.low.is_finite() && self.high.is_finite() && self.low <= self.high && mid > 0.0)
            .then_some(mid)
    }
}

/// Externally supplied bias read on a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heuristics {
    pub bias: Bias,
    /// Raw confidence; not guaranteed to be inside [0, 1]
    pub confidence: f64,
    pub rsi_overbought: bool,
    pub rsi_oversold: bool,
    /// Width of the trading range as a fraction of price
    pub range_size: Option<f64>,
    pub entry_zone: Option<EntryZone>,
    /// Name of the heuristics source
    pub source: String,
}

/// Inputs the signal was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFeatures {
    /// Snapshot price at detection time
    pub price: f64,
    pub change_24h: f64,
    /// (high - low) / current
    pub range_ratio: f64,
    pub liquidity_usd: f64,
    pub volume_24h: f64,
    pub rsi_overbought: bool,
    pub rsi_oversold: bool,
    pub entry_zone: Option<EntryZone>,
    pub heuristic_source: String,
    pub provider: String,
}

/// Scored trading signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// "sig_" + uuid
    pub id: String,
    pub symbol: String,
    pub token_address: String,
    pub chain: String,
    /// Regime + heuristic combination label
    pub pattern: String,
    /// Clamped to [0, 1]
    pub confidence: f64,
    pub direction: Direction,
    pub thesis: String,
    pub regime: MarketRegime,
    pub features: SignalFeatures,
    /// Rule that produced this signal, if any
    pub rule_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
}

impl Signal {
    /// Fresh signal id
    pub fn new_id() -> String {
        format!("{}{}", SIGNAL_ID_PREFIX, Uuid::new_v4().simple())
    }

    /// Attach the rule that produced this signal
    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    /// Validates the signal meets basic criteria
    pub fn validate(&self) -> Result<(), String> {
        if !self.id.starts_with(SIGNAL_ID_PREFIX) {
            return Err(format!("Invalid signal id: {}", self.id));
        }

        if self.confidence.is_nan() || self.confidence < 0.0 || self.confidence > 1.0 {
            return Err(format!("Invalid confidence value: {}", self.confidence));
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_maps_to_direction() {
        assert_eq!(Direction::from(Bias::Bullish), Direction::Long);
        assert_eq!(Direction::from(Bias::Bearish), Direction::Short);
        assert_eq!(Direction::from(Bias::Neutral), Direction::Neutral);
    }

    #[test]
    fn test_signal_id_shape() {
        let id = Signal::new_id();
        assert!(id.starts_with(SIGNAL_ID_PREFIX));
        assert_eq!(id.len(), SIGNAL_ID_PREFIX.len() + 32);
        assert_ne!(id, Signal::new_id());
    }

    #[test]
    fn test_entry_zone_midpoint() {
        assert_eq!(EntryZone { low: 9.0, high: 11.0 }.midpoint(), Some(10.0));
        assert_eq!(EntryZone { low: 11.0, high: 9.0 }.midpoint(), None);
        assert_eq!(EntryZone { low: f64::NAN, high: 9.0 }.midpoint(), None);
        assert_eq!(EntryZone { low: 0.0, high: 0.0 }.midpoint(), None);
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        let json = serde_json::to_string(&Direction::Short).unwrap();
        assert_eq!(json, "\"short\"");
    }
}
