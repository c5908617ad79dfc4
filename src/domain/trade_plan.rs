//! Trade Plan
//!
//! Executable instructions derived from exactly one signal. The plan is
//! created in `Pending` status; execution tracking downstream owns every
//! later transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::signal::Direction;

/// Prefix of every plan id
pub const PLAN_ID_PREFIX: &str = "plan_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub price: f64,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanRisk {
    /// Stop price
    pub stop: f64,
    pub max_loss_usd: f64,
    pub pos_size_units: f64,
    /// Percent of equity at risk (1.0 = 1%)
    pub risk_pct_equity: f64,
}

/// One take-profit level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// 1-based level index
    pub tp: u8,
    pub price: f64,
    /// Reward in multiples of the stop distance
    pub r_multiple: f64,
    /// Fraction of the position closed at this level
    pub share: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanMetrics {
    /// First target distance / stop distance
    pub rr: f64,
    /// Expected value per trade in R units
    pub expectancy: f64,
    pub win_prob: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub label: String,
    pub done: bool,
}

impl ChecklistItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), done: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Pending,
    Active,
    Closed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    /// "plan_" + uuid
    pub id: String,
    pub signal_id: String,
    pub side: Direction,
    pub entry: Entry,
    pub risk: PlanRisk,
    pub targets: Vec<Target>,
    pub metrics: PlanMetrics,
    pub checklist: Vec<ChecklistItem>,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
}

impl TradePlan {
    pub fn new_id() -> String {
        format!("{}{}", PLAN_ID_PREFIX, Uuid::new_v4().simple())
    }

    /// Position notional at the entry price
    pub fn notional_usd(&self) -> f64 {
        self.risk.pos_size_units * self.entry.price
    }

    /// Scale the position down so its notional does not exceed `max_usd`.
    /// Returns true when the plan was resized.
    pub fn cap_notional(&mut self, max_usd: f64) -> bool {
        let notional = self.notional_usd();
        if !(max_usd >= 0.0) || notional <= max_usd || notional <= 0.0 {
            return false;
        }
        let scale = max_usd / notional;
        self.risk.pos_size_units *= scale;
        self.risk.max_loss_usd *= scale;
        self.risk.risk_pct_equity *= scale;
        self.checklist.push(ChecklistItem::new(format!(
            "Size capped to ${:.2} notional by pool liquidity",
            max_usd
        )));
        true
    }

    /// Sum of target shares
    pub fn total_target_share(&self) -> f64 {
        self.targets.iter().map(|t| t.share).sum()
    }
}
