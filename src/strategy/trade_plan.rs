//! Trade Plan Generator
//!
//! Turns one signal into an entry, a volatility-scaled stop, tiered
//! take-profits and a pre-trade checklist. Sizing risks a fixed percent of
//! equity on the stop distance:
//!
//! units = (equity * risk_pct / 100) / |entry - stop|

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    ChecklistItem, Direction, Entry, EntryType, LiquidityTier, PlanMetrics, PlanRisk, PlanStatus,
    Signal, Target, TradePlan, Trend, Volatility,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Equity must be positive, got {0}")]
    InvalidEquity(f64),

    #[error("Risk percent must be in (0, 100], got {0}")]
    InvalidRiskPct(f64),

    #[error("No usable entry price (price {0})")]
    InvalidEntry(f64),

    #[error("Invalid plan profile: {0}")]
    InvalidProfile(String),
}

/// Stop and target shape for a volatility bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolProfile {
    /// Stop distance as a fraction of entry
    pub stop_pct: f64,
    pub r_multiples: Vec<f64>,
    /// Exit share per target; must sum to <= 1
    pub shares: Vec<f64>,
}

impl VolProfile {
    fn validate(&self, name: &str) -> Result<(), String> {
        if !(self.stop_pct > 0.0 && self.stop_pct < 1.0) {
            return Err(format!("{}.stop_pct must be in (0, 1), got {}", name, self.stop_pct));
        }
        if self.r_multiples.is_empty() || self.r_multiples.len() != self.shares.len() {
            return Err(format!(
                "{}: r_multiples and shares must be non-empty and equal length",
                name
            ));
        }
        if self.r_multiples.iter().any(|r| !(*r > 0.0)) {
            return Err(format!("{}: r_multiples must be positive", name));
        }
        let total: f64 = self.shares.iter().sum();
        if self.shares.iter().any(|s| !(*s >= 0.0)) || total > 1.0 + 1e-9 {
            return Err(format!(
                "{}: shares must be non-negative and sum to <= 1, got {}",
                name, total
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    pub low_vol: VolProfile,
    pub mid_vol: VolProfile,
    pub high_vol: VolProfile,
    /// Win probability floor / ceiling
    pub min_win_prob: f64,
    pub max_win_prob: f64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            low_vol: VolProfile {
                stop_pct: 0.02,
                r_multiples: vec![1.2, 2.0],
                shares: vec![0.6, 0.4],
            },
            mid_vol: VolProfile {
                stop_pct: 0.04,
                r_multiples: vec![1.5, 2.5, 4.0],
                shares: vec![0.5, 0.3, 0.2],
            },
            high_vol: VolProfile {
                stop_pct: 0.08,
                r_multiples: vec![1.5, 3.0, 5.0],
                shares: vec![0.5, 0.3, 0.2],
            },
            min_win_prob: 0.05,
            max_win_prob: 0.95,
        }
    }
}

impl PlanConfig {
    pub fn profile(&self, vol: Volatility) -> &VolProfile {
        match vol {
            Volatility::Low => &self.low_vol,
            Volatility::Mid => &self.mid_vol,
            Volatility::High => &self.high_vol,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.low_vol.validate("low_vol")?;
        self.mid_vol.validate("mid_vol")?;
        self.high_vol.validate("high_vol")?;

        let bounds_ok = 0.0 <= self.min_win_prob
            && self.min_win_prob <= self.max_win_prob
            && self.max_win_prob <= 1.0;
        if !bounds_ok {
            return Err("win probability bounds must satisfy 0 <= min <= max <= 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TradePlanGenerator {
    config: PlanConfig,
}

impl TradePlanGenerator {
    /// Generator over a validated config
    pub fn new(config: PlanConfig) -> Result<Self, PlanError> {
        config.validate().map_err(PlanError::InvalidProfile)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Build a pending plan risking `risk_pct` percent of `equity_usd`
    pub fn generate(
        &self,
        signal: &Signal,
        equity_usd: f64,
        risk_pct: f64,
    ) -> Result<TradePlan, PlanError> {
        if !(equity_usd > 0.0) || !equity_usd.is_finite() {
            return Err(PlanError::InvalidEquity(equity_usd));
        }
        if !(risk_pct > 0.0 && risk_pct <= 100.0) {
            return Err(PlanError::InvalidRiskPct(risk_pct));
        }

        let entry = match signal.features.entry_zone.and_then(|z| z.midpoint()) {
            Some(mid) => Entry { price: mid, entry_type: EntryType::Limit },
            None => Entry { price: signal.features.price, entry_type: EntryType::Market },
        };
        if !(entry.price > 0.0) || !entry.price.is_finite() {
            return Err(PlanError::InvalidEntry(entry.price));
        }

        // Neutral signals get long-side levels and a confirmation gate
        let side = signal.direction;
        let sign = if side == Direction::Short { -1.0 } else { 1.0 };

        let profile = self.config.profile(signal.regime.vol);
        let stop_distance = entry.price * profile.stop_pct;
        let stop = entry.price - sign * stop_distance;

        let max_loss_usd = equity_usd * risk_pct / 100.0;
        let pos_size_units = max_loss_usd / stop_distance;

        let targets: Vec<Target> = profile
            .r_multiples
            .iter()
            .zip(&profile.shares)
            .enumerate()
            .map(|(i, (r, share))| Target {
                tp: (i + 1) as u8,
                price: entry.price + sign * r * stop_distance,
                r_multiple: *r,
                share: *share,
            })
            .collect();

        let metrics = self.metrics(signal.confidence, &targets);
        let checklist = checklist(signal);

        let plan = TradePlan {
            id: TradePlan::new_id(),
            signal_id: signal.id.clone(),
            side,
            entry,
            risk: PlanRisk {
                stop,
                max_loss_usd,
                pos_size_units,
                risk_pct_equity: risk_pct,
            },
            targets,
            metrics,
            checklist,
            status: PlanStatus::Pending,
            created_at: Utc::now(),
        };

        tracing::info!(
            "Plan {} for {}: {} @ {:.6} stop {:.6} size {:.4} units (rr {:.2}, win {:.0}%)",
            plan.id,
            signal.symbol,
            plan.side,
            plan.entry.price,
            plan.risk.stop,
            plan.risk.pos_size_units,
            plan.metrics.rr,
            plan.metrics.win_prob * 100.0
        );

        Ok(plan)
    }

    fn metrics(&self, confidence: f64, targets: &[Target]) -> PlanMetrics {
        let rr = targets.first().map(|t| t.r_multiple).unwrap_or(0.0);
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };

        let win_prob = (0.3 + 0.4 * confidence - 0.05 * (rr - 1.0))
            .clamp(self.config.min_win_prob, self.config.max_win_prob);

        // Share-weighted reward; any unallocated share exits at 1R
        let allocated: f64 = targets.iter().map(|t| t.share).sum();
        let weighted: f64 = targets.iter().map(|t| t.share * t.r_multiple).sum();
        let avg_r = weighted + (1.0 - allocated).max(0.0);

        PlanMetrics {
            rr,
            expectancy: win_prob * avg_r - (1.0 - win_prob),
            win_prob,
        }
    }
}

fn checklist(signal: &Signal) -> Vec<ChecklistItem> {
    let mut items = vec![
        ChecklistItem::new("Confirm snapshot price is current before entry"),
        ChecklistItem::new("Place stop order together with entry"),
    ];

    if signal.direction == Direction::Neutral {
        items.push(ChecklistItem::new("No directional bias: wait for confirmation"));
    }

    match (signal.regime.trend, signal.direction) {
        (Trend::Up, Direction::Short) | (Trend::Down, Direction::Long) => {
            items.push(ChecklistItem::new("Counter-trend: wait for reversal structure"));
        }
        (Trend::Side, _) => {
            items.push(ChecklistItem::new("Range regime: fade edges, cut on breakout"));
        }
        _ => {}
    }

    match signal.regime.vol {
        Volatility::High => {
            items.push(ChecklistItem::new("High volatility: wide stop, consider half size"));
        }
        Volatility::Low => {
            items.push(ChecklistItem::new("Low volatility: avoid chasing, use limit entry"));
        }
        Volatility::Mid => {}
    }

    if signal.regime.liquidity == LiquidityTier::Low {
        items.push(ChecklistItem::new("Thin liquidity: check slippage on size"));
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::fixtures;
    use crate::domain::{EntryZone, MarketRegime};
    use approx::assert_relative_eq;
    use chrono::Utc;

    fn signal() -> Signal {
        fixtures::signal_at("SOL", Utc::now())
    }

    #[test]
    fn test_generates_pending_plan_with_positive_rr() {
        let plan = TradePlanGenerator::default().generate(&signal(), 10_000.0, 1.0).unwrap();

        assert_eq!(plan.status, PlanStatus::Pending);
        assert!(plan.id.starts_with("plan_"));
        assert!(plan.metrics.rr > 0.5 && plan.metrics.rr < 10.0);
        assert!(!plan.checklist.is_empty());
        assert!(plan.total_target_share() <= 1.0 + 1e-9);
        assert!(plan.metrics.win_prob > 0.0 && plan.metrics.win_prob < 1.0);
    }

    #[test]
    fn test_limit_entry_from_zone_and_sizing() {
        // Zone 98..100 -> limit at 99, mid vol stop 4%
        let plan = TradePlanGenerator::default().generate(&signal(), 10_000.0, 1.0).unwrap();

        assert_eq!(plan.entry.entry_type, EntryType::Limit);
        assert_relative_eq!(plan.entry.price, 99.0);
        assert_relative_eq!(plan.risk.stop, 99.0 - 3.96, epsilon = 1e-9);
        assert_relative_eq!(plan.risk.max_loss_usd, 100.0);
        assert_relative_eq!(plan.risk.pos_size_units, 100.0 / 3.96, epsilon = 1e-9);
        assert_eq!(plan.targets.len(), 3);
        assert_relative_eq!(plan.targets[0].price, 99.0 + 1.5 * 3.96, epsilon = 1e-9);
        assert_relative_eq!(plan.metrics.rr, 1.5);
    }

    #[test]
    fn test_market_entry_without_zone() {
        let mut s = signal();
        s.features.entry_zone = None;
        let plan = TradePlanGenerator::default().generate(&s, 5_000.0, 2.0).unwrap();
        assert_eq!(plan.entry.entry_type, EntryType::Market);
        assert_eq!(plan.entry.price, 100.0);
    }

    #[test]
    fn test_short_levels_are_mirrored() {
        let mut s = signal();
        s.direction = Direction::Short;
        s.features.entry_zone = Some(EntryZone { low: 100.0, high: 100.0 });
        let plan = TradePlanGenerator::default().generate(&s, 10_000.0, 1.0).unwrap();
        assert!(plan.risk.stop > plan.entry.price);
        assert!(plan.targets.iter().all(|t| t.price < plan.entry.price));
    }

    #[test]
    fn test_high_vol_widens_stop() {
        let mut s = signal();
        s.regime = MarketRegime { vol: Volatility::High, ..s.regime };
        let wide = TradePlanGenerator::default().generate(&s, 10_000.0, 1.0).unwrap();
        let normal = TradePlanGenerator::default().generate(&signal(), 10_000.0, 1.0).unwrap();
        assert!(wide.entry.price - wide.risk.stop > normal.entry.price - normal.risk.stop);
        assert!(wide.risk.pos_size_units < normal.risk.pos_size_units);
        assert!(wide.checklist.iter().any(|c| c.label.starts_with("High volatility")));
    }

    #[test]
    fn test_neutral_signal_waits_for_confirmation() {
        let mut s = signal();
        s.direction = Direction::Neutral;
        let plan = TradePlanGenerator::default().generate(&s, 10_000.0, 1.0).unwrap();
        assert_eq!(plan.side, Direction::Neutral);
        assert!(plan.risk.stop < plan.entry.price);
        assert!(plan
            .checklist
            .iter()
            .any(|c| c.label == "No directional bias: wait for confirmation"));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let gen = TradePlanGenerator::default();
        assert_eq!(gen.generate(&signal(), 0.0, 1.0), Err(PlanError::InvalidEquity(0.0)));
        assert_eq!(gen.generate(&signal(), 1_000.0, 0.0), Err(PlanError::InvalidRiskPct(0.0)));
        assert_eq!(gen.generate(&signal(), 1_000.0, 150.0), Err(PlanError::InvalidRiskPct(150.0)));

        let mut s = signal();
        s.features.entry_zone = None;
        s.features.price = 0.0;
        assert_eq!(gen.generate(&s, 1_000.0, 1.0), Err(PlanError::InvalidEntry(0.0)));
    }

    #[test]
    fn test_expectancy_tracks_confidence() {
        let gen = TradePlanGenerator::default();
        let mut low = signal();
        low.confidence = 0.1;
        let mut high = signal();
        high.confidence = 0.9;
        let low_plan = gen.generate(&low, 10_000.0, 1.0).unwrap();
        let high_plan = gen.generate(&high, 10_000.0, 1.0).unwrap();
        assert!(high_plan.metrics.win_prob > low_plan.metrics.win_prob);
        assert!(high_plan.metrics.expectancy > low_plan.metrics.expectancy);
    }

    #[test]
    fn test_cap_notional_scales_position() {
        let mut plan = TradePlanGenerator::default().generate(&signal(), 10_000.0, 1.0).unwrap();
        let before = plan.notional_usd();
        let checklist_len = plan.checklist.len();

        assert!(plan.cap_notional(before / 2.0));
        assert_relative_eq!(plan.notional_usd(), before / 2.0, epsilon = 1e-6);
        assert_relative_eq!(plan.risk.max_loss_usd, 50.0, epsilon = 1e-9);
        assert_eq!(plan.checklist.len(), checklist_len + 1);

        assert!(!plan.cap_notional(before * 10.0));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(PlanConfig::default().validate().is_ok());
        let mut bad = PlanConfig::default();
        bad.mid_vol.shares = vec![0.7, 0.7, 0.2];
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_generator_rejects_unusable_profiles() {
        let mut no_targets = PlanConfig::default();
        no_targets.mid_vol.r_multiples.clear();
        no_targets.mid_vol.shares.clear();
        assert!(matches!(
            TradePlanGenerator::new(no_targets),
            Err(PlanError::InvalidProfile(_))
        ));

        let mut full_stop = PlanConfig::default();
        full_stop.high_vol.stop_pct = 1.0;
        assert!(matches!(
            TradePlanGenerator::new(full_stop),
            Err(PlanError::InvalidProfile(_))
        ));

        let mut zero_r = PlanConfig::default();
        zero_r.low_vol.r_multiples[0] = 0.0;
        assert!(TradePlanGenerator::new(zero_r).is_err());

        assert!(TradePlanGenerator::new(PlanConfig::default()).is_ok());
    }
}
