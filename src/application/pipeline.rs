//! Signal Pipeline
//!
//! One pass per token:
//! snapshot -> regime -> rug check -> heuristics -> signal -> store ->
//! plan (rug check passed only) -> liquidity check / size cap.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::adapters::cache::FetchOptions;
use crate::domain::{
    LiquidityCheck, LiquidityGuard, LiquidityGuardConfig, MarketRegime, MarketSnapshot, RiskCheck,
    RugRiskChecker, RugRiskConfig, Signal, SignalRule, TradePlan,
};
use crate::ports::{
    HeuristicsSource, MarketDataUnavailableError, SignalStore, SnapshotParams, StoreError,
};
use crate::strategy::{
    PlanConfig, PlanError, RegimeDetector, RegimeThresholds, SignalDetector, TradePlanGenerator,
};

use super::market_data::MarketDataOrchestrator;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    MarketData(#[from] MarketDataUnavailableError),

    #[error("Signal store error: {0}")]
    Store(#[from] StoreError),

    #[error("Trade plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("Rule {0} has no token target (params.address / params.chain)")]
    RuleTarget(String),
}

/// Account inputs for plan sizing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountRisk {
    pub equity_usd: f64,
    /// Percent of equity risked per plan (1.0 = 1%)
    pub risk_pct: f64,
}

impl Default for AccountRisk {
    fn default() -> Self {
        Self {
            equity_usd: 10_000.0,
            risk_pct: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub snapshot: MarketSnapshot,
    pub regime: MarketRegime,
    pub rug_check: RiskCheck,
    pub signal: Signal,
    /// Present only when the rug check passed
    pub plan: Option<TradePlan>,
    /// Liquidity check against the plan notional
    pub liquidity_check: Option<LiquidityCheck>,
}

pub struct SignalPipeline {
    market_data: Arc<MarketDataOrchestrator>,
    heuristics: Arc<dyn HeuristicsSource>,
    store: Arc<dyn SignalStore>,
    regime: RegimeDetector,
    rug: RugRiskChecker,
    liquidity: LiquidityGuard,
    detector: SignalDetector,
    planner: TradePlanGenerator,
    account: AccountRisk,
}

impl SignalPipeline {
    pub fn new(
        market_data: Arc<MarketDataOrchestrator>,
        heuristics: Arc<dyn HeuristicsSource>,
        store: Arc<dyn SignalStore>,
        account: AccountRisk,
    ) -> Self {
        Self {
            market_data,
            heuristics,
            store,
            regime: RegimeDetector::default(),
            rug: RugRiskChecker::new(),
            liquidity: LiquidityGuard::new(),
            detector: SignalDetector::new(),
            planner: TradePlanGenerator::default(),
            account,
        }
    }

    pub fn with_regime_thresholds(mut self, thresholds: RegimeThresholds) -> Self {
        self.regime = RegimeDetector::new(thresholds);
        self
    }

    pub fn with_rug_config(mut self, config: RugRiskConfig) -> Self {
        self.rug = RugRiskChecker::with_config(config);
        self
    }

    pub fn with_liquidity_config(mut self, config: LiquidityGuardConfig) -> Self {
        self.liquidity = LiquidityGuard::with_config(config);
        self
    }

    pub fn with_plan_config(mut self, config: PlanConfig) -> Result<Self, PipelineError> {
        self.planner = TradePlanGenerator::new(config)?;
        Ok(self)
    }

    pub fn market_data(&self) -> &Arc<MarketDataOrchestrator> {
        &self.market_data
    }

    pub fn store(&self) -> &Arc<dyn SignalStore> {
        &self.store
    }

    /// Run one pass for a token
    pub async fn run(
        &self,
        params: &SnapshotParams,
        options: FetchOptions,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.run_inner(params, options, None).await
    }

    /// Run one pass for the token a rule targets, tagging the signal with the rule id
    pub async fn run_rule(&self, rule: &SignalRule) -> Result<PipelineOutcome, PipelineError> {
        let params = rule_target(rule).ok_or_else(|| PipelineError::RuleTarget(rule.id.clone()))?;
        self.run_inner(&params, FetchOptions::default(), Some(rule.id.as_str()))
            .await
    }

    /// Run every enabled rule; failures are reported per rule
    pub async fn run_active_rules(
        &self,
    ) -> Result<Vec<(SignalRule, Result<PipelineOutcome, PipelineError>)>, PipelineError> {
        let rules = self.store.get_active_rules().await?;
        tracing::info!("Running {} active rules", rules.len());

        let mut results = Vec::with_capacity(rules.len());
        for rule in rules {
            let outcome = self.run_rule(&rule).await;
            if let Err(e) = &outcome {
                tracing::warn!("Rule {} ({}) failed: {}", rule.name, rule.id, e);
            }
            results.push((rule, outcome));
        }
        Ok(results)
    }

    async fn run_inner(
        &self,
        params: &SnapshotParams,
        options: FetchOptions,
        rule_id: Option<&str>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let snapshot = self.market_data.get_token_snapshot(params, options).await?;
        let regime = self.regime.detect(&snapshot);
        let rug_check = self.rug.check(&snapshot);
        let heuristics = self.heuristics.evaluate(&snapshot);

        let mut signal = self.detector.detect(&snapshot, &heuristics, regime);
        if let Some(rule_id) = rule_id {
            signal = signal.with_rule(rule_id);
        }
        self.store.create_signal(&signal).await?;

        tracing::info!(
            "{} {} conf {:.2} [{}] risk {} ({:.2})",
            signal.symbol,
            signal.pattern,
            signal.confidence,
            regime,
            rug_check.risk_level().description(),
            rug_check.score
        );

        let (plan, liquidity_check) = if rug_check.passed {
            let mut plan = self
                .planner
                .generate(&signal, self.account.equity_usd, self.account.risk_pct)?;
            let check = self.liquidity.check(&snapshot, plan.notional_usd());
            if !check.passed && plan.cap_notional(check.max_safe_size) {
                tracing::warn!(
                    "Plan {} capped to ${:.2} by liquidity ({})",
                    plan.id,
                    check.max_safe_size,
                    check.warnings.join("; ")
                );
            }
            (Some(plan), Some(check))
        } else {
            tracing::warn!(
                "No plan for {}: rug check failed ({} flags)",
                signal.symbol,
                rug_check.flags.len()
            );
            (None, None)
        };

        Ok(PipelineOutcome {
            snapshot,
            regime,
            rug_check,
            signal,
            plan,
            liquidity_check,
        })
    }
}

/// Token target stored in a rule's params: `{"address": .., "chain": ..}`
pub fn rule_target(rule: &SignalRule) -> Option<SnapshotParams> {
    let address = rule.params.get("address")?.as_str()?;
    let chain = rule.params.get("chain").and_then(|c| c.as_str()).unwrap_or("solana");
    Some(SnapshotParams::new(address, chain).with_symbol(rule.symbol.clone()))
}
