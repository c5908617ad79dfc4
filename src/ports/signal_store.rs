//! Signal store port
//!
//! Append-only persistence for signals and rules. The record layout is
//! load-bearing for reproducibility; the storage engine behind it is not.
//!
//! Lookups:
//! - signals: by `id`, `symbol`, `rule_id`, `pattern` (signal type), `triggered_at`
//! - rules: by `id`, `symbol`, `enabled`, `strategy`, `timeframe`, `created_at`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Signal, SignalRule};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Record already exists: {0}")]
    Duplicate(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Failed to serialize store: {0}")]
    Serialization(String),

    #[error("Failed to read or write store: {0}")]
    Io(String),

    #[error("Store file is corrupted: {0}")]
    Corrupted(String),
}

/// Optional result bounds for signal lookups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalQuery {
    /// Keep at most this many newest entries
    pub limit: Option<usize>,
}

impl SignalQuery {
    pub fn limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }
}

/// Rule filter; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleQuery {
    pub symbol: Option<String>,
    pub strategy: Option<String>,
    pub timeframe: Option<String>,
    pub enabled: Option<bool>,
}

impl RuleQuery {
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = Some(timeframe.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn matches(&self, rule: &SignalRule) -> bool {
        self.symbol.as_ref().map_or(true, |s| *s == rule.symbol)
            && self.strategy.as_ref().map_or(true, |s| *s == rule.strategy)
            && self.timeframe.as_ref().map_or(true, |t| *t == rule.timeframe)
            && self.enabled.map_or(true, |e| e == rule.enabled)
    }
}

#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Append a signal; ids are unique
    async fn create_signal(&self, signal: &Signal) -> Result<(), StoreError>;

    async fn get_signal(&self, id: &str) -> Result<Option<Signal>, StoreError>;

    /// Signals for a symbol, newest first
    async fn get_signals_for_symbol(
        &self,
        symbol: &str,
        query: SignalQuery,
    ) -> Result<Vec<Signal>, StoreError>;

    /// Signals produced by a rule, newest first
    async fn get_signals_for_rule(
        &self,
        rule_id: &str,
        query: SignalQuery,
    ) -> Result<Vec<Signal>, StoreError>;

    /// Signals of one pattern, newest first
    async fn get_signals_by_pattern(
        &self,
        pattern: &str,
        query: SignalQuery,
    ) -> Result<Vec<Signal>, StoreError>;

    /// Signals triggered at or after `since`, most recently triggered first
    async fn get_triggered_signals(
        &self,
        since: DateTime<Utc>,
        query: SignalQuery,
    ) -> Result<Vec<Signal>, StoreError>;

    /// Stamp `triggered_at` on an existing signal
    async fn mark_signal_triggered(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn create_rule(&self, rule: &SignalRule) -> Result<(), StoreError>;

    async fn get_rule(&self, id: &str) -> Result<Option<SignalRule>, StoreError>;

    /// Enabled rules only, newest first by `created_at`
    async fn get_active_rules(&self) -> Result<Vec<SignalRule>, StoreError>;

    /// Rules matching every set field of `query`, newest first by `created_at`
    async fn find_rules(&self, query: &RuleQuery) -> Result<Vec<SignalRule>, StoreError>;

    /// Soft-disable a rule and stamp `updated_at`
    async fn disable_rule(&self, id: &str) -> Result<(), StoreError>;
}
