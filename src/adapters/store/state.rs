//! Store state shared by the in-memory and JSON file stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Signal, SignalRule};
use crate::ports::{RuleQuery, SignalQuery, StoreError};

/// Whole store contents. Vectors are append-only; insertion order breaks
/// `created_at` ties so later inserts rank newer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub signals: Vec<Signal>,
    #[serde(default)]
    pub rules: Vec<SignalRule>,
}

impl StoreState {
    pub fn insert_signal(&mut self, signal: &Signal) -> Result<(), StoreError> {
        if self.signals.iter().any(|s| s.id == signal.id) {
            return Err(StoreError::Duplicate(signal.id.clone()));
        }
        self.signals.push(signal.clone());
        Ok(())
    }

    pub fn signal(&self, id: &str) -> Option<Signal> {
        self.signals.iter().find(|s| s.id == id).cloned()
    }

    /// Matching signals, newest first, truncated to the query limit
    pub fn signals_where<F>(&self, query: SignalQuery, predicate: F) -> Vec<Signal>
    where
        F: Fn(&Signal) -> bool,
    {
        let mut matched: Vec<Signal> = self
            .signals
            .iter()
            .rev()
            .filter(|s| predicate(s))
            .cloned()
            .collect();
        // Stable sort keeps reverse insertion order among equal timestamps
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        matched
    }

    /// Signals triggered at or after `since`, latest trigger first
    pub fn triggered_since(&self, since: DateTime<Utc>, query: SignalQuery) -> Vec<Signal> {
        let mut matched: Vec<Signal> = self
            .signals
            .iter()
            .rev()
            .filter(|s| s.triggered_at.is_some_and(|at| at >= since))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        matched
    }

    pub fn mark_triggered(&mut self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let signal = self
            .signals
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        signal.triggered_at = Some(at);
        Ok(())
    }

    pub fn insert_rule(&mut self, rule: &SignalRule) -> Result<(), StoreError> {
        if self.rules.iter().any(|r| r.id == rule.id) {
            return Err(StoreError::Duplicate(rule.id.clone()));
        }
        self.rules.push(rule.clone());
        Ok(())
    }

    pub fn rule(&self, id: &str) -> Option<SignalRule> {
        self.rules.iter().find(|r| r.id == id).cloned()
    }

    pub fn active_rules(&self) -> Vec<SignalRule> {
        self.rules_matching(&RuleQuery::default().enabled(true))
    }

    pub fn rules_matching(&self, query: &RuleQuery) -> Vec<SignalRule> {
        let mut matched: Vec<SignalRule> = self
            .rules
            .iter()
            .rev()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched
    }

    pub fn disable_rule(&mut self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        rule.enabled = false;
        rule.updated_at = at;
        Ok(())
    }
}
