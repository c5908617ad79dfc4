//! In-memory signal store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::state::StoreState;
use crate::domain::{Signal, SignalRule};
use crate::ports::{RuleQuery, SignalQuery, SignalStore, StoreError};

/// Process-local store. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct InMemorySignalStore {
    state: RwLock<StoreState>,
}

impl InMemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn signal_count(&self) -> usize {
        self.state.read().await.signals.len()
    }
}

#[async_trait]
impl SignalStore for InMemorySignalStore {
    async fn create_signal(&self, signal: &Signal) -> Result<(), StoreError> {
        self.state.write().await.insert_signal(signal)
    }

    async fn get_signal(&self, id: &str) -> Result<Option<Signal>, StoreError> {
        Ok(self.state.read().await.signal(id))
    }

    async fn get_signals_for_symbol(
        &self,
        symbol: &str,
        query: SignalQuery,
    ) -> Result<Vec<Signal>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .signals_where(query, |s| s.symbol == symbol))
    }

    async fn get_signals_for_rule(
        &self,
        rule_id: &str,
        query: SignalQuery,
    ) -> Result<Vec<Signal>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .signals_where(query, |s| s.rule_id.as_deref() == Some(rule_id)))
    }

    async fn get_signals_by_pattern(
        &self,
        pattern: &str,
        query: SignalQuery,
    ) -> Result<Vec<Signal>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .signals_where(query, |s| s.pattern == pattern))
    }

    async fn get_triggered_signals(
        &self,
        since: DateTime<Utc>,
        query: SignalQuery,
    ) -> Result<Vec<Signal>, StoreError> {
        Ok(self.state.read().await.triggered_since(since, query))
    }

    async fn mark_signal_triggered(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.state.write().await.mark_triggered(id, at)
    }

    async fn create_rule(&self, rule: &SignalRule) -> Result<(), StoreError> {
        self.state.write().await.insert_rule(rule)
    }

    async fn get_rule(&self, id: &str) -> Result<Option<SignalRule>, StoreError> {
        Ok(self.state.read().await.rule(id))
    }

    async fn get_active_rules(&self) -> Result<Vec<SignalRule>, StoreError> {
        Ok(self.state.read().await.active_rules())
    }

    async fn find_rules(&self, query: &RuleQuery) -> Result<Vec<SignalRule>, StoreError> {
        Ok(self.state.read().await.rules_matching(query))
    }

    async fn disable_rule(&self, id: &str) -> Result<(), StoreError> {
        self.state.write().await.disable_rule(id, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::fixtures;
    use chrono::Duration;
    use serde_json::json;

    #[tokio::test]
    async fn test_signals_newest_first_with_limit() {
        let store = InMemorySignalStore::new();
        let base = Utc::now();
        for offset in [0, 20, 10] {
            let signal = fixtures::signal_at("SOL", base + Duration::seconds(offset));
            store.create_signal(&signal).await.unwrap();
        }
        store
            .create_signal(&fixtures::signal_at("BONK", base + Duration::seconds(30)))
            .await
            .unwrap();

        let got = store
            .get_signals_for_symbol("SOL", SignalQuery::limit(2))
            .await
            .unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].created_at, base + Duration::seconds(20));
        assert_eq!(got[1].created_at, base + Duration::seconds(10));

        let all = store
            .get_signals_for_symbol("SOL", SignalQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_equal_timestamps_rank_later_insert_first() {
        let store = InMemorySignalStore::new();
        let at = Utc::now();
        let first = fixtures::signal_at("SOL", at);
        let second = fixtures::signal_at("SOL", at);
        store.create_signal(&first).await.unwrap();
        store.create_signal(&second).await.unwrap();

        let got = store
            .get_signals_for_symbol("SOL", SignalQuery::default())
            .await
            .unwrap();
        assert_eq!(got[0].id, second.id);
        assert_eq!(got[1].id, first.id);
    }

    #[tokio::test]
    async fn test_duplicate_signal_rejected() {
        let store = InMemorySignalStore::new();
        let signal = fixtures::signal_at("SOL", Utc::now());
        store.create_signal(&signal).await.unwrap();
        let err = store.create_signal(&signal).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate(signal.id.clone()));
        assert_eq!(store.signal_count().await, 1);
    }

    #[tokio::test]
    async fn test_mark_triggered() {
        let store = InMemorySignalStore::new();
        let signal = fixtures::signal_at("SOL", Utc::now());
        store.create_signal(&signal).await.unwrap();

        let at = Utc::now();
        store.mark_signal_triggered(&signal.id, at).await.unwrap();
        let got = store.get_signal(&signal.id).await.unwrap().unwrap();
        assert_eq!(got.triggered_at, Some(at));

        let err = store.mark_signal_triggered("sig_missing", at).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rule_and_pattern_lookups() {
        let store = InMemorySignalStore::new();
        let base = Utc::now();
        let a = fixtures::signal_at("SOL", base).with_rule("rule_a");
        let mut b = fixtures::signal_at("SOL", base + Duration::seconds(1));
        b.pattern = "no_edge".to_string();
        store.create_signal(&a).await.unwrap();
        store.create_signal(&b).await.unwrap();

        let by_rule = store
            .get_signals_for_rule("rule_a", SignalQuery::default())
            .await
            .unwrap();
        assert_eq!(by_rule.len(), 1);
        assert_eq!(by_rule[0].id, a.id);

        let by_pattern = store
            .get_signals_by_pattern("no_edge", SignalQuery::default())
            .await
            .unwrap();
        assert_eq!(by_pattern.len(), 1);
        assert_eq!(by_pattern[0].id, b.id);
    }

    #[tokio::test]
    async fn test_active_rules_exclude_disabled() {
        let store = InMemorySignalStore::new();
        let base = Utc::now() - Duration::minutes(5);
        let old = SignalRule::new("old", "SOL", "1h", "regime", json!({}))
            .with_created_at(base);
        let new = SignalRule::new("new", "SOL", "4h", "regime", json!({"min_confidence": 0.6}))
            .with_created_at(base + Duration::seconds(60));
        let off = SignalRule::new("off", "BONK", "1d", "regime", json!({}))
            .with_created_at(base + Duration::seconds(120));
        for rule in [&old, &new, &off] {
            store.create_rule(rule).await.unwrap();
        }

        store.disable_rule(&off.id).await.unwrap();

        let active = store.get_active_rules().await.unwrap();
        let names: Vec<&str> = active.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["new", "old"]);

        let disabled = store.get_rule(&off.id).await.unwrap().unwrap();
        assert!(!disabled.enabled);
        assert!(disabled.updated_at > disabled.created_at);
    }

    #[tokio::test]
    async fn test_disable_missing_rule() {
        let store = InMemorySignalStore::new();
        let err = store.disable_rule("rule_missing").await.unwrap_err();
        assert_eq!(err, StoreError::NotFound("rule_missing".to_string()));
    }

    #[tokio::test]
    async fn test_triggered_signals_since_latest_trigger_first() {
        let store = InMemorySignalStore::new();
        let base = Utc::now();
        let early = fixtures::signal_at("SOL", base);
        let late = fixtures::signal_at("BONK", base + Duration::seconds(1));
        let untouched = fixtures::signal_at("SOL", base + Duration::seconds(2));
        for signal in [&early, &late, &untouched] {
            store.create_signal(signal).await.unwrap();
        }

        store
            .mark_signal_triggered(&late.id, base + Duration::seconds(10))
            .await
            .unwrap();
        store
            .mark_signal_triggered(&early.id, base + Duration::seconds(20))
            .await
            .unwrap();

        let all = store
            .get_triggered_signals(base, SignalQuery::default())
            .await
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![early.id.as_str(), late.id.as_str()]);

        let recent = store
            .get_triggered_signals(base + Duration::seconds(15), SignalQuery::default())
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, early.id);

        let capped = store
            .get_triggered_signals(base, SignalQuery::limit(1))
            .await
            .unwrap();
        assert_eq!(capped[0].id, early.id);
    }

    #[tokio::test]
    async fn test_find_rules_by_symbol_strategy_timeframe() {
        let store = InMemorySignalStore::new();
        let base = Utc::now() - Duration::minutes(5);
        let sol_1h = SignalRule::new("sol-1h", "SOL", "1h", "regime", json!({}))
            .with_created_at(base);
        let sol_4h = SignalRule::new("sol-4h", "SOL", "4h", "regime", json!({}))
            .with_created_at(base + Duration::seconds(60));
        let sol_rug = SignalRule::new("sol-rug", "SOL", "1h", "rug_watch", json!({}))
            .with_created_at(base + Duration::seconds(120));
        let bonk = SignalRule::new("bonk-1h", "BONK", "1h", "regime", json!({}))
            .with_created_at(base + Duration::seconds(180));
        for rule in [&sol_1h, &sol_4h, &sol_rug, &bonk] {
            store.create_rule(rule).await.unwrap();
        }
        store.disable_rule(&sol_4h.id).await.unwrap();

        let names = |rules: Vec<SignalRule>| -> Vec<String> {
            rules.into_iter().map(|r| r.name).collect()
        };

        let sol = store.find_rules(&RuleQuery::default().symbol("SOL")).await.unwrap();
        assert_eq!(names(sol), vec!["sol-rug", "sol-4h", "sol-1h"]);

        let regime_1h = store
            .find_rules(&RuleQuery::default().strategy("regime").timeframe("1h"))
            .await
            .unwrap();
        assert_eq!(names(regime_1h), vec!["bonk-1h", "sol-1h"]);

        let disabled = store
            .find_rules(&RuleQuery::default().symbol("SOL").enabled(false))
            .await
            .unwrap();
        assert_eq!(names(disabled), vec!["sol-4h"]);

        let everything = store.find_rules(&RuleQuery::default()).await.unwrap();
        assert_eq!(everything.len(), 4);
    }
}
