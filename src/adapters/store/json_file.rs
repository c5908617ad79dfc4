//! JSON file signal store
//!
//! Loads the whole store on open and rewrites it after every mutation.
//! Writes go to a sibling temp file and are renamed into place, so a crash
//! mid-write leaves the previous contents intact.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::state::StoreState;
use crate::domain::{Signal, SignalRule};
use crate::ports::{RuleQuery, SignalQuery, SignalStore, StoreError};

/// Default store file name
pub const DEFAULT_STORE_FILE: &str = "signals.json";

#[derive(Debug)]
pub struct JsonFileSignalStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl JsonFileSignalStore {
    /// Open (or create on first write) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = Self::load(&path)?;
        info!(
            "Signal store opened: {} ({} signals, {} rules)",
            path.display(),
            state.signals.len(),
            state.rules.len()
        );
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<StoreState, StoreError> {
        if !path.exists() {
            return Ok(StoreState::default());
        }

        let content = fs::read_to_string(path).map_err(|e| StoreError::Io(e.to_string()))?;
        if content.trim().is_empty() {
            return Ok(StoreState::default());
        }

        serde_json::from_str(&content).map_err(|e| StoreError::Corrupted(e.to_string()))
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        debug!("Signal store written: {}", self.path.display());
        Ok(())
    }

    /// Apply `op` to a copy of the state; commit only once it is on disk
    async fn mutate<F>(&self, op: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StoreState) -> Result<(), StoreError>,
    {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        op(&mut next)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }
}

#[async_trait]
impl SignalStore for JsonFileSignalStore {
    async fn create_signal(&self, signal: &Signal) -> Result<(), StoreError> {
        self.mutate(|state| state.insert_signal(signal)).await
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
        self.mutate(|state| state.mark_triggered(id, at)).await
    }

    async fn create_rule(&self, rule: &SignalRule) -> Result<(), StoreError> {
        self.mutate(|state| state.insert_rule(rule)).await
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
        let now = Utc::now();
        self.mutate(|state| state.disable_rule(id, now)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::fixtures;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join(DEFAULT_STORE_FILE);

        let signal = fixtures::signal_at("SOL", Utc::now());
        let rule =
            SignalRule::new("sol trend", "SOL", "1h", "regime", json!({"min_confidence": 0.5}));
        {
            let store = JsonFileSignalStore::open(&path).unwrap();
            store.create_signal(&signal).await.unwrap();
            store.create_rule(&rule).await.unwrap();
            store.mark_signal_triggered(&signal.id, Utc::now()).await.unwrap();
        }

        let reopened = JsonFileSignalStore::open(&path).unwrap();
        let got = reopened.get_signal(&signal.id).await.unwrap().unwrap();
        assert_eq!(got.symbol, "SOL");
        assert!(got.triggered_at.is_some());
        assert_eq!(reopened.get_active_rules().await.unwrap().len(), 1);

        let triggered = reopened
            .get_triggered_signals(signal.created_at, SignalQuery::default())
            .await
            .unwrap();
        assert_eq!(triggered.len(), 1);
        let by_timeframe = reopened
            .find_rules(&RuleQuery::default().symbol("SOL").timeframe("1h"))
            .await
            .unwrap();
        assert_eq!(by_timeframe[0].id, rule.id);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_file_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_STORE_FILE);
        let store = JsonFileSignalStore::open(&path).unwrap();

        let signal = fixtures::signal_at("SOL", Utc::now());
        store.create_signal(&signal).await.unwrap();
        let before = fs::read_to_string(&path).unwrap();

        assert!(store.create_signal(&signal).await.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_open_missing_and_empty_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_STORE_FILE);
        assert!(JsonFileSignalStore::open(&path).is_ok());

        fs::write(&path, "   ").unwrap();
        assert!(JsonFileSignalStore::open(&path).is_ok());
    }

    #[test]
    fn test_open_corrupted_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_STORE_FILE);
        fs::write(&path, "{ invalid json }").unwrap();

        let err = JsonFileSignalStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupted(_)));
    }
}
