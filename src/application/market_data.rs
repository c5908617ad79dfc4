//! Market Data Orchestrator
//!
//! Serves token snapshots through the SWR cache, falling back across
//! providers ranked by rolling health and latency.

use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::adapters::cache::{CacheConfig, CacheState, CacheStats, FetchOptions, SwrCache};
use crate::domain::{MarketSnapshot, ProviderHealth, ProviderHealthTracker, ProviderId};
use crate::ports::{
    AdapterError, MarketDataUnavailableError, ProviderAdapter, ProviderFailure, SnapshotParams,
    Telemetry, TelemetryAttributes,
};

/// Default per-call adapter timeout
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Telemetry event emitted once per `get_token_snapshot`
pub const SNAPSHOT_EVENT: &str = "market_data.get_token_snapshot";

/// How the chain walks its providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// One provider at a time in ranked order
    #[default]
    Sequential,
    /// All providers at once, first success wins
    Race,
}

/// Ranked, health-tracked set of provider adapters
pub struct ProviderChain {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    health: Arc<ProviderHealthTracker>,
    call_timeout: Duration,
    mode: FallbackMode,
}

impl ProviderChain {
    /// `adapters` order is the static tie-break order
    pub fn new(
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        health: Arc<ProviderHealthTracker>,
    ) -> Self {
        Self {
            adapters,
            health,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            mode: FallbackMode::Sequential,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_mode(mut self, mode: FallbackMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> FallbackMode {
        self.mode
    }

    pub fn health(&self) -> &Arc<ProviderHealthTracker> {
        &self.health
    }

    pub fn default_order(&self) -> Vec<ProviderId> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    /// Adapters in the order they would be tried right now
    pub fn ranked(&self) -> Vec<Arc<dyn ProviderAdapter>> {
        let mut pool: Vec<Option<Arc<dyn ProviderAdapter>>> =
            self.adapters.iter().cloned().map(Some).collect();
        let mut ordered = Vec::with_capacity(pool.len());

        for id in self.health.rank(&self.default_order()) {
            let slot = pool
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|a| a.id() == id));
            if let Some(adapter) = slot.and_then(Option::take) {
                ordered.push(adapter);
            }
        }
        ordered
    }

    /// Fetch from the first provider that succeeds
    pub async fn fetch(
        &self,
        params: &SnapshotParams,
    ) -> Result<MarketSnapshot, MarketDataUnavailableError> {
        let ranked = self.ranked();
        tracing::debug!(
            "Provider order for {}: {:?}",
            params.cache_key(),
            ranked.iter().map(|a| a.id().to_string()).collect::<Vec<_>>()
        );

        match self.mode {
            FallbackMode::Sequential => self.fetch_sequential(ranked, params).await,
            FallbackMode::Race => self.fetch_race(ranked, params).await,
        }
    }

    async fn fetch_sequential(
        &self,
        ranked: Vec<Arc<dyn ProviderAdapter>>,
        params: &SnapshotParams,
    ) -> Result<MarketSnapshot, MarketDataUnavailableError> {
        let mut causes = Vec::new();

        for adapter in ranked {
            let call =
                call_adapter(adapter, self.health.clone(), params.clone(), self.call_timeout);
            match call.await {
                Ok(snapshot) => return Ok(snapshot),
                Err(failure) => causes.push(failure),
            }
        }

        tracing::error!("All {} providers failed for {}", causes.len(), params.cache_key());
        Err(MarketDataUnavailableError { causes })
    }

    async fn fetch_race(
        &self,
        ranked: Vec<Arc<dyn ProviderAdapter>>,
        params: &SnapshotParams,
    ) -> Result<MarketSnapshot, MarketDataUnavailableError> {
        let mut attempts: FuturesUnordered<_> = ranked
            .into_iter()
            .enumerate()
            .map(|(rank, adapter)| {
                let call =
                    call_adapter(adapter, self.health.clone(), params.clone(), self.call_timeout);
                async move { (rank, call.await) }
            })
            .collect();

        let mut failed: Vec<(usize, ProviderFailure)> = Vec::new();
        loop {
            let Some((rank, outcome)) = attempts.next().await else {
                break;
            };
            match outcome {
                Ok(snapshot) => {
                    if !attempts.is_empty() {
                        tracing::debug!(
                            "Cancelling {} slower providers for {}",
                            attempts.len(),
                            params.cache_key()
                        );
                    }
                    // Dropping the set cancels the losers before they touch health
                    return Ok(snapshot);
                }
                Err(failure) => failed.push((rank, failure)),
            }
        }

        failed.sort_by_key(|(rank, _)| *rank);
        let causes: Vec<ProviderFailure> = failed.into_iter().map(|(_, f)| f).collect();
        tracing::error!("All {} providers failed for {}", causes.len(), params.cache_key());
        Err(MarketDataUnavailableError { causes })
    }
}

/// One timed, validated adapter call with health bookkeeping
async fn call_adapter(
    adapter: Arc<dyn ProviderAdapter>,
    health: Arc<ProviderHealthTracker>,
    params: SnapshotParams,
    call_timeout: Duration,
) -> Result<MarketSnapshot, ProviderFailure> {
    let provider = adapter.id();
    let started = Instant::now();

    let outcome = match tokio::time::timeout(call_timeout, adapter.fetch_snapshot(&params)).await {
        Ok(Ok(response)) => response
            .into_result()
            .and_then(|snapshot| snapshot.validate().map(|_| snapshot).map_err(AdapterError::from)),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(AdapterError::Timeout(call_timeout.as_millis() as u64)),
    };
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(snapshot) => {
            health.record_success(&provider, latency_ms);
            tracing::debug!("{} served {} in {:.1} ms", provider, params.cache_key(), latency_ms);
            Ok(snapshot)
        }
        Err(error) => {
            health.record_failure(&provider, &error.to_string(), latency_ms);
            tracing::warn!("Provider {} failed for {}: {}", provider, params.cache_key(), error);
            Err(ProviderFailure { provider, error })
        }
    }
}

/// Cached entry point for token snapshots
pub struct MarketDataOrchestrator {
    chain: Arc<ProviderChain>,
    cache: SwrCache<MarketSnapshot, MarketDataUnavailableError>,
    telemetry: Arc<dyn Telemetry>,
}

impl MarketDataOrchestrator {
    pub fn new(
        chain: ProviderChain,
        cache_config: CacheConfig,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            chain: Arc::new(chain),
            cache: SwrCache::with_config(cache_config),
            telemetry,
        }
    }

    /// Snapshot for one token, possibly served from cache
    pub async fn get_token_snapshot(
        &self,
        params: &SnapshotParams,
        options: FetchOptions,
    ) -> Result<MarketSnapshot, MarketDataUnavailableError> {
        let started = Instant::now();
        let key = params.cache_key();
        let cache_state = self.cache.get(&key).state;
        let cache_hit = cache_state.is_hit() && !options.force_refresh;

        let chain = self.chain.clone();
        let owned = params.clone();
        let result = self
            .cache
            .fetch(&key, move || async move { chain.fetch(&owned).await }, options)
            .await
            .map(|snapshot| if cache_hit { snapshot.into_cached() } else { snapshot });

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let provider = result.as_ref().ok().map(|s| s.metadata.provider.clone());
        self.emit(provider, cache_hit, cache_state, options.force_refresh, latency_ms);

        result
    }

    fn emit(
        &self,
        provider: Option<String>,
        cache_hit: bool,
        cache_state: CacheState,
        force_refresh: bool,
        latency_ms: f64,
    ) {
        let mut attributes = TelemetryAttributes::new();
        attributes.insert("providerId".to_string(), json!(provider));
        attributes.insert("cacheHit".to_string(), json!(cache_hit));
        attributes.insert("cacheState".to_string(), json!(cache_state.as_str()));
        attributes.insert("forceRefresh".to_string(), json!(force_refresh));
        attributes.insert("latencyMs".to_string(), json!(latency_ms));
        self.telemetry.log(SNAPSHOT_EVENT, latency_ms, &attributes);
    }

    pub fn provider_health(&self) -> Vec<ProviderHealth> {
        self.chain.health().get_all_health()
    }

    pub fn provider_order(&self) -> Vec<ProviderId> {
        self.chain.ranked().iter().map(|a| a.id()).collect()
    }

    pub fn reset_health(&self) {
        self.chain.health().reset();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
