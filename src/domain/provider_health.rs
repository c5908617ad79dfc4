//! Provider Health Tracker
//!
//! Rolling per-provider health used to order the fallback chain.
//!
//! Each provider carries an exponentially weighted success rate and an EWMA of
//! call latency, both updated as `x += (1 - decay) * (sample - x)`. A provider
//! with no observations defaults to a score of 1.0 and unknown latency, so it
//! ranks ahead of providers with a failure record but behind an equally
//! scored provider with measured latency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Default EWMA decay
pub const DEFAULT_HEALTH_DECAY: f64 = 0.9;

/// Provider identifier, e.g. "dexscreener"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProviderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health tracker configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Weight kept by the previous value on each update, in (0, 1)
    pub decay: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { decay: DEFAULT_HEALTH_DECAY }
    }
}

/// Health view of one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider: ProviderId,
    /// EWMA success rate in [0, 1]
    pub health_score: f64,
    /// EWMA latency; `None` until the first observation
    pub average_latency_ms: Option<f64>,
    pub successes: u64,
    pub failures: u64,
    pub last_error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ProviderHealth {
    /// Defaults for a provider with no observations
    pub fn unseen(provider: ProviderId) -> Self {
        Self {
            provider,
            health_score: 1.0,
            average_latency_ms: None,
            successes: 0,
            failures: 0,
            last_error: None,
            last_updated: None,
        }
    }

    fn latency_rank(&self) -> f64 {
        self.average_latency_ms.unwrap_or(f64::INFINITY)
    }
}

/// Rolling health and latency per provider
#[derive(Debug, Default)]
pub struct ProviderHealthTracker {
    config: HealthConfig,
    providers: Mutex<HashMap<ProviderId, ProviderHealth>>,
}

impl ProviderHealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a custom decay; values outside (0, 1) fall back to the default
    pub fn with_config(config: HealthConfig) -> Self {
        let decay = if config.decay > 0.0 && config.decay < 1.0 {
            config.decay
        } else {
            tracing::warn!(
                "Invalid health decay {}, using {}",
                config.decay,
                DEFAULT_HEALTH_DECAY
            );
            DEFAULT_HEALTH_DECAY
        };
        Self {
            config: HealthConfig { decay },
            providers: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> HealthConfig {
        self.config
    }

    pub fn record_success(&self, provider: &ProviderId, latency_ms: f64) {
        self.record(provider, 1.0, latency_ms, None);
    }

    pub fn record_failure(&self, provider: &ProviderId, error: &str, latency_ms: f64) {
        self.record(provider, 0.0, latency_ms, Some(error));
    }

    fn record(&self, provider: &ProviderId, outcome: f64, latency_ms: f64, error: Option<&str>) {
        let alpha = 1.0 - self.config.decay;
        let mut providers = self.providers.lock().unwrap_or_else(PoisonError::into_inner);
        let health = providers
            .entry(provider.clone())
            .or_insert_with(|| ProviderHealth::unseen(provider.clone()));

        health.health_score = (health.health_score + alpha * (outcome - health.health_score))
            .clamp(0.0, 1.0);

        if latency_ms.is_finite() && latency_ms >= 0.0 {
            health.average_latency_ms = Some(match health.average_latency_ms {
                Some(avg) => avg + alpha * (latency_ms - avg),
                None => latency_ms,
            });
        }

        match error {
            Some(message) => {
                health.failures += 1;
                health.last_error = Some(message.to_string());
            }
            None => health.successes += 1,
        }
        health.last_updated = Some(Utc::now());

        tracing::debug!(
            "Provider {} health {:.3}, latency {:?} ms ({} ok / {} failed)",
            provider,
            health.health_score,
            health.average_latency_ms,
            health.successes,
            health.failures
        );
    }

    /// Health of one provider (defaults when unseen)
    pub fn health_of(&self, provider: &ProviderId) -> ProviderHealth {
        self.providers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider)
            .cloned()
            .unwrap_or_else(|| ProviderHealth::unseen(provider.clone()))
    }

    /// All observed providers, ordered by id
    pub fn get_all_health(&self) -> Vec<ProviderHealth> {
        let mut all: Vec<ProviderHealth> = self
            .providers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.provider.cmp(&b.provider));
        all
    }

    /// Order providers by score (desc), then average latency (asc, unknown
    /// last), then their position in `default_order`.
    pub fn rank(&self, default_order: &[ProviderId]) -> Vec<ProviderId> {
        let mut ranked: Vec<ProviderHealth> =
            default_order.iter().map(|p| self.health_of(p)).collect();

        // sort_by is stable, so default order breaks remaining ties
        ranked.sort_by(|a, b| {
            b.health_score
                .total_cmp(&a.health_score)
                .then_with(|| a.latency_rank().total_cmp(&b.latency_rank()))
        });

        ranked.into_iter().map(|h| h.provider).collect()
    }

    /// Forget all observations
    pub fn reset(&self) {
        self.providers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::info!("Provider health reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ids(names: &[&str]) -> Vec<ProviderId> {
        names.iter().map(|n| ProviderId::from(*n)).collect()
    }

    #[test]
    fn test_unseen_defaults() {
        let tracker = ProviderHealthTracker::new();
        let health = tracker.health_of(&"moralis".into());
        assert_eq!(health.health_score, 1.0);
        assert!(health.average_latency_ms.is_none());
        assert!(tracker.get_all_health().is_empty());
    }

    #[test]
    fn test_ewma_updates() {
        let tracker = ProviderHealthTracker::new();
        let p = ProviderId::from("dexscreener");

        tracker.record_failure(&p, "timeout", 200.0);
        let health = tracker.health_of(&p);
        assert_relative_eq!(health.health_score, 0.9, epsilon = 1e-12);
        assert_relative_eq!(health.average_latency_ms.unwrap(), 200.0);
        assert_eq!(health.last_error.as_deref(), Some("timeout"));

        tracker.record_success(&p, 100.0);
        let health = tracker.health_of(&p);
        assert_relative_eq!(health.health_score, 0.91, epsilon = 1e-12);
        assert_relative_eq!(health.average_latency_ms.unwrap(), 190.0, epsilon = 1e-9);
        assert_eq!(health.successes, 1);
        assert_eq!(health.failures, 1);
    }

    #[test]
    fn test_score_stays_bounded() {
        let tracker = ProviderHealthTracker::with_config(HealthConfig { decay: 0.5 });
        let p = ProviderId::from("moralis");
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        for _ in 0..1_000 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            if seed >> 63 == 1 {
                tracker.record_success(&p, (seed % 500) as f64);
            } else {
                tracker.record_failure(&p, "boom", (seed % 500) as f64);
            }
            let score = tracker.health_of(&p).health_score;
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_rank_orders_by_score() {
        let tracker = ProviderHealthTracker::new();
        let order = ids(&["moralis", "dexpaprika", "dexscreener"]);
        tracker.record_failure(&order[0], "500", 50.0);

        let ranked = tracker.rank(&order);
        assert_eq!(ranked, ids(&["dexpaprika", "dexscreener", "moralis"]));
    }

    #[test]
    fn test_rank_breaks_ties_by_latency() {
        let tracker = ProviderHealthTracker::new();
        let order = ids(&["moralis", "dexpaprika", "dexscreener"]);
        tracker.record_success(&order[0], 300.0);
        tracker.record_success(&order[1], 80.0);

        // equal scores: measured latency first, unseen last
        let ranked = tracker.rank(&order);
        assert_eq!(ranked, ids(&["dexpaprika", "moralis", "dexscreener"]));
    }

    #[test]
    fn test_rank_keeps_default_order_on_full_tie() {
        let tracker = ProviderHealthTracker::new();
        let order = ids(&["moralis", "dexpaprika", "dexscreener"]);
        assert_eq!(tracker.rank(&order), order);

        for p in &order {
            tracker.record_success(p, 120.0);
        }
        assert_eq!(tracker.rank(&order), order);
    }

    #[test]
    fn test_reset_clears_observations() {
        let tracker = ProviderHealthTracker::new();
        let p = ProviderId::from("moralis");
        tracker.record_failure(&p, "down", 10.0);
        tracker.reset();
        assert!(tracker.get_all_health().is_empty());
        assert_eq!(tracker.health_of(&p).health_score, 1.0);
    }

    #[test]
    fn test_invalid_decay_falls_back() {
        let tracker = ProviderHealthTracker::with_config(HealthConfig { decay: 1.5 });
        assert_eq!(tracker.config().decay, DEFAULT_HEALTH_DECAY);
    }
}
