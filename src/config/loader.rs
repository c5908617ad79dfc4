//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/default.toml.
//! Every section and field has a default, so partial files load.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::adapters::cache::CacheConfig;
use crate::application::{AccountRisk, FallbackMode};
use crate::domain::{HealthConfig, LiquidityGuardConfig, RugRiskConfig};
use crate::strategy::{PlanConfig, RangeHeuristicsConfig, RegimeThresholds};

/// Environment variable overriding `[store].path`
pub const STORE_PATH_ENV: &str = "MARKET_PULSE_STORE_PATH";

/// Main configuration structure matching config/default.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheSection,
    pub health: HealthConfig,
    pub providers: ProvidersSection,
    pub regime: RegimeThresholds,
    pub heuristics: RangeHeuristicsConfig,
    pub risk: RiskSection,
    pub plan: PlanConfig,
    pub account: AccountSection,
    pub store: StoreSection,
    pub logging: LoggingSection,
}

/// SWR cache section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Entries younger than this are fresh
    pub ttl_ms: u64,
    /// Additional window in which stale entries are served and refreshed
    pub stale_while_revalidate_ms: u64,
    pub max_entries: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            ttl_ms: defaults.ttl.as_millis() as u64,
            stale_while_revalidate_ms: defaults.stale_while_revalidate.as_millis() as u64,
            max_entries: defaults.max_entries,
        }
    }
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_millis(self.ttl_ms),
            stale_while_revalidate: Duration::from_millis(self.stale_while_revalidate_ms),
            max_entries: self.max_entries,
        }
    }
}

/// Provider chain section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersSection {
    /// Static default order; also the tie-break order in ranking
    pub order: Vec<String>,
    pub mode: FallbackMode,
    /// Per-call adapter timeout
    pub timeout_ms: u64,
    pub dexscreener_url: String,
    /// Directory served by the `fixtures` provider
    pub fixtures_dir: String,
}

impl Default for ProvidersSection {
    fn default() -> Self {
        Self {
            order: vec!["dexscreener".to_string(), "fixtures".to_string()],
            mode: FallbackMode::Sequential,
            timeout_ms: 5_000,
            dexscreener_url: crate::adapters::market_data::dexscreener::DEXSCREENER_API.to_string(),
            fixtures_dir: "demos/fixtures".to_string(),
        }
    }
}

impl ProvidersSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn fixtures_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.fixtures_dir).into_owned())
    }
}

/// Risk gates section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    pub rug: RugRiskConfig,
    pub liquidity: LiquidityGuardConfig,
}

/// Account sizing section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountSection {
    pub equity_usd: f64,
    /// Percent of equity risked per plan (1.0 = 1%)
    pub risk_pct: f64,
}

impl Default for AccountSection {
    fn default() -> Self {
        let defaults = AccountRisk::default();
        Self {
            equity_usd: defaults.equity_usd,
            risk_pct: defaults.risk_pct,
        }
    }
}

impl AccountSection {
    pub fn to_account_risk(&self) -> AccountRisk {
        AccountRisk {
            equity_usd: self.equity_usd,
            risk_pct: self.risk_pct,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Memory,
}

/// Signal store section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: StoreBackend,
    /// JSON store file; `~` is expanded
    pub path: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Json,
            path: "~/.market-pulse/signals.json".to_string(),
        }
    }
}

impl StoreSection {
    /// Store path with environment variable override
    /// Checks MARKET_PULSE_STORE_PATH env var first, falls back to config value
    pub fn get_path(&self) -> PathBuf {
        let raw = std::env::var(STORE_PATH_ENV).unwrap_or_else(|_| self.path.clone());
        PathBuf::from(shellexpand::tilde(&raw).into_owned())
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Cache
        if self.cache.ttl_ms == 0 {
            return Err(ConfigError::ValidationError("cache.ttl_ms must be > 0".to_string()));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::ValidationError(
                "cache.max_entries must be > 0".to_string(),
            ));
        }

        // Health
        if !(self.health.decay > 0.0 && self.health.decay < 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "health.decay must be in (0, 1), got {}",
                self.health.decay
            )));
        }

        // Providers
        if self.providers.order.is_empty() {
            return Err(ConfigError::ValidationError(
                "providers.order cannot be empty".to_string(),
            ));
        }
        if let Some(unknown) = self
            .providers
            .order
            .iter()
            .find(|p| !matches!(p.as_str(), "dexscreener" | "fixtures"))
        {
            return Err(ConfigError::ValidationError(format!(
                "unknown provider in providers.order: {}",
                unknown
            )));
        }
        if self.providers.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "providers.timeout_ms must be > 0".to_string(),
            ));
        }

        // Strategy thresholds
        self.regime
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("regime: {}", e)))?;
        self.plan
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("plan: {}", e)))?;

        // Risk
        if self.risk.rug.min_liquidity_usd < 0.0
            || self.risk.rug.healthy_liquidity_usd <= self.risk.rug.min_liquidity_usd
        {
            return Err(ConfigError::ValidationError(format!(
                "risk.rug: expected 0 <= min_liquidity_usd < healthy_liquidity_usd, got {} / {}",
                self.risk.rug.min_liquidity_usd, self.risk.rug.healthy_liquidity_usd
            )));
        }
        let liq = &self.risk.liquidity;
        if liq.max_position_pct_of_liquidity <= 0.0 || liq.max_position_pct_of_liquidity > 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "risk.liquidity.max_position_pct_of_liquidity must be in (0, 1], got {}",
                liq.max_position_pct_of_liquidity
            )));
        }
        if liq.max_slippage <= 0.0 || liq.max_slippage >= 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "risk.liquidity.max_slippage must be in (0, 1), got {}",
                liq.max_slippage
            )));
        }

        // Account
        if self.account.equity_usd <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "account.equity_usd must be > 0, got {}",
                self.account.equity_usd
            )));
        }
        if self.account.risk_pct <= 0.0 || self.account.risk_pct > 100.0 {
            return Err(ConfigError::ValidationError(format!(
                "account.risk_pct must be 0-100, got {}",
                self.account.risk_pct
            )));
        }

        // Store
        if self.store.backend == StoreBackend::Json && self.store.path.is_empty() {
            return Err(ConfigError::ValidationError(
                "store.path cannot be empty for the json backend".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[cache]
ttl_ms = 15000
stale_while_revalidate_ms = 60000
max_entries = 500

[health]
decay = 0.8

[providers]
order = ["fixtures", "dexscreener"]
mode = "race"
timeout_ms = 2500
fixtures_dir = "demo/fixtures"

[regime]
trend_threshold_pct = 4.0

[risk.rug]
min_liquidity_usd = 20000.0

[risk.liquidity]
max_position_pct_of_liquidity = 0.01

[account]
equity_usd = 25000.0
risk_pct = 0.5

[store]
backend = "memory"

[logging]
level = "debug"
"#
        .to_string()
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(create_valid_config().as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.cache.to_cache_config().ttl, Duration::from_millis(15_000));
        assert_eq!(config.health.decay, 0.8);
        assert_eq!(config.providers.order, vec!["fixtures", "dexscreener"]);
        assert_eq!(config.providers.mode, FallbackMode::Race);
        assert_eq!(config.providers.timeout(), Duration::from_millis(2_500));
        assert_eq!(config.regime.trend_threshold_pct, 4.0);
        assert_eq!(config.regime.high_vol_range, RegimeThresholds::default().high_vol_range);
        assert_eq!(config.risk.rug.min_liquidity_usd, 20_000.0);
        assert_eq!(config.risk.liquidity.max_position_pct_of_liquidity, 0.01);
        assert_eq!(config.account.to_account_risk().risk_pct, 0.5);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.providers.order, vec!["dexscreener", "fixtures"]);
        assert_eq!(config.health.decay, 0.9);
        assert_eq!(config.account.risk_pct, 1.0);
        assert_eq!(config.store.backend, StoreBackend::Json);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = parse_config("[cache\nttl_ms = 1");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_invalid_decay() {
        let result = parse_config("[health]\ndecay = 1.0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_invalid_risk_pct() {
        let result = parse_config("[account]\nrisk_pct = 0.0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
        let result = parse_config("[account]\nrisk_pct = 120.0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let result = parse_config("[providers]\norder = [\"birdeye\"]\n");
        match result {
            Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("birdeye")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_provider_order_rejected() {
        let result = parse_config("[providers]\norder = []\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_inverted_regime_thresholds_rejected() {
        let result = parse_config("[regime]\nlow_vol_range = 0.5\nhigh_vol_range = 0.1\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_store_path_expands_tilde() {
        let section = StoreSection {
            backend: StoreBackend::Json,
            path: "/tmp/market-pulse/signals.json".to_string(),
        };
        if std::env::var(STORE_PATH_ENV).is_err() {
            assert_eq!(section.get_path(), PathBuf::from("/tmp/market-pulse/signals.json"));
        }

        let providers = ProvidersSection {
            fixtures_dir: "~/fixtures".to_string(),
            ..ProvidersSection::default()
        };
        assert!(providers.fixtures_path().ends_with("fixtures"));
    }
}
