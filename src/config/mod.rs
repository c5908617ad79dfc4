//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    AccountSection, CacheSection, Config, ConfigError, LoggingSection, ProvidersSection,
    RiskSection, StoreBackend, StoreSection, STORE_PATH_ENV, load_config, parse_config,
};
