//! market-pulse - Market Data, Regime and Signal Pipeline Library
//!
//! Resilient token snapshots from a health-ranked provider chain, regime
//! classification, rug / liquidity gates, scored signals and trade plans.
//!
//! # Modules
//!
//! - `domain`: Core types and pure checks (MarketSnapshot, MarketRegime, Signal, TradePlan)
//! - `ports`: Trait abstractions (ProviderAdapter, Telemetry, SignalStore, HeuristicsSource)
//! - `strategy`: Regime detection, heuristics, signal detection, plan generation
//! - `adapters`: External implementations (Dexscreener, fixtures, SWR cache, stores, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Provider orchestration and the signal pipeline

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
