pub mod market_data;
pub mod pipeline;

pub use market_data::{
    FallbackMode, MarketDataOrchestrator, ProviderChain, DEFAULT_CALL_TIMEOUT, SNAPSHOT_EVENT,
};
pub use pipeline::{AccountRisk, PipelineError, PipelineOutcome, SignalPipeline, rule_target};
