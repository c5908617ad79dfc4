//! CLI Adapter
//!
//! Command-line interface for market-pulse.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    build_orchestrator, build_pipeline, build_store, CliApp, Command, OutputFormat, RuleAddCmd,
    RulesAction, RulesCmd, SignalCmd, SignalsCmd, SnapshotCmd, TokenArgs,
};

use anyhow::Result;

use crate::config::Config;

/// Initialize the CLI application
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}

/// Execute the CLI command
pub async fn execute(app: CliApp, config: Config) -> Result<()> {
    commands::execute(app, config).await
}
