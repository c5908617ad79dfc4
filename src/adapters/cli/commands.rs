//! CLI Command Handlers
//!
//! Implementation of all CLI commands for market-pulse.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::cache::FetchOptions;
use crate::adapters::market_data::{DexscreenerAdapter, FileSnapshotAdapter};
use crate::adapters::store::{InMemorySignalStore, JsonFileSignalStore};
use crate::adapters::telemetry::TracingTelemetry;
use crate::application::{MarketDataOrchestrator, PipelineOutcome, ProviderChain, SignalPipeline};
use crate::config::{Config, StoreBackend};
use crate::domain::{ProviderHealthTracker, Signal, SignalRule};
use crate::ports::{ProviderAdapter, SignalQuery, SignalStore, SnapshotParams};
use crate::strategy::RangePositionHeuristics;

/// market-pulse - Market data, regime and signal pipeline for DEX tokens
#[derive(Parser, Debug)]
#[command(
    name = "market-pulse",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Market data, regime and signal pipeline for DEX tokens",
    long_about = "market-pulse fetches token snapshots through a health-ranked provider chain \
                  with stale-while-revalidate caching, classifies the market regime, runs risk \
                  checks and turns the result into scored signals and trade plans."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a token snapshot through the provider chain
    Snapshot(SnapshotCmd),

    /// Run the full pipeline for a token and store the signal
    Signal(SignalCmd),

    /// List stored signals
    Signals(SignalsCmd),

    /// Manage signal rules
    Rules(RulesCmd),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Token selection shared by snapshot and signal
#[derive(clap::Args, Debug, Clone)]
pub struct TokenArgs {
    /// Token address (mint)
    #[arg(value_name = "ADDRESS")]
    pub address: String,

    /// Chain id
    #[arg(long, default_value = "solana")]
    pub chain: String,

    /// Symbol hint for providers that do not report one
    #[arg(long)]
    pub symbol: Option<String>,

    /// Bypass fresh / stale cache entries
    #[arg(long)]
    pub force_refresh: bool,
}

impl TokenArgs {
    fn params(&self) -> SnapshotParams {
        let params = SnapshotParams::new(self.address.clone(), self.chain.clone());
        match &self.symbol {
            Some(symbol) => params.with_symbol(symbol.clone()),
            None => params,
        }
    }

    fn options(&self) -> FetchOptions {
        FetchOptions {
            force_refresh: self.force_refresh,
        }
    }
}

#[derive(Parser, Debug)]
pub struct SnapshotCmd {
    #[command(flatten)]
    pub token: TokenArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct SignalCmd {
    #[command(flatten)]
    pub token: TokenArgs,

    /// Override account equity (USD)
    #[arg(long, value_name = "USD")]
    pub equity: Option<f64>,

    /// Override percent of equity risked
    #[arg(long, value_name = "PCT")]
    pub risk_pct: Option<f64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct SignalsCmd {
    /// Filter by symbol
    #[arg(long, conflicts_with_all = ["rule", "pattern"])]
    pub symbol: Option<String>,

    /// Filter by rule id
    #[arg(long, conflicts_with = "pattern")]
    pub rule: Option<String>,

    /// Filter by pattern
    #[arg(long)]
    pub pattern: Option<String>,

    /// Maximum signals to show, newest first
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct RulesCmd {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// List enabled rules, newest first
    List,

    /// Create a rule targeting one token
    Add(RuleAddCmd),

    /// Soft-disable a rule
    Disable {
        /// Rule id
        id: String,
    },

    /// Run the pipeline for every enabled rule
    Run,
}

#[derive(Parser, Debug)]
pub struct RuleAddCmd {
    /// Rule name
    pub name: String,

    /// Token symbol
    pub symbol: String,

    /// Token address (mint)
    pub address: String,

    #[arg(long, default_value = "solana")]
    pub chain: String,

    /// Evaluation timeframe label
    #[arg(long, default_value = "1h")]
    pub timeframe: String,

    /// Strategy identifier
    #[arg(long, default_value = "regime")]
    pub strategy: String,
}

/// Execute the parsed command against a loaded configuration
pub async fn execute(app: CliApp, config: Config) -> Result<()> {
    match app.command {
        Command::Snapshot(cmd) => snapshot_command(cmd, &config).await,
        Command::Signal(cmd) => signal_command(cmd, config).await,
        Command::Signals(cmd) => signals_command(cmd, &config).await,
        Command::Rules(cmd) => rules_command(cmd, config).await,
    }
}

/// Build the provider chain in configured order
pub fn build_orchestrator(config: &Config) -> Result<MarketDataOrchestrator> {
    let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::new();
    for name in &config.providers.order {
        let adapter: Arc<dyn ProviderAdapter> = match name.as_str() {
            "dexscreener" => Arc::new(
                DexscreenerAdapter::with_base_url(
                    &config.providers.dexscreener_url,
                    config.providers.timeout(),
                )
                .context("Failed to create Dexscreener client")?,
            ),
            "fixtures" => Arc::new(FileSnapshotAdapter::new(config.providers.fixtures_path())),
            other => bail!("Unknown provider: {}", other),
        };
        adapters.push(adapter);
    }

    let health = Arc::new(ProviderHealthTracker::with_config(config.health));
    let chain = ProviderChain::new(adapters, health)
        .with_timeout(config.providers.timeout())
        .with_mode(config.providers.mode);

    Ok(MarketDataOrchestrator::new(
        chain,
        config.cache.to_cache_config(),
        Arc::new(TracingTelemetry),
    ))
}

/// Open the configured signal store
pub fn build_store(config: &Config) -> Result<Arc<dyn SignalStore>> {
    Ok(match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory signal store; signals are not persisted");
            Arc::new(InMemorySignalStore::new())
        }
        StoreBackend::Json => {
            let path = config.store.get_path();
            Arc::new(
                JsonFileSignalStore::open(&path)
                    .with_context(|| format!("Failed to open signal store {}", path.display()))?,
            )
        }
    })
}

/// Wire the full pipeline from configuration
pub fn build_pipeline(config: &Config) -> Result<SignalPipeline> {
    let orchestrator = Arc::new(build_orchestrator(config)?);
    let store = build_store(config)?;
    let heuristics = Arc::new(RangePositionHeuristics::new(config.heuristics));

    let pipeline =
        SignalPipeline::new(orchestrator, heuristics, store, config.account.to_account_risk())
            .with_regime_thresholds(config.regime)
            .with_rug_config(config.risk.rug.clone())
            .with_liquidity_config(config.risk.liquidity.clone())
            .with_plan_config(config.plan.clone())
            .context("Invalid [plan] configuration")?;
    Ok(pipeline)
}

async fn snapshot_command(cmd: SnapshotCmd, config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let snapshot = orchestrator
        .get_token_snapshot(&cmd.token.params(), cmd.token.options())
        .await
        .context("Failed to fetch snapshot")?;

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Text => {
            let token = &snapshot.token;
            let price = &snapshot.price;
            println!("{} ({}) on {}", token.symbol, token.address, token.chain);
            println!("  Price:     ${:.8} ({:+.2}% 24h)", price.current, price.change_24h);
            println!("  Range:     ${:.8} - ${:.8}", price.low_24h, price.high_24h);
            println!("  Volume:    ${:.0}", snapshot.volume.volume_24h);
            println!("  Liquidity: ${:.0}", snapshot.liquidity.total);
            println!(
                "  Source:    {} (confidence {:.2}, cached {})",
                snapshot.metadata.provider, snapshot.metadata.confidence, snapshot.metadata.cached
            );
            for health in orchestrator.provider_health() {
                println!(
                    "  Provider {}: score {:.2}, latency {}",
                    health.provider,
                    health.health_score,
                    health
                        .average_latency_ms
                        .map(|l| format!("{:.0} ms", l))
                        .unwrap_or_else(|| "n/a".to_string())
                );
            }
        }
    }
    Ok(())
}

async fn signal_command(cmd: SignalCmd, mut config: Config) -> Result<()> {
    if let Some(equity) = cmd.equity {
        config.account.equity_usd = equity;
    }
    if let Some(risk_pct) = cmd.risk_pct {
        config.account.risk_pct = risk_pct;
    }
    config.validate().context("Invalid account overrides")?;

    let pipeline = build_pipeline(&config)?;
    let outcome = pipeline
        .run(&cmd.token.params(), cmd.token.options())
        .await
        .context("Pipeline failed")?;

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => print_outcome(&outcome),
    }
    Ok(())
}

async fn signals_command(cmd: SignalsCmd, config: &Config) -> Result<()> {
    let store = build_store(config)?;
    let query = SignalQuery::limit(cmd.limit);

    let signals = if let Some(rule) = &cmd.rule {
        store.get_signals_for_rule(rule, query).await?
    } else if let Some(pattern) = &cmd.pattern {
        store.get_signals_by_pattern(pattern, query).await?
    } else if let Some(symbol) = &cmd.symbol {
        store.get_signals_for_symbol(symbol, query).await?
    } else {
        bail!("Specify one of --symbol, --rule or --pattern");
    };

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&signals)?),
        OutputFormat::Text => {
            if signals.is_empty() {
                println!("No signals found");
            }
            for signal in &signals {
                print_signal_line(signal);
            }
        }
    }
    Ok(())
}

async fn rules_command(cmd: RulesCmd, config: Config) -> Result<()> {
    match cmd.action {
        RulesAction::List => {
            let store = build_store(&config)?;
            let rules = store.get_active_rules().await?;
            if rules.is_empty() {
                println!("No active rules");
            }
            for rule in rules {
                print_rule_line(&rule);
            }
        }
        RulesAction::Add(add) => {
            let store = build_store(&config)?;
            let rule = SignalRule::new(
                add.name,
                add.symbol,
                add.timeframe,
                add.strategy,
                serde_json::json!({ "address": add.address, "chain": add.chain }),
            );
            store.create_rule(&rule).await?;
            println!("Created rule {}", rule.id);
        }
        RulesAction::Disable { id } => {
            let store = build_store(&config)?;
            store
                .disable_rule(&id)
                .await
                .with_context(|| format!("Failed to disable rule {}", id))?;
            println!("Disabled rule {}", id);
        }
        RulesAction::Run => {
            let pipeline = build_pipeline(&config)?;
            let results = pipeline.run_active_rules().await?;
            if results.is_empty() {
                println!("No active rules");
            }
            for (rule, outcome) in results {
                match outcome {
                    Ok(outcome) => {
                        println!("[{}] {}", rule.name, rule.id);
                        print_signal_line(&outcome.signal);
                    }
                    Err(e) => println!("[{}] {} failed: {}", rule.name, rule.id, e),
                }
            }
        }
    }
    Ok(())
}

fn print_signal_line(signal: &Signal) {
    println!(
        "{}  {}  {:<10} {:<26} {:<8} conf {:.2}{}",
        signal.created_at.format("%Y-%m-%d %H:%M:%S"),
        signal.id,
        signal.symbol,
        signal.pattern,
        signal.direction,
        signal.confidence,
        if signal.triggered_at.is_some() { "  (triggered)" } else { "" }
    );
}

fn print_rule_line(rule: &SignalRule) {
    println!(
        "{}  {:<20} {:<10} {:<4} {}  {}",
        rule.id, rule.name, rule.symbol, rule.timeframe, rule.strategy, rule.params
    );
}

fn print_outcome(outcome: &PipelineOutcome) {
    let snap = &outcome.snapshot;
    let signal = &outcome.signal;

    let cached = if snap.metadata.cached { " (cached)" } else { "" };
    println!(
        "{} @ ${:.8} via {}{}",
        snap.token.symbol, snap.price.current, snap.metadata.provider, cached
    );
    println!("  Regime:  {}", outcome.regime);
    println!(
        "  Risk:    {} score {:.2} ({})",
        if outcome.rug_check.passed { "PASS" } else { "FAIL" },
        outcome.rug_check.score,
        outcome.rug_check.risk_level().description()
    );
    for flag in &outcome.rug_check.flags {
        println!("    flag: {}", flag);
    }
    for warning in &outcome.rug_check.warnings {
        println!("    warn: {}", warning);
    }

    println!(
        "  Signal:  {} {} {} conf {:.2}",
        signal.id, signal.pattern, signal.direction, signal.confidence
    );
    println!("  Thesis:  {}", signal.thesis);

    match &outcome.plan {
        Some(plan) => {
            println!(
                "  Plan:    {} {} {:?} @ ${:.8}, stop ${:.8}",
                plan.id, plan.side, plan.entry.entry_type, plan.entry.price, plan.risk.stop
            );
            println!(
                "           size {:.4} units (${:.2}), max loss ${:.2}",
                plan.risk.pos_size_units,
                plan.notional_usd(),
                plan.risk.max_loss_usd
            );
            for target in &plan.targets {
                println!(
                    "           TP{} ${:.8} ({:.1}R, {:.0}%)",
                    target.tp,
                    target.price,
                    target.r_multiple,
                    target.share * 100.0
                );
            }
            println!(
                "           rr {:.2}, win {:.0}%, expectancy {:+.2}R",
                plan.metrics.rr,
                plan.metrics.win_prob * 100.0,
                plan.metrics.expectancy
            );
            for item in &plan.checklist {
                println!("           [ ] {}", item.label);
            }
        }
        None => println!("  Plan:    none (rug check failed)"),
    }

    if let Some(check) = &outcome.liquidity_check {
        println!(
            "  Liquidity: max safe ${:.2}, est. slippage {:.2}%{}",
            check.max_safe_size,
            check.slippage_estimate * 100.0,
            if check.passed { "" } else { " (size capped)" }
        );
    }
}
