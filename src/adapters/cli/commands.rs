//! CLI Command Handlers
//!
//! Implementation of all CLI commands for spreadwatch.

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapters::market_data::csv_file::{write_price_csv, write_zscore_csv, CsvMarketData};
use crate::adapters::market_data::replay::ReplayFeed;
use crate::adapters::market_data::synthetic::SyntheticPair;
use crate::adapters::paper_broker::{PaperBroker, PaperBrokerConfig};
use crate::application::backtest::{run_backtest, BacktestSettings};
use crate::application::report::BacktestReport;
use crate::application::session::TradingSession;
use crate::application::signal_runner::SignalRunner;
use crate::config::{load_config, Config};
use crate::domain::position::PositionState;
use crate::domain::price_series::{align, AlignedPair};
use crate::ports::market_data::MarketDataPort;
use crate::strategy::params::SignalThresholds;
use crate::strategy::signal_machine::SignalStateMachine;
use crate::strategy::spread_stats::SpreadStatistics;

const DEFAULT_CONFIG: &str = "config/pairs.toml";

/// Spreadwatch - Pairs-trading signals and backtests on a log-price spread
#[derive(Parser, Debug)]
#[command(
    name = "spreadwatch",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Pairs-trading signals and backtests on a log-price spread",
    long_about = "Spreadwatch computes the rolling z-score of ln(A) - ln(B) for a pair of \
                  instruments and turns it into entry, exit and stop-loss signals, either \
                  over stored history or bar by bar."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

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
    /// Run a paper-traded backtest over the configured pair
    Backtest(BacktestCmd),

    /// Print the most recent spread z-scores
    Zscore(ZscoreCmd),

    /// Classify a single z-score against the thresholds
    Signal(SignalCmd),

    /// Stream stored history bar by bar through a live session
    Replay(ReplayCmd),

    /// Write a synthetic cointegrated pair to the data directory
    Generate(GenerateCmd),
}

/// Run backtesting
#[derive(Parser, Debug)]
pub struct BacktestCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Backtest on this many synthetic bars instead of the data directory
    #[arg(long, value_name = "BARS")]
    pub synthetic: Option<usize>,

    /// Seed for synthetic data
    #[arg(long, value_name = "SEED", default_value = "42")]
    pub seed: u64,

    /// Override the rolling window
    #[arg(long, value_name = "PERIODS")]
    pub window: Option<usize>,

    /// Output detailed trade log
    #[arg(short = 't', long)]
    pub trades: bool,

    /// Export results to JSON
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,
}

/// Print recent z-scores
#[derive(Parser, Debug)]
pub struct ZscoreCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Number of latest defined z-scores to print
    #[arg(short = 'n', long, value_name = "N", default_value = "5")]
    pub tail: usize,

    /// Export the full z-score series to CSV
    #[arg(long, value_name = "FILE")]
    pub export_csv: Option<PathBuf>,
}

/// Position argument for the signal command
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionArg {
    Flat,
    Long,
    Short,
}

impl From<PositionArg> for PositionState {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::Flat => PositionState::Flat,
            PositionArg::Long => PositionState::LongSpread,
            PositionArg::Short => PositionState::ShortSpread,
        }
    }
}

/// Classify one z-score
#[derive(Parser, Debug)]
pub struct SignalCmd {
    /// Spread z-score
    #[arg(value_name = "Z", allow_negative_numbers = true)]
    pub z: f64,

    /// Current position
    #[arg(short, long, value_enum, default_value = "flat")]
    pub position: PositionArg,

    /// Entry threshold
    #[arg(long, value_name = "Z", default_value = "2.0")]
    pub entry: f64,

    /// Exit threshold
    #[arg(long, value_name = "Z", default_value = "0.5")]
    pub exit: f64,

    /// Stop-loss threshold
    #[arg(long, value_name = "Z", default_value = "4.0")]
    pub max: f64,
}

/// Stream history through a session
#[derive(Parser, Debug)]
pub struct ReplayCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Pause between bars in milliseconds
    #[arg(long, value_name = "MS", default_value = "0")]
    pub delay_ms: u64,
}

/// Generate synthetic price files
#[derive(Parser, Debug)]
pub struct GenerateCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Number of bars per leg
    #[arg(long, value_name = "BARS", default_value = "5000")]
    pub bars: usize,

    /// Random seed
    #[arg(long, value_name = "SEED", default_value = "42")]
    pub seed: u64,

    /// Chance that a leg skips a bar
    #[arg(long, value_name = "P", default_value = "0.0")]
    pub gaps: f64,

    /// Output directory (defaults to the configured data directory)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    // Initialize logging based on flags
    init_logging(app.verbose, app.debug)?;

    match app.command {
        Command::Backtest(cmd) => backtest_command(cmd).await,
        Command::Zscore(cmd) => zscore_command(cmd).await,
        Command::Signal(cmd) => signal_command(cmd),
        Command::Replay(cmd) => replay_command(cmd).await,
        Command::Generate(cmd) => generate_command(cmd),
    }
}

/// Initialize logging system
fn init_logging(verbose: bool, debug: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn load(path: &Path) -> Result<Config> {
    tracing::info!("Config: {}", path.display());
    load_config(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Load both legs from the data directory and inner-join them
async fn load_pair(config: &Config) -> Result<AlignedPair> {
    let dir = config.data.resolve_dir();
    let source = CsvMarketData::new(&dir);
    let (a, b) = source
        .fetch_pair(&config.pair.instrument_a, &config.pair.instrument_b)
        .await
        .with_context(|| format!("Failed to load price history from {}", dir.display()))?;

    let pair = align(&a, &b)?;
    tracing::info!(
        "Aligned {} bars ({} and {} before the join)",
        pair.len(),
        a.len(),
        b.len()
    );
    Ok(pair)
}

fn synthetic_pair(config: &Config, bars: usize, seed: u64) -> Result<AlignedPair> {
    let (a, b) = SyntheticPair::new(
        config.pair.instrument_a.clone(),
        config.pair.instrument_b.clone(),
        Utc.with_ymd_and_hms(2025, 1, 2, 8, 0, 0)
            .single()
            .context("invalid synthetic start time")?,
    )
    .with_seed(seed)
    .generate(bars)?;
    Ok(align(&a, &b)?)
}

/// Handle backtest command
async fn backtest_command(cmd: BacktestCmd) -> Result<()> {
    let config = load(&cmd.config)?;

    let mut settings = BacktestSettings::from(&config);
    if let Some(window) = cmd.window {
        settings.strategy = settings.strategy.with_window(window);
        settings.strategy.validate()?;
    }

    let pair = match cmd.synthetic {
        Some(bars) => synthetic_pair(&config, bars, cmd.seed)?,
        None => load_pair(&config).await?,
    };

    if pair.len() < settings.strategy.window {
        tracing::warn!(
            "Only {} aligned bars for a window of {}; no signals will be produced",
            pair.len(),
            settings.strategy.window
        );
    }

    let broker = PaperBroker::new(
        &pair.instrument_a,
        &pair.instrument_b,
        PaperBrokerConfig::from(&config.backtest),
    );
    let report = run_backtest(&settings, &pair, broker).await?;

    print!("{}", report);
    if cmd.trades {
        print_trade_log(&report);
    }

    if let Some(path) = cmd.export_json {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("\nResults exported to {}", path.display());
    }

    Ok(())
}

fn print_trade_log(report: &BacktestReport) {
    println!();
    println!("TRADE LOG");
    println!("{}", "=".repeat(50));
    for trade in &report.trade_log {
        println!("{}", trade);
    }
}

/// Handle zscore command
async fn zscore_command(cmd: ZscoreCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    let pair = load_pair(&config).await?;
    let series = SpreadStatistics::compute_aligned(&pair, config.strategy.window)?;

    println!(
        "{} | window {} | {} of {} bars have a z-score",
        config.pair.symbol(),
        series.window,
        series.defined_count(),
        series.len()
    );

    let latest = series.latest_defined(cmd.tail);
    if latest.is_empty() {
        println!("No z-scores yet: need at least {} aligned bars", series.window);
    }
    for point in latest {
        if let Some(z) = point.z_score {
            println!("{}  spread {:+.5}  z {:+.3}", point.timestamp, point.spread, z);
        }
    }

    if let Some(path) = cmd.export_csv {
        write_zscore_csv(&path, &series)?;
        println!("Z-scores exported to {}", path.display());
    }

    Ok(())
}

/// Handle signal command
fn signal_command(cmd: SignalCmd) -> Result<()> {
    let thresholds = SignalThresholds::new(cmd.entry, cmd.exit, cmd.max)?;
    let machine = SignalStateMachine::new(thresholds)?;
    let decision = machine.decide(Some(cmd.z), cmd.position.into());

    println!("z = {:+.3}, position {}: {}", cmd.z, PositionState::from(cmd.position), decision);
    Ok(())
}

/// Handle replay command
async fn replay_command(cmd: ReplayCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    let pair = load_pair(&config).await?;
    let settings = BacktestSettings::from(&config);

    let broker = PaperBroker::new(
        &pair.instrument_a,
        &pair.instrument_b,
        PaperBrokerConfig::from(&config.backtest),
    );
    let session = TradingSession::new(
        pair.instrument_a.clone(),
        pair.instrument_b.clone(),
        &settings.strategy,
        broker,
    )?
    .with_sizing(settings.sizing)
    .with_reconciliation(settings.reconcile_positions);
    let runner = SignalRunner::new(session);

    // Setup Ctrl+C handler
    let stopper = runner.clone();
    let ctrl_c = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        stopper.stop().await;
    });

    let (bars, feed) = ReplayFeed::new(&pair)
        .with_delay(Duration::from_millis(cmd.delay_ms))
        .spawn();
    let processed = runner.run(bars).await?;
    ctrl_c.abort();
    let _ = ctrl_c.await;
    feed.abort();

    let summary = match runner.into_summary() {
        Some(summary) => summary,
        None => bail!("Session still shared after replay finished"),
    };
    tracing::info!("Replay processed {} bars", processed);

    let report =
        BacktestReport::from_summary(&summary, settings.initial_cash, settings.bars_per_year);
    print!("{}", report);
    Ok(())
}

/// Handle generate command
fn generate_command(cmd: GenerateCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    if !(0.0..=1.0).contains(&cmd.gaps) {
        bail!("--gaps must be within [0, 1], got {}", cmd.gaps);
    }

    let dir = cmd.out_dir.unwrap_or_else(|| config.data.resolve_dir());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let (a, b) = SyntheticPair::new(
        config.pair.instrument_a.clone(),
        config.pair.instrument_b.clone(),
        Utc.with_ymd_and_hms(2025, 1, 2, 8, 0, 0)
            .single()
            .context("invalid synthetic start time")?,
    )
    .with_seed(cmd.seed)
    .with_gaps(cmd.gaps)
    .generate(cmd.bars)?;

    let source = CsvMarketData::new(&dir);
    for series in [&a, &b] {
        let path = source.path_for(series.instrument());
        write_price_csv(&path, series)?;
        println!("Wrote {} bars to {}", series.len(), path.display());
    }
    Ok(())
}
