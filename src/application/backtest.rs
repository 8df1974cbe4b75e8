//! Backtest Runner
//!
//! Replays an aligned pair through a trading session and reports on it.

use crate::application::report::BacktestReport;
use crate::application::session::{PositionSizing, SessionError, TradingSession};
use crate::config::Config;
use crate::domain::price_series::AlignedPair;
use crate::ports::execution::ExecutionPort;
use crate::strategy::params::StrategyConfig;

#[derive(Debug, Clone)]
pub struct BacktestSettings {
    pub strategy: StrategyConfig,
    pub sizing: PositionSizing,
    pub initial_cash: f64,
    pub bars_per_year: f64,
    pub reconcile_positions: bool,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self::from(&crate::config::BacktestSection::default())
    }
}

impl From<&crate::config::BacktestSection> for BacktestSettings {
    fn from(section: &crate::config::BacktestSection) -> Self {
        Self {
            strategy: StrategyConfig::default(),
            sizing: PositionSizing::from(section),
            initial_cash: section.initial_cash,
            bars_per_year: section.bars_per_year,
            reconcile_positions: section.reconcile_positions,
        }
    }
}

impl From<&Config> for BacktestSettings {
    fn from(config: &Config) -> Self {
        Self {
            strategy: StrategyConfig::from(config),
            ..Self::from(&config.backtest)
        }
    }
}

/// Run every bar of `pair` through a fresh session on `broker`.
///
/// The broker should start flat with `settings.initial_cash`.
pub async fn run_backtest<E: ExecutionPort>(
    settings: &BacktestSettings,
    pair: &AlignedPair,
    broker: E,
) -> Result<BacktestReport, SessionError> {
    tracing::info!(
        "Running backtest on {}/{}: {} bars, window {}",
        pair.instrument_a,
        pair.instrument_b,
        pair.len(),
        settings.strategy.window
    );

    let mut session = TradingSession::new(
        pair.instrument_a.clone(),
        pair.instrument_b.clone(),
        &settings.strategy,
        broker,
    )?
    .with_sizing(settings.sizing)
    .with_reconciliation(settings.reconcile_positions);

    for bar in &pair.bars {
        session.on_bar(bar).await?;
    }

    let summary = session.finish();
    tracing::info!(
        "Backtest finished: {} trades, {} rejected orders, final position {}",
        summary.trades.len(),
        summary.rejected_orders,
        summary.final_position
    );
    Ok(BacktestReport::from_summary(
        &summary,
        settings.initial_cash,
        settings.bars_per_year,
    ))
}
