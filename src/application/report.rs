//! Backtest Report
//!
//! Performance summary computed from a finished session: returns, drawdown,
//! Sharpe ratio and round-trip statistics.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::application::session::{EquityPoint, SessionSummary};
use crate::domain::position::PositionState;
use crate::domain::signal::ExitReason;
use crate::domain::trade::PairTrade;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeStats {
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    pub win_rate_pct: f64,
    pub average_win: Option<f64>,
    pub average_loss: Option<f64>,
    pub stop_loss_exits: usize,
}

impl TradeStats {
    pub fn from_trades(trades: &[PairTrade]) -> Self {
        let wins: Vec<f64> = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect();
        let losses: Vec<f64> = trades.iter().filter(|t| t.is_loss()).map(|t| t.pnl).collect();
        let total = trades.len();

        Self {
            total,
            won: wins.len(),
            lost: losses.len(),
            win_rate_pct: if total > 0 {
                wins.len() as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            average_win: (!wins.is_empty()).then(|| wins.iter().mean()),
            average_loss: (!losses.is_empty()).then(|| losses.iter().mean()),
            stop_loss_exits: trades
                .iter()
                .filter(|t| t.exit_reason == ExitReason::StopLoss)
                .count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub pair: String,
    pub initial_capital: f64,
    pub final_value: f64,
    pub pnl: f64,
    pub total_return_pct: f64,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub days: i64,
    pub annualized_return_pct: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown_pct: f64,
    pub bars: usize,
    pub signal_bars: usize,
    pub rejected_orders: usize,
    pub final_position: PositionState,
    pub trades: TradeStats,
    pub trade_log: Vec<PairTrade>,
}

/// Largest peak-to-trough fall of the equity curve, in percent of the peak
pub fn max_drawdown_pct(curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0f64;
    for point in curve {
        peak = peak.max(point.equity);
        if peak > 0.0 {
            worst = worst.max((peak - point.equity) / peak * 100.0);
        }
    }
    worst
}

/// Annualized Sharpe ratio of per-bar simple returns (zero risk-free rate)
pub fn sharpe_ratio(curve: &[EquityPoint], bars_per_year: f64) -> Option<f64> {
    let returns: Vec<f64> = curve
        .windows(2)
        .filter(|w| w[0].equity != 0.0)
        .map(|w| w[1].equity / w[0].equity - 1.0)
        .collect();
    if returns.len() < 2 {
        return None;
    }

    let mean = returns.iter().mean();
    let std_dev = returns.iter().std_dev();
    if !std_dev.is_finite() || std_dev <= 0.0 {
        return None;
    }
    Some(mean / std_dev * bars_per_year.sqrt())
}

impl BacktestReport {
    pub fn from_summary(summary: &SessionSummary, initial_capital: f64, bars_per_year: f64) -> Self {
        let curve = &summary.equity_curve;
        let final_value = curve.last().map(|p| p.equity).unwrap_or(initial_capital);
        let pnl = final_value - initial_capital;
        let start = curve.first().map(|p| p.timestamp);
        let end = curve.last().map(|p| p.timestamp);
        let days = match (start, end) {
            (Some(s), Some(e)) => (e - s).num_days(),
            _ => 0,
        };

        let annualized_return_pct = (days > 0 && final_value > 0.0).then(|| {
            ((final_value / initial_capital).powf(365.0 / days as f64) - 1.0) * 100.0
        });

        Self {
            pair: format!("{}/{}", summary.instrument_a, summary.instrument_b),
            initial_capital,
            final_value,
            pnl,
            total_return_pct: pnl / initial_capital * 100.0,
            start,
            end,
            days,
            annualized_return_pct,
            sharpe_ratio: sharpe_ratio(curve, bars_per_year),
            max_drawdown_pct: max_drawdown_pct(curve),
            bars: summary.bars,
            signal_bars: summary.signal_bars,
            rejected_orders: summary.rejected_orders,
            final_position: summary.final_position,
            trades: TradeStats::from_trades(&summary.trades),
            trade_log: summary.trades.clone(),
        }
    }
}

impl fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);

        writeln!(f, "{}", rule)?;
        writeln!(f, "BACKTEST RESULTS - {}", self.pair)?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Initial Capital: {:.2}", self.initial_capital)?;
        writeln!(f, "Final Portfolio Value: {:.2}", self.final_value)?;
        writeln!(f, "Total P&L: {:+.2}", self.pnl)?;
        writeln!(f, "Total Return: {:+.2}%", self.total_return_pct)?;
        writeln!(
            f,
            "Backtest Period: {} days ({:.1} years), {} bars, {} with a z-score",
            self.days,
            self.days as f64 / 365.0,
            self.bars,
            self.signal_bars
        )?;
        if let Some(annualized) = self.annualized_return_pct {
            writeln!(f, "Annualized Return: {:+.1}%", annualized)?;
        }

        writeln!(f)?;
        writeln!(f, "PERFORMANCE METRICS")?;
        writeln!(f, "{}", rule)?;
        match self.sharpe_ratio {
            Some(sharpe) => writeln!(f, "Sharpe Ratio: {:.3}", sharpe)?,
            None => writeln!(f, "Sharpe Ratio: N/A")?,
        }
        writeln!(f, "Max Drawdown: {:.2}%", self.max_drawdown_pct)?;

        writeln!(f)?;
        writeln!(f, "TRADE ANALYSIS")?;
        writeln!(f, "{}", rule)?;
        if self.trades.total == 0 {
            writeln!(f, "No trades executed during backtest period")?;
        } else {
            writeln!(f, "Total Trades: {}", self.trades.total)?;
            writeln!(f, "Winning Trades: {}", self.trades.won)?;
            writeln!(f, "Losing Trades: {}", self.trades.lost)?;
            writeln!(f, "Win Rate: {:.1}%", self.trades.win_rate_pct)?;
            if let Some(avg) = self.trades.average_win {
                writeln!(f, "Average Win: {:.2}", avg)?;
            }
            if let Some(avg) = self.trades.average_loss {
                writeln!(f, "Average Loss: {:.2}", avg)?;
            }
            writeln!(f, "Stop-Loss Exits: {}", self.trades.stop_loss_exits)?;
        }
        if self.rejected_orders > 0 {
            writeln!(f, "Rejected Orders: {}", self.rejected_orders)?;
        }
        if !self.final_position.is_flat() {
            writeln!(f, "Open Position at End: {}", self.final_position)?;
        }
        Ok(())
    }
}
