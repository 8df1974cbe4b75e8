//! Application Layer - Sessions, backtests and streaming
//!
//! - `session`: per-bar driver owning the spread position
//! - `backtest`: batch replay of an aligned pair through a session
//! - `report`: performance summary of a finished session
//! - `signal_runner`: channel-fed session loop with graceful stop

pub mod session;
pub mod backtest;
pub mod report;
pub mod signal_runner;

pub use session::{
    TradingSession, SessionError, SessionSummary, BarOutcome, EquityPoint, PositionSizing,
};
pub use backtest::{BacktestSettings, run_backtest};
pub use report::{BacktestReport, TradeStats};
pub use signal_runner::{SignalRunner, RunnerStatus};
