//! Strategy Layer - Rolling Spread Z-Score and Signal State Machine
//!
//! - `spread_stats`: log-price spread, rolling mean / sample std, z-score
//!   (batch and incremental)
//! - `signal_machine`: entry / exit / stop-loss decisions from a z-score and
//!   the current position
//! - `pairs`: both of the above wired together for bar-by-bar use
//! - `params`: window and threshold configuration with validation

pub mod params;
pub mod spread_stats;
pub mod signal_machine;
pub mod pairs;

pub use params::{StrategyConfig, SignalThresholds, ConfigError};
pub use spread_stats::{SpreadStatistics, RollingSpread, ZScoreSeries, ZScorePoint, SpreadError, MIN_STD};
pub use signal_machine::SignalStateMachine;
pub use pairs::{PairsSignal, BarSignal};
