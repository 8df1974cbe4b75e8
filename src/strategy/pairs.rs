//! Pairs Signal
//!
//! Per-bar pipeline: incremental spread statistics feeding the state machine.
//! The position stays with the caller and is passed in on every bar.

use crate::domain::position::PositionState;
use crate::domain::price_series::PairBar;
use crate::domain::signal::SignalDecision;
use crate::strategy::params::StrategyConfig;
use crate::strategy::signal_machine::SignalStateMachine;
use crate::strategy::spread_stats::{RollingSpread, SpreadError, ZScorePoint};

/// Statistics and decision for one bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSignal {
    pub point: ZScorePoint,
    pub decision: SignalDecision,
}

#[derive(Debug, Clone)]
pub struct PairsSignal {
    stats: RollingSpread,
    machine: SignalStateMachine,
}

impl PairsSignal {
    pub fn new(
        instrument_a: impl Into<String>,
        instrument_b: impl Into<String>,
        config: &StrategyConfig,
    ) -> Result<Self, SpreadError> {
        config.validate()?;
        Ok(Self {
            stats: RollingSpread::new(instrument_a, instrument_b, config.window)?,
            machine: SignalStateMachine::new(config.thresholds)?,
        })
    }

    /// Feed the next bar. Call exactly once per bar, in timestamp order.
    pub fn on_bar(&mut self, bar: &PairBar, position: PositionState) -> Result<BarSignal, SpreadError> {
        let point = self.stats.push(bar)?;
        let decision = self.machine.decide(point.z_score, position);
        Ok(BarSignal { point, decision })
    }

    pub fn is_ready(&self) -> bool {
        self.stats.is_ready()
    }
}
