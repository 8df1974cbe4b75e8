//! Signal State Machine
//!
//! Maps (z-score, current position) to (next position, action).
//!
//! In a position, checked in order:
//! 1. no z-score          -> hold
//! 2. |z| > max           -> exit (stop-loss)
//! 3. |z| < exit          -> exit (mean reversion)
//! 4. otherwise           -> hold
//!
//! Flat:
//! - z >  entry           -> ShortSpread (spread too rich: short A, long B)
//! - z < -entry           -> LongSpread  (spread too cheap: long A, short B)
//! - otherwise            -> stay flat
//!
//! All comparisons are strict, so z == entry does not open a position.
//! The machine holds no position of its own; the caller threads it through.

use crate::domain::position::PositionState;
use crate::domain::signal::{ExitReason, SignalAction, SignalDecision};
use crate::strategy::params::{ConfigError, SignalThresholds};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalStateMachine {
    thresholds: SignalThresholds,
}

impl SignalStateMachine {
    pub fn new(thresholds: SignalThresholds) -> Result<Self, ConfigError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &SignalThresholds {
        &self.thresholds
    }

    /// Decide the next position and action for one bar.
    ///
    /// `None` or NaN z means no signal for the bar and always yields a no-op.
    pub fn decide(&self, z: Option<f64>, position: PositionState) -> SignalDecision {
        let z = match z {
            Some(z) if !z.is_nan() => z,
            _ => return SignalDecision::hold(position),
        };

        match position {
            PositionState::LongSpread | PositionState::ShortSpread => {
                if z.abs() > self.thresholds.max {
                    SignalDecision::exit(ExitReason::StopLoss)
                } else if z.abs() < self.thresholds.exit {
                    SignalDecision::exit(ExitReason::MeanReversion)
                } else {
                    SignalDecision::hold(position)
                }
            }
            PositionState::Flat => {
                if z > self.thresholds.entry {
                    SignalDecision::enter(PositionState::ShortSpread, SignalAction::EnterShort)
                } else if z < -self.thresholds.entry {
                    SignalDecision::enter(PositionState::LongSpread, SignalAction::EnterLong)
                } else {
                    SignalDecision::hold(PositionState::Flat)
                }
            }
        }
    }
}

impl Default for SignalStateMachine {
    fn default() -> Self {
        Self {
            thresholds: SignalThresholds::default(),
        }
    }
}
