use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::position::PositionState;

/// Action emitted by the signal state machine for one bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignalAction {
    #[default]
    None,
    EnterLong,
    EnterShort,
    Exit,
}

impl SignalAction {
    /// True when the execution side has something to do
    pub fn is_actionable(&self) -> bool {
        !matches!(self, SignalAction::None)
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalAction::None => write!(f, "None"),
            SignalAction::EnterLong => write!(f, "EnterLong"),
            SignalAction::EnterShort => write!(f, "EnterShort"),
            SignalAction::Exit => write!(f, "Exit"),
        }
    }
}

/// Why a position was closed.
///
/// Both reasons produce the same `SignalAction::Exit`; the reason only feeds
/// logging and trade accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    /// |z| fell inside the exit band
    MeanReversion,
    /// |z| blew through the max threshold
    StopLoss,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::MeanReversion => write!(f, "Normal"),
            ExitReason::StopLoss => write!(f, "Stop Loss"),
        }
    }
}

/// Outcome of one decision: the position after the bar and the action to take
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalDecision {
    pub position: PositionState,
    pub action: SignalAction,
    pub exit_reason: Option<ExitReason>,
}

impl SignalDecision {
    /// Keep the current position, do nothing
    pub fn hold(position: PositionState) -> Self {
        Self {
            position,
            action: SignalAction::None,
            exit_reason: None,
        }
    }

    pub fn enter(position: PositionState, action: SignalAction) -> Self {
        Self {
            position,
            action,
            exit_reason: None,
        }
    }

    pub fn exit(reason: ExitReason) -> Self {
        Self {
            position: PositionState::Flat,
            action: SignalAction::Exit,
            exit_reason: Some(reason),
        }
    }

    /// (position, action) pair, the observable part of the decision
    pub fn outcome(&self) -> (PositionState, SignalAction) {
        (self.position, self.action)
    }
}

impl fmt::Display for SignalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_reason {
            Some(reason) => write!(f, "{} -> {} ({})", self.action, self.position, reason),
            None => write!(f, "{} -> {}", self.action, self.position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_has_no_action() {
        let decision = SignalDecision::hold(PositionState::LongSpread);
        assert_eq!(decision.outcome(), (PositionState::LongSpread, SignalAction::None));
        assert!(!decision.action.is_actionable());
        assert!(decision.exit_reason.is_none());
    }

    #[test]
    fn test_exit_goes_flat() {
        let decision = SignalDecision::exit(ExitReason::StopLoss);
        assert_eq!(decision.outcome(), (PositionState::Flat, SignalAction::Exit));
        assert_eq!(decision.exit_reason, Some(ExitReason::StopLoss));
    }

    #[test]
    fn test_display() {
        let decision = SignalDecision::exit(ExitReason::MeanReversion);
        assert_eq!(format!("{}", decision), "Exit -> Flat (Normal)");

        let entry = SignalDecision::enter(PositionState::ShortSpread, SignalAction::EnterShort);
        assert_eq!(format!("{}", entry), "EnterShort -> ShortSpread");
    }
}
