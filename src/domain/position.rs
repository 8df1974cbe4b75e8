use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Spread position held by the strategy.
///
/// `LongSpread` is long instrument A / short instrument B,
/// `ShortSpread` is the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    LongSpread,
    ShortSpread,
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionState::Flat => write!(f, "Flat"),
            PositionState::LongSpread => write!(f, "LongSpread"),
            PositionState::ShortSpread => write!(f, "ShortSpread"),
        }
    }
}

/// Signed unit holdings of the two legs as reported by a broker ledger
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LegPositions {
    pub units_a: f64,
    pub units_b: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("Legs have the same direction: A={units_a}, B={units_b}")]
    SameDirection { units_a: f64, units_b: f64 },
    #[error("Only one leg is open: A={units_a}, B={units_b}")]
    OneLegged { units_a: f64, units_b: f64 },
    #[error("Leg size is not finite: A={units_a}, B={units_b}")]
    NonFinite { units_a: f64, units_b: f64 },
}

impl LegPositions {
    pub fn new(units_a: f64, units_b: f64) -> Self {
        Self { units_a, units_b }
    }

    pub fn is_flat(&self) -> bool {
        self.units_a == 0.0 && self.units_b == 0.0
    }

    /// Derive the authoritative spread position from the ledger.
    ///
    /// Only offsetting legs map to a spread position. Anything else means the
    /// ledger and the strategy have diverged and the caller must intervene.
    pub fn reconcile(&self) -> Result<PositionState, ReconcileError> {
        let LegPositions { units_a, units_b } = *self;
        if !units_a.is_finite() || !units_b.is_finite() {
            return Err(ReconcileError::NonFinite { units_a, units_b });
        }

        match (units_a.partial_cmp(&0.0), units_b.partial_cmp(&0.0)) {
            (Some(std::cmp::Ordering::Equal), Some(std::cmp::Ordering::Equal)) => {
                Ok(PositionState::Flat)
            }
            (Some(std::cmp::Ordering::Greater), Some(std::cmp::Ordering::Less)) => {
                Ok(PositionState::LongSpread)
            }
            (Some(std::cmp::Ordering::Less), Some(std::cmp::Ordering::Greater)) => {
                Ok(PositionState::ShortSpread)
            }
            (Some(std::cmp::Ordering::Equal), _) | (_, Some(std::cmp::Ordering::Equal)) => {
                Err(ReconcileError::OneLegged { units_a, units_b })
            }
            _ => Err(ReconcileError::SameDirection { units_a, units_b }),
        }
    }
}
