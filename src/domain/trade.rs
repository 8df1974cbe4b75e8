use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::position::PositionState;
use crate::domain::signal::ExitReason;

/// Execution of one order against both legs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub timestamp: DateTime<Utc>,
    /// Signed units traded in leg A (+ buy, - sell)
    pub units_a: f64,
    /// Signed units traded in leg B (+ buy, - sell)
    pub units_b: f64,
    /// Executed price of leg A, after slippage
    pub price_a: f64,
    /// Executed price of leg B, after slippage
    pub price_b: f64,
    pub commission: f64,
}

impl Fill {
    /// Net cash flow of the fill: proceeds of sells minus cost of buys and commission
    pub fn cash_flow(&self) -> f64 {
        -(self.units_a * self.price_a) - (self.units_b * self.price_b) - self.commission
    }
}

/// A completed entry/exit round trip on the spread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTrade {
    pub side: PositionState,
    pub units: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_z: f64,
    pub exit_z: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl PairTrade {
    /// Build the round trip from its entry and exit fills
    pub fn from_fills(
        side: PositionState,
        entry: &Fill,
        exit: &Fill,
        entry_z: f64,
        exit_z: f64,
        exit_reason: ExitReason,
    ) -> Self {
        Self {
            side,
            units: entry.units_a.abs(),
            entry_time: entry.timestamp,
            exit_time: exit.timestamp,
            entry_z,
            exit_z,
            pnl: entry.cash_flow() + exit.cash_flow(),
            exit_reason,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}

impl fmt::Display for PairTrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x{} {} -> {} z {:.2} -> {:.2} P&L {:+.2} ({})",
            self.side,
            self.units,
            self.entry_time.format("%Y-%m-%d %H:%M"),
            self.exit_time.format("%Y-%m-%d %H:%M"),
            self.entry_z,
            self.exit_z,
            self.pnl,
            self.exit_reason
        )
    }
}
