//! Domain Layer - Core types for the pairs strategy
//!
//! Pure domain types with no I/O. All external interactions happen through
//! the ports layer.
//!
//! - `price_series`: cleaned per-instrument history and the two-series inner join
//! - `position`: spread position state and broker-ledger reconciliation
//! - `signal`: per-bar decision emitted by the state machine
//! - `trade`: fills and completed round trips
//! - `portfolio`: cash plus the two legs, for paper execution

pub mod position;
pub mod signal;
pub mod price_series;
pub mod trade;
pub mod portfolio;

pub use position::{PositionState, LegPositions, ReconcileError};
pub use signal::{SignalAction, SignalDecision, ExitReason};
pub use price_series::{PricePoint, PriceSeries, PairBar, AlignedPair, InputError, align};
pub use trade::{Fill, PairTrade};
pub use portfolio::{Portfolio, Holding};
