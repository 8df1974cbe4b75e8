//! Ports Layer - Trait definitions for external collaborators
//!
//! Following hexagonal architecture, these traits abstract:
//! - Market data (named price histories)
//! - Order execution and the account ledger

pub mod market_data;
pub mod execution;

pub use market_data::{MarketDataPort, MarketDataError};
pub use execution::{ExecutionPort, ExecutionError, PairOrder, AccountSnapshot};

#[cfg(test)]
pub use execution::MockExecutionPort;
