//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - CLI: Command-line interface handlers
//! - Market Data: CSV history, bar replay and synthetic pairs
//! - Paper Broker: simulated fills and the two-leg ledger

pub mod cli;
pub mod market_data;
pub mod paper_broker;

pub use cli::CliApp;
pub use market_data::{CsvMarketData, ReplayFeed, SyntheticPair};
pub use paper_broker::{PaperBroker, PaperBrokerConfig};
