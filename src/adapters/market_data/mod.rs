//! Market Data Adapters
//!
//! Sources of price history and bar streams:
//! - `CsvMarketData`: one `<instrument>.csv` per leg in a data directory
//! - `ReplayFeed`: aligned bars pushed over a channel, one at a time
//! - `SyntheticPair`: seeded cointegrated pair for demos and tests

pub mod csv_file;
pub mod replay;
pub mod synthetic;

pub use csv_file::{CsvMarketData, parse_price_csv, write_price_csv, write_zscore_csv};
pub use replay::ReplayFeed;
pub use synthetic::SyntheticPair;
