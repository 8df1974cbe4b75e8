//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    Config, ConfigError, PairSection, StrategySection, BacktestSection, DataSection,
    load_config, parse_config, DATA_DIR_ENV,
};
