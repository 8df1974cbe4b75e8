//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/pairs.toml.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::strategy::params::{SignalThresholds, StrategyConfig};

/// Env var that overrides `[data].dir`
pub const DATA_DIR_ENV: &str = "PAIRS_DATA_DIR";

/// Main configuration structure matching config/pairs.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pair: PairSection,
    pub strategy: StrategySection,
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub data: DataSection,
}

/// Instruments making up the pair
#[derive(Debug, Clone, Deserialize)]
pub struct PairSection {
    /// Leg A: long in a LongSpread position
    pub instrument_a: String,
    /// Leg B: short in a LongSpread position
    pub instrument_b: String,
}

impl PairSection {
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.instrument_a, self.instrument_b)
    }
}

/// Strategy configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct StrategySection {
    /// Bars in the rolling window (240 five-minute bars = 20 hours)
    pub window: usize,
    /// |z| above which a flat book opens a position
    pub entry_threshold: f64,
    /// |z| below which an open position is closed
    pub exit_threshold: f64,
    /// |z| above which an open position is stopped out
    pub max_threshold: f64,
}

/// Paper broker and sizing used by backtests
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    /// Starting cash
    pub initial_cash: f64,
    /// Slippage as a fraction of price (0.0002 = 2 bps)
    pub slippage: f64,
    /// Commission as a fraction of traded notional
    pub commission: f64,
    /// Share of cash available to a new entry
    pub cash_fraction: f64,
    /// Cap on cash committed to one entry
    pub max_allocation: f64,
    /// Floor on units per leg
    pub min_units: u32,
    /// Cash per unit when sizing an entry
    pub unit_cost: f64,
    /// Bars per year, for annualizing the Sharpe ratio
    pub bars_per_year: f64,
    /// Derive the position from broker legs before every decision
    pub reconcile_positions: bool,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            initial_cash: 500.0,
            slippage: 0.0002,
            commission: 0.0,
            cash_fraction: 0.9,
            max_allocation: 450.0,
            min_units: 20,
            unit_cost: 80.0,
            // 102 five-minute bars per 8.5h session, 252 sessions
            bars_per_year: 25_704.0,
            reconcile_positions: true,
        }
    }
}

/// Location of market data files
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Directory holding one `<instrument>.csv` per leg
    pub dir: String,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            dir: "data".to_string(),
        }
    }
}

impl DataSection {
    /// Data directory with env override and `~` expansion.
    /// Checks PAIRS_DATA_DIR first, falls back to the config value.
    pub fn resolve_dir(&self) -> PathBuf {
        let raw = std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| self.dir.clone());
        PathBuf::from(shellexpand::tilde(&raw).to_string())
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid strategy parameters: {0}")]
    Strategy(#[from] crate::strategy::params::ConfigError),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pair.instrument_a.trim().is_empty() || self.pair.instrument_b.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "instrument identifiers cannot be empty".to_string(),
            ));
        }

        if self.pair.instrument_a == self.pair.instrument_b {
            return Err(ConfigError::ValidationError(format!(
                "pair legs must differ, got {} twice",
                self.pair.instrument_a
            )));
        }

        StrategyConfig::from(self).validate()?;

        let bt = &self.backtest;
        if !(bt.initial_cash.is_finite() && bt.initial_cash > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "initial_cash must be > 0, got {}",
                bt.initial_cash
            )));
        }

        if !(0.0..1.0).contains(&bt.slippage) {
            return Err(ConfigError::ValidationError(format!(
                "slippage must be in [0, 1), got {}",
                bt.slippage
            )));
        }

        if !(0.0..1.0).contains(&bt.commission) {
            return Err(ConfigError::ValidationError(format!(
                "commission must be in [0, 1), got {}",
                bt.commission
            )));
        }

        if bt.cash_fraction <= 0.0 || bt.cash_fraction > 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "cash_fraction must be in (0, 1], got {}",
                bt.cash_fraction
            )));
        }

        if bt.max_allocation <= 0.0 || bt.unit_cost <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "max_allocation and unit_cost must be > 0, got {} and {}",
                bt.max_allocation, bt.unit_cost
            )));
        }

        if bt.bars_per_year <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "bars_per_year must be > 0, got {}",
                bt.bars_per_year
            )));
        }

        if self.data.dir.is_empty() {
            return Err(ConfigError::ValidationError(
                "data dir cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// Conversion from Config to StrategyConfig
impl From<&Config> for StrategyConfig {
    fn from(config: &Config) -> Self {
        StrategyConfig {
            window: config.strategy.window,
            thresholds: SignalThresholds {
                entry: config.strategy.entry_threshold,
                exit: config.strategy.exit_threshold,
                max: config.strategy.max_threshold,
            },
        }
    }
}
