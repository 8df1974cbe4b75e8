//! Strategy Parameters
//!
//! Rolling window and z-score thresholds for the pairs strategy.
//! Everything is validated up front so no decision can see a bad config.

use serde::{Deserialize, Serialize};

/// Z-score magnitudes that open, close and stop out a spread position.
///
/// Invariant after `validate`: 0 < exit < entry < max.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    /// |z| above this opens a position when flat
    pub entry: f64,
    /// |z| below this closes a position (mean reversion)
    pub exit: f64,
    /// |z| above this closes a position (stop-loss)
    pub max: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            entry: 2.0,
            exit: 0.5,
            max: 4.0,
        }
    }
}

impl SignalThresholds {
    pub fn new(entry: f64, exit: f64, max: f64) -> Result<Self, ConfigError> {
        let thresholds = Self { entry, exit, max };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("entry", self.entry), ("exit", self.exit), ("max", self.max)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositiveThreshold { name, value });
            }
        }
        if self.exit >= self.entry {
            return Err(ConfigError::ExitNotBelowEntry {
                exit: self.exit,
                entry: self.entry,
            });
        }
        if self.entry >= self.max {
            return Err(ConfigError::EntryNotBelowMax {
                entry: self.entry,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Main strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Number of bars in the rolling mean/std window
    pub window: usize,
    pub thresholds: SignalThresholds,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            window: 60,
            thresholds: SignalThresholds::default(),
        }
    }
}

impl StrategyConfig {
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_thresholds(mut self, thresholds: SignalThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_window(self.window)?;
        self.thresholds.validate()
    }
}

/// Window must hold at least two observations for a sample std
pub fn validate_window(window: usize) -> Result<(), ConfigError> {
    if window < 2 {
        return Err(ConfigError::InvalidWindow(window));
    }
    Ok(())
}

/// Strategy configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid window: {0} (must be > 1)")]
    InvalidWindow(usize),
    #[error("Invalid {name} threshold: {value} (must be finite and > 0)")]
    NonPositiveThreshold { name: &'static str, value: f64 },
    #[error("Exit threshold {exit} must be below entry threshold {entry}")]
    ExitNotBelowEntry { exit: f64, entry: f64 },
    #[error("Entry threshold {entry} must be below max threshold {max}")]
    EntryNotBelowMax { entry: f64, max: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StrategyConfig::default();
        assert_eq!(config.window, 60);
        assert_eq!(config.thresholds.entry, 2.0);
        assert_eq!(config.thresholds.exit, 0.5);
        assert_eq!(config.thresholds.max, 4.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let thresholds = SignalThresholds::new(4.0, 1.0, 6.0).unwrap();
        let config = StrategyConfig::default()
            .with_window(240)
            .with_thresholds(thresholds);
        assert_eq!(config.window, 240);
        assert_eq!(config.thresholds.max, 6.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_window() {
        let config = StrategyConfig::default().with_window(1);
        assert_eq!(config.validate(), Err(ConfigError::InvalidWindow(1)));

        let config = StrategyConfig::default().with_window(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidWindow(0)));

        assert!(validate_window(2).is_ok());
    }

    #[test]
    fn test_threshold_ordering() {
        assert!(matches!(
            SignalThresholds::new(2.0, 2.0, 4.0),
            Err(ConfigError::ExitNotBelowEntry { .. })
        ));
        assert!(matches!(
            SignalThresholds::new(2.0, 3.0, 4.0),
            Err(ConfigError::ExitNotBelowEntry { .. })
        ));
        assert!(matches!(
            SignalThresholds::new(4.0, 0.5, 4.0),
            Err(ConfigError::EntryNotBelowMax { .. })
        ));
    }

    #[test]
    fn test_non_positive_thresholds() {
        assert!(matches!(
            SignalThresholds::new(2.0, 0.0, 4.0),
            Err(ConfigError::NonPositiveThreshold { name: "exit", .. })
        ));
        assert!(matches!(
            SignalThresholds::new(2.0, -0.5, 4.0),
            Err(ConfigError::NonPositiveThreshold { .. })
        ));
        assert!(matches!(
            SignalThresholds::new(2.0, 0.5, f64::INFINITY),
            Err(ConfigError::NonPositiveThreshold { name: "max", .. })
        ));
        assert!(matches!(
            SignalThresholds::new(f64::NAN, 0.5, 4.0),
            Err(ConfigError::NonPositiveThreshold { name: "entry", .. })
        ));
    }
}
