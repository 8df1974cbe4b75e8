//! Spread Statistics
//!
//! Rolling z-score of the log-price spread between two instruments.
//!
//! spread = ln(price_a) - ln(price_b)
//! z      = (spread - rolling_mean) / rolling_std
//!
//! The rolling std is the sample standard deviation (denominator N-1) over the
//! trailing `window` spreads, current bar included. Nothing ever looks ahead.
//!
//! Two modes share the same window arithmetic, so for the same bars they agree
//! bit for bit:
//! - `SpreadStatistics::compute` over a full history
//! - `RollingSpread::push` one bar at a time

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::price_series::{align, AlignedPair, InputError, PairBar, PriceSeries};
use crate::strategy::params::{validate_window, ConfigError};

/// Rolling std at or below this is treated as zero: no z-score for the bar
pub const MIN_STD: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpreadError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("Invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Mean and sample std of one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl WindowStats {
    /// z-score of `value`, or None when the window is degenerate
    pub fn z_score(&self, value: f64) -> Option<f64> {
        if !(self.std_dev > MIN_STD) {
            return None;
        }
        Some((value - self.mean) / self.std_dev)
    }
}

/// Two-pass mean / sample std. Callers pass at least two values.
fn window_stats<'a, I>(values: I) -> WindowStats
where
    I: Iterator<Item = &'a f64> + Clone,
{
    let mut n = 0usize;
    let mut sum = 0.0;
    for v in values.clone() {
        sum += *v;
        n += 1;
    }
    let mean = sum / n as f64;

    let squared: f64 = values
        .map(|v| {
            let diff = *v - mean;
            diff * diff
        })
        .sum();
    let variance = squared / (n - 1) as f64;

    WindowStats {
        mean,
        std_dev: variance.sqrt(),
    }
}

/// Statistics for one aligned bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScorePoint {
    pub timestamp: DateTime<Utc>,
    pub spread: f64,
    /// Absent until `window` spreads have been seen
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    /// Absent during warm-up and when the rolling std is zero
    pub z_score: Option<f64>,
}

impl ZScorePoint {
    fn warming_up(timestamp: DateTime<Utc>, spread: f64) -> Self {
        Self {
            timestamp,
            spread,
            mean: None,
            std_dev: None,
            z_score: None,
        }
    }

    fn from_stats(timestamp: DateTime<Utc>, spread: f64, stats: WindowStats) -> Self {
        Self {
            timestamp,
            spread,
            mean: Some(stats.mean),
            std_dev: Some(stats.std_dev),
            z_score: stats.z_score(spread),
        }
    }
}

/// Per-bar spread statistics over a whole history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZScoreSeries {
    pub instrument_a: String,
    pub instrument_b: String,
    pub window: usize,
    pub points: Vec<ZScorePoint>,
}

impl ZScoreSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn z_scores(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.z_score).collect()
    }

    /// Number of bars with a usable z-score
    pub fn defined_count(&self) -> usize {
        self.points.iter().filter(|p| p.z_score.is_some()).count()
    }

    /// Last `n` bars that have a z-score, oldest first
    pub fn latest_defined(&self, n: usize) -> Vec<&ZScorePoint> {
        let mut latest: Vec<&ZScorePoint> = self
            .points
            .iter()
            .rev()
            .filter(|p| p.z_score.is_some())
            .take(n)
            .collect();
        latest.reverse();
        latest
    }
}

fn checked_spread(bar: &PairBar, instrument_a: &str, instrument_b: &str) -> Result<f64, InputError> {
    for (instrument, price) in [(instrument_a, bar.price_a), (instrument_b, bar.price_b)] {
        if !(price.is_finite() && price > 0.0) {
            return Err(InputError::NonPositivePrice {
                instrument: instrument.to_string(),
                timestamp: bar.timestamp,
                price,
            });
        }
    }
    Ok(bar.log_spread())
}

/// Batch computation over a full history
pub struct SpreadStatistics;

impl SpreadStatistics {
    /// Align two series (inner join) and compute the rolling z-score of their spread
    pub fn compute(
        series_a: &PriceSeries,
        series_b: &PriceSeries,
        window: usize,
    ) -> Result<ZScoreSeries, SpreadError> {
        validate_window(window)?;
        let aligned = align(series_a, series_b)?;
        Self::compute_aligned(&aligned, window)
    }

    /// Rolling z-score over bars that are already aligned
    pub fn compute_aligned(pair: &AlignedPair, window: usize) -> Result<ZScoreSeries, SpreadError> {
        validate_window(window)?;
        if pair.is_empty() {
            return Err(InputError::EmptySeries {
                instrument: format!("{}/{}", pair.instrument_a, pair.instrument_b),
            }
            .into());
        }

        // Validate every bar before computing anything
        for bars in pair.bars.windows(2) {
            if bars[1].timestamp <= bars[0].timestamp {
                return Err(InputError::NonIncreasingTimestamp {
                    instrument: format!("{}/{}", pair.instrument_a, pair.instrument_b),
                    previous: bars[0].timestamp,
                    current: bars[1].timestamp,
                }
                .into());
            }
        }
        let spreads = pair
            .bars
            .iter()
            .map(|bar| checked_spread(bar, &pair.instrument_a, &pair.instrument_b))
            .collect::<Result<Vec<f64>, InputError>>()?;

        let points = pair
            .bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let spread = spreads[i];
                if i + 1 < window {
                    ZScorePoint::warming_up(bar.timestamp, spread)
                } else {
                    let stats = window_stats(spreads[i + 1 - window..=i].iter());
                    ZScorePoint::from_stats(bar.timestamp, spread, stats)
                }
            })
            .collect();

        Ok(ZScoreSeries {
            instrument_a: pair.instrument_a.clone(),
            instrument_b: pair.instrument_b.clone(),
            window,
            points,
        })
    }
}

/// Incremental computation: one bar at a time over a trailing buffer.
///
/// Must be fed each bar exactly once in timestamp order.
#[derive(Debug, Clone)]
pub struct RollingSpread {
    instrument_a: String,
    instrument_b: String,
    window: usize,
    buffer: VecDeque<f64>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl RollingSpread {
    pub fn new(
        instrument_a: impl Into<String>,
        instrument_b: impl Into<String>,
        window: usize,
    ) -> Result<Self, SpreadError> {
        validate_window(window)?;
        Ok(Self {
            instrument_a: instrument_a.into(),
            instrument_b: instrument_b.into(),
            window,
            buffer: VecDeque::with_capacity(window),
            last_timestamp: None,
        })
    }

    /// Add the next bar and return its statistics
    pub fn push(&mut self, bar: &PairBar) -> Result<ZScorePoint, SpreadError> {
        if let Some(previous) = self.last_timestamp {
            if bar.timestamp <= previous {
                return Err(InputError::NonIncreasingTimestamp {
                    instrument: format!("{}/{}", self.instrument_a, self.instrument_b),
                    previous,
                    current: bar.timestamp,
                }
                .into());
            }
        }
        let spread = checked_spread(bar, &self.instrument_a, &self.instrument_b)?;

        self.buffer.push_back(spread);
        if self.buffer.len() > self.window {
            self.buffer.pop_front();
        }
        self.last_timestamp = Some(bar.timestamp);

        if self.buffer.len() < self.window {
            return Ok(ZScorePoint::warming_up(bar.timestamp, spread));
        }

        let stats = window_stats(self.buffer.iter());
        Ok(ZScorePoint::from_stats(bar.timestamp, spread, stats))
    }

    /// Check if buffer is full
    pub fn is_ready(&self) -> bool {
        self.buffer.len() >= self.window
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear all buffered history
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price_series::PricePoint;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};
    use statrs::statistics::Statistics;

    fn ts(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap() + Duration::minutes(5 * i)
    }

    fn wavy_pair(n: usize) -> AlignedPair {
        let bars = (0..n)
            .map(|i| {
                let t = i as f64;
                let price_a = 25.0 + (t * 0.7).sin() + 0.01 * t;
                let price_b = 5.0 + 0.2 * (t * 0.3).cos();
                PairBar::new(ts(i as i64), price_a, price_b)
            })
            .collect();
        AlignedPair {
            instrument_a: "SHEL.L".to_string(),
            instrument_b: "BP.L".to_string(),
            bars,
        }
    }

    fn series(name: &str, prices: &[f64]) -> PriceSeries {
        PriceSeries::new(
            name,
            prices
                .iter()
                .enumerate()
                .map(|(i, &p)| PricePoint::new(ts(i as i64), p))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_warm_up_has_no_zscore() {
        let pair = wavy_pair(30);
        let result = SpreadStatistics::compute_aligned(&pair, 10).unwrap();

        assert_eq!(result.len(), 30);
        for point in &result.points[..9] {
            assert!(point.z_score.is_none());
            assert!(point.mean.is_none());
            assert!(point.std_dev.is_none());
        }
        assert!(result.points[9].z_score.is_some());
        assert_eq!(result.defined_count(), 21);
    }

    #[test]
    fn test_spread_is_log_difference() {
        let a = series("A", &[10.0, 20.0]);
        let b = series("B", &[5.0, 5.0]);
        let result = SpreadStatistics::compute(&a, &b, 2).unwrap();

        assert_relative_eq!(result.points[0].spread, (2.0f64).ln(), epsilon = 1e-12);
        assert_relative_eq!(result.points[1].spread, (4.0f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_sample_std_convention() {
        let pair = wavy_pair(20);
        let window = 8;
        let result = SpreadStatistics::compute_aligned(&pair, window).unwrap();

        let spreads: Vec<f64> = pair.bars.iter().map(|b| b.log_spread()).collect();
        let last = &spreads[spreads.len() - window..];
        let expected_mean = last.iter().mean();
        let expected_std = last.iter().std_dev();

        let point = result.points.last().unwrap();
        assert_relative_eq!(point.mean.unwrap(), expected_mean, epsilon = 1e-12);
        assert_relative_eq!(point.std_dev.unwrap(), expected_std, epsilon = 1e-12);
        assert_relative_eq!(
            point.z_score.unwrap(),
            (point.spread - expected_mean) / expected_std,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_known_window() {
        // spreads ln(e^k) - ln(1) = k for k = 1, 2, 3
        let bars = (1..=3)
            .map(|k| PairBar::new(ts(k), (k as f64).exp(), 1.0))
            .collect();
        let pair = AlignedPair {
            instrument_a: "A".to_string(),
            instrument_b: "B".to_string(),
            bars,
        };
        let result = SpreadStatistics::compute_aligned(&pair, 3).unwrap();
        let point = result.points[2];

        // mean 2, sample std 1, z = (3 - 2) / 1
        assert_relative_eq!(point.mean.unwrap(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(point.std_dev.unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(point.z_score.unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_constant_spread_has_no_zscore() {
        // A is always 2x B: the spread is flat at ln(2)
        let prices_b: Vec<f64> = (0..80).map(|i| 10.0 + i as f64 * 0.25).collect();
        let prices_a: Vec<f64> = prices_b.iter().map(|p| p * 2.0).collect();
        let result =
            SpreadStatistics::compute(&series("A", &prices_a), &series("B", &prices_b), 60).unwrap();

        assert_eq!(result.defined_count(), 0);
        let last = result.points.last().unwrap();
        assert!(last.std_dev.unwrap() <= MIN_STD);
        assert!(last.z_score.is_none());
    }

    #[test]
    fn test_invalid_window() {
        let pair = wavy_pair(10);
        assert!(matches!(
            SpreadStatistics::compute_aligned(&pair, 1),
            Err(SpreadError::InvalidConfig(ConfigError::InvalidWindow(1)))
        ));
        assert!(RollingSpread::new("A", "B", 0).is_err());
    }

    #[test]
    fn test_non_positive_price_rejected_before_compute() {
        let mut pair = wavy_pair(10);
        pair.bars[7].price_b = 0.0;
        assert!(matches!(
            SpreadStatistics::compute_aligned(&pair, 3),
            Err(SpreadError::InvalidInput(InputError::NonPositivePrice { .. }))
        ));
    }

    #[test]
    fn test_no_overlap_rejected() {
        let a = PriceSeries::new("A", vec![PricePoint::new(ts(0), 1.0)]).unwrap();
        let b = PriceSeries::new("B", vec![PricePoint::new(ts(1), 1.0)]).unwrap();
        assert!(matches!(
            SpreadStatistics::compute(&a, &b, 2),
            Err(SpreadError::InvalidInput(InputError::NoOverlap { .. }))
        ));
    }

    #[test]
    fn test_empty_aligned_pair_rejected() {
        let pair = AlignedPair {
            instrument_a: "A".to_string(),
            instrument_b: "B".to_string(),
            bars: vec![],
        };
        assert!(matches!(
            SpreadStatistics::compute_aligned(&pair, 2),
            Err(SpreadError::InvalidInput(InputError::EmptySeries { .. }))
        ));
    }

    #[test]
    fn test_batch_rejects_out_of_order_bars() {
        let mut pair = wavy_pair(6);
        pair.bars.swap(2, 3);
        assert!(matches!(
            SpreadStatistics::compute_aligned(&pair, 2),
            Err(SpreadError::InvalidInput(InputError::NonIncreasingTimestamp { .. }))
        ));

        // Duplicate timestamp, as the incremental path would also refuse
        let mut pair = wavy_pair(6);
        pair.bars[4].timestamp = pair.bars[3].timestamp;
        assert!(SpreadStatistics::compute_aligned(&pair, 2).is_err());
    }

    #[test]
    fn test_incremental_matches_batch() {
        let window = 12;
        let pair = wavy_pair(window + 40);
        let batch = SpreadStatistics::compute_aligned(&pair, window).unwrap();

        let mut rolling = RollingSpread::new("SHEL.L", "BP.L", window).unwrap();
        let incremental: Vec<ZScorePoint> = pair
            .bars
            .iter()
            .map(|bar| rolling.push(bar).unwrap())
            .collect();

        assert_eq!(incremental, batch.points);
        assert!(batch.defined_count() > 5);
    }

    #[test]
    fn test_rolling_buffer() {
        let pair = wavy_pair(15);
        let mut rolling = RollingSpread::new("A", "B", 10).unwrap();

        for bar in &pair.bars[..9] {
            assert!(rolling.push(bar).unwrap().z_score.is_none());
        }
        assert!(!rolling.is_ready());

        rolling.push(&pair.bars[9]).unwrap();
        assert!(rolling.is_ready());

        for bar in &pair.bars[10..] {
            rolling.push(bar).unwrap();
        }
        assert_eq!(rolling.buffer_len(), 10);
    }

    #[test]
    fn test_rolling_rejects_out_of_order_bars() {
        let pair = wavy_pair(3);
        let mut rolling = RollingSpread::new("A", "B", 2).unwrap();
        rolling.push(&pair.bars[1]).unwrap();

        assert!(matches!(
            rolling.push(&pair.bars[0]),
            Err(SpreadError::InvalidInput(InputError::NonIncreasingTimestamp { .. }))
        ));
        // Duplicate delivery
        assert!(rolling.push(&pair.bars[1]).is_err());
        // The buffer was not touched by the rejected bars
        assert_eq!(rolling.buffer_len(), 1);
    }

    #[test]
    fn test_reset() {
        let pair = wavy_pair(5);
        let mut rolling = RollingSpread::new("A", "B", 2).unwrap();
        for bar in &pair.bars {
            rolling.push(bar).unwrap();
        }
        rolling.reset();
        assert_eq!(rolling.buffer_len(), 0);
        assert!(!rolling.is_ready());
        // Earlier bars are accepted again after a reset
        assert!(rolling.push(&pair.bars[0]).is_ok());
    }

    #[test]
    fn test_latest_defined() {
        let pair = wavy_pair(20);
        let result = SpreadStatistics::compute_aligned(&pair, 5).unwrap();
        let latest = result.latest_defined(5);

        assert_eq!(latest.len(), 5);
        assert_eq!(latest[4].timestamp, pair.bars[19].timestamp);
        assert_eq!(latest[0].timestamp, pair.bars[15].timestamp);
    }
}
