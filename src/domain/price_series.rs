//! Price Series
//!
//! Cleaned single-instrument price history and the inner join of two
//! instruments onto a common timestamp index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected market data. Raised before any computation runs, never partially.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("Price series for {instrument} is empty")]
    EmptySeries { instrument: String },
    #[error("Non-positive price {price} for {instrument} at {timestamp}")]
    NonPositivePrice {
        instrument: String,
        timestamp: DateTime<Utc>,
        price: f64,
    },
    #[error("Timestamps for {instrument} not strictly increasing: {current} after {previous}")]
    NonIncreasingTimestamp {
        instrument: String,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
    #[error("No overlapping timestamps between {instrument_a} and {instrument_b}")]
    NoOverlap {
        instrument_a: String,
        instrument_b: String,
    },
}

/// One observation of one instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Ordered price history for a single instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    instrument: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from already-clean points.
    ///
    /// Timestamps must be strictly increasing and every price finite and > 0.
    pub fn new(instrument: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, InputError> {
        let instrument = instrument.into();
        if points.is_empty() {
            return Err(InputError::EmptySeries { instrument });
        }

        for point in &points {
            if !(point.price.is_finite() && point.price > 0.0) {
                return Err(InputError::NonPositivePrice {
                    instrument,
                    timestamp: point.timestamp,
                    price: point.price,
                });
            }
        }

        for pair in points.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(InputError::NonIncreasingTimestamp {
                    instrument,
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }

        Ok(Self { instrument, points })
    }

    /// Build a series from raw rows, dropping rows with a missing or NaN price
    pub fn from_raw(
        instrument: impl Into<String>,
        rows: impl IntoIterator<Item = (DateTime<Utc>, Option<f64>)>,
    ) -> Result<Self, InputError> {
        let points = rows
            .into_iter()
            .filter_map(|(timestamp, price)| match price {
                Some(p) if !p.is_nan() => Some(PricePoint::new(timestamp, p)),
                _ => None,
            })
            .collect();
        Self::new(instrument, points)
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Both instruments' prices at one shared timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairBar {
    pub timestamp: DateTime<Utc>,
    pub price_a: f64,
    pub price_b: f64,
}

impl PairBar {
    pub fn new(timestamp: DateTime<Utc>, price_a: f64, price_b: f64) -> Self {
        Self {
            timestamp,
            price_a,
            price_b,
        }
    }

    /// ln(A) - ln(B). Callers guarantee both prices are positive.
    pub fn log_spread(&self) -> f64 {
        self.price_a.ln() - self.price_b.ln()
    }
}

/// Two series joined on their common timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub instrument_a: String,
    pub instrument_b: String,
    pub bars: Vec<PairBar>,
}

impl AlignedPair {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Inner join of two series on timestamp.
///
/// Timestamps present in only one series are dropped. Both inputs are sorted,
/// so this is a single merge pass.
pub fn align(series_a: &PriceSeries, series_b: &PriceSeries) -> Result<AlignedPair, InputError> {
    let a = series_a.points();
    let b = series_b.points();
    let mut bars = Vec::with_capacity(a.len().min(b.len()));

    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].timestamp.cmp(&b[j].timestamp) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                bars.push(PairBar::new(a[i].timestamp, a[i].price, b[j].price));
                i += 1;
                j += 1;
            }
        }
    }

    if bars.is_empty() {
        return Err(InputError::NoOverlap {
            instrument_a: series_a.instrument().to_string(),
            instrument_b: series_b.instrument().to_string(),
        });
    }

    tracing::debug!(
        "Aligned {} ({} rows) with {} ({} rows): {} common bars",
        series_a.instrument(),
        a.len(),
        series_b.instrument(),
        b.len(),
        bars.len()
    );

    Ok(AlignedPair {
        instrument_a: series_a.instrument().to_string(),
        instrument_b: series_b.instrument().to_string(),
        bars,
    })
}
