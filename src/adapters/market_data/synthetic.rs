//! Synthetic Pair Generator
//!
//! Seeded cointegrated pair for demos and tests:
//! - ln(B) follows a Gaussian random walk
//! - the spread ln(A) - ln(B) follows a discrete OU process around `spread_mean`
//!
//! Each leg can randomly skip bars so the output exercises alignment.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::Normal;

use crate::domain::price_series::{InputError, PricePoint, PriceSeries};

#[derive(Debug, Clone)]
pub struct SyntheticPair {
    pub instrument_a: String,
    pub instrument_b: String,
    pub start: DateTime<Utc>,
    pub interval: Duration,
    pub initial_price_b: f64,
    /// Long-run level of ln(A) - ln(B)
    pub spread_mean: f64,
    /// Per-bar pull of the spread towards its mean, in (0, 1]
    pub reversion: f64,
    /// Per-bar std of the spread innovation
    pub spread_vol: f64,
    /// Per-bar std of ln(B) returns
    pub leg_vol: f64,
    /// Chance that a leg is missing a given bar
    pub gap_probability: f64,
    pub seed: u64,
}

impl SyntheticPair {
    pub fn new(instrument_a: impl Into<String>, instrument_b: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            instrument_a: instrument_a.into(),
            instrument_b: instrument_b.into(),
            start,
            interval: Duration::minutes(5),
            initial_price_b: 5.0,
            spread_mean: 1.7,
            reversion: 0.05,
            spread_vol: 0.002,
            leg_vol: 0.001,
            gap_probability: 0.0,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_gaps(mut self, probability: f64) -> Self {
        self.gap_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Generate `bars` timestamps' worth of both legs
    pub fn generate(&self, bars: usize) -> Result<(PriceSeries, PriceSeries), InputError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let normal = Normal::standard();

        let mut log_b = self.initial_price_b.ln();
        let mut spread = self.spread_mean;
        let mut points_a = Vec::with_capacity(bars);
        let mut points_b = Vec::with_capacity(bars);

        for i in 0..bars {
            let timestamp = self.start + self.interval * i as i32;
            log_b += self.leg_vol * rng.sample(normal);
            spread += self.reversion * (self.spread_mean - spread) + self.spread_vol * rng.sample(normal);

            if !rng.gen_bool(self.gap_probability) {
                points_a.push(PricePoint::new(timestamp, (log_b + spread).exp()));
            }
            if !rng.gen_bool(self.gap_probability) {
                points_b.push(PricePoint::new(timestamp, log_b.exp()));
            }
        }

        Ok((
            PriceSeries::new(self.instrument_a.clone(), points_a)?,
            PriceSeries::new(self.instrument_b.clone(), points_b)?,
        ))
    }
}
