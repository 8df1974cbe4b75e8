use async_trait::async_trait;
use thiserror::Error;

use crate::domain::price_series::{InputError, PriceSeries};

/// Market data error type
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Data source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data parsing error: {0}")]
    ParseError(String),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error(transparent)]
    InvalidInput(#[from] InputError),
}

impl From<csv::Error> for MarketDataError {
    fn from(err: csv::Error) -> Self {
        MarketDataError::ParseError(err.to_string())
    }
}

/// Source of historical prices for one named instrument
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Fetch the cleaned close-price history of `instrument`
    async fn fetch_history(&self, instrument: &str) -> Result<PriceSeries, MarketDataError>;

    /// Fetch both legs of a pair
    async fn fetch_pair(
        &self,
        instrument_a: &str,
        instrument_b: &str,
    ) -> Result<(PriceSeries, PriceSeries), MarketDataError> {
        let a = self.fetch_history(instrument_a).await?;
        let b = self.fetch_history(instrument_b).await?;
        Ok((a, b))
    }
}
