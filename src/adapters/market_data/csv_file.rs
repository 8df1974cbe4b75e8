//! CSV Market Data
//!
//! One file per instrument, `<dir>/<instrument>.csv`, with a timestamp column
//! and a close column. Accepts the column names written by common downloaders
//! (`timestamp`/`datetime`/`date`, `close`). Empty close cells are missing
//! bars and get dropped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::domain::price_series::PriceSeries;
use crate::ports::market_data::{MarketDataError, MarketDataPort};
use crate::strategy::spread_stats::ZScoreSeries;

const TIMESTAMP_COLUMNS: [&str; 3] = ["timestamp", "datetime", "date"];
const CLOSE_COLUMN: &str = "close";

#[derive(Debug, Clone)]
pub struct CsvMarketData {
    dir: PathBuf,
}

impl CsvMarketData {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, instrument: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", instrument))
    }
}

#[async_trait]
impl MarketDataPort for CsvMarketData {
    async fn fetch_history(&self, instrument: &str) -> Result<PriceSeries, MarketDataError> {
        let path = self.path_for(instrument);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MarketDataError::UnknownInstrument(format!(
                    "{} (no file at {})",
                    instrument,
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let series = parse_price_csv(instrument, &content)?;
        tracing::info!(
            "Loaded {} bars for {} from {}",
            series.len(),
            instrument,
            path.display()
        );
        Ok(series)
    }
}

/// Parse a timestamp in RFC 3339, `YYYY-MM-DD HH:MM:SS[+HH:MM]` or `YYYY-MM-DD`
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, MarketDataError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(MarketDataError::ParseError(format!("Unrecognised timestamp: {}", raw)))
}

/// Parse one instrument's CSV content into a cleaned series
pub fn parse_price_csv(instrument: &str, content: &str) -> Result<PriceSeries, MarketDataError> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let find = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
    };
    let ts_idx = find(&TIMESTAMP_COLUMNS)
        .ok_or_else(|| MarketDataError::ParseError(format!("{}: missing timestamp column", instrument)))?;
    let close_idx = find(&[CLOSE_COLUMN])
        .ok_or_else(|| MarketDataError::ParseError(format!("{}: missing close column", instrument)))?;

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let timestamp = parse_timestamp(record.get(ts_idx).unwrap_or_default())?;

        let price = match record.get(close_idx).map(str::trim) {
            None | Some("") => None,
            Some(cell) => Some(cell.parse::<f64>().map_err(|e| {
                MarketDataError::ParseError(format!(
                    "{}: invalid close '{}' on row {}: {}",
                    instrument,
                    cell,
                    line + 1,
                    e
                ))
            })?),
        };
        if price.map_or(true, f64::is_nan) {
            dropped += 1;
        }
        rows.push((timestamp, price));
    }

    if dropped > 0 {
        tracing::debug!("{}: dropped {} rows with missing close", instrument, dropped);
    }

    Ok(PriceSeries::from_raw(instrument, rows)?)
}

/// Write a price series in the format `parse_price_csv` reads
pub fn write_price_csv(path: &Path, series: &PriceSeries) -> Result<(), MarketDataError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["timestamp", "close"])?;
    for point in series.points() {
        writer.write_record([point.timestamp.to_rfc3339(), point.price.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Export per-bar spread statistics; undefined values are left empty
pub fn write_zscore_csv(path: &Path, series: &ZScoreSeries) -> Result<(), MarketDataError> {
    let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["timestamp", "spread", "mean", "std_dev", "zscore"])?;
    for point in &series.points {
        writer.write_record([
            point.timestamp.to_rfc3339(),
            point.spread.to_string(),
            opt(point.mean),
            opt(point.std_dev),
            opt(point.z_score),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
