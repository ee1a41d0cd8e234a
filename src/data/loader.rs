//! CSV loader for daily underlying bars.
//!
//! Expects a header row with `date,open,high,low,close,volume` columns
//! (the shape produced by the usual daily-bar exports). Bars are returned
//! in chronological order and validated for monotonically increasing dates
//! so the engine never sees an out-of-order series.

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use super::types::PriceBar;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw CSV row. Column names are case-sensitive and lowercase.
#[derive(Debug, Deserialize)]
struct BarRecord {
    date: NaiveDate,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: i64,
}

/// Loads daily bars from CSV files.
pub struct BarLoader;

impl BarLoader {
    /// Load all bars from a CSV file, validating chronological order.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<PriceBar>, LoaderError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoaderError::FileNotFound(path.display().to_string()));
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut bars = Vec::new();

        for record in reader.deserialize() {
            let record: BarRecord = record?;
            if record.close <= Decimal::ZERO {
                return Err(LoaderError::InvalidData(format!(
                    "non-positive close {} on {}",
                    record.close, record.date
                )));
            }
            bars.push(PriceBar {
                date: record.date,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
            });
        }

        if bars.is_empty() {
            return Err(LoaderError::InvalidData(format!(
                "no bars in {}",
                path.display()
            )));
        }

        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(LoaderError::InvalidData(format!(
                    "bars out of order: {} follows {}",
                    pair[1].date, pair[0].date
                )));
            }
        }

        Ok(bars)
    }
}
