//! CSV price source: one `{TICKER}.csv` per ticker in a directory.
//!
//! Required columns are `date` (YYYY-MM-DD) and `close`; other columns are
//! ignored, so Yahoo-style exports (`Date,Open,High,Low,Close,...`) load as-is.
//! Rows are returned in file order.

use super::provider::{PriceSource, SourceError};
use crate::domain::{PriceBar, Ticker};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Close")]
    close: f64,
}

#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    dir: PathBuf,
}

impl CsvPriceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, ticker: &Ticker) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }
}

impl PriceSource for CsvPriceSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, ticker: &Ticker) -> Result<Vec<PriceBar>, SourceError> {
        let path = self.path_for(ticker);
        let file = File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SourceError::SymbolNotFound {
                ticker: ticker.to_string(),
            },
            _ => SourceError::Io {
                path: path.clone(),
                message: e.to_string(),
            },
        })?;

        let mut reader = csv::Reader::from_reader(file);
        reader
            .deserialize::<CsvRow>()
            .enumerate()
            .map(|(i, row)| {
                let row = row.map_err(|e| {
                    SourceError::Parse(format!("{} record {}: {e}", path.display(), i + 1))
                })?;
                Ok(PriceBar::new(ticker.clone(), row.date, row.close))
            })
            .collect()
    }
}
