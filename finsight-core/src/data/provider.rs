//! Price source and ticker registry traits, with structured error types.
//!
//! The engine never fetches data itself. A `PriceSource` hands it an ordered
//! close series per ticker; a `TickerRegistry` says which tickers exist.
//! Both are swappable so tests can run entirely in memory.

use crate::domain::{PriceBar, Ticker};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("symbol not found: {ticker}")]
    SymbolNotFound { ticker: String },

    #[error("I/O error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("source error: {0}")]
    Other(String),
}

/// A source of daily closes.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Full close history for a ticker, ordered by date.
    fn fetch(&self, ticker: &Ticker) -> Result<Vec<PriceBar>, SourceError>;
}

/// The set of tickers a batch refresh should cover.
pub trait TickerRegistry: Send + Sync {
    /// Raw symbols as listed; callers normalise them.
    fn tickers(&self) -> Result<Vec<String>, SourceError>;
}

/// In-memory price source.
#[derive(Debug, Default, Clone)]
pub struct StaticPriceSource {
    series: HashMap<Ticker, Vec<PriceBar>>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, ticker: Ticker, bars: Vec<PriceBar>) -> Self {
        self.insert(ticker, bars);
        self
    }

    pub fn insert(&mut self, ticker: Ticker, bars: Vec<PriceBar>) {
        self.series.insert(ticker, bars);
    }
}

impl PriceSource for StaticPriceSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self, ticker: &Ticker) -> Result<Vec<PriceBar>, SourceError> {
        self.series
            .get(ticker)
            .cloned()
            .ok_or_else(|| SourceError::SymbolNotFound {
                ticker: ticker.to_string(),
            })
    }
}
