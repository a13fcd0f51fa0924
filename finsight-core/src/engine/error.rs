//! Engine error types.

use crate::config::ConfigError;
use crate::domain::Ticker;
use chrono::NaiveDate;
use thiserror::Error;

/// What is wrong with an input price series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputDefect {
    #[error("date {date} at index {index} is before previous date {previous}")]
    OutOfOrder {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("duplicate date {date} at index {index}")]
    DuplicateDate { index: usize, date: NaiveDate },

    #[error("non-positive close {close} on {date}")]
    NonPositiveClose { date: NaiveDate, close: f64 },

    #[error("non-finite close {close} on {date}")]
    NonFiniteClose { date: NaiveDate, close: f64 },

    #[error("bar for {found} on {date} in series for another ticker")]
    ForeignTicker { date: NaiveDate, found: Ticker },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid price series for {ticker}: {defect}")]
    InvalidInput { ticker: Ticker, defect: InputDefect },

    #[error("{metric} for {ticker} on {date} is non-finite ({value})")]
    Computation {
        ticker: Ticker,
        date: NaiveDate,
        metric: String,
        value: f64,
    },

    #[error("invalid metrics config: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// True for errors caused by the caller's data rather than the engine.
    pub fn is_input_error(&self) -> bool {
        matches!(self, EngineError::InvalidInput { .. })
    }
}
