//! PriceBar: one daily close for one ticker.

use super::Ticker;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closing price of a single ticker on a single trading date.
///
/// Within a series handed to the engine, dates are strictly increasing and
/// every close is positive and finite. The engine checks this; the bar type
/// itself does not, so ingestion code can build bars first and validate once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub ticker: Ticker,
    pub date: NaiveDate,
    pub close: f64,
}

impl PriceBar {
    pub fn new(ticker: Ticker, date: NaiveDate, close: f64) -> Self {
        Self {
            ticker,
            date,
            close,
        }
    }

    /// A close the engine can divide by: finite and strictly positive.
    pub fn has_valid_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}
