//! Store-wide statistics.

use crate::domain::Ticker;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Row count and date range of one table for one ticker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl TableStats {
    /// Stats over dates in ascending order.
    pub fn from_sorted_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut stats = Self::default();
        for date in dates {
            stats.rows += 1;
            stats.first_date.get_or_insert(date);
            stats.last_date = Some(date);
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub ticker: Ticker,
    pub metrics: TableStats,
    pub prices: TableStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSummary {
    pub ticker_count: usize,
    pub total_metric_rows: usize,
    pub total_price_rows: usize,
    pub first_metric_date: Option<NaiveDate>,
    pub last_metric_date: Option<NaiveDate>,
    pub first_price_date: Option<NaiveDate>,
    pub last_price_date: Option<NaiveDate>,
    /// Sorted by ticker.
    pub tickers: Vec<TickerSummary>,
}

impl StoreSummary {
    pub fn from_tickers(mut tickers: Vec<TickerSummary>) -> Self {
        tickers.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        let mut summary = Self {
            ticker_count: tickers.len(),
            ..Self::default()
        };
        for t in &tickers {
            summary.total_metric_rows += t.metrics.rows;
            summary.total_price_rows += t.prices.rows;
            summary.first_metric_date = min_date(summary.first_metric_date, t.metrics.first_date);
            summary.last_metric_date = summary.last_metric_date.max(t.metrics.last_date);
            summary.first_price_date = min_date(summary.first_price_date, t.prices.first_date);
            summary.last_price_date = summary.last_price_date.max(t.prices.last_date);
        }
        summary.tickers = tickers;
        summary
    }

    pub fn ticker(&self, ticker: &Ticker) -> Option<&TickerSummary> {
        self.tickers.iter().find(|t| &t.ticker == ticker)
    }
}

// `Option::min` treats `None` as smallest, which is the wrong answer here.
fn min_date(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}
