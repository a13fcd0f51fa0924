//! Metrics store: idempotent persistence of metric rows and raw price bars.
//!
//! Both tables are keyed by (ticker, date). Upserting a row whose key already
//! exists replaces it; upserting identical rows twice leaves the store
//! unchanged.
//!
//! Implementations:
//! - [`MemoryStore`]: in-process, for tests and embedders
//! - [`ParquetStore`]: one Parquet file per (table, ticker) with a JSON sidecar

pub mod frame;
pub mod memory;
pub mod parquet;
pub mod summary;

pub use memory::MemoryStore;
pub use parquet::{ParquetStore, StoreConfig, Table, TableMeta};
pub use summary::{StoreSummary, TableStats, TickerSummary};

use crate::domain::{MetricId, MetricRow, PriceBar, Ticker};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable at {}: {message}", path.display())]
    Unavailable { path: PathBuf, message: String },

    #[error("corrupt table {} (quarantined): {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("row for {found} passed to upsert for {expected}")]
    TickerMismatch { expected: Ticker, found: Ticker },
}

impl StoreError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        StoreError::Unavailable {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Persistent storage for price bars and computed metric rows.
///
/// Upserts for the same ticker are serialised inside the store; different
/// tickers never wait on each other.
pub trait MetricsStore: Send + Sync {
    /// Insert or replace metric rows by date. Returns the number of distinct
    /// dates written.
    fn upsert(&self, ticker: &Ticker, rows: &[MetricRow]) -> Result<usize, StoreError>;

    /// Insert or replace price bars by date.
    fn upsert_prices(&self, ticker: &Ticker, bars: &[PriceBar]) -> Result<usize, StoreError>;

    /// Row with the greatest date, `None` if the ticker has no metric rows.
    fn latest(&self, ticker: &Ticker) -> Result<Option<MetricRow>, StoreError>;

    /// Every stored metric row for the ticker, ascending by date.
    fn metrics(&self, ticker: &Ticker) -> Result<Vec<MetricRow>, StoreError>;

    /// Every stored price bar for the ticker, ascending by date.
    fn prices(&self, ticker: &Ticker) -> Result<Vec<PriceBar>, StoreError>;

    /// Tickers with stored prices or metrics, sorted.
    fn tickers(&self) -> Result<Vec<Ticker>, StoreError>;

    fn summary(&self) -> Result<StoreSummary, StoreError>;
}

impl<S: MetricsStore + ?Sized> MetricsStore for Arc<S> {
    fn upsert(&self, ticker: &Ticker, rows: &[MetricRow]) -> Result<usize, StoreError> {
        (**self).upsert(ticker, rows)
    }

    fn upsert_prices(&self, ticker: &Ticker, bars: &[PriceBar]) -> Result<usize, StoreError> {
        (**self).upsert_prices(ticker, bars)
    }

    fn latest(&self, ticker: &Ticker) -> Result<Option<MetricRow>, StoreError> {
        (**self).latest(ticker)
    }

    fn metrics(&self, ticker: &Ticker) -> Result<Vec<MetricRow>, StoreError> {
        (**self).metrics(ticker)
    }

    fn prices(&self, ticker: &Ticker) -> Result<Vec<PriceBar>, StoreError> {
        (**self).prices(ticker)
    }

    fn tickers(&self) -> Result<Vec<Ticker>, StoreError> {
        (**self).tickers()
    }

    fn summary(&self) -> Result<StoreSummary, StoreError> {
        (**self).summary()
    }
}

/// A row keyed by (ticker, date).
pub trait Keyed: Clone {
    fn ticker(&self) -> &Ticker;
    fn date(&self) -> NaiveDate;
}

impl Keyed for MetricRow {
    fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Keyed for PriceBar {
    fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Reject rows that belong to a different ticker.
pub(crate) fn check_ticker<T: Keyed>(ticker: &Ticker, rows: &[T]) -> Result<(), StoreError> {
    match rows.iter().find(|r| r.ticker() != ticker) {
        Some(row) => Err(StoreError::TickerMismatch {
            expected: ticker.clone(),
            found: row.ticker().clone(),
        }),
        None => Ok(()),
    }
}

/// Overlay `incoming` onto `table` by date. Later duplicates within
/// `incoming` win. Returns the number of distinct dates written.
pub(crate) fn merge_by_date<T: Keyed>(table: &mut BTreeMap<NaiveDate, T>, incoming: &[T]) -> usize {
    let mut written = BTreeSet::new();
    for row in incoming {
        table.insert(row.date(), row.clone());
        written.insert(row.date());
    }
    written.len()
}

/// Give every stored row the same metric columns: the union of all ids, with
/// `None` where a row has no value. A Parquet table can only hold this shape,
/// so both stores keep it.
pub(crate) fn align_metric_columns(table: &mut BTreeMap<NaiveDate, MetricRow>) {
    let ids: BTreeSet<MetricId> = table
        .values()
        .flat_map(|r| r.values.keys().copied())
        .collect();
    for row in table.values_mut() {
        for id in &ids {
            row.values.entry(*id).or_insert(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ticker: &str, day: u32, close: f64) -> PriceBar {
        PriceBar::new(
            Ticker::parse(ticker).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            close,
        )
    }

    #[test]
    fn merge_overwrites_and_counts_distinct_dates() {
        let mut table = BTreeMap::new();
        assert_eq!(merge_by_date(&mut table, &[bar("SPY", 1, 1.0), bar("SPY", 2, 2.0)]), 2);
        assert_eq!(
            merge_by_date(&mut table, &[bar("SPY", 2, 5.0), bar("SPY", 2, 6.0)]),
            1
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.values().last().unwrap().close, 6.0);
    }

    #[test]
    fn check_ticker_reports_first_foreign_row() {
        let spy = Ticker::parse("SPY").unwrap();
        let rows = [bar("SPY", 1, 1.0), bar("QQQ", 2, 1.0)];
        match check_ticker(&spy, &rows) {
            Err(StoreError::TickerMismatch { expected, found }) => {
                assert_eq!(expected.as_str(), "SPY");
                assert_eq!(found.as_str(), "QQQ");
            }
            other => panic!("expected TickerMismatch, got {other:?}"),
        }
        assert!(check_ticker(&spy, &rows[..1]).is_ok());
    }

    #[test]
    fn align_fills_missing_metric_ids_with_none() {
        let spy = Ticker::parse("SPY").unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2024, 2, d).unwrap();
        let mut table = BTreeMap::new();
        table.insert(
            day(1),
            MetricRow::new(spy.clone(), day(1)).with_value(MetricId::sma(3), Some(1.0)),
        );
        table.insert(
            day(2),
            MetricRow::new(spy, day(2)).with_value(MetricId::sma(5), Some(2.0)),
        );

        align_metric_columns(&mut table);
        for row in table.values() {
            let ids: Vec<MetricId> = row.values.keys().copied().collect();
            assert_eq!(ids.len(), 2);
        }
        assert_eq!(table[&day(1)].values[&MetricId::sma(5)], None);
        assert_eq!(table[&day(2)].sma(5), Some(2.0));
    }
}
