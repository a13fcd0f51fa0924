//! In-memory store.

use super::{
    align_metric_columns, check_ticker, merge_by_date, MetricsStore, StoreError, StoreSummary, TableStats, TickerSummary,
};
use crate::domain::{MetricRow, PriceBar, Ticker};
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct TickerTables {
    metrics: BTreeMap<NaiveDate, MetricRow>,
    prices: BTreeMap<NaiveDate, PriceBar>,
}

/// Per-ticker tables behind their own locks.
///
/// The outer map lock is held only to find or create a ticker's tables; the
/// write lock on those tables serialises upserts for that ticker.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Ticker, Arc<RwLock<TickerTables>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, ticker: &Ticker) -> Option<Arc<RwLock<TickerTables>>> {
        self.tables.read().get(ticker).cloned()
    }

    fn get_or_create(&self, ticker: &Ticker) -> Arc<RwLock<TickerTables>> {
        if let Some(tables) = self.get(ticker) {
            return tables;
        }
        Arc::clone(self.tables.write().entry(ticker.clone()).or_default())
    }
}

impl MetricsStore for MemoryStore {
    fn upsert(&self, ticker: &Ticker, rows: &[MetricRow]) -> Result<usize, StoreError> {
        check_ticker(ticker, rows)?;
        if rows.is_empty() {
            return Ok(0);
        }
        let tables = self.get_or_create(ticker);
        let mut tables = tables.write();
        let written = merge_by_date(&mut tables.metrics, rows);
        align_metric_columns(&mut tables.metrics);
        Ok(written)
    }

    fn upsert_prices(&self, ticker: &Ticker, bars: &[PriceBar]) -> Result<usize, StoreError> {
        check_ticker(ticker, bars)?;
        if bars.is_empty() {
            return Ok(0);
        }
        let tables = self.get_or_create(ticker);
        let mut tables = tables.write();
        Ok(merge_by_date(&mut tables.prices, bars))
    }

    fn latest(&self, ticker: &Ticker) -> Result<Option<MetricRow>, StoreError> {
        Ok(self
            .get(ticker)
            .and_then(|t| t.read().metrics.values().next_back().cloned()))
    }

    fn metrics(&self, ticker: &Ticker) -> Result<Vec<MetricRow>, StoreError> {
        Ok(self
            .get(ticker)
            .map(|t| t.read().metrics.values().cloned().collect())
            .unwrap_or_default())
    }

    fn prices(&self, ticker: &Ticker) -> Result<Vec<PriceBar>, StoreError> {
        Ok(self
            .get(ticker)
            .map(|t| t.read().prices.values().cloned().collect())
            .unwrap_or_default())
    }

    fn tickers(&self) -> Result<Vec<Ticker>, StoreError> {
        let mut tickers: Vec<Ticker> = self
            .tables
            .read()
            .iter()
            .filter(|(_, t)| {
                let t = t.read();
                !t.metrics.is_empty() || !t.prices.is_empty()
            })
            .map(|(ticker, _)| ticker.clone())
            .collect();
        tickers.sort();
        Ok(tickers)
    }

    fn summary(&self) -> Result<StoreSummary, StoreError> {
        let snapshot: Vec<(Ticker, Arc<RwLock<TickerTables>>)> = self
            .tables
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();

        let tickers = snapshot
            .into_iter()
            .filter_map(|(ticker, tables)| {
                let tables = tables.read();
                if tables.metrics.is_empty() && tables.prices.is_empty() {
                    return None;
                }
                Some(TickerSummary {
                    ticker,
                    metrics: TableStats::from_sorted_dates(tables.metrics.keys().copied()),
                    prices: TableStats::from_sorted_dates(tables.prices.keys().copied()),
                })
            })
            .collect();
        Ok(StoreSummary::from_tickers(tickers))
    }
}
