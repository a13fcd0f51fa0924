//! Metrics service: per-ticker refresh, bounded batch fan-out, and queries.
//!
//! A refresh is fetch → compute (in memory) → write metrics → write prices,
//! holding a per-ticker lock for the whole sequence so two refreshes of the
//! same ticker never interleave. A failed metrics write leaves the store
//! untouched; a failed price write after it is reported as
//! [`RefreshError::PricesNotWritten`]. Different tickers run in parallel on a
//! private rayon pool sized by `refresh.max_concurrency`.

use crate::cancel::CancelToken;
use crate::config::{FinsightConfig, RefreshConfig};
use crate::error::{QueryError, RefreshError};
use crate::refresh::{RefreshOutcome, RefreshProgress, RefreshReport, RefreshSummary, TickerResult};
use finsight_core::data::{PriceSource, TickerRegistry};
use finsight_core::store::{MetricsStore, ParquetStore, StoreSummary};
use finsight_core::sync::TickerLocks;
use finsight_core::{MetricRow, MetricsEngine, Ticker};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// A registry entry after normalisation.
enum Entry {
    Valid(Ticker),
    Invalid { raw: String, error: RefreshError },
}

pub struct MetricsService {
    engine: MetricsEngine,
    store: Arc<dyn MetricsStore>,
    source: Arc<dyn PriceSource>,
    refresh_config: RefreshConfig,
    locks: TickerLocks,
}

impl MetricsService {
    pub fn new(
        engine: MetricsEngine,
        store: Arc<dyn MetricsStore>,
        source: Arc<dyn PriceSource>,
        refresh_config: RefreshConfig,
    ) -> Self {
        Self {
            engine,
            store,
            source,
            refresh_config,
            locks: TickerLocks::new(),
        }
    }

    /// Wire an engine and a Parquet store from configuration.
    pub fn from_config(
        config: &FinsightConfig,
        source: Arc<dyn PriceSource>,
    ) -> Result<Self, RefreshError> {
        let engine = MetricsEngine::new(config.metrics.clone())?;
        let store = ParquetStore::from_config(&config.store)?;
        Ok(Self::new(
            engine,
            Arc::new(store),
            source,
            config.refresh.clone(),
        ))
    }

    pub fn store(&self) -> &Arc<dyn MetricsStore> {
        &self.store
    }

    pub fn engine(&self) -> &MetricsEngine {
        &self.engine
    }

    /// Refresh one ticker: fetch its full price history, recompute every
    /// metric, and upsert both tables.
    pub fn refresh(&self, ticker: &str) -> Result<RefreshReport, RefreshError> {
        let ticker = Ticker::parse(ticker)?;
        self.refresh_ticker(&ticker, None)
    }

    fn refresh_ticker(
        &self,
        ticker: &Ticker,
        cancel: Option<&CancelToken>,
    ) -> Result<RefreshReport, RefreshError> {
        let _guard = self.locks.lock(ticker);

        let bars = self
            .source
            .fetch(ticker)
            .map_err(|source| RefreshError::Source {
                ticker: ticker.to_string(),
                source,
            })?;
        let rows = self.engine.compute(ticker, &bars)?;

        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(RefreshError::Cancelled {
                ticker: ticker.to_string(),
            });
        }

        let metric_rows = self.store.upsert(ticker, &rows)?;
        let price_rows = self
            .store
            .upsert_prices(ticker, &bars)
            .map_err(|source| RefreshError::PricesNotWritten {
                ticker: ticker.to_string(),
                source,
            })?;

        debug!(
            ticker = %ticker,
            source = self.source.name(),
            price_rows,
            metric_rows,
            "ticker refreshed"
        );
        Ok(RefreshReport {
            ticker: ticker.clone(),
            price_rows,
            metric_rows,
            first_metric_date: rows.first().map(|r| r.date),
            last_metric_date: rows.last().map(|r| r.date),
        })
    }

    /// Refresh every ticker the registry lists.
    ///
    /// Entries are normalised and deduplicated (first occurrence wins). A
    /// failing ticker is recorded and never stops the others; only a registry
    /// or worker-pool failure fails the batch. Results follow registry order.
    pub fn refresh_all(
        &self,
        registry: &dyn TickerRegistry,
        cancel: &CancelToken,
        progress: Option<&dyn RefreshProgress>,
    ) -> Result<RefreshSummary, RefreshError> {
        let raw = registry.tickers().map_err(RefreshError::Registry)?;
        let entries = normalise(raw);
        let total = entries.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.refresh_config.max_concurrency.max(1))
            .thread_name(|i| format!("finsight-refresh-{i}"))
            .build()
            .map_err(|e| RefreshError::WorkerPool(e.to_string()))?;

        let results: Vec<TickerResult> = pool.install(|| {
            entries
                .into_par_iter()
                .enumerate()
                .map(|(index, entry)| self.run_entry(entry, index, total, cancel, progress))
                .collect()
        });

        let summary = RefreshSummary::from_results(results);
        if let Some(p) = progress {
            p.on_batch_complete(&summary);
        }
        Ok(summary)
    }

    fn run_entry(
        &self,
        entry: Entry,
        index: usize,
        total: usize,
        cancel: &CancelToken,
        progress: Option<&dyn RefreshProgress>,
    ) -> TickerResult {
        let (name, outcome) = match entry {
            Entry::Invalid { raw, error } => (raw, RefreshOutcome::from_result(Err(error))),
            Entry::Valid(ticker) => {
                let name = ticker.to_string();
                let outcome = if cancel.is_cancelled() {
                    RefreshOutcome::Cancelled
                } else {
                    if let Some(p) = progress {
                        p.on_start(&name, index, total);
                    }
                    RefreshOutcome::from_result(self.refresh_ticker(&ticker, Some(cancel)))
                };
                (name, outcome)
            }
        };

        if let Some(p) = progress {
            p.on_complete(&name, index, total, &outcome);
        }
        TickerResult {
            ticker: name,
            outcome,
        }
    }

    /// Latest metric row for a ticker.
    pub fn get_metrics(&self, ticker: &str) -> Result<MetricRow, QueryError> {
        let ticker = Ticker::parse(ticker)?;
        self.store
            .latest(&ticker)?
            .ok_or_else(|| QueryError::NotFound {
                ticker: ticker.to_string(),
            })
    }

    /// Full stored metric history for a ticker, ascending by date.
    pub fn get_history(&self, ticker: &str) -> Result<Vec<MetricRow>, QueryError> {
        let ticker = Ticker::parse(ticker)?;
        let rows = self.store.metrics(&ticker)?;
        if rows.is_empty() {
            return Err(QueryError::NotFound {
                ticker: ticker.to_string(),
            });
        }
        Ok(rows)
    }

    /// Latest metric row for every stored ticker that has one.
    pub fn get_latest_all(&self) -> Result<Vec<MetricRow>, QueryError> {
        let mut rows = Vec::new();
        for ticker in self.store.tickers()? {
            if let Some(row) = self.store.latest(&ticker)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    pub fn get_summary(&self) -> Result<StoreSummary, QueryError> {
        Ok(self.store.summary()?)
    }
}

/// Parse and deduplicate registry entries, keeping registry order.
fn normalise(raw: Vec<String>) -> Vec<Entry> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|symbol| match Ticker::parse(&symbol) {
            Ok(ticker) => seen.insert(ticker.clone()).then_some(Entry::Valid(ticker)),
            Err(e) => Some(Entry::Invalid {
                raw: symbol,
                error: e.into(),
            }),
        })
        .collect()
}
