//! End-to-end refresh tests: source → engine → store → queries.

use chrono::NaiveDate;
use finsight_core::data::{
    CsvPriceSource, PriceSource, SourceError, StaticPriceSource, SyntheticPriceSource,
    TickerRegistry,
};
use finsight_core::store::{MemoryStore, MetricsStore, StoreError, StoreSummary};
use finsight_core::{MetricRow, MetricsConfig, MetricsEngine, PriceBar, Ticker};
use finsight_runner::{
    CancelToken, FailureKind, FinsightConfig, MetricsService, QueryError, RefreshConfig,
    RefreshError, RefreshOutcome, RefreshProgress, RefreshSummary, StaticRegistry,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;

// ── Helpers ──────────────────────────────────────────────────────────

fn ticker(s: &str) -> Ticker {
    Ticker::parse(s).unwrap()
}

fn make_bars(symbol: &str, n: usize) -> Vec<PriceBar> {
    let t = ticker(symbol);
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let close = 50.0 + (i as f64 * 0.4).sin() * 2.0 + i as f64 * 0.05;
            PriceBar::new(t.clone(), base + chrono::Duration::days(i as i64), close)
        })
        .collect()
}

fn synthetic() -> Arc<dyn PriceSource> {
    Arc::new(SyntheticPriceSource::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
    ))
}

fn service_with(source: Arc<dyn PriceSource>, max_concurrency: usize) -> MetricsService {
    MetricsService::new(
        MetricsEngine::new(MetricsConfig::uniform(5)).unwrap(),
        Arc::new(MemoryStore::new()),
        source,
        RefreshConfig { max_concurrency },
    )
}

/// Records every progress callback.
#[derive(Default)]
struct RecordingProgress {
    started: Mutex<Vec<String>>,
    completed: Mutex<Vec<(String, bool)>>,
    batches: Mutex<usize>,
}

impl RefreshProgress for RecordingProgress {
    fn on_start(&self, ticker: &str, _index: usize, _total: usize) {
        self.started.lock().push(ticker.to_string());
    }

    fn on_complete(&self, ticker: &str, _index: usize, _total: usize, outcome: &RefreshOutcome) {
        self.completed
            .lock()
            .push((ticker.to_string(), outcome.is_refreshed()));
    }

    fn on_batch_complete(&self, _summary: &RefreshSummary) {
        *self.batches.lock() += 1;
    }
}

/// Source that trips the cancel token when a given ticker is fetched.
struct CancellingSource {
    inner: Arc<dyn PriceSource>,
    trigger: Ticker,
    token: CancelToken,
}

impl PriceSource for CancellingSource {
    fn name(&self) -> &str {
        "cancelling"
    }

    fn fetch(&self, ticker: &Ticker) -> Result<Vec<PriceBar>, SourceError> {
        if ticker == &self.trigger {
            self.token.cancel();
        }
        self.inner.fetch(ticker)
    }
}

/// Memory store whose metric or price writes can be made to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_metrics: bool,
    fail_prices: bool,
}

fn disk_full(table: &str) -> StoreError {
    StoreError::Unavailable {
        path: table.into(),
        message: "disk full".into(),
    }
}

impl MetricsStore for FlakyStore {
    fn upsert(&self, ticker: &Ticker, rows: &[MetricRow]) -> Result<usize, StoreError> {
        if self.fail_metrics {
            return Err(disk_full("metrics"));
        }
        self.inner.upsert(ticker, rows)
    }

    fn upsert_prices(&self, ticker: &Ticker, bars: &[PriceBar]) -> Result<usize, StoreError> {
        if self.fail_prices {
            return Err(disk_full("prices"));
        }
        self.inner.upsert_prices(ticker, bars)
    }

    fn latest(&self, ticker: &Ticker) -> Result<Option<MetricRow>, StoreError> {
        self.inner.latest(ticker)
    }

    fn metrics(&self, ticker: &Ticker) -> Result<Vec<MetricRow>, StoreError> {
        self.inner.metrics(ticker)
    }

    fn prices(&self, ticker: &Ticker) -> Result<Vec<PriceBar>, StoreError> {
        self.inner.prices(ticker)
    }

    fn tickers(&self) -> Result<Vec<Ticker>, StoreError> {
        self.inner.tickers()
    }

    fn summary(&self) -> Result<StoreSummary, StoreError> {
        self.inner.summary()
    }
}

fn service_over(store: FlakyStore) -> MetricsService {
    let source = StaticPriceSource::new().with_series(ticker("SPY"), make_bars("SPY", 20));
    MetricsService::new(
        MetricsEngine::new(MetricsConfig::uniform(5)).unwrap(),
        Arc::new(store),
        Arc::new(source),
        RefreshConfig { max_concurrency: 1 },
    )
}

struct BrokenRegistry;

impl TickerRegistry for BrokenRegistry {
    fn tickers(&self) -> Result<Vec<String>, SourceError> {
        Err(SourceError::Other("registry offline".into()))
    }
}

// ── Single ticker ────────────────────────────────────────────────────

#[test]
fn refresh_writes_prices_and_metrics() {
    let bars = make_bars("SPY", 30);
    let source = StaticPriceSource::new().with_series(ticker("SPY"), bars.clone());
    let service = service_with(Arc::new(source), 2);

    let report = service.refresh(" spy ").unwrap();
    assert_eq!(report.ticker, ticker("SPY"));
    assert_eq!(report.price_rows, 30);
    assert_eq!(report.metric_rows, 25);
    assert_eq!(report.first_metric_date, Some(bars[5].date));
    assert_eq!(report.last_metric_date, Some(bars[29].date));

    let latest = service.get_metrics("SPY").unwrap();
    assert_eq!(latest.date, bars[29].date);
    assert!(latest.is_complete());
    assert_eq!(service.get_history("spy").unwrap().len(), 25);
    assert_eq!(service.store().prices(&ticker("SPY")).unwrap(), bars);
}

#[test]
fn refresh_twice_is_idempotent() {
    let service = service_with(synthetic(), 2);
    service.refresh("QQQ").unwrap();
    let first = service.store().metrics(&ticker("QQQ")).unwrap();
    let summary = service.get_summary().unwrap();

    service.refresh("QQQ").unwrap();
    assert_eq!(service.store().metrics(&ticker("QQQ")).unwrap(), first);
    assert_eq!(service.get_summary().unwrap(), summary);
}

#[test]
fn unknown_ticker_is_not_found() {
    let service = service_with(synthetic(), 1);
    assert!(matches!(
        service.get_metrics("ZZZZ"),
        Err(QueryError::NotFound { .. })
    ));
    assert!(matches!(
        service.get_metrics("  "),
        Err(QueryError::InvalidTicker(_))
    ));
    assert!(service.get_latest_all().unwrap().is_empty());
}

#[test]
fn refresh_errors_are_classified() {
    let mut duplicated = make_bars("DUP", 10);
    duplicated[5].date = duplicated[4].date;
    let source = StaticPriceSource::new().with_series(ticker("DUP"), duplicated);
    let service = service_with(Arc::new(source), 1);

    let err = service.refresh("DUP").unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidInput);
    // Nothing is written when compute fails.
    assert!(service.store().prices(&ticker("DUP")).unwrap().is_empty());

    let err = service.refresh("MISSING").unwrap_err();
    assert_eq!(err.kind(), FailureKind::Source);

    let err = service.refresh("B@D").unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidTicker);
}

#[test]
fn failed_metrics_write_leaves_store_untouched() {
    let service = service_over(FlakyStore {
        fail_metrics: true,
        ..FlakyStore::default()
    });
    let err = service.refresh("SPY").unwrap_err();
    assert!(matches!(err, RefreshError::Store(_)));
    assert_eq!(err.kind(), FailureKind::Store);
    assert!(service.store().tickers().unwrap().is_empty());
}

#[test]
fn failed_price_write_is_reported_as_partial() {
    let service = service_over(FlakyStore {
        fail_prices: true,
        ..FlakyStore::default()
    });
    let err = service.refresh("SPY").unwrap_err();
    assert!(matches!(err, RefreshError::PricesNotWritten { .. }));
    assert_eq!(err.kind(), FailureKind::Store);
    assert!(err.to_string().contains("metrics for SPY were written"));
    assert_eq!(service.store().metrics(&ticker("SPY")).unwrap().len(), 15);
    assert!(service.store().prices(&ticker("SPY")).unwrap().is_empty());
}

// ── Batch ────────────────────────────────────────────────────────────

#[test]
fn one_failure_does_not_stop_the_batch() {
    let mut source = StaticPriceSource::new();
    source.insert(ticker("SPY"), make_bars("SPY", 30));
    source.insert(ticker("IWM"), make_bars("IWM", 12));
    let mut bad = make_bars("DIA", 10);
    bad[3].close = -1.0;
    source.insert(ticker("DIA"), bad);
    let service = service_with(Arc::new(source), 3);

    let registry = StaticRegistry::new(["SPY", "DIA", "nope!", "MISSING", "iwm", "spy"]);
    let progress = RecordingProgress::default();
    let summary = service
        .refresh_all(&registry, &CancelToken::new(), Some(&progress))
        .unwrap();

    let order: Vec<&str> = summary.results.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(order, vec!["SPY", "DIA", "nope!", "MISSING", "IWM"]);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.cancelled, 0);
    assert_eq!(summary.metric_rows_written, 25 + 7);

    assert!(matches!(
        summary.outcome("DIA"),
        Some(RefreshOutcome::Failed { kind: FailureKind::InvalidInput, .. })
    ));
    assert!(matches!(
        summary.outcome("MISSING"),
        Some(RefreshOutcome::Failed { kind: FailureKind::Source, .. })
    ));

    assert_eq!(progress.completed.lock().len(), 5);
    // The unparseable entry never starts.
    assert_eq!(progress.started.lock().len(), 4);
    assert_eq!(*progress.batches.lock(), 1);

    let latest = service.get_latest_all().unwrap();
    let tickers: Vec<&str> = latest.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["IWM", "SPY"]);
}

#[test]
fn invalid_entry_keeps_raw_name() {
    let service = service_with(synthetic(), 1);
    let summary = service
        .refresh_all(&StaticRegistry::new(["a b"]), &CancelToken::new(), None)
        .unwrap();
    assert_eq!(summary.results[0].ticker, "a b");
    assert!(matches!(
        summary.results[0].outcome,
        RefreshOutcome::Failed { kind: FailureKind::InvalidTicker, .. }
    ));
}

#[test]
fn registry_failure_fails_the_batch() {
    let service = service_with(synthetic(), 1);
    let result = service.refresh_all(&BrokenRegistry, &CancelToken::new(), None);
    assert!(matches!(result, Err(RefreshError::Registry(_))));
}

#[test]
fn cancelled_before_start_touches_nothing() {
    let service = service_with(synthetic(), 2);
    let token = CancelToken::new();
    token.cancel();

    let summary = service
        .refresh_all(&StaticRegistry::new(["SPY", "QQQ"]), &token, None)
        .unwrap();
    assert_eq!(summary.cancelled, 2);
    assert!(service.store().tickers().unwrap().is_empty());
}

#[test]
fn cancel_mid_batch_leaves_store_consistent() {
    let token = CancelToken::new();
    let source = CancellingSource {
        inner: synthetic(),
        trigger: ticker("QQQ"),
        token: token.clone(),
    };
    // One worker: entries run in registry order.
    let service = service_with(Arc::new(source), 1);

    let summary = service
        .refresh_all(&StaticRegistry::new(["SPY", "QQQ", "IWM"]), &token, None)
        .unwrap();

    assert!(summary.outcome("SPY").unwrap().is_refreshed());
    // Cancelled between compute and write: nothing stored for QQQ.
    assert_eq!(summary.outcome("QQQ"), Some(&RefreshOutcome::Cancelled));
    assert_eq!(summary.outcome("IWM"), Some(&RefreshOutcome::Cancelled));
    assert_eq!(service.store().tickers().unwrap(), vec![ticker("SPY")]);
}

// ── Parquet-backed service from config ───────────────────────────────

#[test]
fn configured_service_persists_to_parquet() {
    let dir = tempfile::tempdir().unwrap();
    let csv_dir = dir.path().join("csv");
    std::fs::create_dir_all(&csv_dir).unwrap();
    let mut csv = String::from("date,close\n");
    for bar in make_bars("SPY", 40) {
        csv.push_str(&format!("{},{}\n", bar.date, bar.close));
    }
    std::fs::write(csv_dir.join("SPY.csv"), csv).unwrap();

    let config = FinsightConfig::from_toml(&format!(
        "[metrics]\nvol_windows = [5]\nsma_windows = [5]\nsharpe_windows = [5]\n\n[store]\nroot = {:?}\n",
        dir.path().join("store").display().to_string()
    ))
    .unwrap();

    let service =
        MetricsService::from_config(&config, Arc::new(CsvPriceSource::new(&csv_dir))).unwrap();
    let report = service.refresh("SPY").unwrap();
    assert_eq!(report.metric_rows, 35);

    // A second service over the same root sees the data.
    let reopened =
        MetricsService::from_config(&config, Arc::new(CsvPriceSource::new(&csv_dir))).unwrap();
    let summary = reopened.get_summary().unwrap();
    assert_eq!(summary.ticker_count, 1);
    assert_eq!(summary.total_price_rows, 40);
    assert_eq!(summary.total_metric_rows, 35);
    assert_eq!(
        reopened.get_metrics("SPY").unwrap(),
        service.get_metrics("SPY").unwrap()
    );
}

// ── Properties ───────────────────────────────────────────────────────

fn arb_symbol() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["SPY", "QQQ", "IWM", "DIA", "TLT"]),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(s, lower, pad)| {
            let s = if lower { s.to_lowercase() } else { s.to_string() };
            if pad {
                format!(" {s} ")
            } else {
                s
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn batch_results_follow_normalised_registry_order(
        symbols in prop::collection::vec(arb_symbol(), 1..10),
        workers in 1usize..5,
    ) {
        let service = service_with(synthetic(), workers);
        let summary = service
            .refresh_all(&StaticRegistry::new(symbols.clone()), &CancelToken::new(), None)
            .unwrap();

        let mut expected: Vec<String> = Vec::new();
        for s in &symbols {
            let t = s.trim().to_uppercase();
            if !expected.contains(&t) {
                expected.push(t);
            }
        }
        let got: Vec<String> = summary.results.iter().map(|r| r.ticker.clone()).collect();
        prop_assert_eq!(&got, &expected);
        prop_assert_eq!(summary.succeeded, expected.len());
        prop_assert_eq!(service.store().tickers().unwrap().len(), expected.len());
    }
}
