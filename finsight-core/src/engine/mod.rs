//! Metrics engine: ordered price bars in, ordered metric rows out.
//!
//! The engine is a pure transformation:
//!
//! 1. Validate the series (single ticker, positive finite closes, strictly
//!    increasing dates)
//! 2. Derive closes and simple returns once into a [`PriceSeries`]
//! 3. Precompute every configured rolling metric over the whole series
//! 4. Assemble one [`MetricRow`] per date, reject non-finite values, and apply
//!    the retention policy
//!
//! Rolling windows end strictly before the row's date. See
//! [`crate::indicators`] for the per-metric definitions.

pub mod error;
pub mod precompute;
pub mod validate;

pub use error::{EngineError, InputDefect};
pub use precompute::{compute_warmup, precompute_metrics, MetricSeries};
pub use validate::validate_series;

use crate::config::{MetricsConfig, RetentionPolicy};
use crate::domain::{MetricRow, PriceBar, Ticker};
use crate::indicators::{build_metrics, PriceSeries, RollingMetric};

/// A configured metrics engine. Stateless between calls; share freely
/// across threads.
pub struct MetricsEngine {
    config: MetricsConfig,
    metrics: Vec<Box<dyn RollingMetric>>,
    warmup: usize,
}

impl MetricsEngine {
    pub fn new(config: MetricsConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let metrics = build_metrics(&config);
        let warmup = compute_warmup(&metrics);
        Ok(Self {
            config,
            metrics,
            warmup,
        })
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Number of leading bars before every configured metric can be present.
    pub fn warmup(&self) -> usize {
        self.warmup
    }

    /// Compute metric rows for one ticker's ordered price history.
    pub fn compute(&self, ticker: &Ticker, bars: &[PriceBar]) -> Result<Vec<MetricRow>, EngineError> {
        validate_series(ticker, bars)?;

        let series = PriceSeries::from_bars(bars);
        let computed = precompute_metrics(&series, &self.metrics);

        let mut rows = Vec::with_capacity(bars.len().saturating_sub(1));
        for (t, bar) in bars.iter().enumerate() {
            let mut row = MetricRow::new(ticker.clone(), bar.date);
            row.ret = check_finite(ticker, bar, "return", series.returns()[t])?;
            for metric in &computed {
                let label = metric.id.to_string();
                let value = check_finite(ticker, bar, &label, metric.values[t])?;
                row.values.insert(metric.id, value);
            }
            if self.retain(&row) {
                rows.push(row);
            }
        }

        tracing::debug!(
            ticker = %ticker,
            bars = bars.len(),
            rows = rows.len(),
            "computed metrics"
        );
        Ok(rows)
    }

    fn retain(&self, row: &MetricRow) -> bool {
        match self.config.retention {
            RetentionPolicy::AnyMetric => row.has_any_metric(),
            RetentionPolicy::AllMetrics => row.is_complete(),
        }
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        let config = MetricsConfig::default();
        let metrics = build_metrics(&config);
        let warmup = compute_warmup(&metrics);
        Self {
            config,
            metrics,
            warmup,
        }
    }
}

impl std::fmt::Debug for MetricsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsEngine")
            .field("config", &self.config)
            .field("warmup", &self.warmup)
            .finish()
    }
}

/// Compute metric rows with the default configuration.
pub fn compute_metrics(ticker: &Ticker, bars: &[PriceBar]) -> Result<Vec<MetricRow>, EngineError> {
    MetricsEngine::default().compute(ticker, bars)
}

fn check_finite(
    ticker: &Ticker,
    bar: &PriceBar,
    metric: &str,
    value: Option<f64>,
) -> Result<Option<f64>, EngineError> {
    match value {
        Some(v) if !v.is_finite() => Err(EngineError::Computation {
            ticker: ticker.clone(),
            date: bar.date,
            metric: metric.to_string(),
            value: v,
        }),
        other => Ok(other),
    }
}

/// Build a daily series of bars for tests. Dates start at 2024-01-01.
#[cfg(test)]
pub(crate) fn make_bars(ticker: &str, closes: &[f64]) -> Vec<PriceBar> {
    let ticker = Ticker::parse(ticker).unwrap();
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar::new(ticker.clone(), start + chrono::Days::new(i as u64), c))
        .collect()
}
