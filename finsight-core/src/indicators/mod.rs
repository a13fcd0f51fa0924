//! Rolling metric implementations.
//!
//! Every metric implements [`RollingMetric`]. A ticker's closes and simple
//! returns are derived once into a [`PriceSeries`], then each metric is
//! computed over the whole series in one pass.
//!
//! # Look-ahead contamination guard
//! The value a rolling metric produces at index t may only depend on closes
//! at indices `< t`. The window ends immediately *before* the current bar.
//! Every metric must pass the truncated-vs-full series test.

pub mod returns;
pub mod sharpe;
pub mod sma;
pub mod stats;
pub mod volatility;

pub use returns::simple_returns;
pub use sharpe::TrailingSharpe;
pub use sma::TrailingSma;
pub use volatility::TrailingVolatility;

use crate::config::MetricsConfig;
use crate::domain::{MetricId, MetricKind, PriceBar};

/// Closes and their simple returns, index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    closes: Vec<f64>,
    returns: Vec<Option<f64>>,
}

impl PriceSeries {
    pub fn from_closes(closes: Vec<f64>) -> Self {
        let returns = simple_returns(&closes);
        Self { closes, returns }
    }

    pub fn from_bars(bars: &[PriceBar]) -> Self {
        Self::from_closes(bars.iter().map(|b| b.close).collect())
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    /// `returns()[0]` is always `None`.
    pub fn returns(&self) -> &[Option<f64>] {
        &self.returns
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// A metric computed over a strictly historical window.
pub trait RollingMetric: Send + Sync {
    fn id(&self) -> MetricId;

    /// Number of leading bars for which the metric is always absent.
    fn lookback(&self) -> usize;

    /// Compute the metric for every index of the series.
    ///
    /// Returns a `Vec` of the same length as the series; `None` marks an index
    /// where the metric is not computable.
    fn compute(&self, series: &PriceSeries) -> Vec<Option<f64>>;
}

/// Instantiate every rolling metric named by the configuration.
pub fn build_metrics(config: &MetricsConfig) -> Vec<Box<dyn RollingMetric>> {
    config
        .metric_ids()
        .into_iter()
        .map(|id| -> Box<dyn RollingMetric> {
            match id.kind {
                MetricKind::Volatility => Box::new(TrailingVolatility::new(id.window)),
                MetricKind::Sma => Box::new(TrailingSma::new(id.window)),
                MetricKind::Sharpe => Box::new(TrailingSharpe::new(id.window)),
            }
        })
        .collect()
}

/// The `window` values immediately before index `t`, if all are present.
pub(crate) fn trailing_window(values: &[Option<f64>], t: usize, window: usize) -> Option<Vec<f64>> {
    if window == 0 || t < window || t > values.len() {
        return None;
    }
    values[t - window..t].iter().copied().collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for metric tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
