//! Trailing return volatility.
//!
//! Sample standard deviation of the `window` returns strictly before the
//! current bar. Unannualized.
//! Lookback: window + 1 (return[0] does not exist).

use super::stats::sample_std;
use super::{trailing_window, PriceSeries, RollingMetric};
use crate::domain::MetricId;

#[derive(Debug, Clone)]
pub struct TrailingVolatility {
    window: usize,
}

impl TrailingVolatility {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "volatility window must be >= 1");
        Self { window }
    }
}

impl RollingMetric for TrailingVolatility {
    fn id(&self) -> MetricId {
        MetricId::vol(self.window)
    }

    fn lookback(&self) -> usize {
        self.window + 1
    }

    fn compute(&self, series: &PriceSeries) -> Vec<Option<f64>> {
        let returns = series.returns();
        (0..returns.len())
            .map(|t| trailing_window(returns, t, self.window).and_then(|w| sample_std(&w)))
            .collect()
    }
}
