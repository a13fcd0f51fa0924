//! Trailing Sharpe-style ratio.
//!
//! mean(returns) / sample_std(returns) over the `window` returns strictly
//! before the current bar. No risk-free rate, unannualized.
//! Absent when the standard deviation is zero: a flat window has no
//! meaningful ratio and must not produce inf/NaN.
//! Lookback: window + 1.

use super::stats::{mean, sample_std};
use super::{trailing_window, PriceSeries, RollingMetric};
use crate::domain::MetricId;

#[derive(Debug, Clone)]
pub struct TrailingSharpe {
    window: usize,
}

impl TrailingSharpe {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "sharpe window must be >= 1");
        Self { window }
    }

    fn ratio(values: &[f64]) -> Option<f64> {
        let sd = sample_std(values)?;
        if sd == 0.0 {
            return None;
        }
        Some(mean(values)? / sd)
    }
}

impl RollingMetric for TrailingSharpe {
    fn id(&self) -> MetricId {
        MetricId::sharpe(self.window)
    }

    fn lookback(&self) -> usize {
        self.window + 1
    }

    fn compute(&self, series: &PriceSeries) -> Vec<Option<f64>> {
        let returns = series.returns();
        (0..returns.len())
            .map(|t| trailing_window(returns, t, self.window).and_then(|w| Self::ratio(&w)))
            .collect()
    }
}
