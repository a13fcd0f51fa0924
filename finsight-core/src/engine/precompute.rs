//! Metric precomputation.
//!
//! Every configured metric is computed once over the whole series. Results
//! are stored per metric, index-aligned with the input bars.

use crate::domain::MetricId;
use crate::indicators::{PriceSeries, RollingMetric};

/// One metric's values for every index of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub id: MetricId,
    pub values: Vec<Option<f64>>,
}

/// Compute every metric over the series, in the order given.
pub fn precompute_metrics(
    series: &PriceSeries,
    metrics: &[Box<dyn RollingMetric>],
) -> Vec<MetricSeries> {
    metrics
        .iter()
        .map(|metric| {
            let values = metric.compute(series);
            debug_assert_eq!(
                values.len(),
                series.len(),
                "metric '{}' produced {} values for {} bars",
                metric.id(),
                values.len(),
                series.len()
            );
            MetricSeries {
                id: metric.id(),
                values,
            }
        })
        .collect()
}

/// Maximum lookback across all metrics: the first index at which every
/// metric can be present.
pub fn compute_warmup(metrics: &[Box<dyn RollingMetric>]) -> usize {
    metrics.iter().map(|m| m.lookback()).max().unwrap_or(0)
}
