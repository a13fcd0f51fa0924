//! Trailing Simple Moving Average.
//!
//! Mean of the `window` closes strictly before the current bar.
//! SMA[t] = mean(close[t-window] .. close[t-1])
//! Lookback: window (first value at index `window`).

use super::{PriceSeries, RollingMetric};
use crate::domain::MetricId;

#[derive(Debug, Clone)]
pub struct TrailingSma {
    window: usize,
}

impl TrailingSma {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "SMA window must be >= 1");
        Self { window }
    }
}

impl RollingMetric for TrailingSma {
    fn id(&self) -> MetricId {
        MetricId::sma(self.window)
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn compute(&self, series: &PriceSeries) -> Vec<Option<f64>> {
        let closes = series.closes();
        let n = closes.len();
        let w = self.window;
        let mut result = vec![None; n];

        if n <= w {
            return result;
        }

        // Window for index w is closes[0..w]
        let mut sum: f64 = closes[..w].iter().sum();
        result[w] = Some(sum / w as f64);

        // Roll forward: close[t-1] enters, close[t-1-w] leaves
        for t in (w + 1)..n {
            sum += closes[t - 1] - closes[t - 1 - w];
            result[t] = Some(sum / w as f64);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sma_excludes_current_close() {
        let series = PriceSeries::from_closes(vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let result = TrailingSma::new(5).compute(&series);

        assert_eq!(result.len(), 7);
        for (i, v) in result.iter().enumerate().take(5) {
            assert!(v.is_none(), "expected None at index {i}");
        }
        // SMA[5] = mean(10,11,12,13,14) = 12.0
        assert_approx(result[5].unwrap(), 12.0, DEFAULT_EPSILON);
        // SMA[6] = mean(11,12,13,14,15) = 13.0
        assert_approx(result[6].unwrap(), 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_2_small_sample() {
        let series = PriceSeries::from_closes(vec![100.0, 101.0, 99.0, 102.0, 103.0]);
        let result = TrailingSma::new(2).compute(&series);
        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_approx(result[2].unwrap(), 100.5, DEFAULT_EPSILON);
        assert_approx(result[3].unwrap(), 100.0, DEFAULT_EPSILON);
        assert_approx(result[4].unwrap(), 100.5, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_previous_close() {
        let series = PriceSeries::from_closes(vec![100.0, 200.0, 300.0]);
        let result = TrailingSma::new(1).compute(&series);
        assert_eq!(result[0], None);
        assert_approx(result[1].unwrap(), 100.0, DEFAULT_EPSILON);
        assert_approx(result[2].unwrap(), 200.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_too_few_bars() {
        let series = PriceSeries::from_closes(vec![10.0, 11.0, 12.0]);
        let result = TrailingSma::new(3).compute(&series);
        assert!(result.iter().all(Option::is_none));
    }
}
