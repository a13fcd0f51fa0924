//! Window statistics shared by the rolling metrics.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (Bessel's correction, divides by n - 1).
///
/// `None` for fewer than two observations. A window whose values are all
/// equal yields exactly `0.0`; the mean of such a window can carry rounding
/// error, which would otherwise leak into a tiny non-zero deviation.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let first = values[0];
    if values.iter().all(|&v| v == first) {
        return Some(0.0);
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((sum_sq / (n - 1) as f64).sqrt())
}
