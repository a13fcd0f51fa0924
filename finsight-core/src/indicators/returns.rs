//! Simple period returns.
//!
//! return[t] = close[t] / close[t-1] - 1
//! The first bar has no prior close, so return[0] is absent.

/// Simple returns aligned with `closes`.
pub fn simple_returns(closes: &[f64]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return result;
    }
    result.push(None);
    result.extend(closes.windows(2).map(|w| Some(w[1] / w[0] - 1.0)));
    result
}
