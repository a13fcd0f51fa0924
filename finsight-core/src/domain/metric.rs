//! MetricRow and metric identifiers.

use super::Ticker;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Family of a rolling metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    /// Sample standard deviation of returns.
    Volatility,
    /// Simple moving average of closes.
    Sma,
    /// Mean return over return standard deviation.
    Sharpe,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [MetricKind::Volatility, MetricKind::Sma, MetricKind::Sharpe];

    /// Column prefix used in stored and serialized rows.
    pub fn prefix(self) -> &'static str {
        match self {
            MetricKind::Volatility => "vol",
            MetricKind::Sma => "sma",
            MetricKind::Sharpe => "sharpe",
        }
    }
}

/// A rolling metric of a given kind over a given window, e.g. `vol20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricId {
    pub kind: MetricKind,
    pub window: usize,
}

impl MetricId {
    pub const fn new(kind: MetricKind, window: usize) -> Self {
        Self { kind, window }
    }

    pub const fn vol(window: usize) -> Self {
        Self::new(MetricKind::Volatility, window)
    }

    pub const fn sma(window: usize) -> Self {
        Self::new(MetricKind::Sma, window)
    }

    pub const fn sharpe(window: usize) -> Self {
        Self::new(MetricKind::Sharpe, window)
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.window)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric column '{0}'")]
pub struct UnknownMetric(pub String);

impl FromStr for MetricId {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .iter()
            .find_map(|kind| {
                let digits = s.strip_prefix(kind.prefix())?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok().map(|window| MetricId::new(*kind, window))
            })
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

impl Serialize for MetricId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MetricId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Computed metrics for one ticker on one date.
///
/// Every value is an explicit `Option`: `None` means "not computable at this
/// date" (warm-up, zero variance), never zero. The serialized form is flat:
/// `{"ticker": .., "date": .., "return": .., "vol20": .., "sma50": null, ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub ticker: Ticker,
    pub date: NaiveDate,
    /// Simple return from the previous close to this date's close.
    #[serde(rename = "return")]
    pub ret: Option<f64>,
    #[serde(flatten)]
    pub values: BTreeMap<MetricId, Option<f64>>,
}

impl MetricRow {
    pub fn new(ticker: Ticker, date: NaiveDate) -> Self {
        Self {
            ticker,
            date,
            ret: None,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, id: MetricId, value: Option<f64>) -> Self {
        self.values.insert(id, value);
        self
    }

    /// Value of a metric, `None` when absent or not configured.
    pub fn get(&self, id: MetricId) -> Option<f64> {
        self.values.get(&id).copied().flatten()
    }

    pub fn vol(&self, window: usize) -> Option<f64> {
        self.get(MetricId::vol(window))
    }

    pub fn sma(&self, window: usize) -> Option<f64> {
        self.get(MetricId::sma(window))
    }

    pub fn sharpe(&self, window: usize) -> Option<f64> {
        self.get(MetricId::sharpe(window))
    }

    /// True when at least one rolling metric is present. The return alone
    /// does not count.
    pub fn has_any_metric(&self) -> bool {
        self.values.values().any(Option::is_some)
    }

    /// True when the return and every configured rolling metric are present.
    pub fn is_complete(&self) -> bool {
        self.ret.is_some() && self.values.values().all(Option::is_some)
    }
}
