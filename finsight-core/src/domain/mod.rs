//! Domain types for FinSight

pub mod bar;
pub mod metric;
pub mod ticker;

pub use bar::PriceBar;
pub use metric::{MetricId, MetricKind, MetricRow, UnknownMetric};
pub use ticker::{Ticker, TickerError};
