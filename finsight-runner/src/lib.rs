//! FinSight Runner: refresh orchestration on top of `finsight-core`.
//!
//! This crate provides:
//! - `MetricsService`: single-ticker refresh, bounded parallel batch refresh,
//!   and read queries over the store
//! - Ticker registries (static list, TOML universe file, tracked tickers)
//! - Cooperative cancellation and progress reporting
//! - TOML configuration with environment overrides
//! - Tracing subscriber setup

pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;
pub mod refresh;
pub mod registry;
pub mod service;

pub use cancel::CancelToken;
pub use config::{ConfigError, FinsightConfig, RefreshConfig};
pub use error::{FailureKind, QueryError, RefreshError};
pub use logging::init_tracing;
pub use refresh::{
    RefreshOutcome, RefreshProgress, RefreshReport, RefreshSummary, TickerResult, TracingProgress,
};
pub use registry::{StaticRegistry, StoreRegistry, TickerListFile};
pub use service::MetricsService;
