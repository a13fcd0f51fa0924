//! FinSight Core: domain types, rolling metrics, metrics engine, metrics store.
//!
//! This crate contains the computation and persistence core:
//! - Domain types (tickers, price bars, metric rows)
//! - Rolling metric indicators over strictly historical windows
//! - The pure metrics engine (validate, precompute, assemble, retain)
//! - The metrics store trait with in-memory and Parquet implementations
//! - Price source and ticker registry collaborator traits

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod store;
pub mod sync;

pub use config::{ConfigError, MetricsConfig, RetentionPolicy};
pub use domain::{MetricId, MetricKind, MetricRow, PriceBar, Ticker, TickerError};
pub use engine::{compute_metrics, EngineError, InputDefect, MetricsEngine};
pub use store::{MemoryStore, MetricsStore, ParquetStore, StoreError, StoreSummary};
