//! Refresh and query error types.

use finsight_core::data::SourceError;
use finsight_core::{EngineError, StoreError, TickerError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("invalid ticker: {0}")]
    InvalidTicker(#[from] TickerError),

    #[error("price source failed for {ticker}: {source}")]
    Source {
        ticker: String,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Metrics were stored but the price table kept its previous contents.
    #[error("metrics for {ticker} were written but the price upsert failed: {source}")]
    PricesNotWritten {
        ticker: String,
        #[source]
        source: StoreError,
    },

    #[error("refresh of {ticker} cancelled")]
    Cancelled { ticker: String },

    #[error("ticker registry failed: {0}")]
    Registry(#[source] SourceError),

    #[error("failed to build refresh worker pool: {0}")]
    WorkerPool(String),
}

/// Serializable classification of a per-ticker failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidTicker,
    Source,
    InvalidInput,
    Computation,
    Config,
    Store,
    Cancelled,
    Registry,
    WorkerPool,
}

impl RefreshError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RefreshError::InvalidTicker(_) => FailureKind::InvalidTicker,
            RefreshError::Source { .. } => FailureKind::Source,
            RefreshError::Engine(EngineError::InvalidInput { .. }) => FailureKind::InvalidInput,
            RefreshError::Engine(EngineError::Computation { .. }) => FailureKind::Computation,
            RefreshError::Engine(EngineError::Config(_)) => FailureKind::Config,
            RefreshError::Store(_) | RefreshError::PricesNotWritten { .. } => FailureKind::Store,
            RefreshError::Cancelled { .. } => FailureKind::Cancelled,
            RefreshError::Registry(_) => FailureKind::Registry,
            RefreshError::WorkerPool(_) => FailureKind::WorkerPool,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid ticker: {0}")]
    InvalidTicker(#[from] TickerError),

    #[error("no metrics stored for {ticker}")]
    NotFound { ticker: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsight_core::{InputDefect, Ticker};

    #[test]
    fn kind_splits_engine_errors() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let ticker = Ticker::parse("SPY").unwrap();
        let invalid = RefreshError::from(EngineError::InvalidInput {
            ticker: ticker.clone(),
            defect: InputDefect::DuplicateDate { index: 1, date },
        });
        let computation = RefreshError::from(EngineError::Computation {
            ticker,
            date,
            metric: "return".into(),
            value: f64::INFINITY,
        });
        assert_eq!(invalid.kind(), FailureKind::InvalidInput);
        assert_eq!(computation.kind(), FailureKind::Computation);
    }

    #[test]
    fn failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::InvalidTicker).unwrap();
        assert_eq!(json, "\"invalid_ticker\"");
    }
}
