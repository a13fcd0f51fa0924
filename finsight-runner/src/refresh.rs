//! Refresh reports, per-ticker outcomes, and progress reporting.

use crate::error::{FailureKind, RefreshError};
use chrono::NaiveDate;
use finsight_core::Ticker;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Result of refreshing a single ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub ticker: Ticker,
    pub price_rows: usize,
    pub metric_rows: usize,
    pub first_metric_date: Option<NaiveDate>,
    pub last_metric_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Refreshed { report: RefreshReport },
    Failed { kind: FailureKind, message: String },
    Cancelled,
}

impl RefreshOutcome {
    pub(crate) fn from_result(result: Result<RefreshReport, RefreshError>) -> Self {
        match result {
            Ok(report) => RefreshOutcome::Refreshed { report },
            Err(RefreshError::Cancelled { .. }) => RefreshOutcome::Cancelled,
            Err(e) => RefreshOutcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }

    pub fn is_refreshed(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed { .. })
    }
}

/// One registry entry and what happened to it. `ticker` is the normalised
/// symbol, or the raw entry when it could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerResult {
    pub ticker: String,
    pub outcome: RefreshOutcome,
}

/// Outcome of a batch refresh, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub results: Vec<TickerResult>,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub metric_rows_written: usize,
}

impl RefreshSummary {
    pub fn from_results(results: Vec<TickerResult>) -> Self {
        let mut summary = Self::default();
        for r in &results {
            match &r.outcome {
                RefreshOutcome::Refreshed { report } => {
                    summary.succeeded += 1;
                    summary.metric_rows_written += report.metric_rows;
                }
                RefreshOutcome::Failed { .. } => summary.failed += 1,
                RefreshOutcome::Cancelled => summary.cancelled += 1,
            }
        }
        summary.results = results;
        summary
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn outcome(&self, ticker: &str) -> Option<&RefreshOutcome> {
        self.results
            .iter()
            .find(|r| r.ticker == ticker)
            .map(|r| &r.outcome)
    }
}

/// Progress callback for batch refreshes. Called from worker threads.
pub trait RefreshProgress: Send + Sync {
    /// Called when a ticker's refresh starts.
    fn on_start(&self, ticker: &str, index: usize, total: usize);

    /// Called when a ticker finishes, fails, or is skipped by cancellation.
    fn on_complete(&self, ticker: &str, index: usize, total: usize, outcome: &RefreshOutcome);

    /// Called once when the whole batch is done.
    fn on_batch_complete(&self, summary: &RefreshSummary);
}

/// Progress reporter that logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl RefreshProgress for TracingProgress {
    fn on_start(&self, ticker: &str, index: usize, total: usize) {
        info!(ticker, position = index + 1, total, "refreshing");
    }

    fn on_complete(&self, ticker: &str, _index: usize, _total: usize, outcome: &RefreshOutcome) {
        match outcome {
            RefreshOutcome::Refreshed { report } => info!(
                ticker,
                price_rows = report.price_rows,
                metric_rows = report.metric_rows,
                "refreshed"
            ),
            RefreshOutcome::Failed { kind, message } => {
                warn!(ticker, ?kind, %message, "refresh failed")
            }
            RefreshOutcome::Cancelled => info!(ticker, "refresh cancelled"),
        }
    }

    fn on_batch_complete(&self, summary: &RefreshSummary) {
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            total = summary.total(),
            metric_rows = summary.metric_rows_written,
            "refresh batch complete"
        );
    }
}
