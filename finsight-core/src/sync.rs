//! Per-ticker mutual exclusion.

use crate::domain::Ticker;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Guard returned by [`TickerLocks::lock`]. The lock is released on drop.
pub type TickerGuard = ArcMutexGuard<RawMutex, ()>;

/// One mutex per ticker, created on first use.
///
/// The outer map lock is held only long enough to find or insert the
/// ticker's mutex, so work on different tickers never contends.
#[derive(Debug, Default)]
pub struct TickerLocks {
    locks: Mutex<HashMap<Ticker, Arc<Mutex<()>>>>,
}

impl TickerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until this thread holds the ticker's lock.
    pub fn lock(&self, ticker: &Ticker) -> TickerGuard {
        let entry = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(ticker.clone()).or_default())
        };
        entry.lock_arc()
    }

    /// Number of tickers that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
