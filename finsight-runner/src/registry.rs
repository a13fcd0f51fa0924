//! Ticker registries: where a batch refresh gets its list of symbols.
//!
//! Universe file format:
//!
//! ```toml
//! tickers = ["SPY", "QQQ", "brk.b"]
//! ```

use finsight_core::data::{SourceError, TickerRegistry};
use finsight_core::store::MetricsStore;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A fixed list of symbols.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    tickers: Vec<String>,
}

impl StaticRegistry {
    pub fn new<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tickers: tickers.into_iter().map(Into::into).collect(),
        }
    }
}

impl TickerRegistry for StaticRegistry {
    fn tickers(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.tickers.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TickerList {
    tickers: Vec<String>,
}

/// Symbols listed in a TOML file, re-read on every call.
#[derive(Debug, Clone)]
pub struct TickerListFile {
    path: PathBuf,
}

impl TickerListFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TickerRegistry for TickerListFile {
    fn tickers(&self) -> Result<Vec<String>, SourceError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| SourceError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let list: TickerList = toml::from_str(&content)
            .map_err(|e| SourceError::Parse(format!("{}: {e}", self.path.display())))?;
        Ok(list.tickers)
    }
}

/// Tickers already present in a store: the tracked set.
#[derive(Clone)]
pub struct StoreRegistry {
    store: Arc<dyn MetricsStore>,
}

impl StoreRegistry {
    pub fn new(store: Arc<dyn MetricsStore>) -> Self {
        Self { store }
    }
}

impl TickerRegistry for StoreRegistry {
    fn tickers(&self) -> Result<Vec<String>, SourceError> {
        let tickers = self
            .store
            .tickers()
            .map_err(|e| SourceError::Other(format!("store ticker listing: {e}")))?;
        Ok(tickers.into_iter().map(String::from).collect())
    }
}
