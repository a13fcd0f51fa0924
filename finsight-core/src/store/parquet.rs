//! Parquet-backed store with Hive-style partitioning.
//!
//! Layout:
//! - `{root}/metrics/ticker={TICKER}/metrics.parquet`
//! - `{root}/prices/ticker={TICKER}/prices.parquet`
//!
//! Each partition directory also holds a `meta.json` sidecar (row count,
//! date range, BLAKE3 hash of the rows, data file size, write time). The
//! sidecar is only trusted while the data file still has the recorded size;
//! otherwise stats are read from the data file itself.
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place) for data and sidecar
//! - Quarantine for unreadable files (`{file}.quarantined`)
//! - Per-ticker write lock; readers never take it

use super::frame::{frame_to_metrics, frame_to_prices, metrics_to_frame, prices_to_frame};
use super::{
    align_metric_columns, check_ticker, merge_by_date, Keyed, MetricsStore, StoreError, StoreSummary, TableStats,
    TickerSummary,
};
use crate::domain::{MetricRow, PriceBar, Ticker};
use crate::sync::TickerLocks;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PARTITION_PREFIX: &str = "ticker=";
const META_FILE: &str = "meta.json";

/// Where the Parquet store lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/finsight"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Metrics,
    Prices,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Metrics => "metrics",
            Table::Prices => "prices",
        }
    }
}

/// Metadata sidecar for one (table, ticker) partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub ticker: Ticker,
    pub table: Table,
    pub row_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub data_hash: String,
    /// Size in bytes of the data file this sidecar describes.
    #[serde(default)]
    pub data_bytes: u64,
    pub written_at: chrono::NaiveDateTime,
}

impl TableMeta {
    fn stats(&self) -> TableStats {
        TableStats {
            rows: self.row_count,
            first_date: self.first_date,
            last_date: self.last_date,
        }
    }
}

pub struct ParquetStore {
    root: PathBuf,
    locks: TickerLocks,
}

impl ParquetStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for table in [Table::Metrics, Table::Prices] {
            let dir = root.join(table.name());
            fs::create_dir_all(&dir).map_err(|e| StoreError::unavailable(&dir, e))?;
        }
        Ok(Self {
            root,
            locks: TickerLocks::new(),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::open(&config.root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{table}/ticker={TICKER}/`
    fn partition_dir(&self, table: Table, ticker: &Ticker) -> PathBuf {
        self.root
            .join(table.name())
            .join(format!("{PARTITION_PREFIX}{ticker}"))
    }

    fn data_path(&self, table: Table, ticker: &Ticker) -> PathBuf {
        self.partition_dir(table, ticker)
            .join(format!("{}.parquet", table.name()))
    }

    fn meta_path(&self, table: Table, ticker: &Ticker) -> PathBuf {
        self.partition_dir(table, ticker).join(META_FILE)
    }

    /// Sidecar metadata, `None` if missing or unreadable.
    pub fn meta(&self, table: Table, ticker: &Ticker) -> Option<TableMeta> {
        let content = fs::read_to_string(self.meta_path(table, ticker)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Load a partition's frame. `Ok(None)` when nothing is stored. An
    /// unreadable file is moved aside and reported as `Corrupt`.
    fn read_frame(&self, table: Table, ticker: &Ticker) -> Result<Option<DataFrame>, StoreError> {
        let path = self.data_path(table, ticker);
        if !path.exists() {
            return Ok(None);
        }
        match load_parquet(&path) {
            Ok(df) => Ok(Some(df)),
            Err(reason) => Err(self.quarantine(table, ticker, &path, reason)),
        }
    }

    fn quarantine(&self, table: Table, ticker: &Ticker, path: &Path, reason: String) -> StoreError {
        let target = path.with_extension("parquet.quarantined");
        warn!(
            ticker = %ticker,
            table = table.name(),
            path = %path.display(),
            %reason,
            "quarantining corrupt table"
        );
        let _ = fs::rename(path, &target);
        let _ = fs::remove_file(self.meta_path(table, ticker));
        StoreError::Corrupt {
            path: path.to_path_buf(),
            reason,
        }
    }

    /// Decode a loaded frame; a decode failure also quarantines the file.
    fn decode<T>(
        &self,
        table: Table,
        ticker: &Ticker,
        decode: impl FnOnce(&Ticker, &DataFrame) -> Result<Vec<T>, StoreError>,
    ) -> Result<Vec<T>, StoreError> {
        let Some(df) = self.read_frame(table, ticker)? else {
            return Ok(Vec::new());
        };
        decode(ticker, &df).map_err(|e| {
            let path = self.data_path(table, ticker);
            self.quarantine(table, ticker, &path, e.to_string())
        })
    }

    fn load_metrics(&self, ticker: &Ticker) -> Result<Vec<MetricRow>, StoreError> {
        self.decode(Table::Metrics, ticker, frame_to_metrics)
    }

    fn load_prices(&self, ticker: &Ticker) -> Result<Vec<PriceBar>, StoreError> {
        self.decode(Table::Prices, ticker, frame_to_prices)
    }

    /// Write a full partition atomically, then its sidecar.
    ///
    /// The old sidecar is removed before the new data file is renamed in, so
    /// a failure between the two steps leaves no sidecar rather than a stale
    /// one.
    fn write_partition<T: Keyed + Serialize>(
        &self,
        table: Table,
        ticker: &Ticker,
        rows: &[T],
        mut df: DataFrame,
    ) -> Result<(), StoreError> {
        let dir = self.partition_dir(table, ticker);
        fs::create_dir_all(&dir).map_err(|e| StoreError::unavailable(&dir, e))?;

        let path = self.data_path(table, ticker);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&mut df, &tmp_path)?;

        let meta_path = self.meta_path(table, ticker);
        match fs::remove_file(&meta_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(StoreError::unavailable(&meta_path, e));
            }
        }
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::unavailable(&path, format!("atomic rename failed: {e}"))
        })?;
        let data_bytes = fs::metadata(&path)
            .map_err(|e| StoreError::unavailable(&path, e))?
            .len();

        let hash_input =
            serde_json::to_vec(rows).map_err(|e| StoreError::Serialization(format!("hash: {e}")))?;
        let meta = TableMeta {
            ticker: ticker.clone(),
            table,
            row_count: rows.len(),
            first_date: rows.first().map(Keyed::date),
            last_date: rows.last().map(Keyed::date),
            data_hash: blake3::hash(&hash_input).to_hex().to_string(),
            data_bytes,
            written_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::Serialization(format!("meta: {e}")))?;
        let meta_tmp = meta_path.with_extension("json.tmp");
        fs::write(&meta_tmp, meta_json).map_err(|e| StoreError::unavailable(&meta_tmp, e))?;
        fs::rename(&meta_tmp, &meta_path).map_err(|e| {
            let _ = fs::remove_file(&meta_tmp);
            StoreError::unavailable(&meta_path, format!("atomic rename failed: {e}"))
        })?;

        debug!(ticker = %ticker, table = table.name(), rows = rows.len(), "wrote partition");
        Ok(())
    }

    /// Stats from the sidecar when it still describes the data file,
    /// otherwise from the data file.
    fn table_stats(&self, table: Table, ticker: &Ticker) -> Result<TableStats, StoreError> {
        if let Some(meta) = self.meta(table, ticker) {
            let path = self.data_path(table, ticker);
            let on_disk = fs::metadata(&path).map(|m| m.len()).ok();
            if on_disk == Some(meta.data_bytes) {
                return Ok(meta.stats());
            }
            warn!(
                ticker = %ticker,
                table = table.name(),
                recorded = meta.data_bytes,
                on_disk = ?on_disk,
                "sidecar out of date, reading data file"
            );
        }
        let stats = match table {
            Table::Metrics => {
                TableStats::from_sorted_dates(self.load_metrics(ticker)?.iter().map(|r| r.date))
            }
            Table::Prices => {
                TableStats::from_sorted_dates(self.load_prices(ticker)?.iter().map(|b| b.date))
            }
        };
        Ok(stats)
    }

    fn partition_tickers(&self, table: Table) -> Result<BTreeSet<Ticker>, StoreError> {
        let dir = self.root.join(table.name());
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(StoreError::unavailable(&dir, e)),
        };

        let mut tickers = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::unavailable(&dir, e))?;
            let name = entry.file_name();
            let Some(raw) = name.to_str().and_then(|n| n.strip_prefix(PARTITION_PREFIX)) else {
                continue;
            };
            let Ok(ticker) = Ticker::parse(raw) else {
                warn!(dir = %entry.path().display(), "skipping partition with invalid ticker");
                continue;
            };
            if self.data_path(table, &ticker).exists() {
                tickers.insert(ticker);
            }
        }
        Ok(tickers)
    }
}

impl MetricsStore for ParquetStore {
    fn upsert(&self, ticker: &Ticker, rows: &[MetricRow]) -> Result<usize, StoreError> {
        check_ticker(ticker, rows)?;
        if rows.is_empty() {
            return Ok(0);
        }
        let _guard = self.locks.lock(ticker);

        // Metrics are derived, so a corrupt table is rebuilt from the new rows.
        let existing = match self.load_metrics(ticker) {
            Ok(rows) => rows,
            Err(StoreError::Corrupt { path, .. }) => {
                warn!(ticker = %ticker, path = %path.display(), "rebuilding metrics table");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut table: BTreeMap<NaiveDate, MetricRow> =
            existing.into_iter().map(|r| (r.date, r)).collect();
        let written = merge_by_date(&mut table, rows);
        align_metric_columns(&mut table);
        let merged: Vec<MetricRow> = table.into_values().collect();

        let df = metrics_to_frame(&merged)?;
        self.write_partition(Table::Metrics, ticker, &merged, df)?;
        Ok(written)
    }

    fn upsert_prices(&self, ticker: &Ticker, bars: &[PriceBar]) -> Result<usize, StoreError> {
        check_ticker(ticker, bars)?;
        if bars.is_empty() {
            return Ok(0);
        }
        let _guard = self.locks.lock(ticker);

        let mut table: BTreeMap<NaiveDate, PriceBar> = self
            .load_prices(ticker)?
            .into_iter()
            .map(|b| (b.date, b))
            .collect();
        let written = merge_by_date(&mut table, bars);
        let merged: Vec<PriceBar> = table.into_values().collect();

        let df = prices_to_frame(&merged)?;
        self.write_partition(Table::Prices, ticker, &merged, df)?;
        Ok(written)
    }

    fn latest(&self, ticker: &Ticker) -> Result<Option<MetricRow>, StoreError> {
        Ok(self.load_metrics(ticker)?.pop())
    }

    fn metrics(&self, ticker: &Ticker) -> Result<Vec<MetricRow>, StoreError> {
        self.load_metrics(ticker)
    }

    fn prices(&self, ticker: &Ticker) -> Result<Vec<PriceBar>, StoreError> {
        self.load_prices(ticker)
    }

    fn tickers(&self) -> Result<Vec<Ticker>, StoreError> {
        let mut tickers = self.partition_tickers(Table::Metrics)?;
        tickers.extend(self.partition_tickers(Table::Prices)?);
        Ok(tickers.into_iter().collect())
    }

    fn summary(&self) -> Result<StoreSummary, StoreError> {
        let metric_tickers = self.partition_tickers(Table::Metrics)?;
        let price_tickers = self.partition_tickers(Table::Prices)?;

        let tickers = metric_tickers
            .union(&price_tickers)
            .map(|ticker| {
                let metrics = if metric_tickers.contains(ticker) {
                    self.table_stats(Table::Metrics, ticker)?
                } else {
                    TableStats::default()
                };
                let prices = if price_tickers.contains(ticker) {
                    self.table_stats(Table::Prices, ticker)?
                } else {
                    TableStats::default()
                };
                Ok(TickerSummary {
                    ticker: ticker.clone(),
                    metrics,
                    prices,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(StoreSummary::from_tickers(tickers))
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), StoreError> {
    let file = fs::File::create(path).map_err(|e| StoreError::unavailable(path, e))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| StoreError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_parquet(path: &Path) -> Result<DataFrame, String> {
    let file = fs::File::open(path).map_err(|e| format!("open: {e}"))?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| format!("read: {e}"))
}
