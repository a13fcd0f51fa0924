//! DataFrame conversion for the stored tables.
//!
//! Metrics schema: `date: Date`, `return: Float64?`, then one nullable
//! `Float64` column per metric id (`vol20`, `sma50`, ...). Prices schema:
//! `date: Date`, `close: Float64`. The ticker is not a column; it comes from
//! the partition directory.

use super::StoreError;
use crate::domain::{MetricId, MetricRow, PriceBar, Ticker};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::BTreeSet;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub const DATE_COLUMN: &str = "date";
pub const RETURN_COLUMN: &str = "return";
pub const CLOSE_COLUMN: &str = "close";

fn to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

fn from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(EPOCH_DAYS_FROM_CE)?)
}

fn parquet_err(context: &str) -> impl Fn(PolarsError) -> StoreError + '_ {
    move |e| StoreError::Parquet(format!("{context}: {e}"))
}

fn date_column<'a>(dates: impl Iterator<Item = &'a NaiveDate>) -> Result<Column, StoreError> {
    let days: Vec<i32> = dates.map(|d| to_epoch_days(*d)).collect();
    Column::new(DATE_COLUMN.into(), days)
        .cast(&DataType::Date)
        .map_err(parquet_err("date cast"))
}

fn read_dates(df: &DataFrame) -> Result<Vec<NaiveDate>, StoreError> {
    let dates = df
        .column(DATE_COLUMN)
        .map_err(parquet_err("date column"))?
        .date()
        .map_err(parquet_err("date column type"))?;
    (0..df.height())
        .map(|i| {
            dates
                .get(i)
                .and_then(from_epoch_days)
                .ok_or_else(|| StoreError::Parquet(format!("null or invalid date at row {i}")))
        })
        .collect()
}

fn read_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, StoreError> {
    let ca = df
        .column(name)
        .map_err(parquet_err("column read"))?
        .f64()
        .map_err(|e| StoreError::Parquet(format!("{name} column type: {e}")))?;
    Ok((0..df.height()).map(|i| ca.get(i)).collect())
}

/// Build the metrics frame. Metric columns are the union of every row's ids,
/// in sorted order; a row without a given id stores null.
pub fn metrics_to_frame(rows: &[MetricRow]) -> Result<DataFrame, StoreError> {
    let ids: BTreeSet<MetricId> = rows.iter().flat_map(|r| r.values.keys().copied()).collect();

    let mut columns = Vec::with_capacity(ids.len() + 2);
    columns.push(date_column(rows.iter().map(|r| &r.date))?);
    let returns: Vec<Option<f64>> = rows.iter().map(|r| r.ret).collect();
    columns.push(Column::new(RETURN_COLUMN.into(), returns));
    for id in &ids {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.get(*id)).collect();
        columns.push(Column::new(id.to_string().into(), values));
    }

    DataFrame::new(columns).map_err(parquet_err("dataframe creation"))
}

pub fn frame_to_metrics(ticker: &Ticker, df: &DataFrame) -> Result<Vec<MetricRow>, StoreError> {
    let dates = read_dates(df)?;
    let returns = read_f64(df, RETURN_COLUMN)?;

    let mut metric_columns = Vec::new();
    for name in df.get_column_names() {
        let name = name.as_str();
        if name == DATE_COLUMN || name == RETURN_COLUMN {
            continue;
        }
        let id: MetricId = name
            .parse()
            .map_err(|e| StoreError::Parquet(format!("{e}")))?;
        metric_columns.push((id, read_f64(df, name)?));
    }

    Ok(dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let mut row = MetricRow::new(ticker.clone(), date);
            row.ret = returns[i];
            for (id, values) in &metric_columns {
                row.values.insert(*id, values[i]);
            }
            row
        })
        .collect())
}

pub fn prices_to_frame(bars: &[PriceBar]) -> Result<DataFrame, StoreError> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    DataFrame::new(vec![
        date_column(bars.iter().map(|b| &b.date))?,
        Column::new(CLOSE_COLUMN.into(), closes),
    ])
    .map_err(parquet_err("dataframe creation"))
}

pub fn frame_to_prices(ticker: &Ticker, df: &DataFrame) -> Result<Vec<PriceBar>, StoreError> {
    let dates = read_dates(df)?;
    let closes = read_f64(df, CLOSE_COLUMN)?;
    dates
        .into_iter()
        .zip(closes)
        .enumerate()
        .map(|(i, (date, close))| {
            let close =
                close.ok_or_else(|| StoreError::Parquet(format!("null close at row {i}")))?;
            Ok(PriceBar::new(ticker.clone(), date, close))
        })
        .collect()
}
