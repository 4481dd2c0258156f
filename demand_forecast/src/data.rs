//! Historical demand series handling
//!
//! The history lives in a single delimited-text file with (at least) the
//! columns `date`, `demand` and `inventory`, in any order. The file is only
//! ever extended: [`TimeSeriesStore::append`] adds one row at the end and never
//! rewrites existing ones.

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Columns every history file must carry
pub const REQUIRED_COLUMNS: [&str; 3] = ["date", "demand", "inventory"];

/// Minimum number of daily demand points needed to fit a forecast
pub const DEFAULT_MIN_HISTORY: usize = 10;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// One day of demand history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    pub date: NaiveDate,
    pub demand: f64,
    pub inventory: f64,
}

/// A history row as read from disk; `None` marks an empty cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDemandRow {
    pub date: NaiveDate,
    pub demand: Option<f64>,
    pub inventory: Option<f64>,
}

/// History rows sorted by date, together with the columns they were read from
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSeries {
    columns: Vec<String>,
    rows: Vec<RawDemandRow>,
}

impl DemandSeries {
    /// Create a series with the standard columns from already-parsed rows
    pub fn new(mut rows: Vec<RawDemandRow>) -> Self {
        rows.sort_by_key(|row| row.date);
        Self {
            columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// Create a series from complete records
    pub fn from_records(records: &[DemandRecord]) -> Self {
        Self::new(
            records
                .iter()
                .map(|r| RawDemandRow {
                    date: r.date,
                    demand: Some(r.demand),
                    inventory: Some(r.inventory),
                })
                .collect(),
        )
    }

    /// Get the column names, lower-cased
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get the rows, ascending by date
    pub fn rows(&self) -> &[RawDemandRow] {
        &self.rows
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether a row for `date` exists
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.rows.binary_search_by_key(&date, |row| row.date).is_ok()
    }

    /// Most recent known inventory level, or 0 when none is recorded
    pub fn latest_inventory(&self) -> f64 {
        self.rows
            .iter()
            .rev()
            .find_map(|row| row.inventory)
            .unwrap_or(0.0)
    }

    fn missing_columns(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|required| !self.columns.iter().any(|c| c == required))
            .collect()
    }
}

/// Append-only store for the canonical demand history
#[derive(Debug)]
pub struct TimeSeriesStore {
    path: PathBuf,
    min_history: usize,
    write_lock: Mutex<()>,
}

impl TimeSeriesStore {
    /// Create a store backed by the history file at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            min_history: DEFAULT_MIN_HISTORY,
            write_lock: Mutex::new(()),
        }
    }

    /// Override the minimum number of usable demand points
    pub fn with_min_history(mut self, min_history: usize) -> Self {
        self.min_history = min_history;
        self
    }

    /// Get the history file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }

    /// Read the history file, sorted ascending by date
    ///
    /// Numeric cells that cannot be parsed, or are negative, are read as zero.
    /// Empty cells are kept as missing so normalisation can forward-fill them.
    pub fn load(&self) -> Result<DemandSeries> {
        if !self.path.exists() {
            return Err(ForecastError::DataUnavailable(format!(
                "History file not found: {}",
                self.path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_lowercase())
            .collect();
        let position = |name: &str| columns.iter().position(|c| c == name);
        let (date_idx, demand_idx, inventory_idx) =
            (position("date"), position("demand"), position("inventory"));

        let mut rows = Vec::new();
        if let Some(date_idx) = date_idx {
            for (line, record) in reader.records().enumerate() {
                let record = record?;
                let raw_date = record.get(date_idx).unwrap_or_default();
                if raw_date.is_empty() {
                    warn!(
                        row = line + 1,
                        path = %self.path.display(),
                        "skipping history row without a date"
                    );
                    continue;
                }

                let date = parse_date(raw_date).ok_or_else(|| {
                    ForecastError::SchemaInvalid(format!(
                        "Unparseable date '{}' on data row {}",
                        raw_date,
                        line + 1
                    ))
                })?;

                rows.push(RawDemandRow {
                    date,
                    demand: parse_quantity(demand_idx.and_then(|i| record.get(i))),
                    inventory: parse_quantity(inventory_idx.and_then(|i| record.get(i))),
                });
            }
        }

        // Stable so duplicate dates keep their file order
        rows.sort_by_key(|row| row.date);
        debug!(path = %self.path.display(), rows = rows.len(), "loaded demand history");

        Ok(DemandSeries { columns, rows })
    }

    /// Check that a series carries the required columns and some demand values
    pub fn validate(&self, series: &DemandSeries) -> Result<()> {
        let missing = series.missing_columns();
        if !missing.is_empty() {
            return Err(ForecastError::SchemaInvalid(format!(
                "History is missing required columns: {}",
                missing.join(", ")
            )));
        }

        if series.rows.iter().all(|row| row.demand.is_none()) {
            return Err(ForecastError::EmptySeries(
                "Column 'demand' contains no values".to_string(),
            ));
        }

        Ok(())
    }

    /// Resample to one record per calendar day
    ///
    /// Days without a demand value inherit the previous day's value; days before
    /// the first known demand are dropped. When a date appears more than once
    /// the last row wins.
    pub fn normalize(&self, series: &DemandSeries) -> Result<Vec<DemandRecord>> {
        let mut daily: Vec<RawDemandRow> = Vec::with_capacity(series.rows.len());
        let mut duplicates = 0usize;
        for row in &series.rows {
            match daily.last_mut() {
                Some(last) if last.date == row.date => {
                    *last = *row;
                    duplicates += 1;
                }
                _ => daily.push(*row),
            }
        }
        if duplicates > 0 {
            warn!(duplicates, "history contains duplicate dates; keeping the last row for each");
        }

        let first_known = daily
            .iter()
            .position(|row| row.demand.is_some())
            .ok_or_else(|| {
                ForecastError::EmptySeries("Column 'demand' contains no values".to_string())
            })?;
        let daily = &daily[first_known..];

        let mut records = Vec::new();
        let mut demand = 0.0;
        let mut inventory = 0.0;
        let mut next = 0;
        let mut date = daily[0].date;
        let last_date = daily[daily.len() - 1].date;

        while date <= last_date {
            if next < daily.len() && daily[next].date == date {
                let row = daily[next];
                demand = row.demand.unwrap_or(demand);
                inventory = row.inventory.unwrap_or(inventory);
                next += 1;
            }
            records.push(DemandRecord {
                date,
                demand,
                inventory,
            });
            date += Duration::days(1);
        }

        if records.len() < self.min_history {
            return Err(ForecastError::InsufficientHistory {
                required: self.min_history,
                available: records.len(),
            });
        }

        Ok(records)
    }

    /// Load, validate and normalise the history in one step
    pub fn load_history(&self) -> Result<Vec<DemandRecord>> {
        let series = self.load()?;
        self.validate(&series)?;
        self.normalize(&series)
    }

    /// Whether the history file already has a row for `date`
    pub fn contains_date(&self, date: NaiveDate) -> Result<bool> {
        Ok(self.load()?.contains_date(date))
    }

    /// Most recent known inventory level, or 0 when none is recorded
    pub fn latest_inventory(&self) -> Result<f64> {
        Ok(self.load()?.latest_inventory())
    }

    /// Append `record` unless a row for its date already exists
    ///
    /// The existence check and the write happen under one lock, so concurrent
    /// appends for the same date write exactly one row. Returns whether a row
    /// was written.
    pub fn append(&self, record: &DemandRecord) -> Result<bool> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let series = self.load()?;
        let missing = series.missing_columns();
        if !missing.is_empty() {
            return Err(ForecastError::SchemaInvalid(format!(
                "Cannot append to history missing columns: {}",
                missing.join(", ")
            )));
        }
        if series.contains_date(record.date) {
            debug!(date = %record.date, "history already has a row for this date");
            return Ok(false);
        }

        let mut file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        if !ends_with_newline(&mut file)? {
            file.write_all(b"\n")?;
        }

        let fields: Vec<String> = series
            .columns
            .iter()
            .map(|column| match column.as_str() {
                "date" => record.date.format("%Y-%m-%d").to_string(),
                "demand" => record.demand.to_string(),
                "inventory" => record.inventory.to_string(),
                _ => String::new(),
            })
            .collect();

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(&fields)?;
        writer.flush()?;

        info!(
            date = %record.date,
            demand = record.demand,
            inventory = record.inventory,
            path = %self.path.display(),
            "appended record to demand history"
        );
        Ok(true)
    }
}

/// Write a fresh history file containing `records`
pub fn write_history<P: AsRef<Path>>(path: P, records: &[DemandRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn ends_with_newline(file: &mut File) -> Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn parse_quantity(cell: Option<&str>) -> Option<f64> {
    let cell = cell?.trim();
    if cell.is_empty() {
        return None;
    }

    match cell.parse::<f64>() {
        Ok(v) if v.is_nan() => None,
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => Some(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(None), None);
        assert_eq!(parse_quantity(Some("")), None);
        assert_eq!(parse_quantity(Some("NaN")), None);
        assert_eq!(parse_quantity(Some("12.5")), Some(12.5));
        assert_eq!(parse_quantity(Some("abc")), Some(0.0));
        assert_eq!(parse_quantity(Some("-4")), Some(0.0));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date("2024-03-09"), expected);
        assert_eq!(parse_date("03/09/2024"), expected);
        assert_eq!(parse_date("2024-03-09 00:00:00"), expected);
        assert_eq!(parse_date("09.03.2024"), None);
    }

    #[test]
    fn test_normalize_in_memory_series() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let records: Vec<DemandRecord> = [0, 1, 3]
            .iter()
            .map(|&offset| DemandRecord {
                date: start + Duration::days(offset),
                demand: offset as f64,
                inventory: 5.0,
            })
            .collect();
        let series = DemandSeries::from_records(&records);
        let store = TimeSeriesStore::new("unused.csv").with_min_history(4);

        assert!(series.contains_date(start));
        assert_eq!(series.latest_inventory(), 5.0);
        store.validate(&series).unwrap();

        let daily = store.normalize(&series).unwrap();
        let demand: Vec<f64> = daily.iter().map(|r| r.demand).collect();
        assert_eq!(demand, vec![0.0, 1.0, 1.0, 3.0]);
    }
}
