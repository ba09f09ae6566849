//! Raw dataset loading
//!
//! Reads the delimited air-quality file, parses timestamps into a sortable
//! index, treats the `-200` sentinel as missing and imputes gaps with a
//! forward fill followed by a backward fill for leading gaps. Malformed rows
//! are skipped with a warning.

use super::table::ReadingTable;
use crate::error::{PipelineError, Result};
use crate::models::{parse_timestamp, MISSING_SENTINEL};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Loader settings
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Field delimiter (`;` in the UCI export)
    pub delimiter: u8,
    /// Value that marks a missing measurement
    pub sentinel: f64,
    /// Rows missing any of these columns in the raw file are dropped
    /// instead of imputed
    pub required_columns: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: b';',
            sentinel: MISSING_SENTINEL,
            required_columns: Vec::new(),
        }
    }
}

/// Counters describing what the loader did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub rows_missing_required: usize,
    pub duplicates_dropped: usize,
    pub values_imputed: usize,
}

/// A cleaned, time-sorted table plus the load report
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub table: ReadingTable,
    pub report: LoadReport,
}

enum TimeColumns {
    Combined(usize),
    Split { date: usize, time: usize },
}

/// Load a dataset file with default settings
pub fn load_readings(path: impl AsRef<Path>) -> Result<LoadedData> {
    DataLoader::new(LoaderConfig::default()).load(path)
}

/// Reads raw delimited sensor files into a [`ReadingTable`]
pub struct DataLoader {
    config: LoaderConfig,
}

impl DataLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Load and clean the file at `path`
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedData> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PipelineError::SourceDataMissing(path.to_path_buf()),
            _ => PipelineError::Io(e),
        })?;
        info!(path = %path.display(), "Loading dataset");
        self.load_from_reader(file)
    }

    /// Load and clean delimited data from any reader
    pub fn load_from_reader<R: Read>(&self, reader: R) -> Result<LoadedData> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.config.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let time_columns = locate_time_columns(&headers)?;
        let value_columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, name)| !name.is_empty() && !is_time_column(&time_columns, *i))
            .map(|(i, name)| (i, name.to_string()))
            .collect();
        let required: Vec<usize> = self
            .config
            .required_columns
            .iter()
            .filter_map(|name| value_columns.iter().position(|(_, c)| c == name))
            .collect();

        let mut report = LoadReport::default();
        let mut parsed: Vec<(NaiveDateTime, Vec<Option<f64>>)> = Vec::new();

        for (line, record) in csv_reader.records().enumerate() {
            // header occupies line 1
            let line = line + 2;
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    warn!(line, error = %e, "Skipping unreadable row");
                    report.rows_skipped += 1;
                    continue;
                }
            };
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            report.rows_read += 1;

            let timestamp = match parse_row_timestamp(&record, &time_columns) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(line, error = %e, "Skipping row with malformed timestamp");
                    report.rows_skipped += 1;
                    continue;
                }
            };

            let values: std::result::Result<Vec<Option<f64>>, String> = value_columns
                .iter()
                .map(|(idx, name)| {
                    let raw = record.get(*idx).unwrap_or("");
                    self.parse_value(raw)
                        .map_err(|_| format!("column '{}' has non-numeric value '{}'", name, raw))
                })
                .collect();
            let values = match values {
                Ok(v) => v,
                Err(reason) => {
                    warn!(line, reason = %reason, "Skipping malformed row");
                    report.rows_skipped += 1;
                    continue;
                }
            };

            if required.iter().any(|&i| values[i].is_none()) {
                report.rows_missing_required += 1;
                continue;
            }
            parsed.push((timestamp, values));
        }

        // Stable sort keeps the first occurrence of a duplicated timestamp first
        parsed.sort_by_key(|(ts, _)| *ts);
        let before = parsed.len();
        parsed.dedup_by_key(|(ts, _)| *ts);
        report.duplicates_dropped = before - parsed.len();
        if report.duplicates_dropped > 0 {
            warn!(
                count = report.duplicates_dropped,
                "Dropped rows with duplicate timestamps"
            );
        }

        if parsed.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "no usable rows after parsing".to_string(),
            ));
        }

        let names: Vec<String> = value_columns.into_iter().map(|(_, n)| n).collect();
        let (timestamps, mut raw_rows): (Vec<_>, Vec<_>) = parsed.into_iter().unzip();
        report.values_imputed = impute(&names, &mut raw_rows);

        let shape = (raw_rows.len(), names.len());
        let flat: Vec<f64> = raw_rows.into_iter().flatten().map(|v| v.unwrap_or(0.0)).collect();
        let values = Array2::from_shape_vec(shape, flat)
            .map_err(|e| PipelineError::Shape(e.to_string()))?;
        let table = ReadingTable::new(names, timestamps, values)?;

        debug!(
            rows = table.len(),
            columns = table.width(),
            skipped = report.rows_skipped,
            imputed = report.values_imputed,
            "Dataset loaded"
        );
        Ok(LoadedData { table, report })
    }

    /// Parse one cell; `Ok(None)` for empty or sentinel values
    fn parse_value(&self, raw: &str) -> std::result::Result<Option<f64>, ()> {
        if raw.is_empty() {
            return Ok(None);
        }
        let normalized = if self.config.delimiter != b',' {
            raw.replace(',', ".")
        } else {
            raw.to_string()
        };
        let value: f64 = normalized.parse().map_err(|_| ())?;
        if !value.is_finite() || (value - self.config.sentinel).abs() < f64::EPSILON {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }
}

fn locate_time_columns(headers: &csv::StringRecord) -> Result<TimeColumns> {
    let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    if let Some(idx) = find("DateTime") {
        return Ok(TimeColumns::Combined(idx));
    }
    match (find("Date"), find("Time")) {
        (Some(date), Some(time)) => Ok(TimeColumns::Split { date, time }),
        _ => Err(PipelineError::DataParse(
            "header has neither a DateTime column nor Date and Time columns".to_string(),
        )),
    }
}

fn is_time_column(columns: &TimeColumns, idx: usize) -> bool {
    match columns {
        TimeColumns::Combined(c) => *c == idx,
        TimeColumns::Split { date, time } => *date == idx || *time == idx,
    }
}

fn parse_row_timestamp(record: &csv::StringRecord, columns: &TimeColumns) -> Result<NaiveDateTime> {
    match columns {
        TimeColumns::Combined(idx) => parse_timestamp(record.get(*idx).unwrap_or("")),
        TimeColumns::Split { date, time } => {
            let date_raw = record.get(*date).unwrap_or("");
            let time_raw = record.get(*time).unwrap_or("");
            let date = ["%d/%m/%Y", "%Y-%m-%d"]
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(date_raw, f).ok())
                .ok_or_else(|| PipelineError::DataParse(format!("bad date '{}'", date_raw)))?;
            let time = ["%H.%M.%S", "%H:%M:%S", "%H:%M"]
                .iter()
                .find_map(|f| NaiveTime::parse_from_str(time_raw, f).ok())
                .ok_or_else(|| PipelineError::DataParse(format!("bad time '{}'", time_raw)))?;
            Ok(date.and_time(time))
        }
    }
}

/// Forward fill, then backward fill leading gaps; all-missing columns get 0.
/// Returns the number of imputed cells.
fn impute(names: &[String], rows: &mut [Vec<Option<f64>>]) -> usize {
    let mut imputed = 0;
    for (col, name) in names.iter().enumerate() {
        let mut last = None;
        for row in rows.iter_mut() {
            match row[col] {
                Some(v) => last = Some(v),
                None => {
                    if let Some(v) = last {
                        row[col] = Some(v);
                        imputed += 1;
                    }
                }
            }
        }
        let first = rows.iter().find_map(|r| r[col]);
        let fill = match first {
            Some(v) => v,
            None => {
                warn!(column = %name, "Column has no values; filling with 0");
                0.0
            }
        };
        for row in rows.iter_mut() {
            if row[col].is_none() {
                row[col] = Some(fill);
                imputed += 1;
            }
        }
    }
    imputed
}
