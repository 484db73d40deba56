//! Observed time-series data: DSSAT T-files (`*.MZT`, `*.PTT`, ...) or CSV
//! exports with the same `TRNO` / `DATE` layout.

use crate::dssat::dates::from_dssat_date;
use crate::utils::error::{DssatError, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// DSSAT's sentinel for "not measured".
pub const MISSING_VALUE: f64 = -99.0;

pub type ObservationKey = (u32, NaiveDate);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedData {
    pub columns: Vec<String>,
    pub rows: BTreeMap<ObservationKey, BTreeMap<String, f64>>,
}

impl ObservedData {
    pub fn get(&self, trno: u32, date: NaiveDate, column: &str) -> Option<f64> {
        self.rows.get(&(trno, date))?.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn insert(&mut self, key: ObservationKey, column: &str, value: f64) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
        let row = self.rows.entry(key).or_default();
        if value != MISSING_VALUE {
            row.insert(column.to_string(), value);
        }
    }

    fn select(mut self, name: &str, params: Option<&[String]>) -> Result<Self> {
        let Some(params) = params else {
            return Ok(self);
        };
        for param in params {
            if !self.columns.contains(param) {
                return Err(DssatError::missing_column(name, param));
            }
        }
        self.columns = params.to_vec();
        for row in self.rows.values_mut() {
            row.retain(|column, _| params.contains(column));
        }
        Ok(self)
    }
}

/// Parses a T-file. Every `@` block adds its columns; rows from different
/// blocks that share `(TRNO, DATE)` are merged.
pub fn parse_observed(name: &str, text: &str, params: Option<&[String]>) -> Result<ObservedData> {
    let mut data = ObservedData::default();
    let mut header: Option<(Vec<String>, usize, usize)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end_matches('\r');

        if line.trim().is_empty() || line.starts_with('*') {
            header = None;
            continue;
        }
        if line.starts_with('!') {
            continue;
        }
        if let Some(rest) = line.strip_prefix('@') {
            let columns: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
            let trno_idx = columns
                .iter()
                .position(|c| c == "TRNO")
                .ok_or_else(|| DssatError::missing_column(name, "TRNO"))?;
            let date_idx = columns
                .iter()
                .position(|c| c == "DATE")
                .ok_or_else(|| DssatError::missing_column(name, "DATE"))?;
            header = Some((columns, trno_idx, date_idx));
            continue;
        }

        let Some((columns, trno_idx, date_idx)) = header.as_ref() else {
            continue;
        };
        let cells: Vec<&str> = line.split_whitespace().collect();
        if cells.len() != columns.len() {
            return Err(DssatError::parse(
                name,
                line_no,
                format!("expected {} columns, found {}", columns.len(), cells.len()),
            ));
        }

        let trno = cells[*trno_idx]
            .parse::<u32>()
            .map_err(|_| DssatError::parse(name, line_no, "TRNO is not an integer"))?;
        let date = from_dssat_date(cells[*date_idx])?;

        for (i, column) in columns.iter().enumerate() {
            if i == *trno_idx || i == *date_idx {
                continue;
            }
            let value = cells[i].parse::<f64>().map_err(|_| {
                DssatError::parse(name, line_no, format!("{} value '{}' is not numeric", column, cells[i]))
            })?;
            data.insert((trno, date), column, value);
        }
    }

    tracing::debug!("Read {} observation rows from {}", data.len(), name);
    data.select(name, params)
}

/// Reads the CSV flavour: `TRNO` (or `@TRNO`) and `DATE` (`YYYY-MM-DD` or
/// `YYDDD`/`YYYYDDD`) plus any number of numeric columns. Empty cells are missing.
pub fn read_observed_csv(name: &str, text: &str, params: Option<&[String]>) -> Result<ObservedData> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('@').to_string())
        .collect();

    let trno_idx = headers
        .iter()
        .position(|c| c == "TRNO")
        .ok_or_else(|| DssatError::missing_column(name, "TRNO"))?;
    let date_idx = headers
        .iter()
        .position(|c| c == "DATE")
        .ok_or_else(|| DssatError::missing_column(name, "DATE"))?;

    let mut data = ObservedData::default();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line_no = idx + 2;
        let cell = |i: usize| record.get(i).unwrap_or("");

        let trno = cell(trno_idx)
            .parse::<u32>()
            .map_err(|_| DssatError::parse(name, line_no, "TRNO is not an integer"))?;
        let date = parse_csv_date(cell(date_idx))?;

        for (i, column) in headers.iter().enumerate() {
            if i == trno_idx || i == date_idx {
                continue;
            }
            let raw = cell(i);
            let value = if raw.is_empty() {
                MISSING_VALUE
            } else {
                raw.parse::<f64>().map_err(|_| {
                    DssatError::parse(name, line_no, format!("{} value '{}' is not numeric", column, raw))
                })?
            };
            data.insert((trno, date), column, value);
        }
    }

    data.select(name, params)
}

fn parse_csv_date(value: &str) -> Result<NaiveDate> {
    if value.contains('-') {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| DssatError::InvalidDateError {
            value: value.to_string(),
            reason: e.to_string(),
        })
    } else {
        from_dssat_date(value)
    }
}
