//! Daily time series pulled out of DSSAT output tables.

use crate::dssat::dates::from_year_doy;
use crate::dssat::output::{OutputFile, OutputTable};
use crate::utils::error::{DssatError, Result};
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    /// 1-based position of the run's table in the file.
    pub trno: u32,
    pub crop: Option<String>,
    pub date: NaiveDate,
    /// Requested parameters in request order; `None` when the column is absent.
    pub values: Vec<(String, Option<f64>)>,
}

impl DailyRecord {
    pub fn get(&self, param: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| name == param)
            .and_then(|(_, value)| *value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DailyOptions {
    /// Convert running totals of cumulative variables into per-day amounts.
    pub daily: bool,
    /// Attach the crop from each run's ` MODEL` line.
    pub crop_sequence: bool,
}

/// Differences a cumulative series. A drop in the running total means a new
/// series was stacked after the previous one, so the value is kept as is.
pub fn cum_to_daily(cumulative: &[f64]) -> Vec<f64> {
    let mut daily = Vec::with_capacity(cumulative.len());
    for (i, &value) in cumulative.iter().enumerate() {
        if i == 0 || value < cumulative[i - 1] {
            daily.push(value);
        } else {
            daily.push(value - cumulative[i - 1]);
        }
    }
    daily
}

pub fn extract_daily(
    file: &OutputFile,
    params: &[String],
    cumulative: &[&str],
    options: DailyOptions,
) -> Result<Vec<DailyRecord>> {
    let mut records = Vec::new();
    let tables = file
        .runs
        .iter()
        .flat_map(|run| run.tables.iter().map(move |table| (run, table)));

    for (idx, (run, table)) in tables.enumerate() {
        let trno = idx as u32 + 1;
        let crop = if options.crop_sequence {
            let crop = run.crop.as_ref().ok_or_else(|| DssatError::ProcessingError {
                message: format!("{}: no MODEL line for run {}", file.name, run.run),
            })?;
            Some(crop.clone())
        } else {
            None
        };

        let dates = table_dates(&file.name, table)?;

        let mut columns: Vec<(String, Option<Vec<f64>>)> = Vec::with_capacity(params.len());
        for param in params {
            let series = match table.column(param) {
                Some(cells) => {
                    let values = cells
                        .map(|cell| parse_number(&file.name, param, cell))
                        .collect::<Result<Vec<f64>>>()?;
                    if options.daily && cumulative.contains(&param.as_str()) {
                        Some(cum_to_daily(&values))
                    } else {
                        Some(values)
                    }
                }
                None => {
                    tracing::debug!("{}: column {} not present in run {}", file.name, param, trno);
                    None
                }
            };
            columns.push((param.clone(), series));
        }

        for (row, date) in dates.into_iter().enumerate() {
            let values = columns
                .iter()
                .map(|(name, series)| (name.clone(), series.as_ref().map(|s| s[row])))
                .collect();
            records.push(DailyRecord {
                trno,
                crop: crop.clone(),
                date,
                values,
            });
        }
    }

    Ok(records)
}

pub(crate) fn table_dates(file: &str, table: &OutputTable) -> Result<Vec<NaiveDate>> {
    let years = table
        .column("YEAR")
        .ok_or_else(|| DssatError::missing_column(file, "YEAR"))?;
    let doys = table
        .column("DOY")
        .ok_or_else(|| DssatError::missing_column(file, "DOY"))?;

    years
        .zip(doys)
        .map(|(year, doy)| {
            let year: i32 = year.parse().map_err(|_| DssatError::InvalidDateError {
                value: year.to_string(),
                reason: format!("YEAR in {} is not an integer", file),
            })?;
            let doy: u32 = doy.parse().map_err(|_| DssatError::InvalidDateError {
                value: doy.to_string(),
                reason: format!("DOY in {} is not an integer", file),
            })?;
            from_year_doy(year, doy)
        })
        .collect()
}

pub(crate) fn parse_number(file: &str, column: &str, cell: &str) -> Result<f64> {
    cell.parse::<f64>().map_err(|_| DssatError::ProcessingError {
        message: format!("{}: value '{}' in column {} is not numeric", file, cell, column),
    })
}
