//! DSSAT date helpers.
//!
//! DSSAT writes dates as `YYDDD` (two-digit year, day of year) in most input
//! files and as separate `YEAR` / `DOY` columns in its daily outputs.

use crate::utils::error::{DssatError, Result};
use chrono::{Datelike, NaiveDate};

/// Two-digit years at or above this value belong to the 1900s.
pub const CENTURY_PIVOT: u32 = 86;

pub fn julian_day(date: NaiveDate) -> u32 {
    date.ordinal()
}

pub fn to_dssat_date(date: NaiveDate) -> String {
    format!("{:02}{:03}", date.year().rem_euclid(100), date.ordinal())
}

pub fn from_year_doy(year: i32, doy: u32) -> Result<NaiveDate> {
    NaiveDate::from_yo_opt(year, doy).ok_or_else(|| DssatError::InvalidDateError {
        value: format!("{}/{:03}", year, doy),
        reason: "day of year out of range".to_string(),
    })
}

/// Parses `YYDDD` or `YYYYDDD`.
pub fn from_dssat_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    let invalid = |reason: &str| DssatError::InvalidDateError {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("expected digits only"));
    }

    let (year, doy) = match value.len() {
        5 => {
            let yy: u32 = value[..2].parse().map_err(|_| invalid("bad year"))?;
            let century = if yy >= CENTURY_PIVOT { 1900 } else { 2000 };
            (century + yy as i32, &value[2..])
        }
        7 => {
            let yyyy: i32 = value[..4].parse().map_err(|_| invalid("bad year"))?;
            (yyyy, &value[4..])
        }
        _ => return Err(invalid("expected YYDDD or YYYYDDD")),
    };
    let doy: u32 = doy.parse().map_err(|_| invalid("bad day of year"))?;
    from_year_doy(year, doy)
}
