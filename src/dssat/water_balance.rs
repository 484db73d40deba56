//! Seasonal soil water balance from `SoilWatBal.OUT`.
//!
//! Each run ends with a block like
//!
//! ```text
//! !     Soil H20 (start) on Day 1982/057                    290.1
//! !     Soil H20 (final) on Day 1982/166                    253.1
//! !     Precipitation                                      569.8
//! !     Drainage                                           341.9
//! !     Runoff                                              41.2
//! !     Soil Evaporation                                   126.1
//! !     Transpiration                                       97.6
//! !     Final Balance                                       -0.0
//! ```
//!
//! Losses are reported as negative amounts, inputs as positive ones.

use crate::dssat::dates::from_year_doy;
use crate::dssat::output::parse_run_line;
use crate::utils::error::{DssatError, Result};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterBalance {
    pub run: u32,
    pub treatment: String,
    pub planting_date: NaiveDate,
    pub harvest_date: NaiveDate,
    pub soil_water_start: f64,
    pub soil_water_final: f64,
    pub precipitation: f64,
    pub drainage: f64,
    pub tiledrain_flow: f64,
    pub runoff: f64,
    pub evapotranspiration: f64,
    pub soil_water_lost: f64,
}

#[derive(Debug, Default)]
struct Partial {
    run: u32,
    treatment: String,
    start: Option<(NaiveDate, f64)>,
    end: Option<(NaiveDate, f64)>,
    precipitation: f64,
    drainage: f64,
    tiledrain_flow: f64,
    runoff: f64,
    evaporation: f64,
    transpiration: f64,
}

impl Partial {
    fn finish(self, file: &str, line: usize) -> Result<WaterBalance> {
        let (planting_date, soil_water_start) = self
            .start
            .ok_or_else(|| DssatError::parse(file, line, "balance block without a start line"))?;
        let (harvest_date, soil_water_final) = self
            .end
            .ok_or_else(|| DssatError::parse(file, line, "balance block without a final line"))?;

        Ok(WaterBalance {
            run: self.run,
            treatment: self.treatment,
            planting_date,
            harvest_date,
            soil_water_start,
            soil_water_final,
            precipitation: self.precipitation,
            drainage: -self.drainage,
            tiledrain_flow: -self.tiledrain_flow,
            runoff: -self.runoff,
            evapotranspiration: -(self.evaporation + self.transpiration),
            soil_water_lost: soil_water_start - soil_water_final,
        })
    }
}

pub fn parse_water_balance(name: &str, text: &str) -> Result<Vec<WaterBalance>> {
    let mut balances = Vec::new();
    let mut current: Option<Partial> = None;
    let mut in_block = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end_matches('\r');

        if line.starts_with("*RUN") {
            if in_block {
                return Err(unfinished_season(name, line_no, current.as_ref()));
            }
            let block = parse_run_line(name, line_no, line)?;
            current = Some(Partial {
                run: block.run,
                treatment: block.treatment_name(),
                ..Default::default()
            });
            continue;
        }

        let Some(body) = line.strip_prefix('!') else {
            continue;
        };
        let Some((key, value)) = split_key_value(body) else {
            continue;
        };

        if key.starts_with("Soil H20 (start)") {
            in_block = true;
        }
        if !in_block {
            continue;
        }

        let partial = current
            .as_mut()
            .ok_or_else(|| DssatError::parse(name, line_no, "balance line before any *RUN"))?;
        let amount: f64 = value
            .parse()
            .map_err(|_| DssatError::parse(name, line_no, format!("'{}' is not a number", value)))?;

        if key.starts_with("Soil H20 (start)") {
            partial.start = Some((balance_date(name, line_no, key)?, amount));
        } else if key.starts_with("Soil H20 (final)") {
            partial.end = Some((balance_date(name, line_no, key)?, amount));
        } else if key == "Precipitation" {
            partial.precipitation = amount;
        } else if key == "Drainage" {
            partial.drainage = amount;
        } else if key == "Tiledrain flow" {
            partial.tiledrain_flow = amount;
        } else if key == "Runoff" {
            partial.runoff = amount;
        } else if key.contains("Evaporation") {
            partial.evaporation += amount;
        } else if key.contains("Transpiration") {
            partial.transpiration += amount;
        } else if key.starts_with("Final Balance") {
            in_block = false;
            if let Some(done) = current.take() {
                balances.push(done.finish(name, line_no)?);
            }
        }
    }

    if in_block {
        let last_line = text.lines().count();
        return Err(unfinished_season(name, last_line, current.as_ref()));
    }

    tracing::debug!("Parsed {} seasonal water balance(s) from {}", balances.len(), name);
    Ok(balances)
}

fn unfinished_season(file: &str, line: usize, season: Option<&Partial>) -> DssatError {
    let run = season.map(|p| p.run.to_string()).unwrap_or_else(|| "?".to_string());
    DssatError::parse(
        file,
        line,
        format!("season of run {} has no Final Balance line", run),
    )
}

/// 1-based, inclusive on both ends; `end == None` runs to the last season.
pub fn select_runs(balances: &[WaterBalance], start: usize, end: Option<usize>) -> &[WaterBalance] {
    let from = start.saturating_sub(1).min(balances.len());
    let to = end.unwrap_or(balances.len()).min(balances.len()).max(from);
    &balances[from..to]
}

/// Splits `     Drainage                 341.9` into key and trailing value.
fn split_key_value(body: &str) -> Option<(&str, &str)> {
    let trimmed = body.trim_end();
    let split_at = trimmed.rfind(char::is_whitespace)?;
    let key = trimmed[..split_at].trim();
    let value = trimmed[split_at..].trim();
    if key.is_empty() || value.parse::<f64>().is_err() {
        return None;
    }
    Some((key, value))
}

/// `Soil H20 (start) on Day 1982/057` -> 1982-02-26
fn balance_date(file: &str, line: usize, key: &str) -> Result<NaiveDate> {
    let stamp = key
        .split_whitespace()
        .last()
        .ok_or_else(|| DssatError::parse(file, line, "missing date"))?;
    let (year, doy) = stamp
        .split_once('/')
        .ok_or_else(|| DssatError::parse(file, line, format!("bad date '{}'", stamp)))?;
    let year = year
        .parse()
        .map_err(|_| DssatError::parse(file, line, format!("bad year in '{}'", stamp)))?;
    let doy = doy
        .parse()
        .map_err(|_| DssatError::parse(file, line, format!("bad day in '{}'", stamp)))?;
    from_year_doy(year, doy)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOIL_WAT_BAL: &str = "\
*DSSAT Cropping System Model Ver. 4.7.5.001 -dev

*RUN   1        : Rainfed low N          MZCER047 UFGA8201   1
 MODEL          : MZCER047 - Maize

!     SEASONAL SOIL WATER BALANCE
!     Soil H20 (start) on Day 1982/057                    290.1
!     Soil H20 (final) on Day 1982/166                    253.1
!     Effective Irrigation                                 0.0
!     Precipitation                                      569.8
!     Drainage                                           341.9
!     Runoff                                              41.2
!     Soil Evaporation                                   126.1
!     Transpiration                                       97.6
!     Final Balance                                       -0.0

*RUN   2        : Irrigated high N       MZCER047 UFGA8201   2

!     Soil H20 (start) on Day 1983/060                    280.0
!     Soil H20 (final) on Day 1983/170                    250.0
!     Precipitation                                      400.0
!     Drainage                                           100.0
!     Tiledrain flow                                      10.0
!     Runoff                                              20.0
!     Soil Evaporation                                   100.0
!     Transpiration                                      200.0
!     Final Balance                                        0.0
";

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parse_two_seasons() {
        let balances = parse_water_balance("SoilWatBal.OUT", SOIL_WAT_BAL).unwrap();
        assert_eq!(balances.len(), 2);

        let first = &balances[0];
        assert_eq!(first.run, 1);
        assert_eq!(first.treatment, "Rainfed low N");
        assert_eq!(first.planting_date, NaiveDate::from_ymd_opt(1982, 2, 26).unwrap());
        assert_eq!(first.harvest_date, NaiveDate::from_ymd_opt(1982, 6, 15).unwrap());
        assert!(close(first.precipitation, 569.8));
        assert!(close(first.drainage, -341.9));
        assert!(close(first.tiledrain_flow, 0.0));
        assert!(close(first.runoff, -41.2));
        assert!(close(first.evapotranspiration, -223.7));
        assert!(close(first.soil_water_lost, 37.0));

        let second = &balances[1];
        assert_eq!(second.treatment, "Irrigated high N");
        assert!(close(second.tiledrain_flow, -10.0));
        assert!(close(second.evapotranspiration, -300.0));
    }

    #[test]
    fn test_select_runs() {
        let balances = parse_water_balance("SoilWatBal.OUT", SOIL_WAT_BAL).unwrap();
        assert_eq!(select_runs(&balances, 1, None).len(), 2);
        assert_eq!(select_runs(&balances, 2, None)[0].run, 2);
        assert_eq!(select_runs(&balances, 1, Some(1)).len(), 1);
        assert!(select_runs(&balances, 5, None).is_empty());
    }

    #[test]
    fn test_block_without_final_line_is_an_error() {
        let text = "*RUN   1        : T1 A B C\n!     Soil H20 (start) on Day 1982/057   290.1\n!     Final Balance   0.0\n";
        assert!(parse_water_balance("SoilWatBal.OUT", text).is_err());
    }

    #[test]
    fn test_unfinished_season_is_not_skipped() {
        let truncated = SOIL_WAT_BAL.replacen(
            "!     Final Balance                                       -0.0\n",
            "",
            1,
        );
        let err = parse_water_balance("SoilWatBal.OUT", &truncated).unwrap_err();
        assert!(
            matches!(err, DssatError::ParseError { ref message, .. } if message.contains("run 1"))
        );
    }

    #[test]
    fn test_output_cut_off_mid_season_is_an_error() {
        let cut = SOIL_WAT_BAL
            .split("!     Drainage                                           100.0")
            .next()
            .unwrap();
        let err = parse_water_balance("SoilWatBal.OUT", cut).unwrap_err();
        assert!(
            matches!(err, DssatError::ParseError { ref message, .. } if message.contains("run 2"))
        );
    }
}
