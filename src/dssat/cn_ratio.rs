use crate::dssat::daily::{parse_number, table_dates};
use crate::dssat::output::OutputFile;
use crate::utils::error::{DssatError, Result};
use chrono::NaiveDate;

/// Organic C in SOM, top 20 cm (kg/ha), from `SOMLITC.OUT`.
pub const CARBON_COLUMN: &str = "SCS20D";
/// Organic N in SOM, top 20 cm (kg/ha), from `SOMLITN.OUT`.
pub const NITROGEN_COLUMN: &str = "SNS20D";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CnRatio {
    pub date: NaiveDate,
    pub ratio: f64,
}

/// Soil C:N ratio across every run of the two SOM output files.
pub fn cn_ratio(carbon: &OutputFile, nitrogen: &OutputFile) -> Result<Vec<CnRatio>> {
    let mut dates = Vec::new();
    for table in carbon.tables() {
        dates.extend(table_dates(&carbon.name, table)?);
    }

    let carbon_values = stacked_column(carbon, CARBON_COLUMN)?;
    let nitrogen_values = stacked_column(nitrogen, NITROGEN_COLUMN)?;

    if carbon_values.len() != nitrogen_values.len() {
        return Err(DssatError::ProcessingError {
            message: format!(
                "{} has {} {} values but {} has {} {} values",
                carbon.name,
                carbon_values.len(),
                CARBON_COLUMN,
                nitrogen.name,
                nitrogen_values.len(),
                NITROGEN_COLUMN
            ),
        });
    }

    Ok(dates
        .into_iter()
        .zip(carbon_values.iter().zip(&nitrogen_values))
        .map(|(date, (c, n))| CnRatio { date, ratio: c / n })
        .collect())
}

fn stacked_column(file: &OutputFile, column: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for table in file.tables() {
        let cells = table
            .column(column)
            .ok_or_else(|| DssatError::missing_column(&file.name, column))?;
        for cell in cells {
            values.push(parse_number(&file.name, column, cell)?);
        }
    }
    Ok(values)
}
