use crate::dssat::output::OutputFile;
use crate::utils::error::{DssatError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub trno: u32,
    pub values: Vec<(String, String)>,
}

impl SummaryRow {
    pub fn get(&self, param: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == param)
            .map(|(_, value)| value.as_str())
    }
}

/// Selects `params` from the single season table in `Summary.OUT`, keyed by
/// treatment number.
pub fn read_summary(file: &OutputFile, params: &[String]) -> Result<Vec<SummaryRow>> {
    let table = file.tables().next().ok_or_else(|| DssatError::ProcessingError {
        message: format!("{} contains no table", file.name),
    })?;

    let trno_idx = table
        .column_index("TRNO")
        .ok_or_else(|| DssatError::missing_column(&file.name, "TRNO"))?;
    let indices = params
        .iter()
        .map(|param| {
            table
                .column_index(param)
                .ok_or_else(|| DssatError::missing_column(&file.name, param))
        })
        .collect::<Result<Vec<usize>>>()?;

    table
        .rows
        .iter()
        .map(|row| {
            let trno = row[trno_idx]
                .parse::<u32>()
                .map_err(|_| DssatError::ProcessingError {
                    message: format!("{}: TRNO '{}' is not an integer", file.name, row[trno_idx]),
                })?;
            let values = params
                .iter()
                .zip(&indices)
                .map(|(param, &idx)| (param.clone(), row[idx].clone()))
                .collect();
            Ok(SummaryRow { trno, values })
        })
        .collect()
}
