use crate::dssat::ReportKind;
use crate::utils::error::{DssatError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One table the user wants out of a DSSAT run directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub kind: ReportKind,
    #[serde(default)]
    pub params: Vec<String>,
    /// Difference cumulative variables into daily amounts (default: true).
    pub daily: Option<bool>,
    pub crop_sequence: Option<bool>,
    /// Overrides the report's default file name; required for `observed`.
    pub file: Option<String>,
    pub run_start: Option<usize>,
    pub run_end: Option<usize>,
}

impl ReportRequest {
    pub fn new(kind: ReportKind, params: Vec<String>) -> Self {
        Self {
            kind,
            params,
            daily: None,
            crop_sequence: None,
            file: None,
            run_start: None,
            run_end: None,
        }
    }

    pub fn daily(&self) -> bool {
        self.daily.unwrap_or(true)
    }

    pub fn crop_sequence(&self) -> bool {
        self.crop_sequence.unwrap_or(false)
    }

    pub fn run_start(&self) -> usize {
        self.run_start.unwrap_or(1)
    }

    pub fn source_files(&self) -> Vec<String> {
        match (&self.file, self.kind) {
            (Some(file), kind) if kind != ReportKind::CnRatio => vec![file.clone()],
            (_, kind) => kind.default_files().iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Raw file contents for a request, in the order of `source_files()`.
#[derive(Debug, Clone)]
pub struct RawReport {
    pub request: ReportRequest,
    pub files: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Missing,
}

impl Cell {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Int(v) => serde_json::Value::from(*v),
            Cell::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Cell::Text(v) => serde_json::Value::String(v.clone()),
            Cell::Date(v) => serde_json::Value::String(v.format("%Y-%m-%d").to_string()),
            Cell::Missing => serde_json::Value::Null,
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::Float).unwrap_or(Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(v) => f.write_str(v),
            Cell::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Cell::Missing => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DssatError::ProcessingError {
                message: format!(
                    "table {} has {} columns, row has {}",
                    self.name,
                    self.columns.len(),
                    row.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn to_delimited(&self, delimiter: u8) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| DssatError::IoError(e.into_error()))
    }

    /// Array of objects, one per row.
    pub fn to_json(&self) -> Result<String> {
        let rows: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| {
                let object = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.clone(), cell.to_json()))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();
        Ok(serde_json::to_string_pretty(&rows)?)
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub tables: Vec<Table>,
}

impl TransformResult {
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new("PlantGro", vec!["TRNO".into(), "DATE".into(), "LAID".into()]);
        table
            .push_row(vec![
                Cell::Int(1),
                Cell::Date(NaiveDate::from_ymd_opt(1982, 2, 26).unwrap()),
                Cell::Float(0.25),
            ])
            .unwrap();
        table
            .push_row(vec![
                Cell::Int(2),
                Cell::Date(NaiveDate::from_ymd_opt(1982, 2, 27).unwrap()),
                Cell::Missing,
            ])
            .unwrap();
        table
    }

    #[test]
    fn test_csv_and_tsv_output() {
        let table = sample();
        let csv = String::from_utf8(table.to_delimited(b',').unwrap()).unwrap();
        assert_eq!(csv, "TRNO,DATE,LAID\n1,1982-02-26,0.25\n2,1982-02-27,\n");

        let tsv = String::from_utf8(table.to_delimited(b'\t').unwrap()).unwrap();
        assert_eq!(tsv.lines().next().unwrap(), "TRNO\tDATE\tLAID");
    }

    #[test]
    fn test_json_output_uses_null_for_missing() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json[0]["LAID"], serde_json::json!(0.25));
        assert_eq!(json[1]["LAID"], serde_json::Value::Null);
        assert_eq!(json[1]["DATE"], serde_json::json!("1982-02-27"));
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = sample();
        assert!(table.push_row(vec![Cell::Int(3)]).is_err());
    }

    #[test]
    fn test_request_source_files() {
        let mut request = ReportRequest::new(ReportKind::PlantGro, vec![]);
        assert_eq!(request.source_files(), vec!["PlantGro.OUT"]);
        request.file = Some("PlantGro_seq.OUT".to_string());
        assert_eq!(request.source_files(), vec!["PlantGro_seq.OUT"]);

        let mut cn = ReportRequest::new(ReportKind::CnRatio, vec![]);
        cn.file = Some("ignored.OUT".to_string());
        assert_eq!(cn.source_files(), vec!["SOMLITC.OUT", "SOMLITN.OUT"]);
        assert!(cn.daily());
        assert_eq!(cn.run_start(), 1);
    }
}
