pub mod cli;
pub mod toml_config;

use crate::core::{ConfigProvider, ReportRequest};
use crate::dssat::ReportKind;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};

pub const VALID_FORMATS: [&str; 3] = ["csv", "tsv", "json"];

#[cfg_attr(feature = "cli", derive(clap::Parser))]
#[cfg_attr(feature = "cli", command(name = "dssat-etl"))]
#[cfg_attr(feature = "cli", command(about = "Export DSSAT simulation outputs to CSV/TSV/JSON"))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Directory containing the DSSAT *.OUT files
    #[cfg_attr(feature = "cli", arg(long, default_value = "."))]
    pub input_dir: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = "./output"))]
    pub output_path: String,

    /// Base name of the export (archive or sub-directory)
    #[cfg_attr(feature = "cli", arg(long, default_value = "dssat_export"))]
    pub name: String,

    /// Reports to export, e.g. plant_gro,soil_wat,summary
    #[cfg_attr(feature = "cli", arg(long, value_delimiter = ',', default_value = "summary"))]
    pub reports: Vec<ReportKind>,

    /// Variables to keep (all columns when omitted)
    #[cfg_attr(feature = "cli", arg(long, value_delimiter = ','))]
    pub params: Vec<String>,

    /// Keep cumulative variables as running totals
    #[cfg_attr(feature = "cli", arg(long))]
    pub cumulative: bool,

    /// Add the crop of each run (PlantGro/PlantN only)
    #[cfg_attr(feature = "cli", arg(long))]
    pub crop_sequence: bool,

    /// Observed data file (T-file or CSV) for the observed report
    #[cfg_attr(feature = "cli", arg(long))]
    pub observed: Option<String>,

    #[cfg_attr(feature = "cli", arg(long, value_delimiter = ',', default_value = "csv"))]
    pub formats: Vec<String>,

    /// Bundle all tables in <name>.zip
    #[cfg_attr(feature = "cli", arg(long))]
    pub zip: bool,

    #[cfg_attr(feature = "cli", arg(long, help = "Enable verbose output"))]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[cfg_attr(feature = "cli", arg(long))]
    pub log_json: bool,
}

impl ConfigProvider for CliConfig {
    fn input_dir(&self) -> &str {
        &self.input_dir
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn export_name(&self) -> &str {
        &self.name
    }

    fn reports(&self) -> Vec<ReportRequest> {
        self.reports
            .iter()
            .map(|&kind| {
                let mut request = ReportRequest::new(kind, self.params.clone());
                request.daily = Some(!self.cumulative);
                request.crop_sequence = Some(self.crop_sequence);
                if kind == ReportKind::Observed {
                    request.file = self.observed.clone();
                }
                request
            })
            .collect()
    }

    fn output_formats(&self) -> Vec<String> {
        self.formats.clone()
    }

    fn compress(&self) -> bool {
        self.zip
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input_dir", &self.input_dir)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_non_empty_string("name", &self.name)?;
        validation::validate_positive_number("reports", self.reports.len(), 1)?;
        validation::validate_param_names("params", &self.params)?;
        validate_formats("formats", &self.formats)?;
        if self.reports.contains(&ReportKind::Observed) {
            validation::validate_required_field("observed", &self.observed)?;
        }
        Ok(())
    }
}

pub fn validate_formats(field_name: &str, formats: &[String]) -> Result<()> {
    validation::validate_positive_number(field_name, formats.len(), 1)?;
    for (i, format) in formats.iter().enumerate() {
        // 同一格式重複會在壓縮檔中產生重複檔名
        if formats[..i].contains(format) {
            return Err(crate::utils::error::DssatError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format.clone(),
                reason: "Format listed more than once".to_string(),
            });
        }
        if !VALID_FORMATS.contains(&format.as_str()) {
            return Err(crate::utils::error::DssatError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format.clone(),
                reason: format!(
                    "Unsupported format. Valid formats: {}",
                    VALID_FORMATS.join(", ")
                ),
            });
        }
    }
    Ok(())
}
