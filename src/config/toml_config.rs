use crate::config::validate_formats;
use crate::core::{ConfigProvider, ReportRequest};
use crate::dssat::ReportKind;
use crate::utils::error::{DssatError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub export: ExportConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub reports: Vec<ReportRequest>,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// DSSAT run directory, e.g. `C:/DSSAT47/Maize`
    pub directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compress: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DssatError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DssatError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DSSAT_HOME})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DssatError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("export.name", &self.export.name)?;
        validation::validate_path("source.directory", &self.source.directory)?;
        validation::validate_path("load.output_path", &self.load.output_path)?;
        validate_formats("load.output_formats", &self.load.output_formats)?;
        validation::validate_positive_number("reports", self.reports.len(), 1)?;

        for (i, report) in self.reports.iter().enumerate() {
            let field = format!("reports[{}]", i);
            validation::validate_param_names(&format!("{}.params", field), &report.params)?;
            validation::validate_run_range(
                &format!("{}.run_start", field),
                report.run_start(),
                report.run_end,
            )?;
            if report.kind == ReportKind::Observed {
                validation::validate_required_field(&format!("{}.file", field), &report.file)?;
            }
            if let Some(file) = &report.file {
                validation::validate_path(&format!("{}.file", field), file)?;
            }
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn input_dir(&self) -> &str {
        &self.source.directory
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn export_name(&self) -> &str {
        &self.export.name
    }

    fn reports(&self) -> Vec<ReportRequest> {
        self.reports.clone()
    }

    fn output_formats(&self) -> Vec<String> {
        self.load.output_formats.clone()
    }

    fn compress(&self) -> bool {
        self.load.compress.unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[export]
name = "UFGA8201"
description = "Gainesville maize"

[source]
directory = "C:/DSSAT47/Maize"

[[reports]]
kind = "plant_gro"
params = ["LAID", "CWAD"]
crop_sequence = true

[[reports]]
kind = "soil_wat_bal"
run_start = 2
run_end = 3

[[reports]]
kind = "observed"
file = "UFGA8201.MZT"
params = ["LAID"]

[load]
output_path = "./output"
output_formats = ["csv", "json"]
compress = true
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.export_name(), "UFGA8201");
        assert_eq!(config.input_dir(), "C:/DSSAT47/Maize");
        assert!(config.compress());

        let reports = config.reports();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].kind, ReportKind::PlantGro);
        assert!(reports[0].crop_sequence());
        assert!(reports[0].daily());
        assert_eq!(reports[1].kind, ReportKind::SoilWatBal);
        assert_eq!(reports[1].run_start(), 2);
        assert_eq!(reports[1].run_end, Some(3));
        assert_eq!(reports[2].source_files(), vec!["UFGA8201.MZT"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DSSAT_ETL_TEST_HOME", "/opt/dssat/Maize");

        let toml_content = BASIC.replace("C:/DSSAT47/Maize", "${DSSAT_ETL_TEST_HOME}");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.source.directory, "/opt/dssat/Maize");

        std::env::remove_var("DSSAT_ETL_TEST_HOME");
    }

    #[test]
    fn test_unset_env_var_is_kept() {
        let toml_content = BASIC.replace("C:/DSSAT47/Maize", "${DSSAT_ETL_UNSET_VAR}");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.source.directory, "${DSSAT_ETL_UNSET_VAR}");
    }

    #[test]
    fn test_config_validation() {
        let bad_format = BASIC.replace("\"csv\", \"json\"", "\"xlsx\"");
        let config = TomlConfig::from_toml_str(&bad_format).unwrap();
        assert!(config.validate().is_err());

        let observed_without_file = BASIC.replace("file = \"UFGA8201.MZT\"\n", "");
        let config = TomlConfig::from_toml_str(&observed_without_file).unwrap();
        assert!(matches!(
            config.validate(),
            Err(DssatError::MissingConfigError { .. })
        ));

        let reversed_runs = BASIC.replace("run_end = 3", "run_end = 1");
        let config = TomlConfig::from_toml_str(&reversed_runs).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_report_kind_is_parse_error() {
        let toml_content = BASIC.replace("kind = \"plant_gro\"", "kind = \"plant_growth\"");
        assert!(matches!(
            TomlConfig::from_toml_str(&toml_content),
            Err(DssatError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.export.name, "UFGA8201");
        assert_eq!(config.output_formats(), vec!["csv", "json"]);
    }
}
