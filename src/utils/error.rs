use thiserror::Error;

#[derive(Error, Debug)]
pub enum DssatError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("{file}:{line}: {message}")]
    ParseError {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Column '{column}' not found in {file}")]
    MissingColumnError { file: String, column: String },

    #[error("Soil profile '{soil_id}' not found in {file}")]
    ProfileNotFoundError { file: String, soil_id: String },

    #[error("Invalid date '{value}': {reason}")]
    InvalidDateError { value: String, reason: String },

    #[error("Metric error: {message}")]
    MetricError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Format,
    Configuration,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DssatError {
    pub fn parse(file: &str, line: usize, message: impl Into<String>) -> Self {
        DssatError::ParseError {
            file: file.to_string(),
            line,
            message: message.into(),
        }
    }

    pub fn missing_column(file: &str, column: &str) -> Self {
        DssatError::MissingColumnError {
            file: file.to_string(),
            column: column.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DssatError::IoError(_) | DssatError::ZipError(_) => ErrorCategory::Io,
            DssatError::CsvError(_)
            | DssatError::SerializationError(_)
            | DssatError::ParseError { .. }
            | DssatError::InvalidDateError { .. } => ErrorCategory::Format,
            DssatError::ConfigError { .. }
            | DssatError::ConfigValidationError { .. }
            | DssatError::InvalidConfigValueError { .. }
            | DssatError::MissingConfigError { .. } => ErrorCategory::Configuration,
            DssatError::MissingColumnError { .. }
            | DssatError::ProfileNotFoundError { .. }
            | DssatError::MetricError { .. }
            | DssatError::ProcessingError { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Io => ErrorSeverity::Critical,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Format => ErrorSeverity::High,
            ErrorCategory::Data => match self {
                DssatError::MetricError { .. } => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DssatError::IoError(_) => {
                "Check that the DSSAT output directory exists and the output path is writable"
            }
            DssatError::ZipError(_) => "Retry without compression or free up disk space",
            DssatError::CsvError(_) => "Check the CSV file for unbalanced quotes or ragged rows",
            DssatError::SerializationError(_) => "Report the table that failed to serialize",
            DssatError::ConfigError { .. }
            | DssatError::ConfigValidationError { .. }
            | DssatError::InvalidConfigValueError { .. }
            | DssatError::MissingConfigError { .. } => {
                "Fix the configuration value and run again (use --dry-run to preview)"
            }
            DssatError::ParseError { .. } => {
                "Re-run the simulation; the file may be truncated or hand-edited"
            }
            DssatError::MissingColumnError { .. } => {
                "Enable the matching output group in the experiment file or drop the parameter"
            }
            DssatError::ProfileNotFoundError { .. } => {
                "Check the soil ID against the '*' header lines of the .SOL file"
            }
            DssatError::InvalidDateError { .. } => "DSSAT dates use YYDDD or YYYYDDD",
            DssatError::MetricError { .. } => {
                "Make sure observed and simulated series overlap on at least one date"
            }
            DssatError::ProcessingError { .. } => "Run with --verbose for details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("File access failed: {}", self),
            ErrorCategory::Format => format!("Could not read DSSAT file: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, DssatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = DssatError::parse("PlantGro.OUT", 14, "expected 5 columns, found 4");
        assert_eq!(err.to_string(), "PlantGro.OUT:14: expected 5 columns, found 4");
        assert_eq!(err.category(), ErrorCategory::Format);
    }

    #[test]
    fn test_severity_ordering() {
        let io = DssatError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "x"));
        let metric = DssatError::MetricError {
            message: "empty".to_string(),
        };
        assert_eq!(io.severity(), ErrorSeverity::Critical);
        assert_eq!(metric.severity(), ErrorSeverity::Medium);
        assert!(io.severity() > metric.severity());
    }
}
