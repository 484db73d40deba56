use crate::utils::error::{DssatError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(DssatError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(DssatError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(DssatError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| DssatError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DssatError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// DSSAT variable names are upper-case codes such as `LAID`, `IR#C` or `L#SD`.
pub fn validate_param_names(field_name: &str, params: &[String]) -> Result<()> {
    for param in params {
        validate_non_empty_string(field_name, param)?;
        if param.chars().any(char::is_whitespace) {
            return Err(DssatError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: param.clone(),
                reason: "Parameter names cannot contain whitespace".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_run_range(field_name: &str, start: usize, end: Option<usize>) -> Result<()> {
    validate_positive_number(field_name, start, 1)?;
    if let Some(end) = end {
        if end < start {
            return Err(DssatError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format!("{}..{}", start, end),
                reason: "Run range end must not be before its start".to_string(),
            });
        }
    }
    Ok(())
}
