//! Input hardening for rule parameters.
//!
//! Column names reach DataFusion SQL when the comparison scorer
//! pre-aggregates, and patterns reach the regex engine. Both are checked
//! here before use.

use crate::error::{DaqualError, Result};
use regex::Regex;

/// SQL identifier and pattern validation utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates and quotes a SQL identifier (table or column name).
    ///
    /// Column names in tabular objects routinely contain spaces and
    /// punctuation, so identifiers are always emitted double-quoted with any
    /// embedded quote doubled.
    ///
    /// # Examples
    /// ```rust
    /// use daqual::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::escape_identifier("Account Number").unwrap(), "\"Account Number\"");
    /// assert_eq!(SqlSecurity::escape_identifier("a\"b").unwrap(), "\"a\"\"b\"");
    /// assert!(SqlSecurity::escape_identifier("").is_err());
    /// ```
    pub fn escape_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;
        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Validates an identifier without quoting it.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(DaqualError::Format(
                "identifier cannot be empty or whitespace-only".to_string(),
            ));
        }
        InputValidator::validate_no_null_bytes(identifier, "identifier")
    }

    /// Compiles a user pattern after basic safety checks.
    pub fn validate_regex_pattern(pattern: &str) -> Result<Regex> {
        if pattern.len() > 1000 {
            return Err(DaqualError::Format(
                "regex pattern too long (max 1000 characters)".to_string(),
            ));
        }
        InputValidator::validate_no_null_bytes(pattern, "regex pattern")?;
        Regex::new(pattern)
            .map_err(|e| DaqualError::Format(format!("invalid regex pattern '{pattern}': {e}")))
    }
}

/// Validation of numeric rule inputs.
pub struct InputValidator;

impl InputValidator {
    /// Validates that a value is finite.
    pub fn validate_finite(value: f64, name: &str) -> Result<()> {
        if !value.is_finite() {
            return Err(DaqualError::Format(format!(
                "invalid {name}: must be finite (not NaN or infinite)"
            )));
        }
        Ok(())
    }

    /// Validates a finite, non-negative value.
    pub fn validate_non_negative(value: f64, name: &str) -> Result<()> {
        Self::validate_finite(value, name)?;
        if value < 0.0 {
            return Err(DaqualError::Format(format!(
                "invalid {name}: must be non-negative, got {value}"
            )));
        }
        Ok(())
    }

    /// Validates a fraction in `[0, 1]`.
    pub fn validate_fraction(value: f64, name: &str) -> Result<()> {
        Self::validate_finite(value, name)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(DaqualError::Format(format!(
                "invalid {name}: must be between 0.0 and 1.0, got {value}"
            )));
        }
        Ok(())
    }

    /// Validates that a string doesn't contain null bytes.
    pub fn validate_no_null_bytes(value: &str, name: &str) -> Result<()> {
        if value.contains('\0') {
            return Err(DaqualError::Format(format!(
                "{name} cannot contain null bytes"
            )));
        }
        Ok(())
    }
}
