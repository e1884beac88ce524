//! Validation of mapped records and configuration documents.
//!
//! - [`Validator`] checks mapped records against a client's
//!   [`ValidationRules`]: required fields must be non-blank (errors), numeric
//!   fields should hold digits only (warnings).
//! - [`schema`] checks client mapping and export configuration documents
//!   against embedded JSON Schemas.
//!
//! # Example
//!
//! ```rust,ignore
//! use intake::transform::mapping::ValidationRules;
//! use intake::validation::Validator;
//!
//! let report = Validator::new().validate(&records, &ValidationRules::required(["nombre"]));
//! if !report.valid {
//!     eprintln!("{}", report.errors.join("\n"));
//! }
//! ```

pub mod schema;

use serde::Serialize;

use crate::error::ValidationError;
use crate::models::MappedRecord;
use crate::transform::mapping::ValidationRules;

/// Outcome of validating a batch of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Errors as a [`ValidationError`], or `Ok` when valid.
    pub fn into_result(self) -> Result<Vec<String>, ValidationError> {
        if self.valid {
            Ok(self.warnings)
        } else {
            Err(ValidationError::Failed { errors: self.errors })
        }
    }
}

/// Record validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Validator
    }

    /// Check every record; records are numbered from 1 in messages.
    pub fn validate(&self, records: &[MappedRecord], rules: &ValidationRules) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for (i, record) in records.iter().enumerate() {
            let n = i + 1;

            for field in &rules.required_fields {
                if record.is_blank(field) {
                    errors.push(format!("Record {}: field '{}' is required and empty", n, field));
                }
            }

            for field in &rules.numeric_fields {
                if !record.contains(field) {
                    continue;
                }
                let value = record.text(field);
                let value = value.trim();
                if !value.is_empty() && !value.chars().all(|c| c.is_ascii_digit()) {
                    warnings.push(format!(
                        "Record {}: field '{}' should contain only digits (got '{}')",
                        n, field, value
                    ));
                }
            }
        }

        if !errors.is_empty() {
            tracing::warn!(errors = errors.len(), records = records.len(), "records failed validation");
        }

        ValidationReport { valid: errors.is_empty(), errors, warnings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(pairs: &[(&str, Value)]) -> MappedRecord {
        let mut r = MappedRecord::new();
        for (k, v) in pairs {
            r.insert(*k, v.clone());
        }
        r
    }

    #[test]
    fn test_required_fields() {
        let records = vec![
            record(&[("nombre", json!("ANA")), ("cc", json!("1"))]),
            record(&[("nombre", json!("  ")), ("cc", json!("2"))]),
            record(&[("cc", json!("3"))]),
        ];
        let report = Validator::new().validate(&records, &ValidationRules::required(["nombre", "cc"]));

        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "Record 2: field 'nombre' is required and empty",
                "Record 3: field 'nombre' is required and empty",
            ]
        );
    }

    #[test]
    fn test_null_counts_as_empty() {
        let records = vec![record(&[("nombre", Value::Null)])];
        let report = Validator::new().validate(&records, &ValidationRules::required(["nombre"]));
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_non_digit_document_is_a_warning() {
        let records = vec![
            record(&[("documento", json!("CC-123"))]),
            record(&[("documento", json!("123"))]),
            record(&[("documento", json!(""))]),
        ];
        let report = Validator::new().validate(&records, &ValidationRules::default());
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("Record 1: field 'documento'"));
    }

    #[test]
    fn test_into_result() {
        let report = ValidationReport { valid: false, errors: vec!["e".into()], warnings: vec![] };
        let err = report.into_result().unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: e");
    }
}
