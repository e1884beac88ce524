//! JSON Schema checks for configuration documents.
//!
//! Client mappings and export configurations are validated against the
//! Draft 7 schemas embedded from `schemas/` before they are stored:
//! - `client-mapping.json`
//! - `export-config.json`

use once_cell::sync::Lazy;
use serde_json::Value;

static CLIENT_MAPPING_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/client-mapping.json")).expect("Invalid embedded schema")
});

static EXPORT_CONFIG_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/export-config.json")).expect("Invalid embedded schema")
});

/// Validate a JSON document against a schema.
///
/// # Returns
/// * `Ok(())` when valid
/// * `Err(Vec<String>)` with one message per violation
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use intake::validation::schema::validate;
///
/// let schema = json!({"type": "object", "required": ["client_code"]});
/// assert!(validate(&schema, &json!({"client_code": "ACME"})).is_ok());
/// assert!(validate(&schema, &json!({})).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick yes/no check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a client mapping document.
pub fn validate_client_mapping(data: &Value) -> Result<(), Vec<String>> {
    validate(&CLIENT_MAPPING_SCHEMA, data)
}

pub fn is_valid_client_mapping(data: &Value) -> bool {
    is_valid(&CLIENT_MAPPING_SCHEMA, data)
}

/// Validate an export configuration document.
pub fn validate_export_config(data: &Value) -> Result<(), Vec<String>> {
    validate(&EXPORT_CONFIG_SCHEMA, data)
}

pub fn is_valid_export_config(data: &Value) -> bool {
    is_valid(&EXPORT_CONFIG_SCHEMA, data)
}
