//! Error types for the ingestion pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`FormatError`] - unsupported or unreadable input files
//! - [`MappingError`] - missing or malformed client mapping configuration
//! - [`ValidationError`] - mapped records that fail the client's rules
//! - [`TransmissionError`] - downstream API failures
//! - [`RegistryError`] - configuration store errors
//! - [`ExportError`] - export direction failures
//! - [`ConfigError`] - environment configuration errors
//! - [`ProcessingError`] - top-level per-file errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::models::FileStatus;

// =============================================================================
// Format Errors
// =============================================================================

/// Errors raised while turning file bytes into a table.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Extension outside csv/txt/xlsx/xls.
    #[error("Unsupported file format: '{0}' (expected csv, txt, xlsx or xls)")]
    UnsupportedExtension(String),

    /// The bytes could not be decoded as the declared format.
    #[error("Unreadable file: {0}")]
    Unreadable(String),

    /// Text decoding failed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// No rows at all.
    #[error("File contains no rows")]
    EmptyFile,
}

// =============================================================================
// Mapping Errors
// =============================================================================

/// Errors related to per-client mapping configuration.
#[derive(Debug, Error)]
pub enum MappingError {
    /// No active mapping for the client.
    #[error("No active mapping configuration for client '{client_code}'")]
    NotFound { client_code: String },

    /// Mapping document could not be interpreted.
    #[error("Invalid mapping configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Mapped records failed the client's validation rules.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// One message per violation.
    #[error("Validation failed: {}", .errors.join("; "))]
    Failed { errors: Vec<String> },
}

// =============================================================================
// Transmission Errors
// =============================================================================

/// Errors from the downstream API.
#[derive(Debug, Clone, Error)]
pub enum TransmissionError {
    /// The API answered with a non-success status.
    #[error("API rejected request{}: {}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default(), .message)]
    Rejected { status: Option<u16>, message: String },

    /// Network failure or timeout.
    #[error("API unreachable: {0}")]
    Unreachable(String),

    /// Response body was not what we expected.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Client configuration is missing something.
    #[error("API client not configured: {0}")]
    NotConfigured(String),
}

impl TransmissionError {
    /// HTTP status code, when the API answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransmissionError::Rejected { status, .. } => *status,
            _ => None,
        }
    }
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors from the configuration registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Entry not found.
    #[error("Configuration not found: {0}")]
    NotFound(String),

    /// Document failed schema validation.
    #[error("Invalid configuration document: {}", .0.join("; "))]
    InvalidDocument(Vec<String>),

    /// IO error.
    #[error("Registry IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Registry JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors in the export direction.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing to write.
    #[error("No data to export")]
    NoData,

    /// Workbook writer failure.
    #[error("Failed to write export file: {0}")]
    Write(String),

    /// Delimited writer failure.
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failure.
    #[error("JSON export error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source records could not be fetched.
    #[error("Failed to fetch export data: {0}")]
    Fetch(#[from] TransmissionError),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Environment configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable is set but unusable.
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

// =============================================================================
// Processing Errors (top-level)
// =============================================================================

/// Fatal errors for one file.
///
/// These never escape [`crate::transform::pipeline::Processor::process`]; they
/// are turned into a terminal [`FileStatus`] and a message.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// File could not be read.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Client has no usable mapping.
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Mapped records are invalid.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Downstream delivery failed.
    #[error("Transmission error: {0}")]
    Transmission(#[from] TransmissionError),
}

impl ProcessingError {
    /// Terminal status reported for the file.
    pub fn status(&self) -> FileStatus {
        match self {
            ProcessingError::Validation(_) => FileStatus::Failed,
            _ => FileStatus::Error,
        }
    }

    /// Short machine-readable category for log details.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::Format(_) => "format_error",
            ProcessingError::Mapping(_) => "mapping_not_found",
            ProcessingError::Validation(_) => "validation_error",
            ProcessingError::Transmission(_) => "transmission_error",
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for file reading.
pub type FormatResult<T> = Result<T, FormatError>;

/// Result type for transmission.
pub type TransmissionResult<T> = Result<T, TransmissionError>;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for per-file processing.
pub type ProcessResult<T> = Result<T, ProcessingError>;
