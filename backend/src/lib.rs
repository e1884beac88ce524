//! # Intake - client file ingestion
//!
//! Intake reads the spreadsheets and delimited files clients send (clean
//! tables, messy exports, consolidated reports), maps them onto the canonical
//! record schema with a per-client mapping, validates the records and
//! forwards them one by one to the downstream API. The reverse direction
//! pulls records back and writes client-specific export files.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV / XLSX  │────▶│   Parser    │────▶│   Detect    │────▶│   Mapping   │────▶│  Validate   │──▶ API
//! │ (any enc.)  │     │ (auto-enc)  │     │ (+ extract) │     │  (+derive)  │     │             │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use intake::{ConfigRegistry, DryRunTransmitter, FileInput, Processor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let processor = Processor::new(ConfigRegistry::new(), DryRunTransmitter);
//!     let input = FileInput::from_path("clientes.xlsx".as_ref())?;
//!     let result = processor.process(&input, "CLIENTE_EJEMPLO").await;
//!     println!("{} records, status {}", result.records_processed, result.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, tables, mapped records, file status
//! - [`parser`] - CSV/XLSX parsing with encoding and delimiter detection
//! - [`normalize`] - Column header normalization
//! - [`detect`] - Header detection and consolidated report extraction
//! - [`transform`] - Column resolution, mapping, derivations and the processor
//! - [`validation`] - Record rules and configuration schemas
//! - [`client`] - Downstream API client
//! - [`export`] - Export configurations and file writers
//! - [`registry`] - Stored mappings and export configurations
//! - [`config`] - Environment configuration
//! - [`logs`] - Per-file processing log and tracing setup
//! - [`report`] - Batch summaries

// Core modules
pub mod error;
pub mod models;

// Reading
pub mod detect;
pub mod normalize;
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Downstream
pub mod client;
pub mod export;

// Configuration
pub mod config;
pub mod registry;

// Observability
pub mod logs;
pub mod report;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ExportError, FormatError, MappingError, ProcessingError, RegistryError, TransmissionError,
    ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, FileInput, FileStatus, MappedRecord, RawTable, Table};

// =============================================================================
// Re-exports - Parsing and detection
// =============================================================================

pub use detect::{ConsolidatedExtractor, HeaderDetector, ScatteredExtractor, SheetLayout};
pub use normalize::{ColumnNormalizer, SynonymTable};
pub use parser::{parse_bytes, parse_file, FileKind, ParseResult};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    ClientMapping, ColumnMapping, ColumnResolver, DerivationRules, FieldRule, ProcessingResult, Processor,
    RecordMapper, TableReader, Transform, ValidationRules,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::schema::{
    is_valid_client_mapping, is_valid_export_config, validate_client_mapping, validate_export_config,
};
pub use validation::{ValidationReport, Validator};

// =============================================================================
// Re-exports - Client, export, registry
// =============================================================================

pub use client::{ApiClient, DryRunTransmitter, RecordSource, RecordTransmitter};
pub use config::ServiceConfig;
pub use export::{ExportArtifact, ExportConfig, ExportFormat, ExportService};
pub use registry::{ConfigRegistry, MappingStore};

// =============================================================================
// Re-exports - Observability
// =============================================================================

pub use logs::{init_tracing, LogLevel, ProcessingLog};
pub use report::ProcessingSummary;
