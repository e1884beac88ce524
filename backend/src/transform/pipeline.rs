//! High-level processing of one client file.
//!
//! [`Processor::process`] runs every step for a file and always returns a
//! [`ProcessingResult`]; failures become a terminal status and a message:
//!
//! 1. look up the client's active mapping
//! 2. read the file into a normalized table ([`TableReader`])
//! 3. map rows to records ([`RecordMapper`])
//! 4. validate the records ([`Validator`])
//! 5. transmit records one by one, stopping at the first failure
//!
//! # Example
//!
//! ```rust,ignore
//! use intake::client::DryRunTransmitter;
//! use intake::models::FileInput;
//! use intake::registry::ConfigRegistry;
//! use intake::transform::pipeline::Processor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let processor = Processor::new(ConfigRegistry::new(), DryRunTransmitter);
//!     let input = FileInput::from_path("remesa.xlsx".as_ref())?;
//!     let result = processor.process(&input, "CLIENTE_REMESA").await;
//!     println!("{}: {} records", result.status, result.records_processed);
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::executor::{RecordMapper, ResolutionMiss};
use super::reader::{ReadLayout, TableReader};
use crate::client::RecordTransmitter;
use crate::error::{MappingError, ProcessingError, ValidationError};
use crate::logs::ProcessingLog;
use crate::models::{FileInput, FileStatus};
use crate::registry::MappingStore;
use crate::validation::Validator;

/// Where transmission stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    /// Zero-based index of the record that failed.
    pub record_index: usize,
    pub status_code: Option<u16>,
    pub message: String,
}

/// Outcome of processing one file
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub file_id: Uuid,
    pub file_name: String,
    pub client_code: String,
    pub success: bool,
    pub status: FileStatus,
    /// Records produced by the mapper.
    pub records_processed: usize,
    /// Records accepted downstream.
    pub records_transmitted: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<ReadLayout>,
    /// A consolidated report yielded no data and a fixed record was used.
    pub placeholder: bool,
    pub api_responses: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_failure: Option<DeliveryFailure>,
    pub resolution_misses: Vec<ResolutionMiss>,
    pub log: ProcessingLog,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Everything gathered before a run stops.
#[derive(Debug, Default)]
struct Progress {
    records: usize,
    transmitted: usize,
    warnings: Vec<String>,
    api_responses: Vec<Value>,
    misses: Vec<ResolutionMiss>,
    layout: Option<ReadLayout>,
    placeholder: bool,
    delivery_failure: Option<DeliveryFailure>,
}

/// Runs files through read, map, validate and transmit.
pub struct Processor<S, T> {
    store: S,
    transmitter: T,
    reader: TableReader,
    mapper: RecordMapper,
    validator: Validator,
}

impl<S: MappingStore, T: RecordTransmitter> Processor<S, T> {
    pub fn new(store: S, transmitter: T) -> Self {
        Self {
            store,
            transmitter,
            reader: TableReader::default(),
            mapper: RecordMapper::default(),
            validator: Validator::new(),
        }
    }

    pub fn with_reader(mut self, reader: TableReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_mapper(mut self, mapper: RecordMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process `input` for `client_code`. Never fails.
    pub async fn process(&self, input: &FileInput, client_code: &str) -> ProcessingResult {
        self.process_at(input, client_code, Utc::now()).await
    }

    /// Same as [`Self::process`] with an explicit clock.
    pub async fn process_at(&self, input: &FileInput, client_code: &str, now: DateTime<Utc>) -> ProcessingResult {
        let file_id = Uuid::new_v4();
        let mut log = ProcessingLog::new();
        let mut progress = Progress::default();

        log.info(
            format!("Processing file {}", input.name),
            Some(json!({ "file_id": file_id, "client_code": client_code, "bytes": input.bytes.len() })),
        );

        let outcome = self.run(input, client_code, now, &mut log, &mut progress).await;

        let (status, errors, message) = match outcome {
            Ok(()) => {
                let message = format!(
                    "Processed {} records, {} transmitted",
                    progress.records, progress.transmitted
                );
                log.info(message.clone(), Some(json!({ "records_count": progress.records })));
                (FileStatus::Processed, Vec::new(), message)
            }
            Err(error) => {
                let errors = match &error {
                    ProcessingError::Validation(ValidationError::Failed { errors }) => errors.clone(),
                    other => vec![other.to_string()],
                };
                log.error(error.to_string(), Some(json!({ "error_type": error.kind() })));
                (error.status(), errors, error.to_string())
            }
        };

        ProcessingResult {
            file_id,
            file_name: input.name.clone(),
            client_code: client_code.to_string(),
            success: status == FileStatus::Processed,
            status,
            records_processed: progress.records,
            records_transmitted: progress.transmitted,
            errors,
            warnings: progress.warnings,
            message,
            layout: progress.layout,
            placeholder: progress.placeholder,
            api_responses: progress.api_responses,
            delivery_failure: progress.delivery_failure,
            resolution_misses: progress.misses,
            log,
            started_at: now,
            finished_at: Utc::now(),
        }
    }

    async fn run(
        &self,
        input: &FileInput,
        client_code: &str,
        now: DateTime<Utc>,
        log: &mut ProcessingLog,
        progress: &mut Progress,
    ) -> Result<(), ProcessingError> {
        let mapping = self
            .store
            .active_mapping(client_code)
            .ok_or_else(|| MappingError::NotFound { client_code: client_code.to_string() })?;

        let read = self.reader.read(input, now.date_naive())?;
        progress.layout = Some(read.layout);
        progress.placeholder = read.placeholder;
        log.info(
            format!("Read {} rows", read.table.len()),
            Some(json!({ "columns": read.table.columns, "layout": read.layout })),
        );
        if read.placeholder {
            let warning = "No data found in consolidated report, placeholder record used".to_string();
            log.warning(warning.clone(), None);
            progress.warnings.push(warning);
        }

        let outcome = self.mapper.map_table(&read.table, &mapping.mapping_config, now);
        progress.records = outcome.records.len();
        for miss in &outcome.misses {
            let warning = format!("Column '{}' for field '{}' not found", miss.source, miss.field);
            log.warning(warning.clone(), Some(json!({ "available_columns": read.table.columns })));
            progress.warnings.push(warning);
        }
        progress.misses = outcome.misses;

        let report = self.validator.validate(&outcome.records, &mapping.validation_rules);
        progress.warnings.extend(report.warnings.iter().cloned());
        report.into_result()?;

        for (index, record) in outcome.records.iter().enumerate() {
            match self.transmitter.transmit(record).await {
                Ok(response) => {
                    progress.transmitted += 1;
                    progress.api_responses.push(response);
                }
                Err(error) => {
                    log.error(
                        format!("Record {} was not accepted", index + 1),
                        Some(json!({ "status_code": error.status_code(), "error": error.to_string() })),
                    );
                    progress.delivery_failure = Some(DeliveryFailure {
                        record_index: index,
                        status_code: error.status_code(),
                        message: error.to_string(),
                    });
                    return Err(error.into());
                }
            }
        }

        Ok(())
    }
}
