//! Transformation module.
//!
//! This module turns uploaded files into canonical records:
//! - Operations: per-value transforms (upper, strip, left pad, ...)
//! - Resolver: tolerant column lookup
//! - Mapping: per-client mapping documents
//! - Derive: computed fields (city code, synthetic identifier, delivery type)
//! - Executor: rows to records
//! - Reader: file to normalized table
//! - Pipeline: per-file processing and transmission

pub mod derive;
pub mod executor;
pub mod mapping;
pub mod operations;
pub mod pipeline;
pub mod reader;
pub mod resolver;

pub use derive::{normalize_city, DerivationRules};
pub use executor::{MappingOutcome, RecordMapper, ResolutionMiss};
pub use mapping::{ClientMapping, ColumnMapping, FieldRule, ValidationRules};
pub use operations::{sanitize, Transform};
pub use pipeline::{DeliveryFailure, ProcessingResult, Processor};
pub use reader::{ReadLayout, ReadOutcome, TableReader};
pub use resolver::{ColumnMatch, ColumnResolver, KeywordTable, MatchKind};
