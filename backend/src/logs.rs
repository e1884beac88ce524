//! Processing logs.
//!
//! Every file run keeps its own [`ProcessingLog`]: an ordered list of
//! [`LogEntry`] values that travels with the processing result so callers
//! can show what happened to one file. Each entry is also forwarded to
//! `tracing`, which [`init_tracing`] wires to stderr.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Structured context (counts, column lists, error kind)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), details: None, timestamp: Utc::now() }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Ordered log of one file run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessingLog {
    entries: Vec<LogEntry>,
}

impl ProcessingLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and forward it to `tracing`.
    pub fn push(&mut self, entry: LogEntry) {
        let details = entry.details.as_ref().map(Value::to_string).unwrap_or_default();
        match entry.level {
            LogLevel::Debug => tracing::debug!(details = %details, "{}", entry.message),
            LogLevel::Info => tracing::info!(details = %details, "{}", entry.message),
            LogLevel::Warning => tracing::warn!(details = %details, "{}", entry.message),
            LogLevel::Error => tracing::error!(details = %details, "{}", entry.message),
        }
        self.entries.push(entry);
    }

    pub fn debug(&mut self, message: impl Into<String>, details: Option<Value>) {
        self.record(LogLevel::Debug, message, details);
    }

    pub fn info(&mut self, message: impl Into<String>, details: Option<Value>) {
        self.record(LogLevel::Info, message, details);
    }

    pub fn warning(&mut self, message: impl Into<String>, details: Option<Value>) {
        self.record(LogLevel::Warning, message, details);
    }

    pub fn error(&mut self, message: impl Into<String>, details: Option<Value>) {
        self.record(LogLevel::Error, message, details);
    }

    fn record(&mut self, level: LogLevel, message: impl Into<String>, details: Option<Value>) {
        let mut entry = LogEntry::new(level, message);
        entry.details = details;
        self.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries at or above `level`.
    pub fn at_least(&self, level: LogLevel) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.level >= level)
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default `info` filter.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Subscriber for tests: debug level, captured by the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entries_keep_order_and_details() {
        init_test_tracing();
        let mut log = ProcessingLog::new();
        log.info("processing file", Some(json!({"file": "a.csv"})));
        log.warning("column missing", None);
        log.error("delivery failed", Some(json!({"error_type": "transmission_error"})));

        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[0].level, LogLevel::Info);
        assert_eq!(log.entries()[0].details, Some(json!({"file": "a.csv"})));
        assert_eq!(log.at_least(LogLevel::Warning).count(), 2);
    }

    #[test]
    fn test_entry_serialization() {
        let entry = LogEntry::new(LogLevel::Warning, "x");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["level"], "warning");
        assert!(value.get("details").is_none());
        assert!(value["timestamp"].is_string());
    }
}
