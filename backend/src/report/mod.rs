//! Batch summaries.
//!
//! Aggregates the [`ProcessingResult`]s of a run into one document the CLI
//! prints after processing several files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::FileStatus;
use crate::transform::pipeline::ProcessingResult;

/// Totals for a batch of processed files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingSummary {
    pub total_files: usize,
    pub successful_files: usize,
    pub failed_files: usize,

    /// Records produced by the mapper across all files
    pub records_processed: usize,

    /// Records accepted downstream
    pub records_transmitted: usize,

    /// Share of files processed successfully, in percent
    pub success_rate: f64,

    /// File count per terminal status
    pub by_status: BTreeMap<String, usize>,

    /// Per-client breakdown
    pub by_client: BTreeMap<String, ClientSummary>,

    /// One line per failed file
    pub failures: Vec<FileFailure>,
}

/// Totals for one client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub files: usize,
    pub records_processed: usize,
    pub records_transmitted: usize,
}

/// A file that did not finish as processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub file_name: String,
    pub status: FileStatus,
    pub message: String,
}

impl ProcessingSummary {
    pub fn from_results(results: &[ProcessingResult]) -> Self {
        let mut summary = Self::default();

        for result in results {
            summary.total_files += 1;
            summary.records_processed += result.records_processed;
            summary.records_transmitted += result.records_transmitted;
            *summary.by_status.entry(result.status.to_string()).or_default() += 1;

            let client = summary.by_client.entry(result.client_code.clone()).or_default();
            client.files += 1;
            client.records_processed += result.records_processed;
            client.records_transmitted += result.records_transmitted;

            if result.success {
                summary.successful_files += 1;
            } else {
                summary.failed_files += 1;
                summary.failures.push(FileFailure {
                    file_name: result.file_name.clone(),
                    status: result.status,
                    message: result.message.clone(),
                });
            }
        }

        if summary.total_files > 0 {
            summary.success_rate = summary.successful_files as f64 * 100.0 / summary.total_files as f64;
        }
        summary
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_files == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::ProcessingLog;
    use chrono::Utc;
    use uuid::Uuid;

    fn result(client: &str, status: FileStatus, processed: usize, transmitted: usize) -> ProcessingResult {
        ProcessingResult {
            file_id: Uuid::new_v4(),
            file_name: format!("{}.csv", client.to_lowercase()),
            client_code: client.to_string(),
            success: status == FileStatus::Processed,
            status,
            records_processed: processed,
            records_transmitted: transmitted,
            errors: Vec::new(),
            warnings: Vec::new(),
            message: "done".to_string(),
            layout: None,
            placeholder: false,
            api_responses: Vec::new(),
            delivery_failure: None,
            resolution_misses: Vec::new(),
            log: ProcessingLog::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_from_results() {
        let results = vec![
            result("ACME", FileStatus::Processed, 10, 10),
            result("ACME", FileStatus::Error, 5, 2),
            result("BETA", FileStatus::Failed, 3, 0),
        ];
        let summary = ProcessingSummary::from_results(&results);

        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.successful_files, 1);
        assert_eq!(summary.failed_files, 2);
        assert_eq!(summary.records_processed, 18);
        assert_eq!(summary.records_transmitted, 12);
        assert!((summary.success_rate - 33.33).abs() < 0.01);
        assert_eq!(summary.by_status["error"], 1);
        assert_eq!(summary.by_status["failed"], 1);
        assert_eq!(summary.by_client["ACME"].files, 2);
        assert_eq!(summary.by_client["ACME"].records_transmitted, 12);
        assert_eq!(summary.failures.len(), 2);
        assert!(!summary.all_succeeded());
    }

    #[test]
    fn test_empty_batch() {
        let summary = ProcessingSummary::from_results(&[]);
        assert_eq!(summary.total_files, 0);
        assert_eq!(summary.success_rate, 0.0);
        assert!(summary.all_succeeded());
    }
}
