//! Downstream API client.
//!
//! Mapped records are delivered one POST at a time through a
//! [`RecordTransmitter`]; export rows are pulled through a [`RecordSource`].
//! [`ApiClient`] implements both over HTTP, [`DryRunTransmitter`] echoes
//! records without any network access.
//!
//! ```rust,ignore
//! use intake::client::{ApiClient, RecordTransmitter};
//! use intake::config::ServiceConfig;
//!
//! let client = ApiClient::new(ServiceConfig::from_env()?)?;
//! let response = client.transmit(&record).await?;
//! ```

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::config::ServiceConfig;
use crate::error::{TransmissionError, TransmissionResult};
use crate::models::MappedRecord;

/// Longest error body kept in a rejection message.
const MAX_ERROR_BODY: usize = 500;

/// Delivers one mapped record and returns the downstream response body.
#[async_trait]
pub trait RecordTransmitter: Send + Sync {
    async fn transmit(&self, record: &MappedRecord) -> TransmissionResult<Value>;
}

/// Supplies the rows of an export.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(&self, client_id: i64) -> TransmissionResult<Vec<Map<String, Value>>>;
}

/// HTTP client for the assignment and export endpoints.
#[derive(Clone)]
pub struct ApiClient {
    config: ServiceConfig,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ServiceConfig) -> TransmissionResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransmissionError::NotConfigured(e.to_string()))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_token {
            Some(token) => request.header("Authorization", format!("Token {}", token)),
            None => request,
        }
    }

    /// Status check and body decoding shared by both endpoints.
    async fn read_response(response: reqwest::Response) -> TransmissionResult<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransmissionError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            return Err(TransmissionError::Rejected {
                status: Some(status.as_u16()),
                message: truncate(body.trim(), MAX_ERROR_BODY),
            });
        }

        Ok(parse_body(&body))
    }
}

#[async_trait]
impl RecordTransmitter for ApiClient {
    async fn transmit(&self, record: &MappedRecord) -> TransmissionResult<Value> {
        let url = self.config.assign_url();
        tracing::debug!(url = %url, fields = record.len(), "posting record");

        let response = self
            .authorize(self.http.post(&url))
            .json(record)
            .send()
            .await
            .map_err(|e| TransmissionError::Unreachable(e.to_string()))?;

        Self::read_response(response).await
    }
}

#[async_trait]
impl RecordSource for ApiClient {
    async fn fetch_records(&self, client_id: i64) -> TransmissionResult<Vec<Map<String, Value>>> {
        let url = self.config.export_url();
        tracing::info!(url = %url, client_id, "fetching export rows");

        let response = self
            .authorize(self.http.get(&url))
            .query(&[("id_clie", client_id)])
            .send()
            .await
            .map_err(|e| TransmissionError::Unreachable(e.to_string()))?;

        let body = Self::read_response(response).await?;
        let rows = rows_from_body(body)?;
        tracing::info!(client_id, rows = rows.len(), "export rows fetched");
        Ok(rows)
    }
}

/// Transmitter that never leaves the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunTransmitter;

#[async_trait]
impl RecordTransmitter for DryRunTransmitter {
    async fn transmit(&self, record: &MappedRecord) -> TransmissionResult<Value> {
        tracing::debug!(fields = record.len(), "dry run, record not sent");
        Ok(json!({ "dry_run": true, "record": record }))
    }
}

/// JSON body, or the raw text wrapped as `{"raw": ...}`.
fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| json!({ "raw": body }))
}

/// Export rows: a top-level array, an object with a `results` or `data`
/// array, or a single object.
fn rows_from_body(body: Value) -> TransmissionResult<Vec<Map<String, Value>>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("results").or_else(|| obj.remove("data")) {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => vec![Value::Object(obj)],
        },
        other => {
            return Err(TransmissionError::InvalidResponse(format!(
                "expected a list of rows, got {}",
                truncate(&other.to_string(), 100)
            )))
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(row) => Ok(row),
            other => Err(TransmissionError::InvalidResponse(format!(
                "row is not an object: {}",
                truncate(&other.to_string(), 100)
            ))),
        })
        .collect()
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", &text[..i]),
        None => text.to_string(),
    }
}
