//! Service configuration from the environment.
//!
//! | Variable                   | Default                 |
//! |----------------------------|-------------------------|
//! | `INTAKE_API_BASE_URL`      | `http://localhost:8000` |
//! | `INTAKE_API_TOKEN`         | unset                   |
//! | `INTAKE_ASSIGN_ENDPOINT`   | `/api/v1/asignar/`      |
//! | `INTAKE_EXPORT_ENDPOINT`   | `/clientes/export/`     |
//! | `INTAKE_HTTP_TIMEOUT_SECS` | `30`                    |
//! | `INTAKE_REGISTRY_DIR`      | `.intake`               |
//! | `INTAKE_EXPORT_DIR`        | `exports`               |
//!
//! A `.env` file in the working directory is loaded first when present.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_ASSIGN_ENDPOINT: &str = "/api/v1/asignar/";
pub const DEFAULT_EXPORT_ENDPOINT: &str = "/clientes/export/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REGISTRY_DIR: &str = ".intake";
pub const DEFAULT_EXPORT_DIR: &str = "exports";

/// Settings shared by the downstream client, the registry and exports.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub api_base_url: String,
    /// Sent as `Authorization: Token <token>` when set.
    pub api_token: Option<String>,
    pub assign_endpoint: String,
    pub export_endpoint: String,
    pub timeout: Duration,
    pub registry_dir: PathBuf,
    pub export_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_token: None,
            assign_endpoint: DEFAULT_ASSIGN_ENDPOINT.to_string(),
            export_endpoint: DEFAULT_EXPORT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            registry_dir: PathBuf::from(DEFAULT_REGISTRY_DIR),
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
        }
    }
}

impl ServiceConfig {
    /// Read the configuration from the environment (and `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let api_base_url = get("INTAKE_API_BASE_URL").unwrap_or(defaults.api_base_url);
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "INTAKE_API_BASE_URL".to_string(),
                message: format!("'{}' is not an http(s) URL", api_base_url),
            });
        }

        let timeout = match get("INTAKE_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                    key: "INTAKE_HTTP_TIMEOUT_SECS".to_string(),
                    message: format!("'{}' is not a number of seconds", raw),
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.timeout,
        };

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            api_token: get("INTAKE_API_TOKEN"),
            assign_endpoint: get("INTAKE_ASSIGN_ENDPOINT").unwrap_or(defaults.assign_endpoint),
            export_endpoint: get("INTAKE_EXPORT_ENDPOINT").unwrap_or(defaults.export_endpoint),
            timeout,
            registry_dir: get("INTAKE_REGISTRY_DIR").map(PathBuf::from).unwrap_or(defaults.registry_dir),
            export_dir: get("INTAKE_EXPORT_DIR").map(PathBuf::from).unwrap_or(defaults.export_dir),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn assign_url(&self) -> String {
        join_url(&self.api_base_url, &self.assign_endpoint)
    }

    pub fn export_url(&self) -> String {
        join_url(&self.api_base_url, &self.export_endpoint)
    }
}

fn join_url(base: &str, endpoint: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), endpoint.trim_start_matches('/'))
}
