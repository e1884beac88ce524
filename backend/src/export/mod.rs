//! Export direction: API rows to client-shaped files.
//!
//! An [`ExportConfig`] names the export columns, where each one reads from,
//! their order, per-column transforms and the output format. The flow is:
//!
//! 1. fetch rows for a client id through a [`RecordSource`]
//! 2. [`ExportConfig::map_record`]: one output column per mapping entry,
//!    reordered by `column_order`, with every ordered column forced to exist
//! 3. [`ExportConfig::apply_transformations`] on the export column names
//! 4. write csv / txt / json / xlsx bytes ([`writer`])
//!
//! - [`writer`] - delimited, JSON and workbook writers

pub mod writer;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::client::RecordSource;
use crate::error::{ExportError, ExportResult};
use crate::transform::operations::Transform;

/// Column that always carries the export date.
pub const REPORT_DATE_COLUMN: &str = "FECHA REPORTE FINAL";

// =============================================================================
// Configuration
// =============================================================================

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
    Txt,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Txt => "txt",
            ExportFormat::Json => "json",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "xlsx" => Some(ExportFormat::Xlsx),
            "csv" => Some(ExportFormat::Csv),
            "txt" => Some(ExportFormat::Txt),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

/// Styling and delimiter options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcelConfig {
    #[serde(default = "default_true")]
    pub auto_width: bool,
    #[serde(default = "default_true")]
    pub freeze_header: bool,
    #[serde(default)]
    pub filter_buttons: bool,
    /// Delimiter for csv/txt output.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_true() -> bool {
    true
}

fn default_delimiter() -> char {
    ','
}

impl Default for ExcelConfig {
    fn default() -> Self {
        Self { auto_width: true, freeze_header: true, filter_buttons: false, delimiter: ',' }
    }
}

/// Ordered `export column -> source field` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ExportColumns(Vec<(String, String)>);

impl ExportColumns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, source: impl Into<String>) -> Self {
        self.0.push((column.into(), source.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(c, s)| (c.as_str(), s.as_str()))
    }

    pub fn columns(&self) -> Vec<String> {
        self.0.iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for ExportColumns {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        map.into_iter()
            .map(|(column, source)| match source {
                Value::String(s) => Ok((column, s)),
                other => Err(format!("column '{}' must map to a field name, got {}", column, other)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ExportColumns)
    }
}

impl From<ExportColumns> for Map<String, Value> {
    fn from(columns: ExportColumns) -> Self {
        columns.0.into_iter().map(|(c, s)| (c, Value::String(s))).collect()
    }
}

/// Per-client export layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub client_code: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub description: String,
    pub column_mapping: ExportColumns,
    #[serde(default)]
    pub column_order: Vec<String>,
    #[serde(default)]
    pub export_format: ExportFormat,
    #[serde(default)]
    pub excel_config: ExcelConfig,
    /// Query defaults; `id_clie` ties the configuration to a numeric client id.
    #[serde(default)]
    pub default_filters: Map<String, Value>,
    /// Transforms keyed by export column name.
    #[serde(default)]
    pub transformations: BTreeMap<String, Transform>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ExportConfig {
    pub fn new(client_code: impl Into<String>, column_mapping: ExportColumns) -> Self {
        let client_code = client_code.into();
        Self {
            client_name: client_code.clone(),
            client_code,
            description: String::new(),
            column_order: column_mapping.columns(),
            column_mapping,
            export_format: ExportFormat::default(),
            excel_config: ExcelConfig::default(),
            default_filters: Map::new(),
            transformations: BTreeMap::new(),
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    /// Generic eight-column layout for clients without a configuration.
    pub fn default_for(client_id: i64) -> Self {
        let columns = ExportColumns::new()
            .with("pseudo_id", "seudo_bd")
            .with("cliente_id", "id_clie")
            .with("nombre_completo", "nombre")
            .with("apellidos", "surname")
            .with("documento", "cc")
            .with("tipo_doc", "documento")
            .with("ciudad_cod", "ciudad")
            .with("producto", "nom_pro");

        let mut config = Self::new(format!("CLIENTE_{}", client_id), columns)
            .with_name(format!("Cliente {}", client_id));
        config.default_filters.insert("id_clie".to_string(), json!(client_id));
        config
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.export_format = format;
        self
    }

    pub fn with_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_order = order.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_transformation(mut self, column: impl Into<String>, transform: Transform) -> Self {
        self.transformations.insert(column.into(), transform);
        self
    }

    /// Numeric client id from `default_filters.id_clie`.
    pub fn client_id(&self) -> Option<i64> {
        match self.default_filters.get("id_clie")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Output columns: `column_order`, or the mapping order when no order is set.
    pub fn output_columns(&self) -> Vec<String> {
        if self.column_order.is_empty() {
            self.column_mapping.columns()
        } else {
            self.column_order.clone()
        }
    }

    /// Map one source row into exactly [`Self::output_columns`], in order.
    pub fn map_record(&self, source: &Map<String, Value>, today: NaiveDate) -> Map<String, Value> {
        let mut mapped = Map::new();
        for (column, field) in self.column_mapping.iter() {
            let value = match source.get(field) {
                Some(Value::Null) | None => Value::String(String::new()),
                Some(value) => value.clone(),
            };
            mapped.insert(column.to_string(), value);
        }

        let columns = self.output_columns();
        if columns.iter().any(|c| c == REPORT_DATE_COLUMN) {
            mapped.insert(REPORT_DATE_COLUMN.to_string(), json!(today.format("%Y-%m-%d").to_string()));
        }

        columns
            .into_iter()
            .map(|column| {
                let value = mapped.remove(&column).unwrap_or_else(|| Value::String(String::new()));
                (column, value)
            })
            .collect()
    }

    /// Apply configured transforms to a mapped row.
    pub fn apply_transformations(&self, row: &mut Map<String, Value>) {
        for (column, transform) in &self.transformations {
            if let Some(value) = row.get_mut(column) {
                *value = transform.apply(value);
            }
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// A generated export file held in memory.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub filename: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    pub record_count: usize,
}

impl ExportArtifact {
    /// Write the artifact into `dir`, creating it if needed.
    pub fn save_in(&self, dir: &Path) -> ExportResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// `{client_code}_export_{YYYYMMDD_HHMMSS}.{ext}`
pub fn export_filename(client_code: &str, format: ExportFormat, now: NaiveDateTime) -> String {
    format!("{}_export_{}.{}", client_code, now.format("%Y%m%d_%H%M%S"), format.extension())
}

/// Map, transform and write `rows` as configured.
pub fn render(rows: &[Map<String, Value>], config: &ExportConfig, now: NaiveDateTime) -> ExportResult<ExportArtifact> {
    if rows.is_empty() {
        return Err(ExportError::NoData);
    }

    let columns = config.output_columns();
    let mapped: Vec<Map<String, Value>> = rows
        .iter()
        .map(|row| {
            let mut mapped = config.map_record(row, now.date());
            config.apply_transformations(&mut mapped);
            mapped
        })
        .collect();

    let bytes = match config.export_format {
        ExportFormat::Xlsx => writer::write_xlsx(&mapped, &columns, &config.excel_config)?,
        ExportFormat::Csv | ExportFormat::Txt => {
            writer::write_delimited(&mapped, &columns, config.excel_config.delimiter)?
        }
        ExportFormat::Json => writer::write_json(&mapped)?,
    };

    Ok(ExportArtifact {
        filename: export_filename(&config.client_code, config.export_format, now),
        format: config.export_format,
        bytes,
        record_count: mapped.len(),
    })
}

/// Fetches rows and renders them.
pub struct ExportService<R: RecordSource> {
    source: R,
}

impl<R: RecordSource> ExportService<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub async fn export(&self, client_id: i64, config: &ExportConfig, now: NaiveDateTime) -> ExportResult<ExportArtifact> {
        let rows = self.source.fetch_records(client_id).await?;
        tracing::info!(client_id, client = %config.client_code, rows = rows.len(), "exporting rows");

        let artifact = render(&rows, config, now)?;
        tracing::info!(
            filename = %artifact.filename,
            records = artifact.record_count,
            bytes = artifact.bytes.len(),
            "export generated"
        );
        Ok(artifact)
    }
}
