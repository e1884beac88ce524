//! Intake CLI - ingest client files and generate exports
//!
//! # Main Commands
//!
//! ```bash
//! intake process remesa.xlsx --client CLIENTE_REMESA   # Map, validate and transmit
//! intake process *.csv --client ACME --dry-run         # Same, without network access
//! intake export --client-id 3                          # Pull records and write an export file
//! intake mapping init                                  # Install the built-in configurations
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! intake inspect input.xlsx                      # Show layout, columns and first rows
//! intake mapping preview ACME sample.json        # Map one sample row without transmitting
//! intake mapping list                            # Manage client mappings
//! intake export-config list                      # Manage export configurations
//! ```

use chrono::Local;
use clap::{Parser, Subcommand};
use intake::client::{ApiClient, DryRunTransmitter, RecordTransmitter};
use intake::config::ServiceConfig;
use intake::export::{ExportConfig, ExportFormat, ExportService};
use intake::models::FileInput;
use intake::registry::ConfigRegistry;
use intake::report::ProcessingSummary;
use intake::transform::{ProcessingResult, Processor, RecordMapper, TableReader};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "intake")]
#[command(about = "Ingest client spreadsheets and generate client exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process files for a client: read, map, validate, transmit
    Process {
        /// Input files (csv, txt, xlsx, xls)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Client code whose mapping applies
        #[arg(short, long)]
        client: String,

        /// Do not call the downstream API
        #[arg(long)]
        dry_run: bool,

        /// Output file for the results (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show how a file is read: layout, normalized columns, first rows
    Inspect {
        /// Input file
        input: PathBuf,

        /// Number of rows to show
        #[arg(long, default_value = "5")]
        rows: usize,
    },

    /// Fetch a client's records and write an export file
    Export {
        /// Numeric client id
        #[arg(long)]
        client_id: i64,

        /// Export configuration to use (default: looked up by client id)
        #[arg(short, long)]
        client: Option<String>,

        /// Override the configured format (xlsx, csv, txt, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Directory for the export file
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Manage client mappings
    Mapping {
        #[command(subcommand)]
        action: MappingAction,
    },

    /// Manage export configurations
    ExportConfig {
        #[command(subcommand)]
        action: ExportConfigAction,
    },
}

#[derive(Subcommand)]
enum MappingAction {
    /// List all stored mappings
    List,

    /// Show one mapping
    Show {
        /// Client code
        client: String,
    },

    /// Import a mapping JSON document
    Import {
        /// Mapping JSON file
        file: PathBuf,
    },

    /// Delete a mapping
    Delete {
        /// Client code
        client: String,
    },

    /// Activate a mapping
    Activate {
        /// Client code
        client: String,
    },

    /// Deactivate a mapping
    Deactivate {
        /// Client code
        client: String,
    },

    /// Map one sample row (JSON object) with a client's mapping
    Preview {
        /// Client code
        client: String,
        /// JSON file holding one object of column -> value
        sample: PathBuf,
    },

    /// Install the built-in mappings and export configurations
    Init,
}

#[derive(Subcommand)]
enum ExportConfigAction {
    /// List all export configurations
    List,

    /// Show one export configuration
    Show {
        /// Client code
        client: String,
    },

    /// Import an export configuration JSON document
    Import {
        /// Export configuration JSON file
        file: PathBuf,
    },

    /// Delete an export configuration
    Delete {
        /// Client code
        client: String,
    },
}

#[tokio::main]
async fn main() {
    intake::logs::init_tracing();

    let cli = Cli::parse();

    let result = match ServiceConfig::from_env() {
        Ok(config) => match cli.command {
            Commands::Process { files, client, dry_run, output } => {
                cmd_process(&config, &files, &client, dry_run, output.as_deref()).await
            }

            Commands::Inspect { input, rows } => cmd_inspect(&input, rows),

            Commands::Export { client_id, client, format, output_dir } => {
                cmd_export(&config, client_id, client.as_deref(), format.as_deref(), output_dir.as_deref()).await
            }

            Commands::Mapping { action } => cmd_mapping(&config, action),

            Commands::ExportConfig { action } => cmd_export_config(&config, action),
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_process(
    config: &ServiceConfig,
    files: &[PathBuf],
    client: &str,
    dry_run: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ConfigRegistry::with_dir(&config.registry_dir);

    let results = if dry_run {
        eprintln!("Dry run: records will not be transmitted");
        run_batch(Processor::new(&registry, DryRunTransmitter), files, client).await?
    } else {
        let api = ApiClient::new(config.clone())?;
        run_batch(Processor::new(&registry, api), files, client).await?
    };

    let summary = ProcessingSummary::from_results(&results);
    eprintln!(
        "\nFiles: {} processed, {} failed. Records: {} mapped, {} transmitted",
        summary.successful_files, summary.failed_files, summary.records_processed, summary.records_transmitted
    );
    for failure in &summary.failures {
        eprintln!("   {} [{}]: {}", failure.file_name, failure.status, failure.message);
    }

    let json = serde_json::to_string_pretty(&json!({ "summary": summary, "results": results }))?;
    write_output(&json, output)?;

    if !summary.all_succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_batch<T: RecordTransmitter>(
    processor: Processor<&ConfigRegistry, T>,
    files: &[PathBuf],
    client: &str,
) -> Result<Vec<ProcessingResult>, Box<dyn std::error::Error>> {
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        eprintln!("Processing: {}", path.display());
        let input = FileInput::from_path(path)?;
        let result = processor.process(&input, client).await;

        eprintln!("   Status: {}", result.status);
        eprintln!("   Records: {} mapped, {} transmitted", result.records_processed, result.records_transmitted);
        for warning in result.warnings.iter().take(5) {
            eprintln!("   warning: {}", warning);
        }
        for error in result.errors.iter().take(5) {
            eprintln!("   error: {}", error);
        }

        results.push(result);
    }

    Ok(results)
}

fn cmd_inspect(input: &Path, rows: usize) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Inspecting: {}", input.display());

    let file = FileInput::from_path(input)?;
    let outcome = TableReader::default().read(&file, Local::now().date_naive())?;

    if let Some(ref encoding) = outcome.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(delimiter) = outcome.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(delimiter));
    }
    if let Some(ref sheet) = outcome.sheet {
        eprintln!("   Sheet: {}", sheet);
    }
    eprintln!("   Layout: {}", serde_json::to_string(&outcome.layout)?);
    eprintln!("   Rows: {}", outcome.table.len());
    eprintln!("   Columns: {}", outcome.table.columns.join(", "));
    if outcome.placeholder {
        eprintln!("   No report data found, placeholder record emitted");
    }

    let preview: Vec<Map<String, Value>> = outcome
        .table
        .rows
        .iter()
        .take(rows)
        .map(|row| {
            outcome
                .table
                .columns
                .iter()
                .zip(row)
                .map(|(column, cell)| (column.clone(), Value::String(cell.to_text())))
                .collect()
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(())
}

async fn cmd_export(
    config: &ServiceConfig,
    client_id: i64,
    client: Option<&str>,
    format: Option<&str>,
    output_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ConfigRegistry::with_dir(&config.registry_dir);

    let mut export_config = match client {
        Some(code) => registry
            .get_export(code)
            .cloned()
            .ok_or_else(|| format!("Export configuration not found: {}", code))?,
        None => registry
            .export_for_client_id(client_id)
            .cloned()
            .unwrap_or_else(|| ExportConfig::default_for(client_id)),
    };

    if let Some(name) = format {
        let parsed = ExportFormat::parse(name).ok_or_else(|| format!("Unknown export format: {}", name))?;
        export_config = export_config.with_format(parsed);
    }

    eprintln!("Exporting client {} with configuration {}", client_id, export_config.client_code);

    let service = ExportService::new(ApiClient::new(config.clone())?);
    let artifact = service.export(client_id, &export_config, Local::now().naive_local()).await?;

    let dir = output_dir.unwrap_or(config.export_dir.as_path());
    let path = artifact.save_in(dir)?;
    eprintln!("   {} records written to {}", artifact.record_count, path.display());
    Ok(())
}

fn cmd_mapping(config: &ServiceConfig, action: MappingAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = ConfigRegistry::with_dir(&config.registry_dir);

    match action {
        MappingAction::List => {
            let mappings = registry.list_mappings();
            if mappings.is_empty() {
                eprintln!("No mappings stored yet.");
                eprintln!("   Use 'intake mapping init' or 'intake mapping import <file>' to add one.");
                return Ok(());
            }

            eprintln!("Stored mappings ({}):\n", mappings.len());
            for m in mappings {
                println!("  {} ({})", m.client_name, m.client_code);
                println!("     Fields: {}", m.mapping_config.target_fields().join(", "));
                println!("     Required: {}", m.validation_rules.required_fields.join(", "));
                println!("     Active: {}", m.is_active);
                if let Some(ref updated) = m.updated_at {
                    println!("     Updated: {}", updated);
                }
                println!();
            }
        }

        MappingAction::Show { client } => {
            let mapping = registry
                .get_mapping(&client)
                .ok_or_else(|| format!("Mapping not found: {}", client))?;
            println!("{}", serde_json::to_string_pretty(mapping)?);
        }

        MappingAction::Import { file } => {
            eprintln!("Importing mapping from: {}", file.display());
            let code = registry.import_mapping(&file)?;
            eprintln!("Mapping saved for client: {}", code);
        }

        MappingAction::Delete { client } => {
            registry.delete_mapping(&client)?;
            eprintln!("Mapping deleted: {}", client);
        }

        MappingAction::Activate { client } => {
            registry.set_mapping_active(&client, true)?;
            eprintln!("Mapping activated: {}", client);
        }

        MappingAction::Deactivate { client } => {
            registry.set_mapping_active(&client, false)?;
            eprintln!("Mapping deactivated: {}", client);
        }

        MappingAction::Preview { client, sample } => {
            let mapping = registry
                .get_mapping(&client)
                .ok_or_else(|| format!("Mapping not found: {}", client))?;
            let content = fs::read_to_string(&sample)?;
            let row: Map<String, Value> = serde_json::from_str(&content)?;

            let outcome = RecordMapper::default().preview(&mapping.mapping_config, &row);
            for miss in &outcome.misses {
                eprintln!("   Column '{}' for field '{}' not found", miss.source, miss.field);
            }
            println!("{}", serde_json::to_string_pretty(&outcome.records)?);
        }

        MappingAction::Init => {
            let written = registry.seed_defaults()?;
            if written.is_empty() {
                eprintln!("Built-in configurations already present in {}", registry.dir().display());
            } else {
                eprintln!("Installed in {}: {}", registry.dir().display(), written.join(", "));
            }
        }
    }

    Ok(())
}

fn cmd_export_config(config: &ServiceConfig, action: ExportConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = ConfigRegistry::with_dir(&config.registry_dir);

    match action {
        ExportConfigAction::List => {
            let exports = registry.list_exports();
            if exports.is_empty() {
                eprintln!("No export configurations stored yet.");
                return Ok(());
            }

            eprintln!("Export configurations ({}):\n", exports.len());
            for c in exports {
                println!("  {} ({})", c.client_name, c.client_code);
                if let Some(id) = c.client_id() {
                    println!("     Client id: {}", id);
                }
                println!("     Format: {}", c.export_format.extension());
                println!("     Columns: {}", c.output_columns().join(", "));
                println!();
            }
        }

        ExportConfigAction::Show { client } => {
            let export = registry
                .get_export(&client)
                .ok_or_else(|| format!("Export configuration not found: {}", client))?;
            println!("{}", serde_json::to_string_pretty(export)?);
        }

        ExportConfigAction::Import { file } => {
            eprintln!("Importing export configuration from: {}", file.display());
            let code = registry.import_export(&file)?;
            eprintln!("Export configuration saved for client: {}", code);
        }

        ExportConfigAction::Delete { client } => {
            registry.delete_export(&client)?;
            eprintln!("Export configuration deleted: {}", client);
        }
    }

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
