//! Configuration registry - client mappings and export configurations on disk
//!
//! Layout under the registry directory:
//!
//! ```text
//! <dir>/mappings/<CLIENT_CODE>.json
//! <dir>/exports/<CLIENT_CODE>.json
//! ```
//!
//! Documents are loaded once at construction; every change is written back
//! immediately. Imported documents are checked against the embedded JSON
//! schemas before they are stored.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_REGISTRY_DIR;
use crate::error::{RegistryError, RegistryResult};
use crate::export::{ExportColumns, ExportConfig, ExportFormat};
use crate::transform::mapping::{ClientMapping, ColumnMapping, FieldRule, ValidationRules};
use crate::transform::operations::Transform;
use crate::validation::schema::{validate_client_mapping, validate_export_config};

const MAPPINGS_DIR: &str = "mappings";
const EXPORTS_DIR: &str = "exports";

/// Source of active client mappings for the processor.
pub trait MappingStore {
    fn active_mapping(&self, client_code: &str) -> Option<ClientMapping>;
}

impl MappingStore for HashMap<String, ClientMapping> {
    fn active_mapping(&self, client_code: &str) -> Option<ClientMapping> {
        self.get(client_code).filter(|m| m.is_active).cloned()
    }
}

impl<S: MappingStore + ?Sized> MappingStore for &S {
    fn active_mapping(&self, client_code: &str) -> Option<ClientMapping> {
        (**self).active_mapping(client_code)
    }
}

/// Registry for client mappings and export configurations
pub struct ConfigRegistry {
    dir: PathBuf,
    mappings: HashMap<String, ClientMapping>,
    exports: HashMap<String, ExportConfig>,
}

impl ConfigRegistry {
    /// Open the registry in the default directory
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_REGISTRY_DIR)
    }

    /// Open a registry rooted at `dir`, loading whatever is already there
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let dir = PathBuf::from(dir.as_ref());
        let mappings = load_documents::<ClientMapping>(&dir.join(MAPPINGS_DIR))
            .into_iter()
            .map(|m| (m.client_code.clone(), m))
            .collect();
        let exports = load_documents::<ExportConfig>(&dir.join(EXPORTS_DIR))
            .into_iter()
            .map(|c| (c.client_code.clone(), c))
            .collect();
        Self { dir, mappings, exports }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // -------------------------------------------------------------------------
    // Client mappings
    // -------------------------------------------------------------------------

    /// All mappings, sorted by client code
    pub fn list_mappings(&self) -> Vec<&ClientMapping> {
        let mut list: Vec<_> = self.mappings.values().collect();
        list.sort_by(|a, b| a.client_code.cmp(&b.client_code));
        list
    }

    pub fn get_mapping(&self, client_code: &str) -> Option<&ClientMapping> {
        self.mappings.get(client_code)
    }

    /// Store a mapping, stamping its timestamps
    pub fn save_mapping(&mut self, mut mapping: ClientMapping) -> RegistryResult<()> {
        let now = Utc::now().to_rfc3339();
        if mapping.created_at.is_none() {
            mapping.created_at = self
                .mappings
                .get(&mapping.client_code)
                .and_then(|m| m.created_at.clone())
                .or_else(|| Some(now.clone()));
        }
        mapping.updated_at = Some(now);

        write_document(&self.mapping_path(&mapping.client_code), &mapping)?;
        tracing::info!(client = %mapping.client_code, fields = mapping.mapping_config.len(), "mapping saved");
        self.mappings.insert(mapping.client_code.clone(), mapping);
        Ok(())
    }

    /// Import a mapping document from a JSON file
    pub fn import_mapping(&mut self, path: &Path) -> RegistryResult<String> {
        let doc = read_json(path)?;
        validate_client_mapping(&doc).map_err(RegistryError::InvalidDocument)?;
        let mapping: ClientMapping = serde_json::from_value(doc)?;
        let code = mapping.client_code.clone();
        self.save_mapping(mapping)?;
        Ok(code)
    }

    pub fn delete_mapping(&mut self, client_code: &str) -> RegistryResult<()> {
        if self.mappings.remove(client_code).is_none() {
            return Err(RegistryError::NotFound(client_code.to_string()));
        }
        fs::remove_file(self.mapping_path(client_code))?;
        Ok(())
    }

    /// Activate or deactivate a client's mapping
    pub fn set_mapping_active(&mut self, client_code: &str, active: bool) -> RegistryResult<()> {
        let mut mapping = self
            .mappings
            .get(client_code)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(client_code.to_string()))?;
        mapping.is_active = active;
        self.save_mapping(mapping)
    }

    // -------------------------------------------------------------------------
    // Export configurations
    // -------------------------------------------------------------------------

    pub fn list_exports(&self) -> Vec<&ExportConfig> {
        let mut list: Vec<_> = self.exports.values().collect();
        list.sort_by(|a, b| a.client_code.cmp(&b.client_code));
        list
    }

    pub fn get_export(&self, client_code: &str) -> Option<&ExportConfig> {
        self.exports.get(client_code)
    }

    /// Active export configuration whose `default_filters.id_clie` is `client_id`
    pub fn export_for_client_id(&self, client_id: i64) -> Option<&ExportConfig> {
        self.list_exports()
            .into_iter()
            .find(|c| c.is_active && c.client_id() == Some(client_id))
    }

    pub fn save_export(&mut self, mut config: ExportConfig) -> RegistryResult<()> {
        let now = Utc::now().to_rfc3339();
        if config.created_at.is_none() {
            config.created_at = self
                .exports
                .get(&config.client_code)
                .and_then(|c| c.created_at.clone())
                .or_else(|| Some(now.clone()));
        }
        config.updated_at = Some(now);

        write_document(&self.export_path(&config.client_code), &config)?;
        tracing::info!(client = %config.client_code, columns = config.column_mapping.len(), "export config saved");
        self.exports.insert(config.client_code.clone(), config);
        Ok(())
    }

    pub fn import_export(&mut self, path: &Path) -> RegistryResult<String> {
        let doc = read_json(path)?;
        validate_export_config(&doc).map_err(RegistryError::InvalidDocument)?;
        let config: ExportConfig = serde_json::from_value(doc)?;
        let code = config.client_code.clone();
        self.save_export(config)?;
        Ok(code)
    }

    pub fn delete_export(&mut self, client_code: &str) -> RegistryResult<()> {
        if self.exports.remove(client_code).is_none() {
            return Err(RegistryError::NotFound(client_code.to_string()));
        }
        fs::remove_file(self.export_path(client_code))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Defaults
    // -------------------------------------------------------------------------

    /// Install the built-in documents that are not present yet.
    ///
    /// Returns the codes that were written.
    pub fn seed_defaults(&mut self) -> RegistryResult<Vec<String>> {
        let mut written = Vec::new();

        for mapping in default_mappings() {
            if !self.mappings.contains_key(&mapping.client_code) {
                written.push(mapping.client_code.clone());
                self.save_mapping(mapping)?;
            }
        }

        let export = serfinanza_export();
        if !self.exports.contains_key(&export.client_code) {
            written.push(export.client_code.clone());
            self.save_export(export)?;
        }

        Ok(written)
    }

    fn mapping_path(&self, client_code: &str) -> PathBuf {
        self.dir.join(MAPPINGS_DIR).join(format!("{}.json", file_stem(client_code)))
    }

    fn export_path(&self, client_code: &str) -> PathBuf {
        self.dir.join(EXPORTS_DIR).join(format!("{}.json", file_stem(client_code)))
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingStore for ConfigRegistry {
    fn active_mapping(&self, client_code: &str) -> Option<ClientMapping> {
        self.mappings.get(client_code).filter(|m| m.is_active).cloned()
    }
}

/// Load every parseable JSON document in `dir`; unreadable files are skipped with a warning
fn load_documents<T: DeserializeOwned>(dir: &Path) -> Vec<T> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return Vec::new(),
    };

    let mut documents = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.extension().is_some_and(|e| e == "json") {
            continue;
        }
        match fs::read_to_string(&path).map(|c| serde_json::from_str::<T>(&c)) {
            Ok(Ok(doc)) => documents.push(doc),
            Ok(Err(e)) => tracing::warn!(path = %path.display(), error = %e, "skipping invalid registry document"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable registry document"),
        }
    }
    documents
}

fn write_document<T: Serialize>(path: &Path, doc: &T) -> RegistryResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(doc)?)?;
    Ok(())
}

fn read_json(path: &Path) -> RegistryResult<Value> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Client code as a safe file name
fn file_stem(client_code: &str) -> String {
    client_code
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// Built-in client mappings
pub fn default_mappings() -> Vec<ClientMapping> {
    let remesa = ColumnMapping::new()
        .with_field("seudo_bd", FieldRule::direct("CUENTA 1"))
        .with_field("id_clie", FieldRule::literal(17))
        .with_field("nombre", FieldRule::direct("NOMBRE"))
        .with_field("surname", FieldRule::direct(""))
        .with_field("cc", FieldRule::direct("NIT"))
        .with_field("documento", FieldRule::literal(1))
        .with_field("ciudad", FieldRule::direct("CIUDAD RESIDENCIA"))
        .with_field("nom_pro", FieldRule::literal("01"))
        .with_field("referencia", FieldRule::direct("REMESA"))
        .with_field("tarjeta", FieldRule::direct("CUENTA 1"))
        .with_field("marcacion", FieldRule::direct("HRA ENTREGA"))
        .with_field("convenio", FieldRule::direct("COD"))
        .with_field("tipo_entrega", FieldRule::direct("COD"))
        .with_field("direccion", FieldRule::direct("DIR RESIDENCIA"))
        .with_field("barrio", FieldRule::direct("BARRIO"))
        .with_field("telefono", FieldRule::direct("CELULAR"))
        .with_field("celular", FieldRule::direct("CELULAR"))
        .with_field("direccion_oficina", FieldRule::direct("DIR OFICINA"))
        .with_field("ciudad_oficina", FieldRule::direct("CIUDAD OFICINA"))
        .with_field("telefono_oficina", FieldRule::direct("TEL OFICINA"))
        .with_field("mercado", FieldRule::direct("MERCADO"))
        .with_field("fecha_asignacion", FieldRule::direct("FECHA DE ASIGNACION"))
        .with_field("fecha_entrega", FieldRule::direct("FECHA DE ENTREGA"))
        .with_field("telefono_entrega", FieldRule::direct("TEL ENTREGA"))
        .with_field("direccion_entrega", FieldRule::direct("DIREC ENTREGA"))
        .with_field("hora_entrega", FieldRule::direct("HRA ENTREGA"))
        .with_field("cuenta1", FieldRule::direct("CUENTA 1"))
        .with_field("cuenta2", FieldRule::direct("CUENTA 2"))
        .with_field("sec", FieldRule::direct("SEC"))
        .with_field("cod", FieldRule::direct("COD"));

    let ejemplo = ColumnMapping::new()
        .with_field("seudo_bd", FieldRule::direct("BASE_DATOS"))
        .with_field("id_clie", FieldRule::direct("ID_CLIENTE"))
        .with_field("nombre", FieldRule::direct("NOMBRE_COMPLETO"))
        .with_field("cc", FieldRule::direct("CEDULA"))
        .with_field("direccion", FieldRule::direct("DIRECCION"))
        .with_field("barrio", FieldRule::direct("BARRIO"))
        .with_field("ciudad", FieldRule::direct("CIUDAD"))
        .with_field("telefono", FieldRule::direct("TELEFONO"))
        .with_field("celular", FieldRule::direct("CELULAR"));

    let required = ValidationRules::required(["seudo_bd", "nombre", "cc"]);

    vec![
        ClientMapping::new("CLIENTE_REMESA", remesa)
            .with_name("Cliente remesas")
            .with_validation(required.clone().with_optional(["id_clie", "direccion", "barrio", "ciudad", "telefono", "celular"])),
        ClientMapping::new("CLIENTE_EJEMPLO", ejemplo)
            .with_name("Cliente ejemplo")
            .with_validation(required.with_optional(["id_clie", "direccion", "telefono"])),
    ]
}

/// Built-in SERFINANZA export layout
pub fn serfinanza_export() -> ExportConfig {
    let columns = [
        ("pseudo_id", "seudo_bd"),
        ("cliente_id", "id_clie"),
        ("nombre_completo", "nombre"),
        ("apellidos", "surname"),
        ("documento", "cc"),
        ("tipo_doc", "documento"),
        ("ciudad_cod", "ciudad"),
        ("producto", "nom_pro"),
        ("direccion", "direccion"),
        ("barrio", "barrio"),
        ("telefono", "telefono"),
        ("celular", "celular"),
        ("referencia", "referencia"),
        ("tarjeta", "tarjeta"),
        ("marcacion", "marcacion"),
        ("convenio", "convenio"),
        ("tipo_entrega", "tipo_entrega"),
    ]
    .iter()
    .fold(ExportColumns::new(), |cols, (column, field)| cols.with(*column, *field));

    let mut config = ExportConfig::new("SERFINANZA", columns)
        .with_name("Serfinanza")
        .with_format(ExportFormat::Xlsx)
        .with_transformation("ciudad_cod", Transform::LeftPad(5))
        .with_transformation("documento", Transform::Upper)
        .with_transformation("nombre_completo", Transform::Upper);
    config.description = "Export layout for Serfinanza".to_string();
    config.excel_config.filter_buttons = true;
    config.default_filters.insert("id_clie".to_string(), json!(3));
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        {
            let mut registry = ConfigRegistry::with_dir(dir.path());
            let mapping = ClientMapping::new("ACME", ColumnMapping::new().with_field("nombre", FieldRule::direct("NOMBRE")));
            registry.save_mapping(mapping).unwrap();
        }

        let registry = ConfigRegistry::with_dir(dir.path());
        let mapping = registry.get_mapping("ACME").unwrap();
        assert!(mapping.created_at.is_some());
        assert!(dir.path().join("mappings/ACME.json").exists());
        assert!(registry.active_mapping("ACME").is_some());
    }

    #[test]
    fn test_inactive_mapping_is_not_served() {
        let dir = tempdir().unwrap();
        let mut registry = ConfigRegistry::with_dir(dir.path());
        registry
            .save_mapping(ClientMapping::new("ACME", ColumnMapping::new().with_field("a", FieldRule::direct("A"))))
            .unwrap();
        registry.set_mapping_active("ACME", false).unwrap();
        assert!(registry.active_mapping("ACME").is_none());
        assert!(registry.get_mapping("ACME").is_some());
    }

    #[test]
    fn test_import_validates_document() {
        let dir = tempdir().unwrap();
        let mut registry = ConfigRegistry::with_dir(dir.path().join("reg"));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"client_code": "X"}"#).unwrap();
        assert!(matches!(registry.import_mapping(&bad), Err(RegistryError::InvalidDocument(_))));

        let good = dir.path().join("good.json");
        fs::write(&good, r#"{"client_code": "X", "mapping_config": {"nombre": "NOMBRE", "id_clie": 4}}"#).unwrap();
        assert_eq!(registry.import_mapping(&good).unwrap(), "X");
        assert_eq!(registry.get_mapping("X").unwrap().mapping_config.len(), 2);
    }

    #[test]
    fn test_delete_missing() {
        let dir = tempdir().unwrap();
        let mut registry = ConfigRegistry::with_dir(dir.path());
        assert!(matches!(registry.delete_mapping("NOPE"), Err(RegistryError::NotFound(_))));
        assert!(matches!(registry.delete_export("NOPE"), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_seed_defaults_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut registry = ConfigRegistry::with_dir(dir.path());
        let written = registry.seed_defaults().unwrap();
        assert_eq!(written, vec!["CLIENTE_REMESA", "CLIENTE_EJEMPLO", "SERFINANZA"]);
        assert!(registry.seed_defaults().unwrap().is_empty());

        let export = registry.export_for_client_id(3).unwrap();
        assert_eq!(export.client_code, "SERFINANZA");
        assert_eq!(export.output_columns().len(), 17);
    }

    #[test]
    fn test_seeded_documents_pass_schemas() {
        for mapping in default_mappings() {
            let doc = serde_json::to_value(&mapping).unwrap();
            assert!(validate_client_mapping(&doc).is_ok(), "{}", mapping.client_code);
        }
        let doc = serde_json::to_value(serfinanza_export()).unwrap();
        assert_eq!(validate_export_config(&doc), Ok(()));
    }

    #[test]
    fn test_hashmap_store() {
        let mut store = HashMap::new();
        store.insert("A".to_string(), ClientMapping::new("A", ColumnMapping::new()));
        assert!(store.active_mapping("A").is_some());
        assert!(store.active_mapping("B").is_none());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("CLIENTE_1"), "CLIENTE_1");
        assert_eq!(file_stem("../x y"), "___x_y");
    }
}
