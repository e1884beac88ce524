//! Column header normalization.
//!
//! Raw headers arrive with stray whitespace, punctuation, accents and
//! inconsistent casing. [`ColumnNormalizer`] cleans them and folds known
//! variants onto one canonical label through a [`SynonymTable`].
//!
//! ```rust,ignore
//! use intake::normalize::ColumnNormalizer;
//!
//! let normalizer = ColumnNormalizer::default();
//! assert_eq!(normalizer.normalize("  Cédula "), "NIT");
//! assert_eq!(normalizer.normalize("Dir.  Oficina"), "DIR OFICINA");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Version of the built-in synonym table. Bump when entries change.
pub const SYNONYM_TABLE_VERSION: u32 = 1;

/// Built-in header variants and the canonical label they fold onto.
///
/// Keys are compared after cleaning, so they are uppercase with single spaces.
pub const DEFAULT_SYNONYMS: &[(&str, &str)] = &[
    ("REMESSA", "REMESA"),
    ("SEUDO_BD", "REMESA"),
    ("SEUDO BD", "REMESA"),
    ("PSEUDO_BD", "REMESA"),
    ("NOMBRES", "NOMBRE"),
    ("CLIENTE", "NOMBRE"),
    ("TITULAR", "NOMBRE"),
    ("CC", "NIT"),
    ("CEDULA", "NIT"),
    ("CÉDULA", "NIT"),
    ("DOCUMENTO", "NIT"),
    ("ID", "NIT"),
    ("IDENTIFICACION", "NIT"),
    ("IDENTIFICACIÓN", "NIT"),
    ("CUENTA1", "CUENTA 1"),
    ("CUENTA_UNO", "CUENTA 1"),
    ("CUENTA", "CUENTA 1"),
    ("ACCOUNT", "CUENTA 1"),
    ("CUENTA2", "CUENTA 2"),
    ("CUENTA_DOS", "CUENTA 2"),
    ("ACCOUNT2", "CUENTA 2"),
    ("DIRECCION", "DIR RESIDENCIA"),
    ("DIRECCIÓN", "DIR RESIDENCIA"),
    ("DIRECCION RESIDENCIA", "DIR RESIDENCIA"),
    ("ADDRESS", "DIR RESIDENCIA"),
    ("NEIGHBORHOOD", "BARRIO"),
    ("CIUDAD", "CIUDAD RESIDENCIA"),
    ("CITY", "CIUDAD RESIDENCIA"),
    ("TELEFONO", "TEL RESIDENCIA"),
    ("TELÉFONO", "TEL RESIDENCIA"),
    ("PHONE", "TEL RESIDENCIA"),
    ("CEL", "CELULAR"),
    ("MOVIL", "CELULAR"),
    ("MÓVIL", "CELULAR"),
    ("MOBILE", "CELULAR"),
    ("MARKET", "MERCADO"),
    ("CODE", "COD"),
    ("CODIGO", "COD"),
    ("CÓDIGO", "COD"),
];

/// Immutable lookup from cleaned header to canonical label.
#[derive(Debug, Clone, PartialEq)]
pub struct SynonymTable {
    entries: HashMap<String, String>,
}

impl SynonymTable {
    /// Empty table: headers are only cleaned.
    pub fn empty() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Add or replace one entry.
    pub fn with_entry(mut self, variant: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.entries.insert(variant.into(), canonical.into());
        self
    }

    pub fn lookup(&self, cleaned: &str) -> Option<&str> {
        self.entries.get(cleaned).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_SYNONYMS.iter().copied())
    }
}

/// Cleans raw header labels and applies a synonym table.
#[derive(Debug, Clone, Default)]
pub struct ColumnNormalizer {
    synonyms: SynonymTable,
}

impl ColumnNormalizer {
    pub fn new(synonyms: SynonymTable) -> Self {
        Self { synonyms }
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    /// Normalize one header. Never fails; unmatched labels come back cleaned.
    pub fn normalize(&self, raw: &str) -> String {
        let cleaned = clean_header(raw);
        match self.synonyms.lookup(&cleaned) {
            Some(canonical) => canonical.to_string(),
            None => cleaned,
        }
    }

    /// Normalize a full header row, logging every synonym that fired.
    pub fn normalize_all(&self, headers: &[String]) -> Vec<String> {
        headers
            .iter()
            .map(|raw| {
                let normalized = self.normalize(raw);
                if clean_header(raw) != normalized {
                    tracing::debug!(raw = %raw, canonical = %normalized, "header mapped through synonym table");
                }
                normalized
            })
            .collect()
    }
}

/// Steps 1-4 of normalization: trim, collapse whitespace, drop punctuation, uppercase.
pub fn clean_header(raw: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(raw.trim(), " ");
    let stripped = NON_WORD.replace_all(&collapsed, "");
    stripped.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_header() {
        assert_eq!(clean_header("  nombre  "), "NOMBRE");
        assert_eq!(clean_header("Dir.\u{a0} Oficina"), "DIR OFICINA");
        assert_eq!(clean_header("Tel\t\tEntrega"), "TEL ENTREGA");
        assert_eq!(clean_header("(Cuenta #1)"), "CUENTA 1");
        assert_eq!(clean_header("seudo_bd"), "SEUDO_BD");
        assert_eq!(clean_header("Dirección"), "DIRECCIÓN");
    }

    #[test]
    fn test_default_synonyms() {
        let normalizer = ColumnNormalizer::default();
        assert_eq!(normalizer.normalize("cedula"), "NIT");
        assert_eq!(normalizer.normalize("Documento"), "NIT");
        assert_eq!(normalizer.normalize(" id "), "NIT");
        assert_eq!(normalizer.normalize("Teléfono"), "TEL RESIDENCIA");
        assert_eq!(normalizer.normalize("phone"), "TEL RESIDENCIA");
        assert_eq!(normalizer.normalize("Dirección"), "DIR RESIDENCIA");
        assert_eq!(normalizer.normalize("seudo_bd"), "REMESA");
    }

    #[test]
    fn test_unmatched_passes_through_cleaned() {
        let normalizer = ColumnNormalizer::default();
        assert_eq!(normalizer.normalize("last_name"), "LAST_NAME");
        assert_eq!(normalizer.normalize("Fecha de Entrega"), "FECHA DE ENTREGA");
    }

    #[test]
    fn test_injected_table_overrides_defaults() {
        let normalizer = ColumnNormalizer::new(SynonymTable::empty().with_entry("CLIENT_ID", "ID_CLIE"));
        assert_eq!(normalizer.normalize("client_id"), "ID_CLIE");
        // default entries are gone
        assert_eq!(normalizer.normalize("cedula"), "CEDULA");
    }

    #[test]
    fn test_normalize_all_keeps_order() {
        let normalizer = ColumnNormalizer::default();
        let headers = vec!["Nombres".to_string(), "CC".to_string(), "Barrio".to_string()];
        assert_eq!(normalizer.normalize_all(&headers), vec!["NOMBRE", "NIT", "BARRIO"]);
    }
}
