//! Column lookup for mapping rules
//!
//! A mapping rule names a source column the way the client's file is
//! expected to spell it. Files drift, so the lookup is tolerant:
//!
//! 1. exact match on the trimmed uppercase name
//! 2. first column whose name contains the target
//! 3. keyword table: when the target is a known concept, the first column
//!    containing any of its keywords
//!
//! A target nothing matches resolves to an empty value and is reported as a
//! miss.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::Cell;

/// Built-in concept keywords.
pub const DEFAULT_KEYWORDS: &[(&str, &[&str])] = &[
    ("REMESA", &["REMESA", "REMESSA", "SEUDO", "PSEUDO"]),
    ("NOMBRE", &["NOMBRE", "NOMBRES", "CLIENTE", "TITULAR"]),
    ("NIT", &["NIT", "CC", "CEDULA", "DOCUMENTO", "ID"]),
    ("CUENTA 1", &["CUENTA", "ACCOUNT"]),
    ("DIRECCION", &["DIRECCION", "ADDRESS", "DIR"]),
    ("BARRIO", &["BARRIO", "NEIGHBORHOOD"]),
    ("CIUDAD", &["CIUDAD", "CITY"]),
    ("TELEFONO", &["TELEFONO", "TEL", "PHONE"]),
    ("CELULAR", &["CELULAR", "CEL", "MOVIL", "MOBILE"]),
    ("MERCADO", &["MERCADO", "MARKET"]),
    ("COD", &["COD", "CODE", "CÓDIGO"]),
];

/// Which lookup step located a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Substring,
    Keyword,
}

/// A located column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMatch {
    pub index: usize,
    pub kind: MatchKind,
}

/// Concept name to the keywords that identify it in a header.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordTable {
    concepts: HashMap<String, Vec<String>>,
}

impl KeywordTable {
    pub fn empty() -> Self {
        Self { concepts: HashMap::new() }
    }

    /// Add or replace the keywords of one concept.
    pub fn with_concept<I, S>(mut self, concept: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords = keywords.into_iter().map(|k| k.into().to_uppercase()).collect();
        self.concepts.insert(concept.into().to_uppercase(), keywords);
        self
    }

    pub fn keywords(&self, concept: &str) -> Option<&[String]> {
        self.concepts.get(concept).map(|k| k.as_slice())
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        DEFAULT_KEYWORDS
            .iter()
            .fold(Self::empty(), |table, (concept, keywords)| {
                table.with_concept(*concept, keywords.iter().copied())
            })
    }
}

/// Resolves mapping targets against a table's columns.
#[derive(Debug, Clone, Default)]
pub struct ColumnResolver {
    keywords: KeywordTable,
}

impl ColumnResolver {
    pub fn new(keywords: KeywordTable) -> Self {
        Self { keywords }
    }

    /// Locate `target` among `columns`.
    pub fn find_column(&self, target: &str, columns: &[String]) -> Option<ColumnMatch> {
        let target = target.trim().to_uppercase();
        if target.is_empty() {
            return None;
        }
        let columns: Vec<String> = columns.iter().map(|c| c.trim().to_uppercase()).collect();

        if let Some(index) = columns.iter().position(|c| *c == target) {
            return Some(ColumnMatch { index, kind: MatchKind::Exact });
        }

        if let Some(index) = columns.iter().position(|c| c.contains(target.as_str())) {
            return Some(ColumnMatch { index, kind: MatchKind::Substring });
        }

        let keywords = self.keywords.keywords(&target)?;
        columns
            .iter()
            .position(|c| keywords.iter().any(|k| c.contains(k.as_str())))
            .map(|index| ColumnMatch { index, kind: MatchKind::Keyword })
    }

    /// Trimmed value of `target` in `row`, or `None` when no column matches.
    pub fn resolve(&self, target: &str, columns: &[String], row: &[Cell]) -> Option<String> {
        let found = self.find_column(target, columns)?;
        Some(row.get(found.index).map(cell_text).unwrap_or_default())
    }
}

/// Cell text without surrounding whitespace.
pub fn cell_text(cell: &Cell) -> String {
    cell.to_text().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_beats_substring() {
        let resolver = ColumnResolver::default();
        let columns = cols(&["NIT CLIENTE", "NIT"]);
        assert_eq!(
            resolver.find_column("nit", &columns),
            Some(ColumnMatch { index: 1, kind: MatchKind::Exact })
        );
    }

    #[test]
    fn test_substring_match() {
        let resolver = ColumnResolver::default();
        let columns = cols(&["REMESA", "NOMBRE DEL TITULAR"]);
        assert_eq!(
            resolver.find_column("NOMBRE", &columns),
            Some(ColumnMatch { index: 1, kind: MatchKind::Substring })
        );
    }

    #[test]
    fn test_keyword_fallback() {
        let resolver = ColumnResolver::default();
        let columns = cols(&["PSEUDO_BD", "CITY"]);
        assert_eq!(
            resolver.find_column("REMESA", &columns),
            Some(ColumnMatch { index: 0, kind: MatchKind::Keyword })
        );
        assert_eq!(resolver.find_column("CIUDAD", &columns).map(|m| m.index), Some(1));
    }

    #[test]
    fn test_miss() {
        let resolver = ColumnResolver::default();
        let columns = cols(&["A", "B"]);
        assert_eq!(resolver.find_column("MERCADO", &columns), None);
        assert_eq!(resolver.find_column("UNKNOWN CONCEPT", &columns), None);
        assert_eq!(resolver.resolve("MERCADO", &columns, &[Cell::text("x")]), None);
    }

    #[test]
    fn test_resolve_value() {
        let resolver = ColumnResolver::default();
        let columns = cols(&["NOMBRE", "COD"]);
        let row = vec![Cell::text("ANA"), Cell::Number(15.0)];
        assert_eq!(resolver.resolve("COD", &columns, &row), Some("15".to_string()));

        let padded = vec![Cell::text("  ANA GOMEZ \t"), Cell::Empty];
        assert_eq!(resolver.resolve("NOMBRE", &columns, &padded), Some("ANA GOMEZ".to_string()));
    }

    #[test]
    fn test_injected_keywords() {
        let resolver = ColumnResolver::new(KeywordTable::empty().with_concept("PRODUCTO", ["PROD"]));
        let columns = cols(&["COD_PROD"]);
        assert_eq!(resolver.find_column("PRODUCTO", &columns).map(|m| m.kind), Some(MatchKind::Keyword));
        assert_eq!(resolver.find_column("CIUDAD", &cols(&["CITY"])), None);
    }
}
