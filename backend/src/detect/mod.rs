//! Sheet layout detection.
//!
//! A spreadsheet handed over by a client may have its header anywhere in
//! the first rows, no header at all, or be a two-column consolidated
//! report instead of a table. [`HeaderDetector::classify`] decides which,
//! and the helpers here turn the raw grid into a named [`Table`].
//!
//! - [`consolidated`] extracts records out of two-column summary sheets
//! - [`scattered`] extracts one record out of "daily remittance" sheets
//!   whose values are scattered over labelled cells

pub mod consolidated;
pub mod scattered;

use serde::Serialize;

use crate::models::{Cell, RawTable, Table};

pub use consolidated::{ConsolidatedExtractor, Extraction, ExtractorConfig, SideAttribute, SideChannel};
pub use scattered::ScatteredExtractor;

/// Header keywords looked for while scanning for the header row.
pub const DEFAULT_HEADER_KEYWORDS: &[&str] =
    &["REMESA", "NOMBRE", "NIT", "CC", "CUENTA", "DIRECC", "TEL", "CEL"];

/// Keywords that mark a two-column consolidated report.
pub const DEFAULT_REPORT_KEYWORDS: &[&str] = &["REMESA", "TOTAL", "BASE", "RESUMEN", "CONSOLIDADO"];

/// Positional column names for wide header-less remittance sheets.
pub const HEADERLESS_SCHEMA: &[&str] = &[
    "REMESA",
    "CUENTA 1",
    "CUENTA 2",
    "SEC",
    "COD",
    "NIT",
    "NOMBRE",
    "DIR RESIDENCIA",
    "BARRIO",
    "CIUDAD RESIDENCIA",
    "TEL RESIDENCIA",
    "CELULAR",
    "DIR OFICINA",
    "CIUDAD OFICINA",
    "TEL OFICINA",
    "MERCADO",
    "FECHA DE ASIGNACION",
    "FECHA DE ENTREGA",
    "TEL ENTREGA",
    "DIREC ENTREGA",
    "HRA ENTREGA",
];

/// Minimum sheet width for [`HEADERLESS_SCHEMA`] to apply.
pub const HEADERLESS_SCHEMA_MIN_WIDTH: usize = 20;

/// How a header row was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStrategy {
    /// Enough domain keywords in the row.
    Keywords,
    /// Enough non-numeric label-looking cells in the row.
    Labels,
}

/// What kind of sheet we are looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum SheetLayout {
    /// Two-column summary, handled by [`ConsolidatedExtractor`].
    ConsolidatedReport,
    /// Regular table whose header sits at `row`.
    Header { row: usize, strategy: HeaderStrategy },
    /// No header found; columns get positional names.
    Headerless,
}

/// Tunables for header detection.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub header_keywords: Vec<String>,
    pub report_keywords: Vec<String>,
    /// Rows scanned for header keywords.
    pub keyword_scan_rows: usize,
    /// Rows scanned by the label fallback.
    pub label_scan_rows: usize,
    pub min_keyword_matches: usize,
    pub min_label_cells: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            header_keywords: DEFAULT_HEADER_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            report_keywords: DEFAULT_REPORT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            keyword_scan_rows: 10,
            label_scan_rows: 5,
            min_keyword_matches: 2,
            min_label_cells: 3,
        }
    }
}

/// Locates header rows and classifies sheet layouts.
#[derive(Debug, Clone, Default)]
pub struct HeaderDetector {
    config: DetectorConfig,
}

impl HeaderDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Decide how the raw grid should be read.
    pub fn classify(&self, raw: &RawTable) -> SheetLayout {
        if self.is_consolidated(raw) {
            tracing::info!(rows = raw.len(), "sheet classified as consolidated report");
            return SheetLayout::ConsolidatedReport;
        }

        match self.find_header_row(raw) {
            Some((row, strategy)) => {
                tracing::info!(row, ?strategy, "header row detected");
                SheetLayout::Header { row, strategy }
            }
            None => {
                tracing::warn!(width = raw.width(), "no header row found, using positional column names");
                SheetLayout::Headerless
            }
        }
    }

    /// Exactly two columns, a report keyword somewhere, and a numeric second column.
    pub fn is_consolidated(&self, raw: &RawTable) -> bool {
        if raw.width() != 2 {
            return false;
        }

        let has_keyword = raw.rows().iter().flatten().any(|cell| {
            let text = cell.upper();
            self.config.report_keywords.iter().any(|k| text.contains(k.as_str()))
        });
        if !has_keyword {
            return false;
        }

        raw.rows()
            .iter()
            .any(|row| row.get(1).is_some_and(|c| !c.is_blank() && c.is_numeric_like()))
    }

    /// Keyword scan first, then the label fallback.
    pub fn find_header_row(&self, raw: &RawTable) -> Option<(usize, HeaderStrategy)> {
        let keyword_row = raw
            .rows()
            .iter()
            .take(self.config.keyword_scan_rows)
            .position(|row| self.keyword_matches(row) >= self.config.min_keyword_matches);
        if let Some(row) = keyword_row {
            return Some((row, HeaderStrategy::Keywords));
        }

        raw.rows()
            .iter()
            .take(self.config.label_scan_rows)
            .position(|row| label_cells(row) >= self.config.min_label_cells)
            .map(|row| (row, HeaderStrategy::Labels))
    }

    /// Number of cells containing at least one header keyword.
    pub fn keyword_matches(&self, row: &[Cell]) -> usize {
        row.iter()
            .filter(|cell| {
                let text = cell.upper();
                !text.is_empty()
                    && self.config.header_keywords.iter().any(|k| text.contains(k.as_str()))
            })
            .count()
    }
}

/// Cells that are non-empty and not numeric.
fn label_cells(row: &[Cell]) -> usize {
    row.iter()
        .filter(|c| !c.is_blank() && !c.is_numeric_like() && c.upper() != "NAN")
        .count()
}

/// Positional names: the remittance schema for wide sheets, `COLUMN_<n>` otherwise.
pub fn headerless_columns(width: usize) -> Vec<String> {
    (0..width)
        .map(|i| {
            if width >= HEADERLESS_SCHEMA_MIN_WIDTH && i < HEADERLESS_SCHEMA.len() {
                HEADERLESS_SCHEMA[i].to_string()
            } else {
                format!("COLUMN_{}", i + 1)
            }
        })
        .collect()
}

/// Use row `header_row` as labels and every later row as data.
pub fn table_from_header(raw: &RawTable, header_row: usize) -> Table {
    let width = raw.width();
    let header = raw.row(header_row).unwrap_or(&[]);

    let columns = (0..width)
        .map(|i| match header.get(i) {
            Some(cell) if !cell.is_blank() => cell.to_text().trim().to_string(),
            _ => format!("COLUMN_{}", i + 1),
        })
        .collect();

    let rows = raw
        .rows()
        .iter()
        .skip(header_row + 1)
        .map(|row| pad_row(row, width))
        .collect();

    Table::new(columns, rows)
}

/// Every row is data; columns get positional names.
pub fn headerless_table(raw: &RawTable) -> Table {
    let width = raw.width();
    let rows = raw.rows().iter().map(|row| pad_row(row, width)).collect();
    Table::new(headerless_columns(width), rows)
}

fn pad_row(row: &[Cell], width: usize) -> Vec<Cell> {
    let mut out = row.to_vec();
    out.resize(width, Cell::Empty);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            rows.iter()
                .map(|r| r.iter().map(|v| Cell::text(*v)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_keyword_header_at_row_three() {
        let raw = grid(&[
            &["INFORME MENSUAL", "", ""],
            &["Generado", "2026-02-19", ""],
            &["", "", ""],
            &["NOMBRE", "NIT", "CUENTA"],
            &["ANA", "900", "5432"],
        ]);
        let detector = HeaderDetector::default();
        assert_eq!(detector.find_header_row(&raw), Some((3, HeaderStrategy::Keywords)));
        assert_eq!(
            detector.classify(&raw),
            SheetLayout::Header { row: 3, strategy: HeaderStrategy::Keywords }
        );
    }

    #[test]
    fn test_single_keyword_is_not_enough() {
        let raw = grid(&[&["NOMBRE", "x"], &["a", "b"]]);
        let detector = HeaderDetector::default();
        assert_eq!(detector.keyword_matches(raw.row(0).unwrap()), 1);
        assert_eq!(detector.find_header_row(&raw), None);
    }

    #[test]
    fn test_label_fallback() {
        let raw = grid(&[
            &["1", "2", "3", "4"],
            &["Producto", "Valor", "Zona", "123"],
            &["A", "10", "Norte", "1"],
        ]);
        let detector = HeaderDetector::default();
        assert_eq!(detector.find_header_row(&raw), Some((1, HeaderStrategy::Labels)));
    }

    #[test]
    fn test_headerless_when_all_numeric() {
        let raw = grid(&[&["1", "2", "3"], &["4", "5", "6"]]);
        assert_eq!(HeaderDetector::default().classify(&raw), SheetLayout::Headerless);
    }

    #[test]
    fn test_consolidated_classification() {
        let raw = grid(&[
            &["REMESA", "TOTAL"],
            &["101", "4"],
            &["TOTAL", "4"],
        ]);
        let detector = HeaderDetector::default();
        assert!(detector.is_consolidated(&raw));
        assert_eq!(detector.classify(&raw), SheetLayout::ConsolidatedReport);
    }

    #[test]
    fn test_two_columns_without_numbers_is_not_consolidated() {
        let raw = grid(&[&["RESUMEN", "NOTAS"], &["uno", "dos"]]);
        assert!(!HeaderDetector::default().is_consolidated(&raw));
    }

    #[test]
    fn test_three_columns_is_not_consolidated() {
        let raw = grid(&[&["TOTAL", "1", "x"]]);
        assert!(!HeaderDetector::default().is_consolidated(&raw));
    }

    #[test]
    fn test_headerless_columns() {
        assert_eq!(headerless_columns(3), vec!["COLUMN_1", "COLUMN_2", "COLUMN_3"]);

        let wide = headerless_columns(23);
        assert_eq!(wide[0], "REMESA");
        assert_eq!(wide[6], "NOMBRE");
        assert_eq!(wide[20], "HRA ENTREGA");
        assert_eq!(wide[21], "COLUMN_22");
    }

    #[test]
    fn test_table_from_header_pads_and_names_blanks() {
        let raw = grid(&[
            &["titulo"],
            &["NOMBRE", "", "NIT"],
            &["ANA", "x"],
        ]);
        let table = table_from_header(&raw, 1);
        assert_eq!(table.columns, vec!["NOMBRE", "COLUMN_2", "NIT"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.value(0, 2), &Cell::Empty);
    }
}
