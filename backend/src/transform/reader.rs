//! From file bytes to a normalized table
//!
//! Delimited files take their first row as header. Workbooks are classified
//! first: daily remittance sheets (by file name) and consolidated reports
//! are extracted into records, regular sheets use their detected header row,
//! and header-less sheets get positional column names. Column names are then
//! normalized in every case.

use chrono::NaiveDate;
use serde::Serialize;

use crate::detect::scattered::is_daily_remittance;
use crate::detect::{
    headerless_table, table_from_header, ConsolidatedExtractor, HeaderDetector, ScatteredExtractor, SheetLayout,
};
use crate::error::FormatResult;
use crate::models::{FileInput, Table};
use crate::normalize::ColumnNormalizer;
use crate::parser::{parse_bytes, FileKind};

/// How the table was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ReadLayout {
    /// csv/txt with a header on the first row
    Delimited,
    /// Workbook read through layout detection
    Sheet { layout: SheetLayout },
    /// Workbook read as a daily remittance
    DailyRemittance,
}

/// A normalized table plus what was learned while reading it.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub table: Table,
    pub layout: ReadLayout,
    pub encoding: Option<String>,
    pub delimiter: Option<char>,
    pub sheet: Option<String>,
    /// A consolidated report yielded no data and a fixed record was emitted instead.
    pub placeholder: bool,
}

/// Reads uploaded files into normalized tables.
#[derive(Debug, Clone, Default)]
pub struct TableReader {
    detector: HeaderDetector,
    normalizer: ColumnNormalizer,
    consolidated: ConsolidatedExtractor,
    scattered: ScatteredExtractor,
}

impl TableReader {
    pub fn new(detector: HeaderDetector, normalizer: ColumnNormalizer) -> Self {
        Self { detector, normalizer, ..Self::default() }
    }

    pub fn with_consolidated(mut self, extractor: ConsolidatedExtractor) -> Self {
        self.consolidated = extractor;
        self
    }

    pub fn with_scattered(mut self, extractor: ScatteredExtractor) -> Self {
        self.scattered = extractor;
        self
    }

    pub fn normalizer(&self) -> &ColumnNormalizer {
        &self.normalizer
    }

    /// Parse, classify and normalize. `processing_date` stamps synthesized records.
    pub fn read(&self, input: &FileInput, processing_date: NaiveDate) -> FormatResult<ReadOutcome> {
        let parsed = parse_bytes(&input.bytes, &input.extension)?;
        let raw = &parsed.table;
        let mut placeholder = false;

        let (table, layout) = match parsed.kind {
            FileKind::Delimited => (table_from_header(raw, 0), ReadLayout::Delimited),
            FileKind::Workbook if is_daily_remittance(&input.name) => {
                (self.scattered.extract(raw, processing_date), ReadLayout::DailyRemittance)
            }
            FileKind::Workbook => {
                let layout = self.detector.classify(raw);
                let table = match layout {
                    SheetLayout::ConsolidatedReport => {
                        let extraction = self.consolidated.extract(raw, processing_date);
                        placeholder = extraction.placeholder;
                        extraction.table
                    }
                    SheetLayout::Header { row, .. } => table_from_header(raw, row),
                    SheetLayout::Headerless => headerless_table(raw),
                };
                (table, ReadLayout::Sheet { layout })
            }
        };

        let columns = self.normalizer.normalize_all(&table.columns);
        tracing::info!(
            file = %input.name,
            rows = table.len(),
            columns = ?columns,
            ?layout,
            "table read"
        );

        Ok(ReadOutcome {
            table: table.with_columns(columns),
            layout,
            encoding: parsed.encoding,
            delimiter: parsed.delimiter,
            sheet: parsed.sheet,
            placeholder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use rust_xlsxwriter::Workbook;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 19).unwrap()
    }

    fn workbook(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_csv_header_is_normalized() {
        let input = FileInput::new("clientes.csv", b"Nombres;Cedula;Ciudad\nAna;123;5001\n".to_vec());
        let outcome = TableReader::default().read(&input, date()).unwrap();
        assert_eq!(outcome.layout, ReadLayout::Delimited);
        assert_eq!(outcome.table.columns, vec!["NOMBRE", "NIT", "CIUDAD RESIDENCIA"]);
        assert_eq!(outcome.table.len(), 1);
        assert_eq!(outcome.delimiter, Some(';'));
    }

    #[test]
    fn test_workbook_header_detected_below_title() {
        let bytes = workbook(&[
            &["REPORTE DE ASIGNACION", "", ""],
            &["", "", ""],
            &["REMESA", "NOMBRE", "NIT"],
            &["R-1", "ANA", "900"],
        ]);
        let input = FileInput::new("asignacion.xlsx", bytes);
        let outcome = TableReader::default().read(&input, date()).unwrap();
        assert!(matches!(outcome.layout, ReadLayout::Sheet { layout: SheetLayout::Header { .. } }));
        assert_eq!(outcome.table.columns, vec!["REMESA", "NOMBRE", "NIT"]);
        assert_eq!(outcome.table.len(), 1);
    }

    #[test]
    fn test_spacer_rows_do_not_push_header_out_of_window() {
        let mut rows: Vec<&[&str]> = vec![&["REPORTE", "", ""]];
        rows.extend(std::iter::repeat(&["", "", ""][..]).take(12));
        rows.push(&["REMESA", "NOMBRE", "NIT"]);
        rows.push(&["R-1", "ANA", "900"]);

        let input = FileInput::new("asignacion.xlsx", workbook(&rows));
        let outcome = TableReader::default().read(&input, date()).unwrap();

        assert!(matches!(
            outcome.layout,
            ReadLayout::Sheet { layout: SheetLayout::Header { row: 1, .. } }
        ));
        assert_eq!(outcome.table.columns, vec!["REMESA", "NOMBRE", "NIT"]);
        assert_eq!(outcome.table.len(), 1);
    }

    #[test]
    fn test_padded_workbook_values_map_trimmed() {
        use crate::transform::executor::RecordMapper;
        use crate::transform::mapping::{ColumnMapping, FieldRule};
        use chrono::{TimeZone, Utc};
        use serde_json::json;

        let bytes = workbook(&[&["REMESA", "NOMBRE", "NIT"], &["R-1", "  John  ", " 12345678 "]]);
        let input = FileInput::new("asignacion.xlsx", bytes);
        let outcome = TableReader::default().read(&input, date()).unwrap();

        let mapping = ColumnMapping::new()
            .with_field("nombre", FieldRule::direct("NOMBRE"))
            .with_field("cc", FieldRule::direct("NIT"));
        let now = Utc.timestamp_opt(1_700_000_123, 0).unwrap();
        let mapped = RecordMapper::default().map_table(&outcome.table, &mapping, now);

        assert_eq!(mapped.records[0].get("nombre"), Some(&json!("John")));
        assert_eq!(mapped.records[0].get("cc"), Some(&json!("12345678")));
    }

    #[test]
    fn test_consolidated_report() {
        let bytes = workbook(&[
            &["RESUMEN", ""],
            &["REMESA", "TOTAL"],
            &["101", "4"],
            &["202", "1"],
            &["TOTAL", "5"],
        ]);
        let input = FileInput::new("consolidado.xlsx", bytes);
        let outcome = TableReader::default().read(&input, date()).unwrap();
        assert_eq!(outcome.layout, ReadLayout::Sheet { layout: SheetLayout::ConsolidatedReport });
        assert!(!outcome.placeholder);
        assert_eq!(outcome.table.len(), 2);
        assert!(outcome.table.column_index("TOTAL").is_some());
    }

    #[test]
    fn test_daily_remittance_by_name() {
        let bytes = workbook(&[&["REMESA", "NOMBRE", "NIT"], &["R-1", "ANA", "900"]]);
        let input = FileInput::new("Remesa Diaria 19.xlsx", bytes);
        let outcome = TableReader::default().read(&input, date()).unwrap();
        assert_eq!(outcome.layout, ReadLayout::DailyRemittance);
        assert_eq!(outcome.table.len(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let input = FileInput::new("notes.pdf", vec![1, 2, 3]);
        assert!(matches!(
            TableReader::default().read(&input, date()),
            Err(FormatError::UnsupportedExtension(_))
        ));
    }
}
