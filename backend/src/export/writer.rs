//! File writers for export artifacts.
//!
//! Rows arrive already mapped and ordered; `columns` gives the header.

use rust_xlsxwriter::{Color, Format, FormatBorder, FormatPattern, Workbook, XlsxError};
use serde_json::{Map, Value};

use super::ExcelConfig;
use crate::error::{ExportError, ExportResult};
use crate::models::value_text;

/// Name of the single data sheet.
pub const SHEET_NAME: &str = "Datos";

/// Widest auto-sized column, in characters.
const MAX_COLUMN_WIDTH: usize = 50;

const HEADER_BACKGROUND: u32 = 0x366092;

/// Delimited text with a header row.
pub fn write_delimited(rows: &[Map<String, Value>], columns: &[String], delimiter: char) -> ExportResult<Vec<u8>> {
    let delimiter = u8::try_from(delimiter)
        .map_err(|_| ExportError::Write(format!("delimiter '{}' is not a single byte", delimiter)))?;

    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(Vec::new());
    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| row.get(c).map(value_text).unwrap_or_default()))?;
    }

    writer.into_inner().map_err(|e| ExportError::Write(e.to_string()))
}

/// Pretty-printed JSON array, keys in column order.
pub fn write_json(rows: &[Map<String, Value>]) -> ExportResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(rows)?)
}

/// Single-sheet workbook with a styled header row.
pub fn write_xlsx(rows: &[Map<String, Value>], columns: &[String], config: &ExcelConfig) -> ExportResult<Vec<u8>> {
    build_workbook(rows, columns, config).map_err(|e| ExportError::Write(e.to_string()))
}

fn build_workbook(rows: &[Map<String, Value>], columns: &[String], config: &ExcelConfig) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_BACKGROUND))
        .set_pattern(FormatPattern::Solid)
        .set_border(FormatBorder::Thin);

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();

    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &header_format)?;
    }

    for (r, row) in rows.iter().enumerate() {
        let excel_row = (r + 1) as u32;
        for (col, name) in columns.iter().enumerate() {
            let value = row.get(name).unwrap_or(&Value::Null);
            let text = value_text(value);
            widths[col] = widths[col].max(text.chars().count());

            match value {
                Value::Number(n) => match n.as_f64() {
                    Some(f) => sheet.write_number(excel_row, col as u16, f)?,
                    None => sheet.write_string(excel_row, col as u16, &text)?,
                },
                Value::Null => continue,
                _ => sheet.write_string(excel_row, col as u16, &text)?,
            };
        }
    }

    if config.auto_width {
        for (col, width) in widths.iter().enumerate() {
            sheet.set_column_width(col as u16, ((*width + 2).min(MAX_COLUMN_WIDTH)) as f64)?;
        }
    }
    if config.freeze_header {
        sheet.set_freeze_panes(1, 0)?;
    }
    if config.filter_buttons && !columns.is_empty() {
        sheet.autofilter(0, 0, rows.len() as u32, (columns.len() - 1) as u16)?;
    }

    workbook.save_to_buffer()
}
