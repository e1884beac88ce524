//! File decoding into a header-less [`RawTable`].
//!
//! Delimited text goes through encoding and delimiter auto-detection, then
//! the `csv` reader. Workbooks are opened with `calamine` and only the first
//! worksheet is read. No header interpretation happens here; that is the
//! job of [`crate::detect`].

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::Timelike;
use std::io::Cursor;
use std::path::Path;

use crate::error::{FormatError, FormatResult};
use crate::models::{Cell, RawTable};

/// Broad family of an accepted input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// csv / txt
    Delimited,
    /// xlsx / xls
    Workbook,
}

impl FileKind {
    /// Classify a declared extension (with or without leading dot).
    pub fn from_extension(extension: &str) -> FormatResult<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "csv" | "txt" => Ok(FileKind::Delimited),
            "xlsx" | "xls" => Ok(FileKind::Workbook),
            other => Err(FormatError::UnsupportedExtension(other.to_string())),
        }
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Every row of the file (or first sheet), untouched
    pub table: RawTable,
    pub kind: FileKind,
    /// Detected encoding (delimited files only)
    pub encoding: Option<String>,
    /// Detected delimiter (delimited files only)
    pub delimiter: Option<char>,
    /// Sheet that was read (workbooks only)
    pub sheet: Option<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> FormatResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    if decoded.contains('\u{0}') {
        return Err(FormatError::Encoding(format!(
            "content is not text in encoding '{}'",
            encoding
        )));
    }
    Ok(decoded)
}

/// Detect the delimiter by counting occurrences in the first non-blank line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse delimited text with an explicit delimiter into raw rows.
pub fn parse_delimited_str(content: &str, delimiter: char) -> FormatResult<RawTable> {
    let delimiter = u8::try_from(delimiter)
        .map_err(|_| FormatError::Unreadable(format!("unsupported delimiter '{}'", delimiter)))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| FormatError::Unreadable(format!("line {}: {}", idx + 1, e)))?;
        let row: Vec<Cell> = record.iter().map(|v| Cell::text(v.trim())).collect();
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(FormatError::EmptyFile);
    }
    Ok(RawTable::new(rows))
}

/// Parse delimited bytes with auto-detection of encoding and delimiter.
pub fn parse_delimited(bytes: &[u8]) -> FormatResult<ParseResult> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(FormatError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);

    tracing::debug!(encoding = %encoding, delimiter = %delimiter.escape_default(), "decoded delimited file");

    let table = parse_delimited_str(&content, delimiter)?;
    Ok(ParseResult {
        table,
        kind: FileKind::Delimited,
        encoding: Some(encoding),
        delimiter: Some(delimiter),
        sheet: None,
    })
}

/// Parse the first worksheet of an xlsx/xls workbook.
pub fn parse_workbook(bytes: &[u8]) -> FormatResult<ParseResult> {
    if bytes.is_empty() {
        return Err(FormatError::EmptyFile);
    }

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| FormatError::Unreadable(format!("cannot open workbook: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| FormatError::Unreadable("workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| FormatError::Unreadable(format!("cannot read sheet '{}': {}", sheet_name, e)))?;

    // Entirely blank rows are dropped, so detection windows count non-blank rows.
    let rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect::<Vec<_>>())
        .filter(|row: &Vec<Cell>| !row.iter().all(Cell::is_blank))
        .collect();

    if rows.is_empty() {
        return Err(FormatError::EmptyFile);
    }

    tracing::debug!(sheet = %sheet_name, rows = rows.len(), "read worksheet");

    Ok(ParseResult {
        table: RawTable::new(rows),
        kind: FileKind::Workbook,
        encoding: None,
        delimiter: None,
        sheet: Some(sheet_name),
    })
}

/// Dispatch on the declared extension.
pub fn parse_bytes(bytes: &[u8], extension: &str) -> FormatResult<ParseResult> {
    match FileKind::from_extension(extension)? {
        FileKind::Delimited => parse_delimited(bytes),
        FileKind::Workbook => parse_workbook(bytes),
    }
}

/// Read and parse a file from disk, using its extension.
pub fn parse_file<P: AsRef<Path>>(path: P) -> FormatResult<ParseResult> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string();
    FileKind::from_extension(&extension)?;

    let bytes = std::fs::read(path)
        .map_err(|e| FormatError::Unreadable(format!("cannot read '{}': {}", path.display(), e)))?;
    parse_bytes(&bytes, &extension)
}

/// Convert a calamine cell into our scalar model.
fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.num_seconds_from_midnight() == 0 => {
                Cell::Text(ts.format("%Y-%m-%d").to_string())
            }
            Some(ts) => Cell::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn workbook_bytes(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if let Ok(n) = value.parse::<f64>() {
                    sheet.write_number(r as u32, c as u16, n).unwrap();
                } else if !value.is_empty() {
                    sheet.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_extension_dispatch() {
        assert_eq!(FileKind::from_extension("CSV").unwrap(), FileKind::Delimited);
        assert_eq!(FileKind::from_extension(".txt").unwrap(), FileKind::Delimited);
        assert_eq!(FileKind::from_extension("xls").unwrap(), FileKind::Workbook);
        let err = FileKind::from_extension("pdf").unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedExtension(ref e) if e == "pdf"));
    }

    #[test]
    fn test_simple_csv() {
        let csv = "name;age\nAlice;30\nBob;25";
        let result = parse_delimited(csv.as_bytes()).unwrap();

        assert_eq!(result.delimiter, Some(';'));
        assert_eq!(result.table.len(), 3);
        assert_eq!(result.table.cell(1, 0), &Cell::text("Alice"));
        assert_eq!(result.table.cell(2, 1), &Cell::text("25"));
    }

    #[test]
    fn test_quoted_values() {
        let csv = "name,value\n\"Perez, Ana\",\"Hello World\"";
        let result = parse_delimited(csv.as_bytes()).unwrap();

        assert_eq!(result.table.cell(1, 0), &Cell::text("Perez, Ana"));
        assert_eq!(result.table.cell(1, 1), &Cell::text("Hello World"));
    }

    #[test]
    fn test_leading_zeros_preserved() {
        let csv = "client_id,name\n001,John";
        let result = parse_delimited(csv.as_bytes()).unwrap();
        assert_eq!(result.table.cell(1, 0).to_text(), "001");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let csv = "a;b\n1;2\n\n;\n3;4\n";
        let result = parse_delimited(csv.as_bytes()).unwrap();
        assert_eq!(result.table.len(), 3);
    }

    #[test]
    fn test_missing_values() {
        let csv = "a;b;c\n1;;3";
        let result = parse_delimited(csv.as_bytes()).unwrap();
        assert_eq!(result.table.cell(1, 1), &Cell::Empty);
        assert_eq!(result.table.cell(1, 2), &Cell::text("3"));
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_delimited(b""), Err(FormatError::EmptyFile)));
        assert!(matches!(parse_delimited(b"\n\n  "), Err(FormatError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("\n\na|b\n"), '|');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Dirección" in ISO-8859-1
        let bytes: &[u8] = &[0x44, 0x69, 0x72, 0x65, 0x63, 0x63, 0x69, 0xF3, 0x6E];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Dirección");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let bytes = b"\xEF\xBB\xBFREMESA,NOMBRE\n1,ANA";
        let result = parse_delimited(bytes).unwrap();
        assert_eq!(result.table.cell(0, 0), &Cell::text("REMESA"));
    }

    #[test]
    fn test_workbook_first_sheet() {
        let bytes = workbook_bytes(&[&["NOMBRE", "NIT"], &["ANA", "900123"]]);
        let result = parse_workbook(&bytes).unwrap();

        assert_eq!(result.kind, FileKind::Workbook);
        assert_eq!(result.table.len(), 2);
        assert_eq!(result.table.cell(0, 0), &Cell::text("NOMBRE"));
        assert_eq!(result.table.cell(1, 1), &Cell::Number(900123.0));
        assert_eq!(result.table.cell(1, 1).to_text(), "900123");
    }

    #[test]
    fn test_workbook_blank_rows_dropped() {
        let bytes = workbook_bytes(&[&["", ""], &["NOMBRE", "NIT"], &["", ""], &["", ""], &["ANA", "900123"]]);
        let result = parse_workbook(&bytes).unwrap();

        assert_eq!(result.table.len(), 2);
        assert_eq!(result.table.cell(0, 0), &Cell::text("NOMBRE"));
        assert_eq!(result.table.cell(1, 0), &Cell::text("ANA"));
    }

    #[test]
    fn test_corrupt_workbook_is_format_error() {
        let err = parse_bytes(b"definitely not a zip", "xlsx").unwrap_err();
        assert!(matches!(err, FormatError::Unreadable(_)));
    }
}
