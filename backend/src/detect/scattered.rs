//! Daily remittance sheets.
//!
//! These workbooks describe a single delivery, with values spread over
//! labelled cells rather than laid out as a table. When the first row already
//! carries REMESA/NOMBRE/NIT headers the sheet is read as a normal table;
//! otherwise every cell is examined in document order and the first value that
//! fits each field is kept.

use chrono::NaiveDate;

use super::consolidated::{placeholder_row, ExtractorConfig};
use super::{table_from_header, HEADERLESS_SCHEMA};
use crate::models::{Cell, RawTable, Table};

/// File names containing this (case-insensitive) are read as daily remittances.
pub const DAILY_REMITTANCE_MARKER: &str = "remesa diaria";

/// Words that disqualify a cell from being taken as a person's name.
const NAME_EXCLUSIONS: &[&str] = &[
    "REMESA", "COD", "TOTAL", "CUENTA", "UNNAMED", "DIR", "TEL", "CEL", "BARRIO", "CIUDAD",
    "MERCADO", "FECHA",
];

/// Whether a file name designates a daily remittance workbook.
pub fn is_daily_remittance(file_name: &str) -> bool {
    file_name.to_lowercase().contains(DAILY_REMITTANCE_MARKER)
}

/// Reads daily remittance sheets into a one-record table.
#[derive(Debug, Clone, Default)]
pub struct ScatteredExtractor {
    config: ExtractorConfig,
}

/// Values collected while probing cells, one slot per field.
#[derive(Debug, Default)]
struct Slots {
    remesa: Option<String>,
    account: Option<String>,
    second_account: Option<String>,
    code: Option<String>,
    nit: Option<String>,
    name: Option<String>,
    address: Option<String>,
    neighborhood: Option<String>,
    city: Option<String>,
    mobile: Option<String>,
    phone: Option<String>,
    market: Option<String>,
}

impl ScatteredExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Read the sheet; never returns an empty table.
    pub fn extract(&self, raw: &RawTable, processing_date: NaiveDate) -> Table {
        if has_tabular_header(raw) {
            tracing::info!("daily remittance sheet carries headers, reading as table");
            return table_from_header(raw, 0);
        }

        let slots = self.collect_slots(raw);
        tracing::info!(?slots, "daily remittance values collected");

        let columns: Vec<String> = HEADERLESS_SCHEMA.iter().map(|s| s.to_string()).collect();
        let row = match (&slots.name, &slots.nit) {
            (Some(_), Some(_)) => slots_to_row(slots),
            _ => {
                tracing::warn!("daily remittance sheet lacks name or NIT, emitting placeholder record");
                placeholder_row(&self.config, processing_date)
            }
        };
        Table::new(columns, vec![row])
    }

    fn collect_slots(&self, raw: &RawTable) -> Slots {
        let mut slots = Slots::default();

        for row in raw.rows() {
            for (col, cell) in row.iter().enumerate() {
                if cell.is_blank() {
                    continue;
                }
                let next = row.get(col + 1).filter(|c| !c.is_blank());
                fill_slot(&mut slots, cell, next);
            }
        }

        slots
    }
}

/// First row holds at least one of the identifying headers.
fn has_tabular_header(raw: &RawTable) -> bool {
    raw.row(0).is_some_and(|row| {
        row.iter()
            .map(|c| c.to_text().trim().to_string())
            .any(|h| h == "REMESA" || h == "NOMBRE" || h == "NIT")
    })
}

/// Fill the first empty slot this cell fits, in priority order.
fn fill_slot(slots: &mut Slots, cell: &Cell, next: Option<&Cell>) {
    let text = cell.to_text().trim().to_string();
    let upper = text.to_uppercase();
    let next_text = next.map(|c| c.to_text().trim().to_string());
    let is_text = matches!(cell, Cell::Text(_));

    if upper.contains("REMESA") && slots.remesa.is_none() {
        slots.remesa = Some(next_text.unwrap_or(text));
    } else if text.starts_with("543280") && slots.account.is_none() {
        slots.account = Some(text);
    } else if text.contains("543280") && slots.account.is_some() && slots.second_account.is_none() {
        slots.second_account = Some(text);
    } else if slots.code.is_none() && (upper.contains("COD") || small_number(cell).is_some()) {
        slots.code = if upper.contains("COD") {
            next_text
        } else {
            small_number(cell).map(|n| n.to_string())
        };
    } else if slots.nit.is_none() && nit_number(cell).is_some() {
        slots.nit = nit_number(cell);
    } else if is_text && slots.name.is_none() && looks_like_name(&text) {
        slots.name = Some(text);
    } else if is_text
        && slots.address.is_none()
        && (upper.contains("CALLE") || upper.contains("CRA") || upper.contains("AV"))
    {
        slots.address = Some(text);
    } else if is_text && upper.contains("BARRIO") && slots.neighborhood.is_none() {
        slots.neighborhood = next_text;
    } else if is_text && upper.contains("CIUDAD") && slots.city.is_none() {
        slots.city = next_text;
    } else if text.starts_with('3') && text.len() >= 10 && slots.mobile.is_none() {
        slots.mobile = Some(text);
    } else if is_phone(&text) && slots.phone.is_none() {
        slots.phone = Some(text);
    } else if is_text && upper.contains("MERCADO") && slots.market.is_none() {
        slots.market = next_text;
    }
}

fn small_number(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Number(n) if *n > 0.0 && *n < 999.0 => Some(*n as i64),
        _ => None,
    }
}

fn nit_number(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Number(n) if *n > 100_000_000.0 && *n < 9_999_999_999.0 => Some(format!("{}", *n as i64)),
        _ => None,
    }
}

fn looks_like_name(text: &str) -> bool {
    let upper = text.to_uppercase();
    text.chars().count() > 5
        && text.chars().any(char::is_uppercase)
        && !NAME_EXCLUSIONS.iter().any(|w| upper.contains(w))
}

fn is_phone(text: &str) -> bool {
    let digits: String = text.chars().filter(|c| *c != '-' && *c != ' ').collect();
    digits.len() >= 7 && digits.chars().all(|c| c.is_ascii_digit())
}

fn slots_to_row(slots: Slots) -> Vec<Cell> {
    let value = |v: Option<String>| Cell::text(v.unwrap_or_default());
    vec![
        value(slots.remesa),
        value(slots.account),
        value(slots.second_account),
        Cell::Empty,
        value(slots.code),
        value(slots.nit),
        value(slots.name),
        value(slots.address),
        value(slots.neighborhood),
        value(slots.city),
        value(slots.phone),
        value(slots.mobile),
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        value(slots.market),
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 19).unwrap()
    }

    fn get(table: &Table, name: &str) -> String {
        let idx = table.column_index(name).unwrap();
        table.value(0, idx).to_text()
    }

    #[test]
    fn test_file_name_marker() {
        assert!(is_daily_remittance("Remesa diaria 19-02.xlsx"));
        assert!(is_daily_remittance("REMESA DIARIA.xls"));
        assert!(!is_daily_remittance("remesa_mensual.xlsx"));
    }

    #[test]
    fn test_scattered_values() {
        let raw = RawTable::new(vec![
            vec![Cell::text("REMESA No."), Cell::text("R-889"), Cell::Empty],
            vec![Cell::text("5432801111222233"), Cell::Number(15.0), Cell::Number(1_032_456_789.0)],
            vec![Cell::text("MARIA GOMEZ"), Cell::text("CALLE 80 # 20-10"), Cell::Empty],
            vec![Cell::text("BARRIO"), Cell::text("CHAPINERO"), Cell::text("3157778899")],
        ]);
        let table = ScatteredExtractor::default().extract(&raw, date());

        assert_eq!(table.len(), 1);
        assert_eq!(get(&table, "REMESA"), "R-889");
        assert_eq!(get(&table, "CUENTA 1"), "5432801111222233");
        assert_eq!(get(&table, "COD"), "15");
        assert_eq!(get(&table, "NIT"), "1032456789");
        assert_eq!(get(&table, "NOMBRE"), "MARIA GOMEZ");
        assert_eq!(get(&table, "DIR RESIDENCIA"), "CALLE 80 # 20-10");
        assert_eq!(get(&table, "BARRIO"), "CHAPINERO");
        assert_eq!(get(&table, "CELULAR"), "3157778899");
    }

    #[test]
    fn test_missing_nit_gives_placeholder() {
        let raw = RawTable::new(vec![vec![Cell::text("MARIA GOMEZ")]]);
        let table = ScatteredExtractor::default().extract(&raw, date());
        assert_eq!(table.len(), 1);
        assert_eq!(get(&table, "REMESA"), "BASE_PRUEBA");
        assert_eq!(get(&table, "FECHA DE ASIGNACION"), "20260219");
    }

    #[test]
    fn test_tabular_sheet_read_as_table() {
        let raw = RawTable::new(vec![
            vec![Cell::text("REMESA"), Cell::text("NOMBRE")],
            vec![Cell::text("R1"), Cell::text("ANA")],
            vec![Cell::text("R2"), Cell::text("LUIS")],
        ]);
        let table = ScatteredExtractor::default().extract(&raw, date());
        assert_eq!(table.columns, vec!["REMESA", "NOMBRE"]);
        assert_eq!(table.len(), 2);
    }
}
