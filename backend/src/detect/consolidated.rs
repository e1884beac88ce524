//! Extraction of records from two-column consolidated reports.
//!
//! A consolidated report is a summary sheet of label/quantity pairs, e.g.
//!
//! ```text
//! REMESA        | TOTAL
//! 101           | 4
//! NOMBRE        |
//! ANA PEREZ     |
//! 205           | 1
//! TOTAL         | 5
//! ```
//!
//! Rows below the `REMESA | TOTAL` marker are read in one ordered pass.
//! Attribute labels (address, name, neighbourhood, phones) capture the first
//! cell of the following row into a [`SideChannel`]; rows with a code-like
//! first cell and a quantity become data units. Each unit is then expanded
//! into a full record, falling back to per-code placeholders for attributes
//! the sheet never provided.
//!
//! Values read from the sheet and synthesized placeholders are not told
//! apart on the output records.

use chrono::NaiveDate;
use serde::Serialize;

use super::HEADERLESS_SCHEMA;
use crate::models::{Cell, RawTable, Table};

/// Column carrying the unit quantity on synthesized records.
pub const TOTAL_COLUMN: &str = "TOTAL";

/// Tunables for consolidated report extraction.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Label marking the data block together with [`Self::total_label`].
    pub group_label: String,
    pub total_label: String,
    /// First-cell values that never form a data unit.
    pub skip_labels: Vec<String>,
    pub default_city: String,
    pub market: String,
    pub delivery_window: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            group_label: "REMESA".to_string(),
            total_label: "TOTAL".to_string(),
            skip_labels: vec!["TOTAL".into(), "SUMA".into(), "BASE".into(), "NAN".into()],
            default_city: "11001".to_string(),
            market: "INTERNO".to_string(),
            delivery_window: "08:00 - 18:00".to_string(),
        }
    }
}

/// Attributes that can be carried through label/value row pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideAttribute {
    Address,
    Name,
    Neighborhood,
    Phone,
    Mobile,
}

impl SideAttribute {
    /// Attribute announced by a label cell, if any.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_uppercase();
        if label.contains("DIR RESIDENCIA") || label.contains("DIRECCION") || label.contains("DIRECCIÓN") {
            Some(SideAttribute::Address)
        } else if label.contains("NOMBRE") {
            Some(SideAttribute::Name)
        } else if label.contains("BARRIO") {
            Some(SideAttribute::Neighborhood)
        } else if label.contains("CELULAR") {
            Some(SideAttribute::Mobile)
        } else if label.contains("TEL") {
            Some(SideAttribute::Phone)
        } else {
            None
        }
    }
}

/// Side-channel values found in the sheet. The first value for a slot wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SideChannel {
    pub address: Option<String>,
    pub name: Option<String>,
    pub neighborhood: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
}

impl SideChannel {
    fn slot(&mut self, attribute: SideAttribute) -> &mut Option<String> {
        match attribute {
            SideAttribute::Address => &mut self.address,
            SideAttribute::Name => &mut self.name,
            SideAttribute::Neighborhood => &mut self.neighborhood,
            SideAttribute::Phone => &mut self.phone,
            SideAttribute::Mobile => &mut self.mobile,
        }
    }

    /// Store `value` unless the slot is already filled. Returns whether it was stored.
    pub fn offer(&mut self, attribute: SideAttribute, value: impl Into<String>) -> bool {
        let slot = self.slot(attribute);
        if slot.is_some() {
            return false;
        }
        *slot = Some(value.into());
        true
    }

    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.name.is_none()
            && self.neighborhood.is_none()
            && self.phone.is_none()
            && self.mobile.is_none()
    }
}

/// One code/quantity pair from the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataUnit {
    pub code: String,
    pub quantity: String,
}

/// Output of one extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Records in [`report_columns`] layout.
    pub table: Table,
    pub units: Vec<DataUnit>,
    pub side_channel: SideChannel,
    /// True when no unit was found and the fixed placeholder record was emitted.
    pub placeholder: bool,
}

/// Column layout of synthesized records.
pub fn report_columns() -> Vec<String> {
    HEADERLESS_SCHEMA
        .iter()
        .chain(std::iter::once(&TOTAL_COLUMN))
        .map(|s| s.to_string())
        .collect()
}

/// Extracts records out of a consolidated report grid.
#[derive(Debug, Clone, Default)]
pub struct ConsolidatedExtractor {
    config: ExtractorConfig,
}

impl ConsolidatedExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Never returns an empty table: at least one placeholder record is emitted.
    pub fn extract(&self, raw: &RawTable, processing_date: NaiveDate) -> Extraction {
        let Some(start) = self.find_block_start(raw) else {
            tracing::warn!(
                group_label = %self.config.group_label,
                "no data block marker in consolidated report, emitting placeholder record"
            );
            return self.placeholder_extraction(processing_date, SideChannel::default(), Vec::new());
        };

        let (side_channel, units) = self.scan(raw, start + 1);
        tracing::info!(
            block_start = start,
            units = units.len(),
            side_channel = !side_channel.is_empty(),
            "scanned consolidated report"
        );

        if units.is_empty() {
            tracing::warn!("consolidated report has no code rows, emitting placeholder record");
            return self.placeholder_extraction(processing_date, side_channel, units);
        }

        let rows = units
            .iter()
            .map(|unit| self.synthesize(unit, &side_channel, processing_date))
            .collect();

        Extraction {
            table: Table::new(report_columns(), rows),
            units,
            side_channel,
            placeholder: false,
        }
    }

    /// Row holding both the group label and the total label as whole cells.
    pub fn find_block_start(&self, raw: &RawTable) -> Option<usize> {
        raw.rows().iter().position(|row| {
            let cells: Vec<String> = row.iter().map(Cell::upper).collect();
            cells.iter().any(|c| *c == self.config.group_label)
                && cells.iter().any(|c| *c == self.config.total_label)
        })
    }

    /// Single ordered pass collecting side-channel values and data units.
    pub fn scan(&self, raw: &RawTable, from: usize) -> (SideChannel, Vec<DataUnit>) {
        let mut side_channel = SideChannel::default();
        let mut units = Vec::new();

        for index in from..raw.len() {
            let first = raw.cell(index, 0);
            let label = first.upper();

            // The value row stays in the scan and may itself be a data unit.
            if let Some(attribute) = SideAttribute::from_label(&label) {
                let value = raw.cell(index + 1, 0);
                if !value.is_blank() {
                    let value = value.to_text().trim().to_string();
                    if side_channel.offer(attribute, value.clone()) {
                        tracing::debug!(?attribute, value = %value, row = index + 1, "captured side-channel value");
                    }
                }
                if attribute == SideAttribute::Address {
                    continue;
                }
            }

            if first.is_blank() || self.config.skip_labels.iter().any(|s| *s == label) {
                continue;
            }
            let quantity = raw.cell(index, 1);
            if quantity.is_blank() {
                continue;
            }

            let code = first.to_text().trim().to_string();
            if code.chars().any(|c| c.is_ascii_digit()) {
                units.push(DataUnit {
                    code,
                    quantity: quantity.to_text().trim().to_string(),
                });
            }
        }

        (side_channel, units)
    }

    /// Expand one unit into a full record row.
    fn synthesize(&self, unit: &DataUnit, side: &SideChannel, date: NaiveDate) -> Vec<Cell> {
        let code = unit.code.as_str();
        let phone = format!("3{}", zero_fill(code, 9));
        let date = date.format("%Y%m%d").to_string();

        let values: Vec<String> = vec![
            format!("REMESA_{}", code),
            synthetic_account(code),
            String::new(),
            String::new(),
            code.to_string(),
            synthetic_nit(code),
            side.name.clone().unwrap_or_else(|| format!("CLIENTE_{}", code)),
            side.address.clone().unwrap_or_else(|| format!("DIRECCION_CLIENTE_{}", code)),
            side.neighborhood.clone().unwrap_or_else(|| format!("BARRIO_{}", code)),
            self.config.default_city.clone(),
            side.phone.clone().unwrap_or_else(|| phone.clone()),
            side.mobile.clone().unwrap_or(phone),
            String::new(),
            String::new(),
            String::new(),
            self.config.market.clone(),
            date.clone(),
            date,
            String::new(),
            String::new(),
            self.config.delivery_window.clone(),
            unit.quantity.clone(),
        ];
        values.into_iter().map(Cell::text).collect()
    }

    fn placeholder_extraction(
        &self,
        date: NaiveDate,
        side_channel: SideChannel,
        units: Vec<DataUnit>,
    ) -> Extraction {
        let mut row = placeholder_row(&self.config, date);
        row.push(Cell::text("1"));
        Extraction {
            table: Table::new(report_columns(), vec![row]),
            units,
            side_channel,
            placeholder: true,
        }
    }
}

/// Fixed placeholder record in [`HEADERLESS_SCHEMA`] layout.
pub fn placeholder_row(config: &ExtractorConfig, date: NaiveDate) -> Vec<Cell> {
    let date = date.format("%Y%m%d").to_string();
    let values = [
        "BASE_PRUEBA",
        "5432801234567890",
        "",
        "",
        "01",
        "123456789",
        "CLIENTE EJEMPLO",
        "CALLE 123",
        "CENTRO",
        config.default_city.as_str(),
        "1234567",
        "3001234567",
        "",
        "",
        "",
        config.market.as_str(),
        date.as_str(),
        date.as_str(),
        "",
        "",
        config.delivery_window.as_str(),
    ];
    values.iter().map(|v| Cell::text(*v)).collect()
}

/// Left-pad with zeros to `width` characters.
fn zero_fill(code: &str, width: usize) -> String {
    format!("{:0>width$}", code, width = width)
}

/// Code padded to nine characters with the tail of `123456789`.
pub fn synthetic_nit(code: &str) -> String {
    const FILLER: &str = "123456789";
    let missing = FILLER.len().saturating_sub(code.chars().count());
    format!("{}{}", code, &FILLER[..missing])
}

/// `543280` + code zero-filled to ten + as many trailing digits of `1234567890` as the code has.
pub fn synthetic_account(code: &str) -> String {
    const FILLER: &str = "1234567890";
    let take = code.chars().count().min(FILLER.len());
    format!("543280{}{}", zero_fill(code, 10), &FILLER[FILLER.len() - take..])
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

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 19).unwrap()
    }

    fn column(extraction: &Extraction, row: usize, name: &str) -> String {
        let idx = extraction.table.column_index(name).unwrap();
        extraction.table.value(row, idx).to_text()
    }

    #[test]
    fn test_units_with_placeholders() {
        let raw = grid(&[
            &["RESUMEN DE ENTREGAS", ""],
            &["REMESA", "TOTAL"],
            &["101", "4"],
            &["205", "1"],
            &["TOTAL", "5"],
        ]);
        let extraction = ConsolidatedExtractor::default().extract(&raw, date());

        assert!(!extraction.placeholder);
        assert_eq!(extraction.table.len(), 2);
        assert_eq!(column(&extraction, 0, "REMESA"), "REMESA_101");
        assert_eq!(column(&extraction, 0, "NOMBRE"), "CLIENTE_101");
        assert_eq!(column(&extraction, 0, "NIT"), "101123456");
        assert_eq!(column(&extraction, 0, "CUENTA 1"), "5432800000000101890");
        assert_eq!(column(&extraction, 0, "TEL RESIDENCIA"), "3000000101");
        assert_eq!(column(&extraction, 0, "CIUDAD RESIDENCIA"), "11001");
        assert_eq!(column(&extraction, 0, "FECHA DE ENTREGA"), "20260219");
        assert_eq!(column(&extraction, 0, "TOTAL"), "4");
        assert_eq!(column(&extraction, 1, "COD"), "205");
        assert_eq!(column(&extraction, 1, "TOTAL"), "1");
    }

    #[test]
    fn test_side_channel_applies_to_all_units() {
        let raw = grid(&[
            &["REMESA", "TOTAL"],
            &["NOMBRE", ""],
            &["ANA PEREZ", ""],
            &["DIRECCION", ""],
            &["CALLE 45 # 12-30", ""],
            &["CELULAR", ""],
            &["3104445566", ""],
            &["101", "2"],
            &["NOMBRE", ""],
            &["OTRO NOMBRE", ""],
            &["102", "3"],
        ]);
        let extraction = ConsolidatedExtractor::default().extract(&raw, date());

        assert_eq!(extraction.units.len(), 2);
        assert_eq!(extraction.side_channel.name.as_deref(), Some("ANA PEREZ"));
        for row in 0..2 {
            assert_eq!(column(&extraction, row, "NOMBRE"), "ANA PEREZ");
            assert_eq!(column(&extraction, row, "DIR RESIDENCIA"), "CALLE 45 # 12-30");
            assert_eq!(column(&extraction, row, "CELULAR"), "3104445566");
        }
        // phone was never given: per-code placeholder
        assert_eq!(column(&extraction, 1, "TEL RESIDENCIA"), "3000000102");
    }

    #[test]
    fn test_value_rows_remain_unit_candidates() {
        let raw = grid(&[
            &["REMESA", "TOTAL"],
            &["DIRECCION", ""],
            &["CALLE 10", "7"],
            &["NOMBRE", ""],
            &["ANA", ""],
            &["301", "2"],
        ]);
        let (side, units) = ConsolidatedExtractor::default().scan(&raw, 1);
        assert_eq!(side.address.as_deref(), Some("CALLE 10"));
        assert_eq!(side.name.as_deref(), Some("ANA"));
        let codes: Vec<&str> = units.iter().map(|u| u.code.as_str()).collect();
        assert_eq!(codes, vec!["CALLE 10", "301"]);
        assert_eq!(units[0].quantity, "7");
    }

    #[test]
    fn test_no_units_yields_single_placeholder() {
        let raw = grid(&[&["REMESA", "TOTAL"], &["TOTAL", "0"], &["BASE", "3"]]);
        let extraction = ConsolidatedExtractor::default().extract(&raw, date());

        assert!(extraction.placeholder);
        assert_eq!(extraction.table.len(), 1);
        assert_eq!(column(&extraction, 0, "REMESA"), "BASE_PRUEBA");
        assert_eq!(column(&extraction, 0, "NOMBRE"), "CLIENTE EJEMPLO");
        assert_eq!(column(&extraction, 0, "TOTAL"), "1");
    }

    #[test]
    fn test_missing_marker_yields_single_placeholder() {
        let raw = grid(&[&["CONSOLIDADO", "12"], &["BASE", "3"]]);
        let extraction = ConsolidatedExtractor::default().extract(&raw, date());
        assert!(extraction.placeholder);
        assert_eq!(extraction.table.len(), 1);
    }

    #[test]
    fn test_side_attribute_labels() {
        assert_eq!(SideAttribute::from_label("Dir Residencia"), Some(SideAttribute::Address));
        assert_eq!(SideAttribute::from_label("TEL FIJO"), Some(SideAttribute::Phone));
        assert_eq!(SideAttribute::from_label("CELULAR"), Some(SideAttribute::Mobile));
        assert_eq!(SideAttribute::from_label("101"), None);
    }

    #[test]
    fn test_synthetic_codes() {
        assert_eq!(synthetic_nit("7"), "712345678");
        assert_eq!(synthetic_nit("1234567890"), "1234567890");
        assert_eq!(synthetic_account("7"), "54328000000000070");
    }
}
