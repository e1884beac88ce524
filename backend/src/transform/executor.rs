//! Record mapper
//!
//! Applies a [`ColumnMapping`] to every row of a normalized [`Table`] and
//! runs the derivations on the result. Source columns are bound once per
//! table; a column that cannot be located is reported once as a
//! [`ResolutionMiss`] and its field is left empty on every record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::derive::DerivationRules;
use super::mapping::{ColumnMapping, FieldRule};
use super::operations::{sanitize, Transform};
use super::resolver::{cell_text, ColumnMatch, ColumnResolver};
use crate::models::{Cell, MappedRecord, Table};

/// A mapping rule whose source column is absent from the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionMiss {
    pub field: String,
    pub source: String,
}

/// Records produced from one table.
#[derive(Debug, Clone, Default)]
pub struct MappingOutcome {
    pub records: Vec<MappedRecord>,
    pub misses: Vec<ResolutionMiss>,
}

/// A rule bound to the table at hand.
#[derive(Debug, Clone)]
enum Binding {
    Column { index: usize, transform: Transform },
    Literal(Value),
    /// Empty source, or a source that did not resolve.
    Empty,
}

/// Maps tables to canonical records.
#[derive(Debug, Clone, Default)]
pub struct RecordMapper {
    resolver: ColumnResolver,
    derivations: DerivationRules,
}

impl RecordMapper {
    pub fn new(resolver: ColumnResolver, derivations: DerivationRules) -> Self {
        Self { resolver, derivations }
    }

    pub fn derivations(&self) -> &DerivationRules {
        &self.derivations
    }

    /// Map every row and apply the derivations.
    pub fn map_table(&self, table: &Table, mapping: &ColumnMapping, now: DateTime<Utc>) -> MappingOutcome {
        let (bindings, misses) = self.bind(table, mapping);

        let records = table
            .rows
            .iter()
            .map(|row| {
                let mut record = map_row(&bindings, row);
                self.derivations.apply(&mut record, now);
                record
            })
            .collect();

        MappingOutcome { records, misses }
    }

    /// Try a mapping against one sample row given as `column -> value`.
    ///
    /// Derivations are not applied, so the result shows exactly what the
    /// rules produce.
    pub fn preview(&self, mapping: &ColumnMapping, sample: &Map<String, Value>) -> MappingOutcome {
        let columns = sample.keys().cloned().collect();
        let row = sample.values().map(cell_from_value).collect();
        let table = Table::new(columns, vec![row]);

        let (bindings, misses) = self.bind(&table, mapping);
        let records = table.rows.iter().map(|row| map_row(&bindings, row)).collect();
        MappingOutcome { records, misses }
    }

    fn bind(&self, table: &Table, mapping: &ColumnMapping) -> (Vec<(String, Binding)>, Vec<ResolutionMiss>) {
        let mut misses = Vec::new();

        let bindings = mapping
            .iter()
            .map(|(field, rule)| {
                let binding = match rule {
                    FieldRule::Literal(value) => Binding::Literal(sanitize(value)),
                    FieldRule::Direct(source) => self.bind_column(field, source, Transform::Direct, table, &mut misses),
                    FieldRule::Transformed { source, transform } => {
                        self.bind_column(field, source, *transform, table, &mut misses)
                    }
                };
                (field.to_string(), binding)
            })
            .collect();

        (bindings, misses)
    }

    fn bind_column(
        &self,
        field: &str,
        source: &str,
        transform: Transform,
        table: &Table,
        misses: &mut Vec<ResolutionMiss>,
    ) -> Binding {
        if source.trim().is_empty() {
            return Binding::Empty;
        }

        match self.resolver.find_column(source, &table.columns) {
            Some(ColumnMatch { index, kind }) => {
                tracing::debug!(field, source, column = %table.columns[index], ?kind, "mapping source resolved");
                Binding::Column { index, transform }
            }
            None => {
                tracing::warn!(field, source, columns = ?table.columns, "mapping source column not found");
                misses.push(ResolutionMiss { field: field.to_string(), source: source.to_string() });
                Binding::Empty
            }
        }
    }
}

fn map_row(bindings: &[(String, Binding)], row: &[Cell]) -> MappedRecord {
    let mut record = MappedRecord::new();
    for (field, binding) in bindings {
        let value = match binding {
            Binding::Column { index, transform } => {
                let text = row.get(*index).map(cell_text).unwrap_or_default();
                Value::String(transform.apply_str(&text))
            }
            Binding::Literal(value) => value.clone(),
            Binding::Empty => Value::String(String::new()),
        };
        record.insert(field.clone(), value);
    }
    record
}

fn cell_from_value(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
        Value::String(s) => Cell::text(s.clone()),
        other => Cell::text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_123, 0).unwrap()
    }

    fn table() -> Table {
        Table::new(
            vec!["REMESA".into(), "CUENTA 1".into(), "NIT".into(), "NOMBRE".into(), "CIUDAD RESIDENCIA".into(), "COD".into()],
            vec![
                vec![
                    Cell::text("R-1"),
                    Cell::text("5432801234567890"),
                    Cell::Number(1_032_456_789.0),
                    Cell::text(" ana gomez "),
                    Cell::Number(5001.0),
                    Cell::Number(15.0),
                ],
                vec![
                    Cell::text("R-2"),
                    Cell::Empty,
                    Cell::text("79111222"),
                    Cell::text("LUIS"),
                    Cell::text("11001"),
                    Cell::text("7"),
                ],
            ],
        )
    }

    fn mapping() -> ColumnMapping {
        serde_json::from_value(json!({
            "seudo_bd": "REMESA",
            "cuenta1": "CUENTA 1",
            "cc": "NIT",
            "nombre": {"source": "NOMBRE", "transform": "upper"},
            "ciudad": "CIUDAD",
            "cod": "COD",
            "nom_pro": {"value": "01"},
            "id_clie": 3.0,
            "mercado": "MERCADO",
            "sucursal": ""
        }))
        .unwrap()
    }

    #[test]
    fn test_map_table() {
        let outcome = RecordMapper::default().map_table(&table(), &mapping(), now());
        assert_eq!(outcome.records.len(), 2);

        let first = &outcome.records[0];
        assert_eq!(first.get("cc"), Some(&json!("1032456789")));
        assert_eq!(first.get("nombre"), Some(&json!("ANA GOMEZ")));
        assert_eq!(first.get("ciudad"), Some(&json!("05001")));
        assert_eq!(first.get("nom_pro"), Some(&json!("01")));
        assert_eq!(first.get("id_clie"), Some(&json!(3)));
        assert_eq!(first.get("mercado"), Some(&json!("")));
        assert_eq!(first.get("sucursal"), Some(&json!("")));
        assert_eq!(first.get("seudo_bd"), Some(&json!("78901032456789123")));
        assert_eq!(first.get("tipo_entrega"), Some(&json!(3)));

        let second = &outcome.records[1];
        assert_eq!(second.get("seudo_bd"), Some(&json!("R-2-1700000123")));
        assert_eq!(second.get("tipo_entrega"), Some(&json!(1)));
    }

    #[test]
    fn test_misses_reported_once_per_field() {
        let outcome = RecordMapper::default().map_table(&table(), &mapping(), now());
        assert_eq!(
            outcome.misses,
            vec![ResolutionMiss { field: "mercado".into(), source: "MERCADO".into() }]
        );
    }

    #[test]
    fn test_record_keys_follow_mapping_order() {
        let outcome = RecordMapper::default().map_table(&table(), &mapping(), now());
        let keys: Vec<&str> = outcome.records[0].keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["seudo_bd", "cuenta1", "cc", "nombre", "ciudad", "cod", "nom_pro", "id_clie", "mercado", "sucursal", "tipo_entrega"]
        );
    }

    #[test]
    fn test_preview_skips_derivations() {
        let sample = json!({"NOMBRE": "ana", "NIT": 123}).as_object().cloned().unwrap();
        let mapping = ColumnMapping::new()
            .with_field("nombre", FieldRule::Transformed { source: "NOMBRE".into(), transform: Transform::Upper })
            .with_field("cc", FieldRule::direct("NIT"));
        let outcome = RecordMapper::default().preview(&mapping, &sample);
        let record = &outcome.records[0];
        assert_eq!(record.get("nombre"), Some(&json!("ANA")));
        assert_eq!(record.get("cc"), Some(&json!("123")));
        assert!(!record.contains("tipo_entrega"));
    }
}
