//! Derived fields
//!
//! After the mapping rules run, three fields are computed from the record
//! itself: the city code is normalized to five digits, a synthetic identifier
//! is built from account and document, and the delivery type is derived
//! from the product code.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::models::MappedRecord;

/// Field names and defaults used by the derivations.
#[derive(Debug, Clone)]
pub struct DerivationRules {
    pub city_field: String,
    /// Replacement for numeric city codes of unexpected length.
    pub default_city: String,
    pub account_field: String,
    pub document_field: String,
    pub identifier_field: String,
    /// Identifier used when neither account/document nor an existing value is present.
    pub identifier_fallback: String,
    pub code_field: String,
    pub delivery_field: String,
    /// Product code that selects [`Self::special_delivery`].
    pub special_code: f64,
    pub special_delivery: i64,
    pub default_delivery: i64,
}

impl Default for DerivationRules {
    fn default() -> Self {
        Self {
            city_field: "ciudad".to_string(),
            default_city: "11001".to_string(),
            account_field: "cuenta1".to_string(),
            document_field: "cc".to_string(),
            identifier_field: "seudo_bd".to_string(),
            identifier_fallback: "DEFAULT_PSEUDO_BD".to_string(),
            code_field: "cod".to_string(),
            delivery_field: "tipo_entrega".to_string(),
            special_code: 15.0,
            special_delivery: 3,
            default_delivery: 1,
        }
    }
}

impl DerivationRules {
    /// Compute the derived fields in place. `now` feeds the identifier suffix.
    pub fn apply(&self, record: &mut MappedRecord, now: DateTime<Utc>) {
        let city = normalize_city(&record.text(&self.city_field), &self.default_city);
        record.insert(self.city_field.clone(), Value::String(city));

        let identifier = self.identifier(record, now);
        record.insert(self.identifier_field.clone(), Value::String(identifier));

        let delivery = self.delivery_type(record.get(&self.code_field));
        record.insert(self.delivery_field.clone(), json!(delivery));
    }

    /// Synthetic identifier.
    ///
    /// With both account and document: last four account characters, the
    /// document, and the last three digits of the unix timestamp. Otherwise an
    /// existing identifier gets `-<unix timestamp>` appended, and failing that
    /// the fallback is used.
    pub fn identifier(&self, record: &MappedRecord, now: DateTime<Utc>) -> String {
        let account = record.text(&self.account_field).trim().to_string();
        let document = record.text(&self.document_field).trim().to_string();
        let timestamp = now.timestamp().to_string();

        if !account.is_empty() && !document.is_empty() {
            let suffix = &timestamp[timestamp.len().saturating_sub(3)..];
            return format!("{}{}{}", last_chars(&account, 4), document, suffix);
        }

        let existing = record.text(&self.identifier_field);
        if !existing.trim().is_empty() {
            return format!("{}-{}", existing, timestamp);
        }

        self.identifier_fallback.clone()
    }

    /// Delivery type from the product code; unparseable codes get the default.
    pub fn delivery_type(&self, code: Option<&Value>) -> i64 {
        let parsed = match code {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(code) if code == self.special_code => self.special_delivery,
            _ => self.default_delivery,
        }
    }
}

/// Five-digit city code.
///
/// Four digits get a leading zero, five are kept, any other all-digit value
/// becomes `default_city`. Values with non-digits pass through unchanged.
pub fn normalize_city(value: &str, default_city: &str) -> String {
    let city = value.trim();
    if city.is_empty() || !city.chars().all(|c| c.is_ascii_digit()) {
        return city.to_string();
    }
    match city.len() {
        4 => format!("0{}", city),
        5 => city.to_string(),
        _ => default_city.to_string(),
    }
}

fn last_chars(value: &str, n: usize) -> &str {
    let count = value.chars().count();
    if count <= n {
        return value;
    }
    let start = value.char_indices().nth(count - n).map(|(i, _)| i).unwrap_or(0);
    &value[start..]
}
