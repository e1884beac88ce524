//! Client mapping configuration
//!
//! A [`ColumnMapping`] is an ordered set of `output field -> rule` entries.
//! In JSON each rule takes one of these shapes:
//!
//! ```json
//! {
//!   "nombre": "NOMBRE",
//!   "cc": {"source": "NIT", "transform": "strip"},
//!   "nom_pro": {"value": "01"},
//!   "id_clie": 3
//! }
//! ```
//!
//! A bare string names a source column, an object with `source` adds a
//! transform, and an object with `value` (or any other scalar) is a literal.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::operations::Transform;

/// How one output field gets its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleDocument", into = "RuleDocument")]
pub enum FieldRule {
    /// Copy a source column.
    Direct(String),
    /// Copy a source column through a transform.
    Transformed { source: String, transform: Transform },
    /// Fixed value, independent of the file.
    Literal(Value),
}

impl FieldRule {
    pub fn direct(source: impl Into<String>) -> Self {
        FieldRule::Direct(source.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        FieldRule::Literal(value.into())
    }

    /// Source column named by the rule, if any.
    pub fn source(&self) -> Option<&str> {
        match self {
            FieldRule::Direct(source) | FieldRule::Transformed { source, .. } => Some(source),
            FieldRule::Literal(_) => None,
        }
    }
}

/// Wire shapes of a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RuleDocument {
    Source(String),
    Structured {
        source: String,
        #[serde(default)]
        transform: Transform,
    },
    Fixed {
        value: Value,
    },
    Scalar(Value),
}

impl TryFrom<RuleDocument> for FieldRule {
    type Error = String;

    fn try_from(doc: RuleDocument) -> Result<Self, Self::Error> {
        match doc {
            RuleDocument::Source(source) => Ok(FieldRule::Direct(source)),
            RuleDocument::Structured { source, transform } => {
                Ok(FieldRule::Transformed { source, transform })
            }
            RuleDocument::Fixed { value } => Ok(FieldRule::Literal(value)),
            RuleDocument::Scalar(value @ (Value::Object(_) | Value::Array(_))) => Err(format!(
                "rule must be a column name, {{\"source\": ...}}, {{\"value\": ...}} or a scalar, got {}",
                value
            )),
            RuleDocument::Scalar(value) => Ok(FieldRule::Literal(value)),
        }
    }
}

impl From<FieldRule> for RuleDocument {
    fn from(rule: FieldRule) -> Self {
        match rule {
            FieldRule::Direct(source) => RuleDocument::Source(source),
            FieldRule::Transformed { source, transform } => RuleDocument::Structured { source, transform },
            FieldRule::Literal(value @ Value::String(_)) => RuleDocument::Fixed { value },
            FieldRule::Literal(value) => RuleDocument::Scalar(value),
        }
    }
}

/// Ordered output-field rules for one client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ColumnMapping {
    fields: Vec<(String, FieldRule)>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, replacing an existing rule of the same name in place.
    pub fn with_field(mut self, field: impl Into<String>, rule: FieldRule) -> Self {
        self.insert(field, rule);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, rule: FieldRule) {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = rule,
            None => self.fields.push((field, rule)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|(name, _)| name == field).map(|(_, rule)| rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Output field names in order.
    pub fn target_fields(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Source columns referenced by the rules.
    pub fn source_columns(&self) -> Vec<&str> {
        self.fields.iter().filter_map(|(_, rule)| rule.source()).collect()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl TryFrom<Map<String, Value>> for ColumnMapping {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut mapping = ColumnMapping::new();
        for (field, raw) in map {
            let rule: FieldRule = serde_json::from_value(raw)
                .map_err(|e| format!("field '{}': {}", field, e))?;
            mapping.insert(field, rule);
        }
        Ok(mapping)
    }
}

impl From<ColumnMapping> for Map<String, Value> {
    fn from(mapping: ColumnMapping) -> Self {
        mapping
            .fields
            .into_iter()
            .map(|(field, rule)| {
                let value = serde_json::to_value(RuleDocument::from(rule))
                    .expect("rule documents hold only strings and JSON values");
                (field, value)
            })
            .collect()
    }
}

/// Per-client validation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Fields that must be non-blank on every record.
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Fields expected to hold digits only; violations are warnings.
    #[serde(default = "default_numeric_fields")]
    pub numeric_fields: Vec<String>,
    /// Informational list of fields that may be blank.
    #[serde(default)]
    pub optional_fields: Vec<String>,
}

fn default_numeric_fields() -> Vec<String> {
    vec!["documento".to_string()]
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self { required_fields: Vec::new(), numeric_fields: default_numeric_fields(), optional_fields: Vec::new() }
    }
}

impl ValidationRules {
    pub fn required<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { required_fields: fields.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    pub fn with_optional<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Stored mapping for one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMapping {
    pub client_code: String,
    #[serde(default)]
    pub client_name: String,
    pub mapping_config: ColumnMapping,
    #[serde(default)]
    pub validation_rules: ValidationRules,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_active() -> bool {
    true
}

impl ClientMapping {
    pub fn new(client_code: impl Into<String>, mapping_config: ColumnMapping) -> Self {
        let client_code = client_code.into();
        Self {
            client_name: client_code.clone(),
            client_code,
            mapping_config,
            validation_rules: ValidationRules::default(),
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_validation(mut self, rules: ValidationRules) -> Self {
        self.validation_rules = rules;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_shapes() {
        let mapping: ColumnMapping = serde_json::from_value(json!({
            "nombre": "NOMBRE",
            "cc": {"source": "NIT", "transform": "strip"},
            "ciudad": {"source": "CIUDAD"},
            "nom_pro": {"value": "01"},
            "id_clie": 3
        }))
        .unwrap();

        assert_eq!(mapping.target_fields(), vec!["nombre", "cc", "ciudad", "nom_pro", "id_clie"]);
        assert_eq!(mapping.get("nombre"), Some(&FieldRule::direct("NOMBRE")));
        assert_eq!(
            mapping.get("cc"),
            Some(&FieldRule::Transformed { source: "NIT".into(), transform: Transform::Strip })
        );
        assert_eq!(
            mapping.get("ciudad"),
            Some(&FieldRule::Transformed { source: "CIUDAD".into(), transform: Transform::Direct })
        );
        assert_eq!(mapping.get("nom_pro"), Some(&FieldRule::literal("01")));
        assert_eq!(mapping.get("id_clie"), Some(&FieldRule::literal(3)));
        assert_eq!(mapping.source_columns(), vec!["NOMBRE", "NIT", "CIUDAD"]);
    }

    #[test]
    fn test_object_without_source_or_value_is_rejected() {
        let result: Result<ColumnMapping, _> = serde_json::from_value(json!({"x": {"column": "A"}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_json_keeps_field_order() {
        let mapping = ColumnMapping::new()
            .with_field("z", FieldRule::direct("Z"))
            .with_field("a", FieldRule::literal("01"))
            .with_field("m", FieldRule::literal(1));
        let json = mapping.to_json().unwrap();
        let back = ColumnMapping::from_json(&json).unwrap();
        assert_eq!(back, mapping);
        assert!(json.find("\"z\"").unwrap() < json.find("\"a\"").unwrap());
    }

    #[test]
    fn test_rules_serialize_to_documents() {
        let mapping = ColumnMapping::new()
            .with_field("nombre", FieldRule::direct("NOMBRE"))
            .with_field("cc", FieldRule::Transformed { source: "NIT".into(), transform: Transform::LeftPad(10) })
            .with_field("nom_pro", FieldRule::literal("01"))
            .with_field("id_clie", FieldRule::literal(3));

        let map = Map::from(mapping);
        assert_eq!(
            Value::Object(map),
            json!({
                "nombre": "NOMBRE",
                "cc": {"source": "NIT", "transform": "left_pad_10"},
                "nom_pro": {"value": "01"},
                "id_clie": 3
            })
        );
    }

    #[test]
    fn test_client_mapping_defaults() {
        let doc: ClientMapping = serde_json::from_value(json!({
            "client_code": "ACME",
            "mapping_config": {"nombre": "NOMBRE"}
        }))
        .unwrap();
        assert!(doc.is_active);
        assert!(doc.validation_rules.required_fields.is_empty());
        assert_eq!(doc.validation_rules.numeric_fields, vec!["documento"]);
    }
}
