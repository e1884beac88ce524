//! Value transformations
//!
//! Named, string-encoded transforms used by both directions: import mapping
//! rules (`{"source": "NOMBRE", "transform": "upper"}`) and export column
//! transformations (`"ciudad_cod": "left_pad_5"`).

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::models::value_text;

/// A transform applied to one field value
///
/// Encoded as a plain string. Unknown names decode to [`Transform::Direct`]
/// so a typo in a configuration leaves values untouched instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Transform {
    /// Value as-is
    #[default]
    Direct,
    /// Uppercase
    Upper,
    /// Lowercase
    Lower,
    /// Trim surrounding whitespace
    Strip,
    /// Left-pad with zeros to the given width (`left_pad_<n>`)
    LeftPad(usize),
}

impl Transform {
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "upper" => Transform::Upper,
            "lower" => Transform::Lower,
            "strip" => Transform::Strip,
            "direct" | "" => Transform::Direct,
            other => match other.strip_prefix("left_pad_").and_then(|n| n.parse().ok()) {
                Some(width) => Transform::LeftPad(width),
                None => {
                    tracing::warn!(transform = %other, "unknown transform, value left unchanged");
                    Transform::Direct
                }
            },
        }
    }

    pub fn name(&self) -> String {
        match self {
            Transform::Direct => "direct".to_string(),
            Transform::Upper => "upper".to_string(),
            Transform::Lower => "lower".to_string(),
            Transform::Strip => "strip".to_string(),
            Transform::LeftPad(width) => format!("left_pad_{}", width),
        }
    }

    /// Apply to a string value
    pub fn apply_str(&self, value: &str) -> String {
        match self {
            Transform::Direct => value.to_string(),
            Transform::Upper => value.to_uppercase(),
            Transform::Lower => value.to_lowercase(),
            Transform::Strip => value.trim().to_string(),
            Transform::LeftPad(width) => {
                let len = value.chars().count();
                if len >= *width {
                    value.to_string()
                } else {
                    format!("{}{}", "0".repeat(width - len), value)
                }
            }
        }
    }

    /// Apply to a JSON value
    ///
    /// Strings and numbers are transformed through their text form; other
    /// values are returned unchanged. `Direct` never touches the value.
    pub fn apply(&self, value: &Value) -> Value {
        match (self, value) {
            (Transform::Direct, _) => value.clone(),
            (_, Value::String(s)) => Value::String(self.apply_str(s)),
            (_, Value::Number(_)) => Value::String(self.apply_str(&value_text(value))),
            _ => value.clone(),
        }
    }
}

impl From<String> for Transform {
    fn from(name: String) -> Self {
        Transform::parse(&name)
    }
}

impl From<Transform> for String {
    fn from(transform: Transform) -> Self {
        transform.name()
    }
}

/// Coerce a literal mapping value into a clean scalar
///
/// Null becomes `""`, integral floats become integers, other floats become
/// their string form. Arrays and objects are flattened to JSON text.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Null => Value::String(String::new()),
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Value::Number(Number::from(f as i64)),
            Some(f) => Value::String(f.to_string()),
            None => Value::String(n.to_string()),
        },
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_names() {
        assert_eq!(Transform::parse("UPPER"), Transform::Upper);
        assert_eq!(Transform::parse("strip"), Transform::Strip);
        assert_eq!(Transform::parse("left_pad_5"), Transform::LeftPad(5));
        assert_eq!(Transform::parse("titlecase"), Transform::Direct);
        assert_eq!(Transform::parse("left_pad_x"), Transform::Direct);
    }

    #[test]
    fn test_string_encoding() {
        let t: Transform = serde_json::from_value(json!("left_pad_5")).unwrap();
        assert_eq!(t, Transform::LeftPad(5));
        assert_eq!(serde_json::to_value(Transform::Upper).unwrap(), json!("upper"));
    }

    #[test]
    fn test_apply() {
        assert_eq!(Transform::Upper.apply(&json!("ana maria")), json!("ANA MARIA"));
        assert_eq!(Transform::Lower.apply(&json!("ANA")), json!("ana"));
        assert_eq!(Transform::Strip.apply(&json!("  x ")), json!("x"));
        assert_eq!(Transform::LeftPad(5).apply(&json!("5001")), json!("05001"));
        assert_eq!(Transform::LeftPad(5).apply(&json!(5001)), json!("05001"));
        assert_eq!(Transform::LeftPad(5).apply(&json!("123456")), json!("123456"));
        assert_eq!(Transform::Upper.apply(&Value::Null), Value::Null);
        assert_eq!(Transform::Direct.apply(&json!(12)), json!(12));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(&Value::Null), json!(""));
        assert_eq!(sanitize(&json!(1.0)), json!(1));
        assert_eq!(sanitize(&json!(1.5)), json!("1.5"));
        assert_eq!(sanitize(&json!(7)), json!(7));
        assert_eq!(sanitize(&json!("01")), json!("01"));
        assert_eq!(sanitize(&json!(true)), json!(true));
    }
}
