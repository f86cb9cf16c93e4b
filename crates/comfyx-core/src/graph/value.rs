//! Scalar values stored on node widgets.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scalar value of a node widget (seed, prompt text, file name, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WidgetValue {
    /// Boolean toggle.
    Bool(bool),
    /// Integral number.
    Integer(i64),
    /// Non-integral number, or an integer outside the `i64` range.
    Float(f64),
    /// Free-form text.
    String(String),
}

impl WidgetValue {
    /// Converts a JSON scalar into a widget value.
    ///
    /// Returns `None` for `null`, arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Converts this value back into JSON.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::String(s) => Value::String(s.clone()),
        }
    }

    /// Returns the text if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for WidgetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for WidgetValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for WidgetValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for WidgetValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for WidgetValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for WidgetValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(WidgetValue::from_json(&json!(true)), Some(WidgetValue::Bool(true)));
        assert_eq!(WidgetValue::from_json(&json!(42)), Some(WidgetValue::Integer(42)));
        assert_eq!(WidgetValue::from_json(&json!(7.5)), Some(WidgetValue::Float(7.5)));
        assert_eq!(
            WidgetValue::from_json(&json!("a.png")),
            Some(WidgetValue::String("a.png".into()))
        );
    }

    #[test]
    fn test_from_json_large_unsigned_becomes_float() {
        let value = WidgetValue::from_json(&json!(u64::MAX)).unwrap();
        assert!(matches!(value, WidgetValue::Float(_)));
    }

    #[test]
    fn test_from_json_rejects_structures() {
        assert_eq!(WidgetValue::from_json(&json!(null)), None);
        assert_eq!(WidgetValue::from_json(&json!(["1", 0])), None);
        assert_eq!(WidgetValue::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_untagged_serialization() {
        let values = vec![
            WidgetValue::from(3_i64),
            WidgetValue::from("euler"),
            WidgetValue::from(false),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[3,"euler",false]"#);
    }
}
