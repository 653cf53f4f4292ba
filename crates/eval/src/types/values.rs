//! Document values and JSON conversion.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Prefix that marks a map key as an operator name.
pub const OPERATOR_PREFIX: char = '$';

// ──────────────────────────────────────────────
// Document values
// ──────────────────────────────────────────────

/// An untyped document tree. Queries are values too.
///
/// Numbers are held as `f64`: every numeric comparison in the matcher is a
/// double comparison, so integers and floats never need to be told apart.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Canonical type name, as matched by `$type`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "array",
            Value::Map(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// True iff this is a map with at least one `$`-prefixed key.
    pub fn is_operator_map(&self) -> bool {
        match self {
            Value::Map(fields) => fields.keys().any(|k| k.starts_with(OPERATOR_PREFIX)),
            _ => false,
        }
    }

    /// Order two values when they are mutually comparable: both numbers,
    /// both strings, or both booleans. `None` otherwise, and for NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Convert a JSON tree into a document value.
    pub fn from_json(v: &serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert back to JSON. Integral numbers become JSON integers;
    /// non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => match integral(*n) {
                Some(i) => serde_json::Value::from(i),
                None => serde_json::Number::from_f64(*n)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            },
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Largest magnitude at which every integer is exactly representable.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn integral(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Some(n as i64)
    } else {
        None
    }
}

/// String form used by `$regex`: strings unquoted, integral numbers
/// without a fractional part, lists and maps as compact JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => match integral(*n) {
                Some(i) => write!(f, "{}", i),
                None => write!(f, "{}", n),
            },
            Value::String(s) => write!(f, "{}", s),
            Value::List(_) | Value::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from_json(&v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trip_keeps_integers() {
        let original = json!({ "age": 25, "ratio": 0.5, "tags": ["a", null, true] });
        let value = Value::from_json(&original);
        assert_eq!(value.to_json(), original);
    }

    #[test]
    fn integers_and_floats_are_equal() {
        assert_eq!(Value::from_json(&json!(3)), Value::from_json(&json!(3.0)));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::from(25i64).to_string(), "25");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from_json(&json!([1, "x"])).to_string(), "[1,\"x\"]");
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from_json(&json!([])).type_name(), "array");
        assert_eq!(Value::from_json(&json!({})).type_name(), "object");
        assert_eq!(Value::from(true).type_name(), "boolean");
        assert_eq!(Value::from(1i64).type_name(), "number");
        assert_eq!(Value::from("s").type_name(), "string");
    }

    #[test]
    fn operator_map_detection() {
        assert!(Value::from_json(&json!({ "$gt": 1 })).is_operator_map());
        assert!(Value::from_json(&json!({ "$gt": 1, "name": 2 })).is_operator_map());
        assert!(!Value::from_json(&json!({ "name": { "$gt": 1 } })).is_operator_map());
        assert!(!Value::from_json(&json!({})).is_operator_map());
        assert!(!Value::from("$gt").is_operator_map());
    }

    #[test]
    fn comparison_only_within_kind() {
        use std::cmp::Ordering;
        assert_eq!(Value::from(1i64).compare(&Value::from(2.5)), Some(Ordering::Less));
        assert_eq!(Value::from("b").compare(&Value::from("a")), Some(Ordering::Greater));
        assert_eq!(Value::from(false).compare(&Value::from(true)), Some(Ordering::Less));
        assert_eq!(Value::from("1").compare(&Value::from(1i64)), None);
        assert_eq!(Value::Number(f64::NAN).compare(&Value::from(1i64)), None);
    }
}
