//! Value types for tabconv records
//!
//! This module provides the [`Value`] enum that every reader produces and every
//! writer consumes. Text formats only ever produce strings (CSV, XML) or JSON
//! scalars; the binary formats produce the full range of typed scalars.

use serde_json::{Number as JsonNumber, Value as JsonValue};
use std::fmt;

/// A single cell of a record
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or null value
    Null,
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// Double precision float
    Double(f64),
    /// Boolean value
    Bool(bool),
    /// Text value
    String(String),
    /// Nested array or object, kept structured until a writer flattens it
    Opaque(JsonValue),
}

impl Value {
    /// Create a new string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Check if value is null
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null or empty text; both count as "no value" during inference and coercion
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Text rendering used by positional writers and by string coercion
    #[must_use]
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Convert from a JSON value, keeping scalars typed
    #[must_use]
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => Value::Int(small),
                        Err(_) => Value::Long(i),
                    }
                } else if n.is_u64() {
                    // beyond i64; keep the digits rather than lose precision
                    Value::String(n.to_string())
                } else if let Some(f) = n.as_f64() {
                    Value::Double(f)
                } else {
                    Value::String(n.to_string())
                }
            }
            JsonValue::String(s) => Value::String(s),
            nested @ (JsonValue::Array(_) | JsonValue::Object(_)) => Value::Opaque(nested),
        }
    }

    /// Convert to a JSON value
    ///
    /// Non-finite doubles have no JSON representation and become `null`.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Int(i) => JsonValue::Number(JsonNumber::from(*i)),
            Value::Long(l) => JsonValue::Number(JsonNumber::from(*l)),
            Value::Double(d) => JsonNumber::from_f64(*d)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Opaque(json) => json.clone(),
        }
    }
}

/// Render a double so it always reads back as a double
///
/// Integral values keep a fractional digit (`3.0`, not `3`). Magnitudes of
/// 1e16 and above use exponent form (`1e20`).
#[must_use]
pub fn format_double(d: f64) -> String {
    if !d.is_finite() {
        format!("{d}")
    } else if d.abs() >= 1e16 {
        format!("{d:e}")
    } else if d.fract() == 0.0 {
        format!("{d:.1}")
    } else {
        format!("{d}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{i}"),
            Value::Long(l) => write!(f, "{l}"),
            Value::Double(d) => f.write_str(&format_double(*d)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::String(s) => f.write_str(s),
            Value::Opaque(json) => write!(f, "{json}"),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Int(i) => serializer.serialize_i32(*i),
            Value::Long(l) => serializer.serialize_i64(*l),
            Value::Double(d) if d.is_finite() => serializer.serialize_f64(*d),
            Value::Double(_) => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s),
            Value::Opaque(json) => json.serialize(serializer),
        }
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

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}
