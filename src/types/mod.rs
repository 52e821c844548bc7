//! Cell values and table metadata for the labsql engine

mod table;
mod result;

pub use table::{ColumnDef, ColumnKind, TableInfo};
pub use result::ResultSet;

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// A single cell value
///
/// Serializes as the boundary encoding: numbers native, text and dates as
/// strings, NULL as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,

    /// Integer value
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// Boolean value
    Bool(bool),

    /// Text string
    Text(String),

    /// ISO `YYYY-MM-DD[...]` text, kept verbatim
    Date(String),
}

/// A row is an ordered sequence of cells
pub type Row = Vec<Value>;

/// Hashable projection of a value for grouping and DISTINCT.
///
/// NULL equals NULL, `1` equals `1.0`, and date-like text equals plain text
/// with the same characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum KeyPart {
    Null,
    Int(i64),
    Float(u64),
    Bool(bool),
    Str(String),
}

impl Value {
    /// Build a text value, tagging ISO dates as date-like
    pub fn text_or_date(s: impl Into<String>) -> Self {
        let s = s.into();
        if looks_like_date(&s) {
            Value::Date(s)
        } else {
            Value::Text(s)
        }
    }

    /// Convert a JSON scalar into a cell. Arrays and objects are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    n.as_f64().map(Value::Float).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::text_or_date(s.as_str()),
            other => Value::Text(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, Value::Text(_) | Value::Date(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Date(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the value's type, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
        }
    }

    /// Comparison used by predicates (`=`, `<`, IN, MIN/MAX).
    ///
    /// Returns `None` when either side is NULL. Numbers compare numerically,
    /// a number against numeric-looking text coerces the text, text and
    /// date-like values compare lexicographically, anything else compares
    /// by text form.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => Some(cmp_f64(a.as_f64()?, b.as_f64()?)),
            (a, Value::Text(s)) if a.is_numeric() => match parse_numeric_text(s) {
                Some(n) => a.sql_cmp(&n),
                None => Some(a.to_string().cmp(s)),
            },
            (Value::Text(s), b) if b.is_numeric() => match parse_numeric_text(s) {
                Some(n) => n.sql_cmp(b),
                None => Some(s.as_str().cmp(b.to_string().as_str())),
            },
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_str(), b.as_str()) {
                (Some(x), Some(y)) => Some(x.cmp(y)),
                _ => Some(a.to_string().cmp(&b.to_string())),
            },
        }
    }

    /// Ordering used by ORDER BY for non-NULL values: numeric when both are
    /// numbers, otherwise lexicographic on the text form (ISO dates sort
    /// chronologically this way).
    pub(crate) fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                cmp_f64(a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0))
            }
            (a, b) => match (a.as_str(), b.as_str()) {
                (Some(x), Some(y)) => x.cmp(y),
                _ => a.to_string().cmp(&b.to_string()),
            },
        }
    }

    pub(crate) fn key(&self) -> KeyPart {
        match self {
            Value::Null => KeyPart::Null,
            Value::Integer(i) => KeyPart::Int(*i),
            Value::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    KeyPart::Int(*f as i64)
                } else if f.is_nan() {
                    KeyPart::Float(f64::NAN.to_bits())
                } else {
                    KeyPart::Float(f.to_bits())
                }
            }
            Value::Bool(b) => KeyPart::Bool(*b),
            Value::Text(s) | Value::Date(s) => KeyPart::Str(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) | Value::Date(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::text_or_date(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::text_or_date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// `^\d{4}-\d{2}-\d{2}` prefix test
pub fn looks_like_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}

fn parse_numeric_text(s: &str) -> Option<Value> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(i) = t.parse::<i64>() {
        return Some(Value::Integer(i));
    }
    match t.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(Value::Float(f)),
        _ => None,
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
