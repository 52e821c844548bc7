/// Column metadata for registered tables
use super::{looks_like_date, Value};
use serde::Serialize;

/// Inferred column kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Integer or fractional numbers
    Numeric,
    /// Free text (and anything not recognized otherwise)
    Text,
    /// ISO `YYYY-MM-DD[...]` text
    Date,
    /// No non-null value seen at registration
    Unknown,
}

impl ColumnKind {
    /// Kind of a single non-null sample
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ColumnKind::Unknown,
            Value::Integer(_) | Value::Float(_) => ColumnKind::Numeric,
            Value::Date(_) => ColumnKind::Date,
            Value::Text(s) if looks_like_date(s) => ColumnKind::Date,
            Value::Text(_) | Value::Bool(_) => ColumnKind::Text,
        }
    }

    /// Sniff the first non-null value of a column
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        values
            .into_iter()
            .find(|v| !v.is_null())
            .map(ColumnKind::of)
            .unwrap_or(ColumnKind::Unknown)
    }
}

/// Column definition
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDef {
    /// Column name as registered
    pub name: String,
    /// Inferred kind
    pub kind: ColumnKind,
    #[serde(skip)]
    key: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        let name = name.into();
        let key = name.to_lowercase();
        Self { name, kind, key }
    }

    /// Lowercased lookup key
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Table summary returned by `list()`
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TableInfo {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
