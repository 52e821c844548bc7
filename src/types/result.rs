/// Tabular query result
use super::Value;
use serde::Serialize;

/// Result of `execute`: output column names (duplicates allowed) and rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first output column with this name (case-insensitive)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Values of one output column, top to bottom
    pub fn column_values(&self, index: usize) -> Vec<&Value> {
        self.rows.iter().filter_map(|row| row.get(index)).collect()
    }

    /// Rows as (column_name, value) pairs in output order; duplicate names are kept
    pub fn rows_as_pairs(&self) -> Vec<Vec<(String, Value)>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, val)| (col.clone(), val.clone()))
                    .collect()
            })
            .collect()
    }

    /// `{"columns": [...], "rows": [[...], ...]}`
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_set_json() {
        let rs = ResultSet::new(
            vec!["a".into(), "n".into()],
            vec![vec![Value::Integer(1), Value::Null]],
        );
        assert_eq!(rs.to_json().unwrap(), r#"{"columns":["a","n"],"rows":[[1,null]]}"#);
        assert_eq!(rs.column_index("N"), Some(1));
        assert_eq!(rs.row_count(), 1);
    }

    #[test]
    fn test_rows_as_pairs_keep_duplicate_columns() {
        let rs = ResultSet::new(
            vec!["id".into(), "id".into(), "value".into()],
            vec![
                vec![Value::Integer(1), Value::Integer(10), Value::from("a")],
                vec![Value::Integer(2), Value::Integer(20), Value::Null],
            ],
        );
        let pairs = rs.rows_as_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(
            pairs[0],
            vec![
                ("id".to_string(), Value::Integer(1)),
                ("id".to_string(), Value::Integer(10)),
                ("value".to_string(), Value::from("a")),
            ]
        );
        assert_eq!(pairs[1][1], ("id".to_string(), Value::Integer(20)));
        assert_eq!(pairs[1][2], ("value".to_string(), Value::Null));
        assert_eq!(rs.column_index("id"), Some(0));
    }
}
