/// Registered table: schema plus an immutable row store
use crate::error::CatalogError;
use crate::types::{ColumnDef, ColumnKind, Row, TableInfo};
use ahash::AHashSet;

#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    key: String,
    columns: Vec<ColumnDef>,
    rows: Vec<Row>,
    description: Option<String>,
}

impl Table {
    /// Validate and build a table. Column kinds are sniffed from the first
    /// non-null value of each column.
    pub fn new(
        name: &str,
        columns: Vec<String>,
        rows: Vec<Row>,
        description: Option<String>,
    ) -> Result<Self, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::EmptyName);
        }

        let mut seen = AHashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.to_lowercase()) {
                return Err(CatalogError::DuplicateColumn {
                    table: name.to_string(),
                    column: column.clone(),
                });
            }
        }

        if let Some((row, found)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
            .map(|(i, r)| (i, r.len()))
        {
            return Err(CatalogError::RowWidthMismatch {
                table: name.to_string(),
                row,
                expected: columns.len(),
                found,
            });
        }

        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(pos, col)| {
                let kind = ColumnKind::infer(rows.iter().map(|r| &r[pos]));
                ColumnDef::new(col, kind)
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            key: name.to_lowercase(),
            columns,
            rows,
            description: description.filter(|d| !d.trim().is_empty()),
        })
    }

    /// Name as registered (trimmed, original casing)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased lookup key
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Get column position by name (case-insensitive)
    pub fn column_position(&self, name: &str) -> Option<usize> {
        let key = name.to_lowercase();
        self.columns.iter().position(|c| c.key() == key)
    }

    pub fn info(&self) -> TableInfo {
        TableInfo {
            name: self.name.clone(),
            columns: self.columns.clone(),
            description: self.description.clone(),
        }
    }
}
