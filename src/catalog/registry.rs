/// Table registry: the set of tables the engine can query
use super::table::Table;
use super::TableSource;
use crate::error::{BindError, CatalogError};
use crate::types::{Row, TableInfo, Value};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Registry contents. Cloned on write so snapshots stay immutable.
#[derive(Debug, Clone, Default)]
struct RegistryState {
    /// Tables in insertion order
    tables: Vec<Arc<Table>>,
    /// Lowercased name -> position in `tables`
    index: AHashMap<String, usize>,
}

impl RegistryState {
    fn rebuild_index(&mut self) {
        self.index.clear();
        for (pos, table) in self.tables.iter().enumerate() {
            self.index.insert(table.key().to_string(), pos);
        }
    }

    fn get(&self, name: &str) -> Option<&Arc<Table>> {
        let key = name.trim().to_lowercase();
        self.index.get(&key).map(|&pos| &self.tables[pos])
    }
}

/// Registry of in-memory tables
///
/// Writers replace the shared state copy-on-write; an `execute` call works
/// on the `CatalogSnapshot` taken when it starts.
#[derive(Debug, Default)]
pub struct Catalog {
    state: RwLock<Arc<RegistryState>>,
}

/// Immutable view of the catalog at one point in time
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    state: Arc<RegistryState>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table, replacing any table with the same (case-insensitive) name
    #[instrument(level = "debug", skip_all, fields(table = %name.trim(), rows = rows.len()))]
    pub fn register(
        &self,
        name: &str,
        columns: Vec<String>,
        rows: Vec<Row>,
        description: Option<String>,
    ) -> Result<(), CatalogError> {
        let table = Table::new(name, columns, rows, description)?;
        self.install(table);
        Ok(())
    }

    /// Register a user-saved dataset given as a JSON array of records.
    ///
    /// Columns are the union of record keys in first-seen order; missing keys
    /// become NULL.
    pub fn register_records(
        &self,
        name: &str,
        records: &serde_json::Value,
        description: Option<String>,
    ) -> Result<(), CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidDataset {
            table: name.trim().to_string(),
            reason: reason.to_string(),
        };

        let items = records.as_array().ok_or_else(|| invalid("expected a JSON array of records"))?;

        let mut columns: Vec<String> = Vec::new();
        let mut positions: AHashMap<String, usize> = AHashMap::new();
        for item in items {
            let object = item.as_object().ok_or_else(|| invalid("every record must be a JSON object"))?;
            for key in object.keys() {
                if !positions.contains_key(key) {
                    positions.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
        }

        let rows = items
            .iter()
            .filter_map(|item| item.as_object())
            .map(|object| {
                let mut row = vec![Value::Null; columns.len()];
                for (key, value) in object {
                    if let Some(&pos) = positions.get(key) {
                        row[pos] = Value::from_json(value);
                    }
                }
                row
            })
            .collect();

        self.register(name, columns, rows, description)
    }

    fn install(&self, table: Table) {
        let table = Arc::new(table);
        let mut guard = self.state.write();
        let state = Arc::make_mut(&mut *guard);

        match state.index.get(table.key()).copied() {
            Some(pos) => {
                debug!(table = table.name(), "replacing table");
                state.tables[pos] = table;
            }
            None => {
                state.index.insert(table.key().to_string(), state.tables.len());
                state.tables.push(table);
            }
        }
    }

    /// Remove a table; no-op if absent
    #[instrument(level = "debug", skip(self))]
    pub fn unregister(&self, name: &str) {
        let mut guard = self.state.write();
        let key = name.trim().to_lowercase();
        if !guard.index.contains_key(&key) {
            return;
        }
        let state = Arc::make_mut(&mut *guard);
        state.tables.retain(|t| t.key() != key);
        state.rebuild_index();
    }

    /// Capture the current contents
    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            state: self.state.read().clone(),
        }
    }

    /// Check if table exists
    pub fn contains(&self, name: &str) -> bool {
        self.state.read().get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.state.read().tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TableSource for Catalog {
    fn list(&self) -> Vec<TableInfo> {
        self.snapshot().list()
    }

    fn lookup(&self, name: &str) -> Result<Arc<Table>, BindError> {
        self.snapshot().lookup(name)
    }
}

impl TableSource for CatalogSnapshot {
    fn list(&self) -> Vec<TableInfo> {
        self.state.tables.iter().map(|t| t.info()).collect()
    }

    fn lookup(&self, name: &str) -> Result<Arc<Table>, BindError> {
        self.state
            .get(name)
            .cloned()
            .ok_or_else(|| BindError::UnknownTable {
                name: name.trim().to_string(),
                offset: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnKind;
    use serde_json::json;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_register_and_lookup() {
        let catalog = Catalog::new();
        catalog
            .register(
                "  Samples ",
                cols(&["id", "name"]),
                vec![vec![Value::Integer(1), Value::from("blood")]],
                Some("Collected samples".into()),
            )
            .unwrap();

        let table = catalog.lookup("SAMPLES").unwrap();
        assert_eq!(table.name(), "Samples");
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.columns()[0].kind, ColumnKind::Numeric);
        assert!(catalog.contains("samples"));
    }

    #[test]
    fn test_register_rejects_bad_input() {
        let catalog = Catalog::new();
        assert_eq!(
            catalog.register("   ", cols(&["a"]), vec![], None),
            Err(CatalogError::EmptyName)
        );
        assert!(matches!(
            catalog.register("t", cols(&["a", "A"]), vec![], None),
            Err(CatalogError::DuplicateColumn { .. })
        ));
        assert!(matches!(
            catalog.register("t", cols(&["a"]), vec![vec![Value::Null, Value::Null]], None),
            Err(CatalogError::RowWidthMismatch { row: 0, expected: 1, found: 2, .. })
        ));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_replace_keeps_position() {
        let catalog = Catalog::new();
        catalog.register("t1", cols(&["a"]), vec![], None).unwrap();
        catalog.register("t2", cols(&["b"]), vec![], None).unwrap();
        catalog.register("T1", cols(&["x", "y"]), vec![], None).unwrap();

        let tables = catalog.list();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "T1");
        assert_eq!(tables[0].column_names(), vec!["x", "y"]);
        assert_eq!(tables[1].name, "t2");
    }

    #[test]
    fn test_unregister() {
        let catalog = Catalog::new();
        catalog.register("t1", cols(&["a"]), vec![], None).unwrap();
        catalog.register("t2", cols(&["a"]), vec![], None).unwrap();
        catalog.unregister("T1");
        catalog.unregister("missing");

        assert!(matches!(catalog.lookup("t1"), Err(BindError::UnknownTable { .. })));
        assert!(catalog.lookup("t2").is_ok());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_snapshot_is_isolated_from_writes() {
        let catalog = Catalog::new();
        catalog.register("t", cols(&["a"]), vec![vec![Value::Integer(1)]], None).unwrap();
        let snapshot = catalog.snapshot();

        catalog.register("t", cols(&["a"]), vec![], None).unwrap();
        catalog.unregister("t");

        assert_eq!(snapshot.lookup("t").unwrap().rows().len(), 1);
        assert!(catalog.lookup("t").is_err());
    }

    #[test]
    fn test_register_records() {
        let catalog = Catalog::new();
        let records = json!([
            {"id": 1, "collected": "2024-02-01"},
            {"id": 2, "note": "hemolyzed"}
        ]);
        catalog.register_records("My Dataset", &records, None).unwrap();

        let table = catalog.lookup("my dataset").unwrap();
        let info = table.info();
        assert_eq!(info.column_names(), vec!["id", "collected", "note"]);
        assert_eq!(info.columns[1].kind, ColumnKind::Date);
        assert_eq!(table.rows()[1], vec![Value::Integer(2), Value::Null, Value::from("hemolyzed")]);

        assert!(matches!(
            catalog.register_records("bad", &json!({"id": 1}), None),
            Err(CatalogError::InvalidDataset { .. })
        ));
    }
}
