//! Engine facade
//!
//! Owns the catalog and the parsed statement cache and exposes the three
//! operations the workbench calls: table registration, `execute` and `suggest`.

use crate::catalog::{Catalog, TableSource};
use crate::config::{EngineConfig, ExecuteOptions};
use crate::error::Result;
use crate::sql::ast::SelectStmt;
use crate::sql::completion::{self, Suggestion};
use crate::sql::executor::QueryExecutor;
use crate::sql::parser::parse_sql;
use crate::sql::planner;
use crate::types::{ResultSet, Row, TableInfo};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// In-memory SQL engine
///
/// # Example
///
/// ```
/// use labsql::{Engine, ExecuteOptions, Value};
///
/// let engine = Engine::new();
/// engine.register_table(
///     "samples",
///     vec!["id".into(), "sample_type".into()],
///     vec![
///         vec![Value::Integer(1), Value::from("blood")],
///         vec![Value::Integer(2), Value::from("serum")],
///     ],
///     None,
/// )?;
///
/// let result = engine.execute("SELECT id FROM samples WHERE sample_type = 'serum'", &ExecuteOptions::default())?;
/// assert_eq!(result.rows, vec![vec![Value::Integer(2)]]);
/// # Ok::<(), labsql::Error>(())
/// ```
pub struct Engine {
    catalog: Catalog,
    config: EngineConfig,
    /// Parsed statements keyed by SQL text; `None` when disabled
    statements: Mutex<Option<LruCache<String, Arc<SelectStmt>>>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let statements = NonZeroUsize::new(config.statement_cache_capacity).map(LruCache::new);
        Self {
            catalog: Catalog::new(),
            config,
            statements: Mutex::new(statements),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Register or replace a table
    pub fn register_table(
        &self,
        name: &str,
        columns: Vec<String>,
        rows: Vec<Row>,
        description: Option<String>,
    ) -> Result<()> {
        Ok(self.catalog.register(name, columns, rows, description)?)
    }

    /// Register a dataset given as a JSON array of records
    pub fn register_records(
        &self,
        name: &str,
        records: &serde_json::Value,
        description: Option<String>,
    ) -> Result<()> {
        Ok(self.catalog.register_records(name, records, description)?)
    }

    pub fn unregister_table(&self, name: &str) {
        self.catalog.unregister(name);
    }

    pub fn list_tables(&self) -> Vec<TableInfo> {
        self.catalog.list()
    }

    /// Columns and inferred kinds of one table
    pub fn describe_table(&self, name: &str) -> Result<TableInfo> {
        Ok(self.catalog.lookup(name)?.info())
    }

    /// Run one SELECT statement against the catalog as it is now
    #[instrument(level = "debug", skip(self, options))]
    pub fn execute(&self, sql: &str, options: &ExecuteOptions) -> Result<ResultSet> {
        let statement = self.parse(sql)?;
        let snapshot = self.catalog.snapshot();
        let plan = planner::plan(&statement, &snapshot)?;

        let default_limit = options.default_limit.unwrap_or(self.config.default_limit);
        let executor = QueryExecutor::new(self.config.null_ordering, default_limit);
        let result = executor.execute(&plan)?;

        debug!(rows = result.row_count(), columns = result.columns.len(), "statement executed");
        Ok(result)
    }

    /// `execute` with default options
    pub fn query(&self, sql: &str) -> Result<ResultSet> {
        self.execute(sql, &ExecuteOptions::default())
    }

    /// Ranked completions for the cursor position; never fails
    #[instrument(level = "trace", skip(self))]
    pub fn suggest(&self, sql: &str, cursor: usize) -> Vec<Suggestion> {
        let snapshot = self.catalog.snapshot();
        completion::suggest(sql, cursor, &snapshot)
    }

    /// Drop every cached statement
    pub fn clear_statement_cache(&self) {
        if let Some(cache) = self.statements.lock().as_mut() {
            cache.clear();
        }
    }

    fn parse(&self, sql: &str) -> Result<Arc<SelectStmt>> {
        if let Some(cache) = self.statements.lock().as_mut() {
            if let Some(statement) = cache.get(sql) {
                trace!("statement cache hit");
                return Ok(Arc::clone(statement));
            }
        }

        let statement = Arc::new(parse_sql(sql)?);
        if let Some(cache) = self.statements.lock().as_mut() {
            cache.put(sql.to_string(), Arc::clone(&statement));
        }
        Ok(statement)
    }

    #[cfg(test)]
    fn cached_statements(&self) -> usize {
        self.statements.lock().as_ref().map_or(0, |c| c.len())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
