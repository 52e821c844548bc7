//! labsql
//!
//! In-memory SQL engine behind the laboratory workbench query builder.
//!
//! ## Features
//! - SELECT dialect: DISTINCT, TOP, inner and left joins, WHERE, GROUP BY,
//!   HAVING, ORDER BY, LIMIT
//! - Aggregates COUNT/SUM/AVG/MIN/MAX and a fixed set of scalar functions
//! - Errors carry the byte offset of the offending token or expression
//! - Cursor-aware completion of keywords, tables and columns
//!
//! ## Architecture
//! - Catalog: copy-on-write registry of named tables
//! - SQL: lexer, parser, planner (binder), evaluator, executor, completion
//! - Engine: facade tying the catalog to the SQL pipeline

pub mod config;
pub mod types;
pub mod catalog;
pub mod sql;

mod engine;
mod error;

pub use config::{EngineConfig, ExecuteOptions, NullOrdering};
pub use error::{
    BindError, CatalogError, Error, ExecutionError, ExecutionErrorKind, ParseError, ParseErrorKind, Result,
};

pub use catalog::{Catalog, CatalogSnapshot, Table, TableSource};
pub use engine::Engine;
pub use sql::completion::{Suggestion, SuggestionKind};
pub use types::{ColumnDef, ColumnKind, ResultSet, Row, TableInfo, Value};
