//! Table catalog: registry, tables and the source trait the planner binds against

mod registry;
mod table;
pub mod lab;

pub use registry::{Catalog, CatalogSnapshot};
pub use table::Table;

use crate::error::BindError;
use crate::types::TableInfo;
use std::sync::Arc;

/// Provider of tables for name resolution
pub trait TableSource {
    /// All tables, in insertion order
    fn list(&self) -> Vec<TableInfo>;

    /// Case-insensitive lookup; `UnknownTable` if absent
    fn lookup(&self, name: &str) -> Result<Arc<Table>, BindError>;
}
