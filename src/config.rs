//! Engine configuration
//!
//! Controls result capping, NULL placement in ORDER BY and the parsed
//! statement cache.

use serde::{Deserialize, Serialize};

/// Where NULLs go in ORDER BY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullOrdering {
    /// NULLs last in ASC, first in DESC
    #[default]
    NullsLastAsc,
    /// NULLs first in ASC, last in DESC
    NullsFirstAsc,
}

impl NullOrdering {
    /// Whether NULLs sort before non-NULLs for a key with this direction
    pub fn nulls_first(&self, descending: bool) -> bool {
        match self {
            NullOrdering::NullsLastAsc => descending,
            NullOrdering::NullsFirstAsc => !descending,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Row cap applied when a statement has neither TOP nor LIMIT (0 = unlimited)
    pub default_limit: usize,

    /// NULL placement in ORDER BY
    pub null_ordering: NullOrdering,

    /// Capacity of the parsed statement cache, keyed by SQL text (0 = disabled)
    pub statement_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_limit: 0,
            null_ordering: NullOrdering::NullsLastAsc,
            statement_cache_capacity: 128,
        }
    }
}

impl EngineConfig {
    /// Query builder preset: caps unbounded queries at 1000 rows
    pub fn interactive() -> Self {
        Self {
            default_limit: 1000,
            ..Default::default()
        }
    }

    /// Testing preset: no cache, no cap
    pub fn for_testing() -> Self {
        Self {
            default_limit: 0,
            null_ordering: NullOrdering::NullsLastAsc,
            statement_cache_capacity: 0,
        }
    }

    /// Load from a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Per-call options for `execute`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOptions {
    /// Overrides `EngineConfig::default_limit` for this call (0 = unlimited)
    pub default_limit: Option<usize>,
}

impl ExecuteOptions {
    pub fn with_default_limit(limit: usize) -> Self {
        Self {
            default_limit: Some(limit),
        }
    }
}
