//! # Climate Indicator Engine - Domain Model
//!
//! Policy clusters, the indicator catalog, and every payload type exchanged
//! with the reporting front end. These types are the single source of truth
//! across all layers: raw store, analytics, and HTTP.

use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod schema;

pub use catalog::{Catalog, Cluster, IndicatorDef};
pub use schema::{
    ClusterMeta, ClusterProfile, Contract, CorrelationResult, CountryMeta, CountryProfile,
    ForecastResult, GreenGrowthReport, HealthStatus, IndicatorSeries, IndicatorsMeta, MasterRow,
    RankingEntry, ScatterPoint, SnapshotInfo, TrendPoint,
};

// =============================================================================
// VALUE OBJECTS
// =============================================================================

/// Inclusive range of calendar years covered by the raw store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    /// Range between two years, given in either order.
    #[must_use]
    pub const fn new(start: i32, end: i32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    #[must_use]
    pub const fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }

    /// Query-string form used by the World Bank API (`1990:2023`).
    #[must_use]
    pub fn as_query(&self) -> String {
        format!("{}:{}", self.start, self.end)
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 1990,
            end: 2023,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Catalog validation failures. Any of these aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Cluster '{0}' has no indicators")]
    EmptyCluster(Cluster),

    #[error("Indicator key '{key}' is declared more than once")]
    DuplicateKey { key: String },

    #[error("Upstream code '{code}' is bound to both '{first}' and '{second}'")]
    DuplicateCode {
        code: String,
        first: String,
        second: String,
    },

    #[error("Malformed indicator key '{0}': expected lowercase snake_case")]
    MalformedKey(String),

    #[error("Malformed upstream code for indicator '{key}'")]
    MalformedCode { key: String },

    #[error("Unknown cluster '{0}'")]
    UnknownCluster(String),

    #[error("Catalog parse error: {0}")]
    Parse(String),

    #[error("Cannot read catalog {path}: {message}")]
    Io { path: String, message: String },
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Raised when a payload's serialized shape drifts from its declared contract.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("{payload}: expected a JSON object")]
    NotAnObject { payload: &'static str },

    #[error("{payload}: missing fields {missing:?}, unexpected fields {unexpected:?}")]
    FieldMismatch {
        payload: &'static str,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
