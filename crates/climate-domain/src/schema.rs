//! # Payload Schema
//!
//! Every structure crossing the HTTP boundary is declared here, once, and
//! consumed by both the analytics engine (producer) and the API layer and
//! contract tests (consumers). Each payload lists its exact field set in a
//! `FIELDS` constant; [`Contract::check`] compares a serialized value against
//! it so a renamed field fails loudly instead of reaching a client as a
//! silent `null`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SchemaError;
use crate::catalog::Cluster;

// =============================================================================
// CONTRACT
// =============================================================================

/// A payload whose serialized field set is fixed.
pub trait Contract: Serialize {
    /// Validate a serialized value (including nested payloads) against the
    /// declared field sets.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] on any missing or unexpected field.
    fn check(value: &Value) -> Result<(), SchemaError>;

    /// Serialize and validate in one step.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if serialization fails or the result does
    /// not match the contract.
    fn to_contract_value(&self) -> Result<Value, SchemaError>
    where
        Self: Sized,
    {
        let value = serde_json::to_value(self)?;
        Self::check(&value)?;
        Ok(value)
    }
}

impl<T: Contract> Contract for Vec<T> {
    fn check(value: &Value) -> Result<(), SchemaError> {
        match value {
            Value::Array(items) => items.iter().try_for_each(T::check),
            _ => Err(SchemaError::NotAnObject { payload: "list" }),
        }
    }
}

/// Compare the keys of a JSON object against an exact field list.
///
/// # Errors
///
/// Returns a [`SchemaError`] if `value` is not an object or its keys differ
/// from `fields`.
pub fn check_fields(
    payload: &'static str,
    fields: &[&str],
    value: &Value,
) -> Result<(), SchemaError> {
    let Value::Object(map) = value else {
        return Err(SchemaError::NotAnObject { payload });
    };

    let missing: Vec<String> = fields
        .iter()
        .filter(|f| !map.contains_key(**f))
        .map(|f| (*f).to_string())
        .collect();
    let unexpected: Vec<String> = map
        .keys()
        .filter(|k| !fields.contains(&k.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::FieldMismatch {
            payload,
            missing,
            unexpected,
        })
    }
}

fn check_each<T: Contract>(value: Option<&Value>) -> Result<(), SchemaError> {
    value.map_or(Ok(()), Vec::<T>::check)
}

// =============================================================================
// COUNTRY PROFILES
// =============================================================================

/// One indicator for one country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorSeries {
    /// Value at the latest observed year.
    pub current: Option<f64>,
    /// Observed (non-null) values keyed by ascending year.
    pub history: BTreeMap<i32, f64>,
    /// Trailing five-year compound annual growth rate, as a fraction.
    pub growth_5y: Option<f64>,
}

impl IndicatorSeries {
    pub const FIELDS: &'static [&'static str] = &["current", "history", "growth_5y"];

    /// Latest observed year.
    #[must_use]
    pub fn latest_year(&self) -> Option<i32> {
        self.history.keys().next_back().copied()
    }
}

impl Contract for IndicatorSeries {
    fn check(value: &Value) -> Result<(), SchemaError> {
        check_fields("IndicatorSeries", Self::FIELDS, value)
    }
}

/// Indicator key to series, for one cluster of one country.
pub type ClusterProfile = BTreeMap<String, IndicatorSeries>;

/// Full per-country profile across every cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountryProfile {
    pub iso3: String,
    pub name: String,
    pub data: BTreeMap<Cluster, ClusterProfile>,
}

impl CountryProfile {
    pub const FIELDS: &'static [&'static str] = &["iso3", "name", "data"];

    /// Series for an indicator key within its owning cluster.
    #[must_use]
    pub fn series(&self, cluster: Cluster, key: &str) -> Option<&IndicatorSeries> {
        self.data.get(&cluster)?.get(key)
    }
}

impl Contract for CountryProfile {
    fn check(value: &Value) -> Result<(), SchemaError> {
        check_fields("CountryProfile", Self::FIELDS, value)?;
        if let Some(Value::Object(clusters)) = value.get("data") {
            for cluster in clusters.values() {
                let Value::Object(series) = cluster else {
                    return Err(SchemaError::NotAnObject {
                        payload: "ClusterProfile",
                    });
                };
                series.values().try_for_each(IndicatorSeries::check)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// METADATA
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountryMeta {
    pub iso3: String,
    pub name: String,
}

impl CountryMeta {
    pub const FIELDS: &'static [&'static str] = &["iso3", "name"];
}

impl Contract for CountryMeta {
    fn check(value: &Value) -> Result<(), SchemaError> {
        check_fields("CountryMeta", Self::FIELDS, value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterMeta {
    pub description: String,
    pub indicators: Vec<String>,
}

impl ClusterMeta {
    pub const FIELDS: &'static [&'static str] = &["description", "indicators"];
}

/// Cluster-grouped indicator listing.
pub type IndicatorsMeta = BTreeMap<Cluster, ClusterMeta>;

impl Contract for IndicatorsMeta {
    fn check(value: &Value) -> Result<(), SchemaError> {
        let Value::Object(map) = value else {
            return Err(SchemaError::NotAnObject {
                payload: "IndicatorsMeta",
            });
        };
        map.values()
            .try_for_each(|v| check_fields("ClusterMeta", ClusterMeta::FIELDS, v))
    }
}

/// Summary of the snapshot currently being served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotInfo {
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    pub countries: usize,
    pub indicators: usize,
    /// Upstream codes that could not be fetched for this generation.
    pub unavailable: Vec<String>,
}

impl SnapshotInfo {
    pub const FIELDS: &'static [&'static str] =
        &["generation", "built_at", "countries", "indicators", "unavailable"];
}

impl Contract for SnapshotInfo {
    fn check(value: &Value) -> Result<(), SchemaError> {
        check_fields("SnapshotInfo", Self::FIELDS, value)
    }
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub generation: u64,
    pub countries: usize,
}

impl HealthStatus {
    pub const FIELDS: &'static [&'static str] =
        &["status", "version", "generation", "countries"];
}

impl Contract for HealthStatus {
    fn check(value: &Value) -> Result<(), SchemaError> {
        check_fields("HealthStatus", Self::FIELDS, value)
    }
}

/// One row of the latest-value master table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterRow {
    pub iso3: String,
    pub country: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

impl MasterRow {
    /// Columns present on every row ahead of the indicator columns.
    pub const FIXED_FIELDS: &'static [&'static str] = &["iso3", "country"];

    /// Check a serialized row against an exact set of indicator columns.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if a column is missing or unexpected, or
    /// if any value has the wrong type.
    pub fn check_columns<'a>(
        value: &Value,
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), SchemaError> {
        let fields: Vec<&str> = Self::FIXED_FIELDS.iter().copied().chain(keys).collect();
        check_fields("MasterRow", &fields, value)?;
        Self::check(value)
    }
}

impl Contract for MasterRow {
    /// Fixed columns are strings; every other column is a number or null.
    fn check(value: &Value) -> Result<(), SchemaError> {
        let Value::Object(map) = value else {
            return Err(SchemaError::NotAnObject {
                payload: "MasterRow",
            });
        };

        let missing: Vec<String> = Self::FIXED_FIELDS
            .iter()
            .filter(|f| !map.get(**f).is_some_and(Value::is_string))
            .map(|f| (*f).to_string())
            .collect();
        let unexpected: Vec<String> = map
            .iter()
            .filter(|(key, v)| {
                !Self::FIXED_FIELDS.contains(&key.as_str()) && !(v.is_number() || v.is_null())
            })
            .map(|(key, _)| key.clone())
            .collect();

        if missing.is_empty() && unexpected.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::FieldMismatch {
                payload: "MasterRow",
                missing,
                unexpected,
            })
        }
    }
}

// =============================================================================
// ANALYTICS
// =============================================================================

/// One country in a correlation scatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScatterPoint {
    pub iso3: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl ScatterPoint {
    pub const FIELDS: &'static [&'static str] = &["iso3", "name", "x", "y"];
}

impl Contract for ScatterPoint {
    fn check(value: &Value) -> Result<(), SchemaError> {
        check_fields("ScatterPoint", Self::FIELDS, value)
    }
}

/// Cross-country Pearson correlation between two indicators.
///
/// Each country contributes its latest value of each indicator, taken
/// independently; the two values need not share a calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorrelationResult {
    pub x_indicator: String,
    pub y_indicator: String,
    pub pearson_r: Option<f64>,
    pub p_value: Option<f64>,
    pub n_samples: usize,
    pub scatter: Vec<ScatterPoint>,
}

impl CorrelationResult {
    pub const FIELDS: &'static [&'static str] = &[
        "x_indicator",
        "y_indicator",
        "pearson_r",
        "p_value",
        "n_samples",
        "scatter",
    ];
}

impl Contract for CorrelationResult {
    fn check(value: &Value) -> Result<(), SchemaError> {
        check_fields("CorrelationResult", Self::FIELDS, value)?;
        check_each::<ScatterPoint>(value.get("scatter"))
    }
}

/// One country in the green-growth ranking. Rates are percentage points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankingEntry {
    pub rank: usize,
    pub iso3: String,
    pub country: String,
    pub gdp_growth_5y: f64,
    pub co2_growth_5y: f64,
    pub decoupling_score: f64,
}

impl RankingEntry {
    pub const FIELDS: &'static [&'static str] = &[
        "rank",
        "iso3",
        "country",
        "gdp_growth_5y",
        "co2_growth_5y",
        "decoupling_score",
    ];
}

impl Contract for RankingEntry {
    fn check(value: &Value) -> Result<(), SchemaError> {
        check_fields("RankingEntry", Self::FIELDS, value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GreenGrowthReport {
    pub rankings: Vec<RankingEntry>,
    pub total_green_countries: usize,
    pub total_analyzed: usize,
}

impl GreenGrowthReport {
    pub const FIELDS: &'static [&'static str] =
        &["rankings", "total_green_countries", "total_analyzed"];
}

impl Contract for GreenGrowthReport {
    fn check(value: &Value) -> Result<(), SchemaError> {
        check_fields("GreenGrowthReport", Self::FIELDS, value)?;
        check_each::<RankingEntry>(value.get("rankings"))
    }
}

/// A trend-line point; `actual` is null for the projected year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrendPoint {
    pub year: i32,
    pub actual: Option<f64>,
    pub trend: f64,
}

impl TrendPoint {
    pub const FIELDS: &'static [&'static str] = &["year", "actual", "trend"];
}

impl Contract for TrendPoint {
    fn check(value: &Value) -> Result<(), SchemaError> {
        check_fields("TrendPoint", Self::FIELDS, value)
    }
}

/// Linear-trend projection of one indicator for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForecastResult {
    pub iso3: String,
    pub indicator: String,
    pub target_year: i32,
    pub predicted_value: f64,
    pub slope_per_year: f64,
    pub intercept: f64,
    pub r_squared: Option<f64>,
    pub p_value: Option<f64>,
    pub n_samples: usize,
    pub trend_points: Vec<TrendPoint>,
}

impl ForecastResult {
    pub const FIELDS: &'static [&'static str] = &[
        "iso3",
        "indicator",
        "target_year",
        "predicted_value",
        "slope_per_year",
        "intercept",
        "r_squared",
        "p_value",
        "n_samples",
        "trend_points",
    ];
}

impl Contract for ForecastResult {
    fn check(value: &Value) -> Result<(), SchemaError> {
        check_fields("ForecastResult", Self::FIELDS, value)?;
        check_each::<TrendPoint>(value.get("trend_points"))
    }
}
