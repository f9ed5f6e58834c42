//! # Raw Store
//!
//! Sparse `(indicator code, country, year) -> Option<f64>` table built from
//! World Bank records. Read-only once handed to the profile builder.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// World Bank aggregate and region codes. These are not countries.
pub const AGGREGATE_CODES: &[&str] = &[
    "WLD", "EAS", "ECS", "LCN", "MEA", "NAC", "SAS", "SSF", "EAP", "ECA", "LAC", "MNA", "SSA",
    "HIC", "LIC", "LMC", "LMY", "MIC", "UMC", "ARB", "CEB", "CSS", "EAR", "EMU", "FCS", "HPC",
    "IBD", "IBT", "IDA", "IDB", "IDX", "INX", "LDC", "LTE", "OED", "OSS", "PRE", "PSS", "PST",
    "SST", "TEA", "TEC", "TLA", "TMN", "TSA", "TSS", "AFE", "AFW",
];

/// Country reference embedded in a World Bank record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub value: String,
}

/// A single observation as returned by the World Bank API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "countryiso3code", default)]
    pub iso3: String,
    #[serde(default)]
    pub country: Option<CountryRef>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
}

impl RawRecord {
    /// Convenience constructor, mostly for fixtures.
    #[must_use]
    pub fn new(iso3: &str, name: &str, year: i32, value: Option<f64>) -> Self {
        Self {
            iso3: iso3.to_string(),
            country: Some(CountryRef {
                id: String::new(),
                value: name.to_string(),
            }),
            date: Some(year.to_string()),
            value,
        }
    }

    fn year(&self) -> Option<i32> {
        self.date.as_deref()?.trim().parse().ok()
    }
}

type CountrySeries = BTreeMap<i32, Option<f64>>;

/// In-memory raw indicator table.
#[derive(Debug, Clone, Default)]
pub struct RawStore {
    values: HashMap<String, BTreeMap<String, CountrySeries>>,
    names: BTreeMap<String, String>,
    unavailable: BTreeSet<String>,
}

impl RawStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation. The first non-null value for a cell wins.
    pub fn insert(&mut self, code: &str, iso3: &str, year: i32, value: Option<f64>) {
        let value = value.filter(|v| v.is_finite());
        let cell = self
            .values
            .entry(code.to_string())
            .or_default()
            .entry(iso3.to_string())
            .or_default()
            .entry(year)
            .or_insert(None);
        if cell.is_none() {
            *cell = value;
        }
    }

    pub fn set_country_name(&mut self, iso3: &str, name: &str) {
        self.names
            .entry(iso3.to_string())
            .or_insert_with(|| name.to_string());
    }

    /// Load World Bank records for one indicator code, dropping aggregates
    /// and undated rows. Returns the number of records kept.
    pub fn ingest_records(&mut self, code: &str, records: &[RawRecord]) -> usize {
        let mut kept = 0;
        for record in records {
            let iso3 = record.iso3.trim();
            if iso3.is_empty() || AGGREGATE_CODES.contains(&iso3) {
                continue;
            }
            let Some(year) = record.year() else {
                continue;
            };

            self.insert(code, iso3, year, record.value);
            match record.country.as_ref().map(|c| c.value.as_str()) {
                Some(name) if !name.is_empty() => self.set_country_name(iso3, name),
                _ => self.set_country_name(iso3, iso3),
            }
            kept += 1;
        }
        // An indicator that answered, even with nothing usable, is known.
        self.values.entry(code.to_string()).or_default();
        kept
    }

    /// Flag an indicator whose upstream fetch failed.
    pub fn mark_unavailable(&mut self, code: &str) {
        self.unavailable.insert(code.to_string());
    }

    #[must_use]
    pub fn get(&self, code: &str, iso3: &str, year: i32) -> Option<f64> {
        self.series(code, iso3)?.get(&year).copied().flatten()
    }

    /// Every recorded year (null or not) for one indicator and country.
    #[must_use]
    pub fn series(&self, code: &str, iso3: &str) -> Option<&BTreeMap<i32, Option<f64>>> {
        self.values.get(code)?.get(iso3)
    }

    /// All countries seen in any indicator, ascending.
    #[must_use]
    pub fn countries(&self) -> BTreeSet<&str> {
        self.values
            .values()
            .flat_map(BTreeMap::keys)
            .chain(self.names.keys())
            .map(String::as_str)
            .collect()
    }

    #[must_use]
    pub fn country_name(&self, iso3: &str) -> Option<&str> {
        self.names.get(iso3).map(String::as_str)
    }

    #[must_use]
    pub const fn unavailable(&self) -> &BTreeSet<String> {
        &self.unavailable
    }

    #[must_use]
    pub fn has_indicator(&self, code: &str) -> bool {
        self.values.contains_key(code)
    }

    #[must_use]
    pub fn indicator_count(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.values().all(BTreeMap::is_empty)
    }
}
