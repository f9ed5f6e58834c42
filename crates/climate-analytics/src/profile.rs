//! Country profile construction from raw indicator observations.

use std::collections::BTreeMap;

use climate_domain::{Catalog, ClusterProfile, CountryProfile, IndicatorSeries, YearRange};
use climate_store::RawStore;

/// Look-back used for `growth_5y`.
pub const GROWTH_WINDOW_YEARS: i32 = 5;

/// Turns a [`RawStore`] into per-country profiles over a fixed year range.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileBuilder {
    years: YearRange,
}

impl ProfileBuilder {
    /// Builder restricted to `years`.
    #[must_use]
    pub const fn new(years: YearRange) -> Self {
        Self { years }
    }

    /// Year range observations are restricted to.
    #[must_use]
    pub const fn years(&self) -> YearRange {
        self.years
    }

    /// Build a profile for every country in `countries` (ISO3 to display name).
    ///
    /// Every catalog cluster and indicator key is present in every profile;
    /// countries without observations get empty histories.
    #[must_use]
    pub fn build(
        &self,
        raw: &RawStore,
        catalog: &Catalog,
        countries: &BTreeMap<String, String>,
    ) -> BTreeMap<String, CountryProfile> {
        countries
            .iter()
            .map(|(iso3, name)| (iso3.clone(), self.build_country(raw, catalog, iso3, name)))
            .collect()
    }

    /// Build one country's profile.
    #[must_use]
    pub fn build_country(
        &self,
        raw: &RawStore,
        catalog: &Catalog,
        iso3: &str,
        name: &str,
    ) -> CountryProfile {
        let data = catalog
            .clusters()
            .map(|(cluster, defs)| {
                let profile: ClusterProfile = defs
                    .iter()
                    .map(|def| (def.key.clone(), self.build_series(raw, &def.code, iso3)))
                    .collect();
                (cluster, profile)
            })
            .collect();

        CountryProfile {
            iso3: iso3.to_string(),
            name: name.to_string(),
            data,
        }
    }

    /// Observed values of one indicator for one country, with summary fields.
    #[must_use]
    pub fn build_series(&self, raw: &RawStore, code: &str, iso3: &str) -> IndicatorSeries {
        let history: BTreeMap<i32, f64> = raw
            .series(code, iso3)
            .into_iter()
            .flat_map(|series| series.iter().filter(|(year, _)| self.years.contains(**year)))
            .filter_map(|(year, value)| value.filter(|v| v.is_finite()).map(|v| (*year, v)))
            .collect();

        IndicatorSeries {
            current: history.values().next_back().copied(),
            growth_5y: growth_rate(&history, GROWTH_WINDOW_YEARS),
            history,
        }
    }
}

/// ISO3 to display name for every country in the raw store. Countries
/// without a recorded name fall back to their code.
#[must_use]
pub fn country_index(raw: &RawStore) -> BTreeMap<String, String> {
    raw.countries()
        .into_iter()
        .map(|iso3| {
            let name = raw.country_name(iso3).unwrap_or(iso3);
            (iso3.to_string(), name.to_string())
        })
        .collect()
}

/// Compound annual growth rate ending at the most recent observation.
///
/// The base point is the latest year at least `window` years earlier, or the
/// earliest year when none is. Absent with fewer than two points, a
/// non-positive base, a sign change, or a non-finite result.
#[must_use]
pub fn growth_rate(history: &BTreeMap<i32, f64>, window: i32) -> Option<f64> {
    if history.len() < 2 {
        return None;
    }
    let (&end_year, &end) = history.iter().next_back()?;
    let (&base_year, &base) = history
        .range(..=end_year - window)
        .next_back()
        .or_else(|| history.iter().next())?;

    if base_year == end_year || base <= 0.0 || end < 0.0 {
        return None;
    }

    let growth = (end / base).powf(1.0 / f64::from(end_year - base_year)) - 1.0;
    growth.is_finite().then_some(growth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_domain::{Cluster, IndicatorDef};

    fn history(points: &[(i32, f64)]) -> BTreeMap<i32, f64> {
        points.iter().copied().collect()
    }

    fn small_catalog() -> Catalog {
        Catalog::from_definitions([
            IndicatorDef {
                cluster: Cluster::EconomicRisk,
                key: "gdp_growth".into(),
                code: "NY.GDP.MKTP.KD.ZG".into(),
            },
            IndicatorDef {
                cluster: Cluster::EnergyTransition,
                key: "co2_emissions".into(),
                code: "EN.GHG.CO2.MT.CE.AR5".into(),
            },
            IndicatorDef {
                cluster: Cluster::UrbanHealth,
                key: "population".into(),
                code: "SP.POP.TOTL".into(),
            },
            IndicatorDef {
                cluster: Cluster::AgriculturalResilience,
                key: "rule_of_law".into(),
                code: "RL.EST".into(),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_growth_rate_uses_window_base() {
        let g = growth_rate(&history(&[(1990, 10.0), (2000, 20.0)]), 5).unwrap();
        assert!((g - 0.071_773_462_536_293_1).abs() < 1e-9);
    }

    #[test]
    fn test_growth_rate_picks_latest_year_before_window() {
        let h = history(&[(2010, 50.0), (2015, 100.0), (2018, 400.0), (2020, 121.0)]);
        // Base is 2015: (121 / 100)^(1/5) - 1
        let g = growth_rate(&h, 5).unwrap();
        assert!((g - (1.21_f64.powf(0.2) - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_growth_rate_falls_back_to_earliest() {
        let g = growth_rate(&history(&[(2019, 100.0), (2021, 121.0)]), 5).unwrap();
        assert!((g - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_growth_rate_absent_cases() {
        assert_eq!(growth_rate(&history(&[(2020, 5.0)]), 5), None);
        assert_eq!(growth_rate(&history(&[(2010, 0.0), (2020, 5.0)]), 5), None);
        assert_eq!(growth_rate(&history(&[(2010, -3.0), (2020, 5.0)]), 5), None);
        assert_eq!(growth_rate(&history(&[(2010, 3.0), (2020, -5.0)]), 5), None);
    }

    #[test]
    fn test_growth_rate_to_zero_is_total_decline() {
        let g = growth_rate(&history(&[(2015, 4.0), (2020, 0.0)]), 5).unwrap();
        assert!((g + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reversed_year_range_builds_normally() {
        let mut raw = RawStore::new();
        raw.insert("SP.POP.TOTL", "FRA", 1985, Some(1.0));
        raw.insert("SP.POP.TOTL", "FRA", 2000, Some(2.0));
        raw.insert("SP.POP.TOTL", "FRA", 2010, Some(4.0));

        let builder = ProfileBuilder::new(YearRange::new(2023, 1990));
        assert_eq!(builder.years(), YearRange::default());
        let series = builder.build_series(&raw, "SP.POP.TOTL", "FRA");
        assert_eq!(series.history, history(&[(2000, 2.0), (2010, 4.0)]));
    }

    #[test]
    fn test_build_series_filters_range_and_nulls() {
        let mut raw = RawStore::new();
        raw.insert("SP.POP.TOTL", "FRA", 1985, Some(1.0));
        raw.insert("SP.POP.TOTL", "FRA", 2000, Some(2.0));
        raw.insert("SP.POP.TOTL", "FRA", 2005, None);
        raw.insert("SP.POP.TOTL", "FRA", 2010, Some(4.0));

        let series = ProfileBuilder::default().build_series(&raw, "SP.POP.TOTL", "FRA");
        assert_eq!(series.history, history(&[(2000, 2.0), (2010, 4.0)]));
        assert_eq!(series.current, Some(4.0));
        assert!(series.growth_5y.is_some());
    }

    #[test]
    fn test_build_covers_every_key_for_every_country() {
        let catalog = small_catalog();
        let mut raw = RawStore::new();
        raw.insert("SP.POP.TOTL", "FRA", 2020, Some(67.0));
        raw.set_country_name("FRA", "France");
        raw.insert("RL.EST", "CHN", 2020, None);

        let countries = country_index(&raw);
        let profiles = ProfileBuilder::default().build(&raw, &catalog, &countries);

        assert_eq!(profiles.len(), 2);
        for profile in profiles.values() {
            assert_eq!(profile.data.len(), 4);
            for def in catalog.indicators() {
                assert!(profile.series(def.cluster, &def.key).is_some());
            }
        }
        assert_eq!(profiles["FRA"].name, "France");
        assert_eq!(profiles["CHN"].name, "CHN");
        let rule_of_law = profiles["CHN"]
            .series(Cluster::AgriculturalResilience, "rule_of_law")
            .unwrap();
        assert_eq!(rule_of_law.current, None);
        assert!(rule_of_law.history.is_empty());
    }

    #[test]
    fn test_build_is_idempotent() {
        let catalog = small_catalog();
        let mut raw = RawStore::new();
        for (year, value) in [(2000, 1.0), (2005, 2.0), (2010, 3.0)] {
            raw.insert("NY.GDP.MKTP.KD.ZG", "DEU", year, Some(value));
        }
        let countries = country_index(&raw);
        let builder = ProfileBuilder::default();
        assert_eq!(
            builder.build(&raw, &catalog, &countries),
            builder.build(&raw, &catalog, &countries)
        );
    }
}
