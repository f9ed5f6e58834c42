//! Cross-country analytics over a single snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use climate_domain::{Cluster, CorrelationResult, ForecastResult, ScatterPoint, TrendPoint};

use crate::error::{AnalyticsError, Result};
use crate::snapshot::Snapshot;
use crate::stats;

/// Default horizon for `forecast`.
pub const DEFAULT_TARGET_YEAR: i32 = 2030;

/// Analytics engine pinned to one snapshot.
///
/// Every query reads the snapshot it was created with, so a rebuild
/// published mid-request cannot mix generations into one answer.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    snapshot: Arc<Snapshot>,
}

impl AnalyticsEngine {
    #[must_use]
    pub const fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }

    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Owning cluster of a catalog key.
    fn require_indicator(&self, key: &str) -> Result<Cluster> {
        self.snapshot
            .catalog()
            .cluster_of(key)
            .ok_or_else(|| AnalyticsError::indicator(key))
    }

    /// Latest observed value of `key` per country, omitting countries with none.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::NotFound`] for a key outside the catalog.
    pub fn latest_values(&self, key: &str) -> Result<BTreeMap<String, f64>> {
        let cluster = self.require_indicator(key)?;
        Ok(self
            .snapshot
            .profiles()
            .filter_map(|p| {
                let current = p.series(cluster, key)?.current?;
                Some((p.iso3.clone(), current))
            })
            .collect())
    }

    /// Five-year growth of `key` per country, omitting countries with none.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::NotFound`] for a key outside the catalog.
    pub fn growth_values(&self, key: &str) -> Result<BTreeMap<String, f64>> {
        let cluster = self.require_indicator(key)?;
        Ok(self
            .snapshot
            .profiles()
            .filter_map(|p| {
                let growth = p.series(cluster, key)?.growth_5y?;
                Some((p.iso3.clone(), growth))
            })
            .collect())
    }

    /// Pearson correlation between two indicators across countries, using
    /// each country's latest value of each.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::NotFound`] for an unknown key,
    /// [`AnalyticsError::InsufficientData`] with fewer than three countries
    /// reporting both.
    pub fn correlation(&self, x_key: &str, y_key: &str) -> Result<CorrelationResult> {
        let xs = self.latest_values(x_key)?;
        let ys = self.latest_values(y_key)?;

        let scatter: Vec<ScatterPoint> = xs
            .iter()
            .filter_map(|(iso3, &x)| {
                let &y = ys.get(iso3)?;
                Some(ScatterPoint {
                    iso3: iso3.clone(),
                    name: self.snapshot.country_name(iso3).unwrap_or(iso3).to_string(),
                    x,
                    y,
                })
            })
            .collect();

        let x_values: Vec<f64> = scatter.iter().map(|p| p.x).collect();
        let y_values: Vec<f64> = scatter.iter().map(|p| p.y).collect();
        let fit = stats::pearson(&x_values, &y_values)?;

        tracing::debug!(x = x_key, y = y_key, n = fit.n, r = ?fit.r, "Correlation computed");

        Ok(CorrelationResult {
            x_indicator: x_key.to_string(),
            y_indicator: y_key.to_string(),
            pearson_r: fit.r,
            p_value: fit.p_value,
            n_samples: fit.n,
            scatter,
        })
    }

    /// Linear trend of one country's indicator, extrapolated to `target_year`.
    ///
    /// The trend line has one point per observed year plus a terminal point
    /// at the target year with no actual value.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::NotFound`] for an unknown country or key,
    /// [`AnalyticsError::InsufficientData`] below three observations.
    pub fn forecast(&self, iso3: &str, key: &str, target_year: i32) -> Result<ForecastResult> {
        let profile = self.snapshot.country_profile(iso3)?;
        let cluster = self.require_indicator(key)?;
        let series = profile
            .series(cluster, key)
            .ok_or_else(|| AnalyticsError::indicator(key))?;

        let points: Vec<(f64, f64)> = series
            .history
            .iter()
            .map(|(year, value)| (f64::from(*year), *value))
            .collect();
        let fit = stats::linear_regression(&points)?;

        let mut trend_points: Vec<TrendPoint> = series
            .history
            .iter()
            .map(|(&year, &actual)| TrendPoint {
                year,
                actual: Some(actual),
                trend: fit.predict(f64::from(year)),
            })
            .collect();
        let predicted_value = fit.predict(f64::from(target_year));
        trend_points.push(TrendPoint {
            year: target_year,
            actual: None,
            trend: predicted_value,
        });
        // Stable: a target year inside the history lands after its observation.
        trend_points.sort_by_key(|p| p.year);

        Ok(ForecastResult {
            iso3: profile.iso3.clone(),
            indicator: key.to_string(),
            target_year,
            predicted_value,
            slope_per_year: fit.slope,
            intercept: fit.intercept,
            r_squared: fit.r_squared,
            p_value: fit.p_value,
            n_samples: fit.n,
            trend_points,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::profile::ProfileBuilder;
    use crate::snapshot::SnapshotStore;
    use climate_domain::{Catalog, Cluster, IndicatorDef};
    use climate_store::RawStore;

    pub(crate) fn catalog() -> Arc<Catalog> {
        let defs = [
            (Cluster::EnergyTransition, "co2_emissions", "EN.CO2"),
            (Cluster::EnergyTransition, "renewables_share", "EG.REN"),
            (Cluster::AgriculturalResilience, "cereal_yield", "AG.YLD"),
            (Cluster::UrbanHealth, "pm25", "EN.PM25"),
            (Cluster::EconomicRisk, "gdp_growth", "NY.GDP"),
        ]
        .map(|(cluster, key, code)| IndicatorDef {
            cluster,
            key: key.into(),
            code: code.into(),
        });
        Arc::new(Catalog::from_definitions(defs).unwrap())
    }

    pub(crate) fn engine_for(raw: &RawStore) -> AnalyticsEngine {
        let store = SnapshotStore::new(catalog(), ProfileBuilder::default());
        AnalyticsEngine::new(store.rebuild_from(raw).unwrap())
    }

    fn correlation_raw() -> RawStore {
        let mut raw = RawStore::new();
        let rows = [
            ("ARG", "Argentina", 1.0, 2.0),
            ("BRA", "Brazil", 2.0, 4.0),
            ("CHL", "Chile", 3.0, 5.0),
            ("DNK", "Denmark", 4.0, 4.0),
            ("EGY", "Egypt", 5.0, 5.0),
        ];
        for (iso3, name, x, y) in rows {
            raw.insert("EN.PM25", iso3, 2019, Some(x));
            raw.insert("AG.YLD", iso3, 2020, Some(y));
            raw.set_country_name(iso3, name);
        }
        // Reports only one side: excluded from pairs.
        raw.insert("EN.PM25", "FIN", 2020, Some(9.0));
        raw
    }

    #[test]
    fn test_correlation_pairs_latest_values() {
        let engine = engine_for(&correlation_raw());
        let result = engine.correlation("pm25", "cereal_yield").unwrap();

        assert_eq!(result.n_samples, 5);
        assert_eq!(result.scatter.len(), 5);
        assert_eq!(result.scatter[0].iso3, "ARG");
        assert_eq!(result.scatter[0].name, "Argentina");
        assert!((result.pearson_r.unwrap() - 0.774_596_669_241_483_4).abs() < 1e-9);
        assert!(result.p_value.unwrap() > 0.1);
    }

    #[test]
    fn test_per_country_values_by_key() {
        let mut raw = correlation_raw();
        raw.insert("EG.REN", "ARG", 2010, Some(10.0));
        raw.insert("EG.REN", "ARG", 2020, Some(20.0));
        let engine = engine_for(&raw);

        let pm25 = engine.latest_values("pm25").unwrap();
        assert_eq!(pm25.len(), 6);
        assert_eq!(pm25["FIN"], 9.0);
        assert!(!engine.latest_values("cereal_yield").unwrap().contains_key("FIN"));

        let growth = engine.growth_values("renewables_share").unwrap();
        assert_eq!(growth.len(), 1);
        assert!((growth["ARG"] - (2.0_f64.powf(0.1) - 1.0)).abs() < 1e-12);

        assert!(matches!(
            engine.growth_values("nope"),
            Err(AnalyticsError::NotFound { .. })
        ));
    }

    #[test]
    fn test_correlation_is_symmetric() {
        let engine = engine_for(&correlation_raw());
        let xy = engine.correlation("pm25", "cereal_yield").unwrap();
        let yx = engine.correlation("cereal_yield", "pm25").unwrap();
        assert_eq!(xy.pearson_r, yx.pearson_r);
        assert_eq!(xy.p_value, yx.p_value);
        assert_eq!(xy.n_samples, yx.n_samples);
    }

    #[test]
    fn test_correlation_needs_three_pairs() {
        let mut raw = RawStore::new();
        for (iso3, x) in [("AUT", 1.0), ("BEL", 2.0)] {
            raw.insert("EN.PM25", iso3, 2020, Some(x));
            raw.insert("AG.YLD", iso3, 2020, Some(x * 2.0));
        }
        let err = engine_for(&raw).correlation("pm25", "cereal_yield").unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::InsufficientData {
                required: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn test_correlation_unknown_indicator() {
        let engine = engine_for(&correlation_raw());
        assert!(matches!(
            engine.correlation("pm25", "not_an_indicator"),
            Err(AnalyticsError::NotFound { entity_type: "Indicator", .. })
        ));
    }

    #[test]
    fn test_forecast_exact_line() {
        let mut raw = RawStore::new();
        for (year, value) in [(1990, 1.0), (2000, 2.0), (2010, 3.0)] {
            raw.insert("EG.REN", "NOR", year, Some(value));
        }
        let result = engine_for(&raw).forecast("nor", "renewables_share", 2030).unwrap();

        assert_eq!(result.iso3, "NOR");
        assert!((result.slope_per_year - 0.1).abs() < 1e-9);
        assert!((result.predicted_value - 5.0).abs() < 1e-9);
        assert!((result.r_squared.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(result.n_samples, 3);

        let years: Vec<i32> = result.trend_points.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![1990, 2000, 2010, 2030]);
        let last = result.trend_points.last().unwrap();
        assert_eq!(last.actual, None);
        assert!((last.trend - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_forecast_target_inside_history_stays_ordered() {
        let mut raw = RawStore::new();
        for (year, value) in [(2000, 1.0), (2005, 2.0), (2010, 3.0)] {
            raw.insert("EG.REN", "NOR", year, Some(value));
        }
        let result = engine_for(&raw).forecast("NOR", "renewables_share", 2005).unwrap();
        let years: Vec<i32> = result.trend_points.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2000, 2005, 2005, 2010]);
        assert_eq!(result.trend_points[1].actual, Some(2.0));
        assert_eq!(result.trend_points[2].actual, None);
    }

    #[test]
    fn test_forecast_errors() {
        let mut raw = RawStore::new();
        raw.insert("EG.REN", "NOR", 2000, Some(1.0));
        raw.insert("EG.REN", "NOR", 2010, Some(2.0));
        let engine = engine_for(&raw);

        assert!(matches!(
            engine.forecast("ZZZ", "renewables_share", 2030),
            Err(AnalyticsError::NotFound { entity_type: "Country", .. })
        ));
        assert!(matches!(
            engine.forecast("NOR", "nope", 2030),
            Err(AnalyticsError::NotFound { entity_type: "Indicator", .. })
        ));
        assert!(matches!(
            engine.forecast("NOR", "renewables_share", 2030),
            Err(AnalyticsError::InsufficientData { available: 2, .. })
        ));
    }
}
