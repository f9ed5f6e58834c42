//! Immutable analytics snapshots and the handle that publishes them.
//!
//! A [`Snapshot`] is built once from a [`RawStore`] and never mutated. The
//! [`SnapshotStore`] swaps whole snapshots in with a single atomic pointer
//! store, so a reader holding an `Arc<Snapshot>` never observes a partially
//! rebuilt table.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use climate_domain::{
    Catalog, CountryMeta, CountryProfile, IndicatorsMeta, SnapshotInfo, YearRange,
};
use climate_store::{RawSource, RawStore};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{AnalyticsError, Result};
use crate::profile::{ProfileBuilder, country_index};

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Every country profile derived from one raw store generation.
#[derive(Debug, Clone)]
pub struct Snapshot {
    generation: u64,
    built_at: DateTime<Utc>,
    years: YearRange,
    catalog: Arc<Catalog>,
    profiles: BTreeMap<String, CountryProfile>,
    unavailable: Vec<String>,
}

impl Snapshot {
    /// Generation zero: no countries, served until the first build lands.
    #[must_use]
    pub fn empty(catalog: Arc<Catalog>, years: YearRange) -> Self {
        Self {
            generation: 0,
            built_at: Utc::now(),
            years,
            catalog,
            profiles: BTreeMap::new(),
            unavailable: Vec::new(),
        }
    }

    /// Build profiles for every country in `raw`.
    #[must_use]
    pub fn build(
        raw: &RawStore,
        catalog: Arc<Catalog>,
        builder: &ProfileBuilder,
        generation: u64,
    ) -> Self {
        let countries = country_index(raw);
        let profiles = builder.build(raw, &catalog, &countries);

        Self {
            generation,
            built_at: Utc::now(),
            years: builder.years(),
            catalog,
            profiles,
            unavailable: raw.unavailable().iter().cloned().collect(),
        }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Profile for a country; the ISO3 lookup ignores case.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::NotFound`] for an unknown country.
    pub fn country_profile(&self, iso3: &str) -> Result<&CountryProfile> {
        self.profiles
            .get(&iso3.to_ascii_uppercase())
            .ok_or_else(|| AnalyticsError::country(iso3))
    }

    /// Profiles in ascending ISO3 order.
    pub fn profiles(&self) -> impl Iterator<Item = &CountryProfile> {
        self.profiles.values()
    }

    #[must_use]
    pub fn country_name(&self, iso3: &str) -> Option<&str> {
        self.profiles.get(iso3).map(|p| p.name.as_str())
    }

    /// Country listing in ascending ISO3 order.
    #[must_use]
    pub fn countries(&self) -> Vec<CountryMeta> {
        self.profiles
            .values()
            .map(|p| CountryMeta {
                iso3: p.iso3.clone(),
                name: p.name.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn indicators(&self) -> IndicatorsMeta {
        self.catalog.metadata()
    }

    /// Upstream codes missing from this generation.
    #[must_use]
    pub fn unavailable(&self) -> &[String] {
        &self.unavailable
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    #[must_use]
    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            generation: self.generation,
            built_at: self.built_at,
            countries: self.profiles.len(),
            indicators: self.catalog.len(),
            unavailable: self.unavailable.clone(),
        }
    }

    /// Check the structural invariants every published snapshot must hold.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::MalformedSnapshot`] naming the first violation.
    pub fn validate(&self) -> Result<()> {
        for (iso3, profile) in &self.profiles {
            if *iso3 != profile.iso3 {
                return Err(malformed(format!(
                    "profile '{}' filed under '{iso3}'",
                    profile.iso3
                )));
            }

            for (cluster, defs) in self.catalog.clusters() {
                let Some(series_by_key) = profile.data.get(&cluster) else {
                    return Err(malformed(format!("{iso3}: cluster '{cluster}' missing")));
                };
                if series_by_key.len() != defs.len() {
                    return Err(malformed(format!(
                        "{iso3}: cluster '{cluster}' has {} series, catalog lists {}",
                        series_by_key.len(),
                        defs.len()
                    )));
                }

                for def in defs {
                    let Some(series) = series_by_key.get(&def.key) else {
                        return Err(malformed(format!("{iso3}: series '{}' missing", def.key)));
                    };
                    if let Some(year) = series.history.keys().find(|y| !self.years.contains(**y)) {
                        return Err(malformed(format!(
                            "{iso3}/{}: year {year} outside {}",
                            def.key,
                            self.years.as_query()
                        )));
                    }
                    if series.current != series.history.values().next_back().copied() {
                        return Err(malformed(format!(
                            "{iso3}/{}: current does not match latest observation",
                            def.key
                        )));
                    }
                    if series.growth_5y.is_some_and(|g| !g.is_finite()) {
                        return Err(malformed(format!("{iso3}/{}: non-finite growth", def.key)));
                    }
                }
            }

            if profile.data.len() != self.catalog.clusters().count() {
                return Err(malformed(format!("{iso3}: unexpected cluster present")));
            }
        }
        Ok(())
    }
}

fn malformed(detail: String) -> AnalyticsError {
    AnalyticsError::MalformedSnapshot(detail)
}

// =============================================================================
// SNAPSHOT STORE
// =============================================================================

/// Atomic handle to the current snapshot.
///
/// Readers call [`SnapshotStore::current`] and keep the returned `Arc` for
/// the whole request. Rebuilds are serialized; a failed rebuild leaves the
/// previous snapshot in place.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    catalog: Arc<Catalog>,
    builder: ProfileBuilder,
    next_generation: AtomicU64,
    rebuild: Mutex<()>,
}

impl SnapshotStore {
    /// Store serving an empty generation-zero snapshot.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, builder: ProfileBuilder) -> Self {
        let empty = Snapshot::empty(Arc::clone(&catalog), builder.years());
        Self {
            current: ArcSwap::from_pointee(empty),
            catalog,
            builder,
            next_generation: AtomicU64::new(1),
            rebuild: Mutex::new(()),
        }
    }

    /// Snapshot in service right now.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    #[must_use]
    pub const fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Reload the raw store from `source`, rebuild, validate, and publish.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::UpstreamUnavailable`] when the source fails,
    /// [`AnalyticsError::MalformedSnapshot`] when the rebuilt snapshot is
    /// rejected. Either way the previous snapshot keeps serving.
    pub async fn refresh(&self, source: &dyn RawSource) -> Result<Arc<Snapshot>> {
        let _guard = self.rebuild.lock().await;

        let raw = source.load(&self.catalog).await.map_err(|e| {
            warn!(error = %e, "Raw store load failed, keeping current snapshot");
            AnalyticsError::from(e)
        })?;

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let catalog = Arc::clone(&self.catalog);
        let builder = self.builder;
        let snapshot = tokio::task::spawn_blocking(move || {
            Snapshot::build(&raw, catalog, &builder, generation)
        })
        .await
        .map_err(|e| malformed(format!("snapshot build task failed: {e}")))?;

        self.install(snapshot)
    }

    /// Build from an already loaded raw store and publish.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::MalformedSnapshot`] when validation fails.
    pub fn rebuild_from(&self, raw: &RawStore) -> Result<Arc<Snapshot>> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let snapshot = Snapshot::build(raw, Arc::clone(&self.catalog), &self.builder, generation);
        self.install(snapshot)
    }

    /// Validate and publish. A snapshot older than the one in service is
    /// validated but not installed.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::MalformedSnapshot`] when validation fails.
    pub fn install(&self, snapshot: Snapshot) -> Result<Arc<Snapshot>> {
        if let Err(e) = snapshot.validate() {
            warn!(
                generation = snapshot.generation(),
                error = %e,
                "Rejected snapshot, keeping current"
            );
            return Err(e);
        }

        let fresh = Arc::new(snapshot);
        let previous = self.current.rcu(|current| {
            if current.generation() < fresh.generation() {
                Arc::clone(&fresh)
            } else {
                Arc::clone(current)
            }
        });

        if previous.generation() < fresh.generation() {
            info!(
                generation = fresh.generation(),
                countries = fresh.len(),
                unavailable = fresh.unavailable().len(),
                "Snapshot published"
            );
            Ok(fresh)
        } else {
            Ok(self.current())
        }
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("generation", &self.current.load().generation())
            .field("indicators", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use climate_domain::{Cluster, IndicatorDef};
    use climate_store::{StaticSource, StoreError};

    fn catalog() -> Arc<Catalog> {
        let defs = [
            (Cluster::EnergyTransition, "co2_emissions", "EN.CO2"),
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

    fn raw_with(value: f64) -> RawStore {
        let mut raw = RawStore::new();
        for iso3 in ["BRA", "DEU", "IND", "USA"] {
            raw.insert("NY.GDP", iso3, 2020, Some(value));
            raw.set_country_name(iso3, iso3);
        }
        raw
    }

    struct FailingSource;

    #[async_trait]
    impl RawSource for FailingSource {
        async fn load(&self, _catalog: &Catalog) -> climate_store::Result<RawStore> {
            Err(StoreError::CacheUnavailable("offline with no cache".into()))
        }
    }

    #[test]
    fn test_new_store_serves_empty_generation_zero() {
        let store = SnapshotStore::new(catalog(), ProfileBuilder::default());
        let snap = store.current();
        assert_eq!(snap.generation(), 0);
        assert!(snap.is_empty());
        assert!(snap.validate().is_ok());
    }

    #[test]
    fn test_country_lookup_ignores_case() {
        let store = SnapshotStore::new(catalog(), ProfileBuilder::default());
        let snap = store.rebuild_from(&raw_with(1.0)).unwrap();
        assert_eq!(snap.country_profile("deu").unwrap().iso3, "DEU");
        assert!(matches!(
            snap.country_profile("XXX"),
            Err(AnalyticsError::NotFound { entity_type: "Country", .. })
        ));
    }

    #[test]
    fn test_info_reports_counts() {
        let store = SnapshotStore::new(catalog(), ProfileBuilder::default());
        let mut raw = raw_with(1.0);
        raw.mark_unavailable("EN.PM25");
        let info = store.rebuild_from(&raw).unwrap().info();
        assert_eq!(info.generation, 1);
        assert_eq!(info.countries, 4);
        assert_eq!(info.indicators, 4);
        assert_eq!(info.unavailable, vec!["EN.PM25".to_string()]);
    }

    #[test]
    fn test_validate_rejects_missing_series() {
        let catalog = catalog();
        let mut snap = Snapshot::build(&raw_with(1.0), catalog, &ProfileBuilder::default(), 1);
        let profile = snap.profiles.get_mut("BRA").unwrap();
        profile
            .data
            .get_mut(&Cluster::EconomicRisk)
            .unwrap()
            .remove("gdp_growth");
        assert!(matches!(
            snap.validate(),
            Err(AnalyticsError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_install_rejects_malformed_and_keeps_current() {
        let store = SnapshotStore::new(catalog(), ProfileBuilder::default());
        let good = store.rebuild_from(&raw_with(1.0)).unwrap();

        let mut bad = Snapshot::build(
            &raw_with(2.0),
            Arc::clone(store.catalog()),
            &ProfileBuilder::default(),
            99,
        );
        bad.profiles.get_mut("USA").unwrap().iso3 = "CAN".into();

        assert!(store.install(bad).is_err());
        assert_eq!(store.current().generation(), good.generation());
    }

    #[test]
    fn test_older_generation_is_not_installed() {
        let store = SnapshotStore::new(catalog(), ProfileBuilder::default());
        let builder = ProfileBuilder::default();
        let newer = Snapshot::build(&raw_with(2.0), Arc::clone(store.catalog()), &builder, 5);
        let older = Snapshot::build(&raw_with(1.0), Arc::clone(store.catalog()), &builder, 4);
        store.install(newer).unwrap();
        let served = store.install(older).unwrap();
        assert_eq!(served.generation(), 5);
        assert_eq!(store.current().generation(), 5);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_snapshot() {
        let store = SnapshotStore::new(catalog(), ProfileBuilder::default());
        let source = StaticSource::new(raw_with(1.0));
        store.refresh(&source).await.unwrap();

        let err = store.refresh(&FailingSource).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::UpstreamUnavailable(_)));
        assert_eq!(store.current().generation(), 1);
        assert_eq!(store.current().len(), 4);
    }

    #[tokio::test]
    async fn test_reader_keeps_its_snapshot_across_refresh() {
        let store = SnapshotStore::new(catalog(), ProfileBuilder::default());
        let source = StaticSource::new(raw_with(1.0));
        store.refresh(&source).await.unwrap();

        let held = store.current();
        source.replace(raw_with(2.0));
        store.refresh(&source).await.unwrap();

        let gdp = |snap: &Snapshot| {
            snap.country_profile("USA")
                .unwrap()
                .series(Cluster::EconomicRisk, "gdp_growth")
                .and_then(|s| s.current)
        };
        let new_snap = store.current();
        assert_eq!(gdp(held.as_ref()), Some(1.0));
        assert_eq!(gdp(new_snap.as_ref()), Some(2.0));
        assert_eq!(new_snap.generation(), held.generation() + 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_never_see_mixed_generations() {
        let store = Arc::new(SnapshotStore::new(catalog(), ProfileBuilder::default()));
        let source = Arc::new(StaticSource::new(raw_with(1.0)));
        store.refresh(source.as_ref()).await.unwrap();

        let mut readers = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let snap = store.current();
                    let values: Vec<Option<f64>> = snap
                        .profiles()
                        .map(|p| {
                            p.series(Cluster::EconomicRisk, "gdp_growth")
                                .and_then(|s| s.current)
                        })
                        .collect();
                    assert!(values.windows(2).all(|w| w[0] == w[1]));
                    tokio::task::yield_now().await;
                }
            }));
        }

        for round in 2..12 {
            source.replace(raw_with(f64::from(round)));
            store.refresh(source.as_ref()).await.unwrap();
        }
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(store.current().generation(), 11);
    }
}
