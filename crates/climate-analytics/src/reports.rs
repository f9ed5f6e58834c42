//! Flat table exports.

use climate_domain::MasterRow;

use crate::engine::AnalyticsEngine;

impl AnalyticsEngine {
    /// One row per country with the latest value of every catalog indicator.
    /// Indicators a country never reported are `null`.
    #[must_use]
    pub fn master_table(&self) -> Vec<MasterRow> {
        let snapshot = self.snapshot();
        let catalog = snapshot.catalog();

        snapshot
            .profiles()
            .map(|profile| MasterRow {
                iso3: profile.iso3.clone(),
                country: profile.name.clone(),
                values: catalog
                    .indicators()
                    .map(|def| {
                        let current = profile.series(def.cluster, &def.key).and_then(|s| s.current);
                        (def.key.clone(), current)
                    })
                    .collect(),
            })
            .collect()
    }
}
