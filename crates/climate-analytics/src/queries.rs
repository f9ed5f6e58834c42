//! Ranking queries.

use std::cmp::Ordering;

use climate_domain::catalog::{CO2_EMISSIONS_KEY, GDP_GROWTH_KEY};
use climate_domain::{GreenGrowthReport, RankingEntry};

use crate::engine::AnalyticsEngine;
use crate::error::Result;

/// Growth rates are reported in percent.
const PERCENT: f64 = 100.0;

impl AnalyticsEngine {
    /// Countries whose economy grew while CO2 emissions fell over the last
    /// five years, ranked by decoupling score (GDP growth minus CO2 growth,
    /// in percentage points).
    ///
    /// Ties break by ascending ISO3. `limit` truncates the ranking only;
    /// the totals always cover every evaluated country.
    ///
    /// # Errors
    ///
    /// [`crate::AnalyticsError::NotFound`] if the catalog lacks either key.
    pub fn green_growth(&self, limit: Option<usize>) -> Result<GreenGrowthReport> {
        let gdp = self.growth_values(GDP_GROWTH_KEY)?;
        let co2 = self.growth_values(CO2_EMISSIONS_KEY)?;

        let mut total_analyzed = 0;
        let mut green = Vec::new();
        for (iso3, &gdp_growth) in &gdp {
            let Some(&co2_growth) = co2.get(iso3) else {
                continue;
            };
            total_analyzed += 1;
            if gdp_growth > 0.0 && co2_growth < 0.0 {
                let gdp_pct = gdp_growth * PERCENT;
                let co2_pct = co2_growth * PERCENT;
                green.push((iso3, gdp_pct, co2_pct, gdp_pct - co2_pct));
            }
        }

        green.sort_by(|a, b| {
            b.3.partial_cmp(&a.3)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        let total_green_countries = green.len();

        let rankings = green
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .enumerate()
            .map(|(i, (iso3, gdp_pct, co2_pct, score))| RankingEntry {
                rank: i + 1,
                iso3: iso3.clone(),
                country: self
                    .snapshot()
                    .country_name(iso3)
                    .unwrap_or(iso3)
                    .to_string(),
                gdp_growth_5y: gdp_pct,
                co2_growth_5y: co2_pct,
                decoupling_score: score,
            })
            .collect();

        Ok(GreenGrowthReport {
            rankings,
            total_green_countries,
            total_analyzed,
        })
    }
}
