//! # Indicator Catalog
//!
//! Closed set of policy clusters, each owning a fixed list of indicator keys
//! bound to World Bank indicator codes. A catalog is validated once when it
//! is loaded; everything downstream can assume keys are unique, well formed,
//! and owned by exactly one cluster.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CatalogError;
use crate::schema::{ClusterMeta, IndicatorsMeta};

// =============================================================================
// CLUSTERS
// =============================================================================

/// Policy domains the indicators are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cluster {
    EnergyTransition,
    AgriculturalResilience,
    UrbanHealth,
    EconomicRisk,
}

impl Cluster {
    pub const ALL: [Self; 4] = [
        Self::EnergyTransition,
        Self::AgriculturalResilience,
        Self::UrbanHealth,
        Self::EconomicRisk,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EnergyTransition => "energy_transition",
            Self::AgriculturalResilience => "agricultural_resilience",
            Self::UrbanHealth => "urban_health",
            Self::EconomicRisk => "economic_risk",
        }
    }

    /// The policy question each cluster answers.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::EnergyTransition => "Is this country actually decarbonizing, or just greenwashing?",
            Self::AgriculturalResilience => "Will food security collapse under +2°C warming?",
            Self::UrbanHealth => "Are cities becoming death traps due to pollution and heat?",
            Self::EconomicRisk => "Is the economy too dependent on extracting resources?",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cluster {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownCluster(s.to_string()))
    }
}

// =============================================================================
// INDICATOR DEFINITIONS
// =============================================================================

/// One catalog entry: a short key bound to an upstream indicator code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorDef {
    pub cluster: Cluster,
    pub key: String,
    pub code: String,
}

/// Key of the GDP growth indicator used by the green-growth ranking.
pub const GDP_GROWTH_KEY: &str = "gdp_growth";

/// Key of the CO2 emissions indicator used by the green-growth ranking.
pub const CO2_EMISSIONS_KEY: &str = "co2_emissions";

const STANDARD_INDICATORS: &[(Cluster, &str, &str)] = &[
    // Energy transition
    (Cluster::EnergyTransition, "co2_emissions", "EN.GHG.CO2.PC.CE.AR5"),
    (Cluster::EnergyTransition, "renewable_energy", "EG.FEC.RNEW.ZS"),
    (Cluster::EnergyTransition, "fossil_fuel_energy_pct", "EG.USE.COMM.FO.ZS"),
    (Cluster::EnergyTransition, "access_electricity", "EG.ELC.ACCS.ZS"),
    (Cluster::EnergyTransition, "electric_power_kwh", "EG.USE.ELEC.KH.PC"),
    (Cluster::EnergyTransition, "energy_use_per_capita", "EG.USE.PCAP.KG.OE"),
    (Cluster::EnergyTransition, "alt_nuclear_energy_pct", "EG.USE.COMM.CL.ZS"),
    (Cluster::EnergyTransition, "co2_from_transport_pct", "EN.CO2.TRAN.ZS"),
    (Cluster::EnergyTransition, "co2_from_manufacturing_pct", "EN.CO2.MANF.ZS"),
    (Cluster::EnergyTransition, "co2_from_electricity_pct", "EN.CO2.ETOT.ZS"),
    (Cluster::EnergyTransition, "energy_intensity", "EG.EGY.PRIM.PP.KD"),
    (Cluster::EnergyTransition, "elec_from_coal_pct", "EG.ELC.COAL.ZS"),
    (Cluster::EnergyTransition, "elec_from_gas_pct", "EG.ELC.NGAS.ZS"),
    (Cluster::EnergyTransition, "elec_from_oil_pct", "EG.ELC.PETR.ZS"),
    (Cluster::EnergyTransition, "elec_from_hydro_pct", "EG.ELC.HYRO.ZS"),
    (Cluster::EnergyTransition, "elec_from_nuclear_pct", "EG.ELC.NUCL.ZS"),
    // Agricultural resilience
    (Cluster::AgriculturalResilience, "cereal_yield", "AG.YLD.CREL.KG"),
    (Cluster::AgriculturalResilience, "agricultural_land_pct", "AG.LND.AGRI.ZS"),
    (Cluster::AgriculturalResilience, "arable_land_pct", "AG.LND.ARBL.ZS"),
    (Cluster::AgriculturalResilience, "fertilizer_consumption", "AG.CON.FERT.ZS"),
    (Cluster::AgriculturalResilience, "food_production_index", "AG.PRD.FOOD.XD"),
    (Cluster::AgriculturalResilience, "crop_production_index", "AG.PRD.CROP.XD"),
    (Cluster::AgriculturalResilience, "livestock_production_index", "AG.PRD.LVSK.XD"),
    (Cluster::AgriculturalResilience, "methane_agriculture_pct", "EN.ATM.METH.AG.ZS"),
    (Cluster::AgriculturalResilience, "n2o_agriculture_pct", "EN.ATM.NOXE.AG.ZS"),
    (Cluster::AgriculturalResilience, "freshwater_withdrawal_agri", "ER.H2O.FWAG.ZS"),
    (Cluster::AgriculturalResilience, "freshwater_per_capita", "ER.H2O.INTR.PC"),
    (Cluster::AgriculturalResilience, "agriculture_value_added_pct", "NV.AGR.TOTL.ZS"),
    (Cluster::AgriculturalResilience, "employment_agriculture_pct", "SL.AGR.EMPL.ZS"),
    (Cluster::AgriculturalResilience, "forest_area_pct", "AG.LND.FRST.ZS"),
    // Urban health
    (Cluster::UrbanHealth, "pm25_exposure", "EN.ATM.PM25.MC.M3"),
    (Cluster::UrbanHealth, "pm25_pop_exposed_pct", "EN.ATM.PM25.MC.ZS"),
    (Cluster::UrbanHealth, "urban_population_pct", "SP.URB.TOTL.IN.ZS"),
    (Cluster::UrbanHealth, "urban_population_growth", "SP.URB.GROW"),
    (Cluster::UrbanHealth, "sanitation_safe_pct", "SH.STA.SMSS.ZS"),
    (Cluster::UrbanHealth, "water_safe_pct", "SH.H2O.SMDW.ZS"),
    (Cluster::UrbanHealth, "sanitation_basic_pct", "SH.STA.BASS.ZS"),
    (Cluster::UrbanHealth, "water_basic_pct", "SH.H2O.BASW.ZS"),
    (Cluster::UrbanHealth, "mortality_under5", "SH.DYN.MORT"),
    (Cluster::UrbanHealth, "life_expectancy", "SP.DYN.LE00.IN"),
    (Cluster::UrbanHealth, "health_expenditure_pct_gdp", "SH.XPD.CHEX.GD.ZS"),
    (Cluster::UrbanHealth, "population_density", "EN.POP.DNST"),
    (Cluster::UrbanHealth, "population_total", "SP.POP.TOTL"),
    // Economic risk
    (Cluster::EconomicRisk, "gdp_per_capita", "NY.GDP.PCAP.CD"),
    (Cluster::EconomicRisk, "gdp_growth", "NY.GDP.MKTP.KD.ZG"),
    (Cluster::EconomicRisk, "inflation", "FP.CPI.TOTL.ZG"),
    (Cluster::EconomicRisk, "fdi_net_inflows_pct", "BX.KLT.DINV.WD.GD.ZS"),
    (Cluster::EconomicRisk, "natural_resource_rents_pct", "NY.GDP.TOTL.RT.ZS"),
    (Cluster::EconomicRisk, "oil_rents_pct", "NY.GDP.PETR.RT.ZS"),
    (Cluster::EconomicRisk, "coal_rents_pct", "NY.GDP.COAL.RT.ZS"),
    (Cluster::EconomicRisk, "mineral_rents_pct", "NY.GDP.MINR.RT.ZS"),
    (Cluster::EconomicRisk, "gas_rents_pct", "NY.GDP.NGAS.RT.ZS"),
    (Cluster::EconomicRisk, "forest_rents_pct", "NY.GDP.FRST.RT.ZS"),
    (Cluster::EconomicRisk, "trade_pct_gdp", "NE.TRD.GNFS.ZS"),
    (Cluster::EconomicRisk, "external_debt_pct_gni", "DT.DOD.DECT.GN.ZS"),
    (Cluster::EconomicRisk, "gross_capital_formation_pct", "NE.GDI.TOTL.ZS"),
    (Cluster::EconomicRisk, "current_account_balance_pct", "BN.CAB.XOKA.GD.ZS"),
];

// =============================================================================
// CATALOG
// =============================================================================

/// Validated indicator catalog.
///
/// Indicators keep their declaration order within a cluster; clusters are
/// always iterated in [`Cluster::ALL`] order.
#[derive(Debug, Clone)]
pub struct Catalog {
    clusters: BTreeMap<Cluster, Vec<IndicatorDef>>,
    by_key: HashMap<String, (Cluster, usize)>,
}

impl Catalog {
    /// The built-in World Bank catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the built-in table is malformed.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_definitions(STANDARD_INDICATORS.iter().map(|(cluster, key, code)| {
            IndicatorDef {
                cluster: *cluster,
                key: (*key).to_string(),
                code: (*code).to_string(),
            }
        }))
    }

    /// Parse a catalog override: a JSON array of `{cluster, key, code}`.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] on malformed JSON or a failed validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let defs: Vec<IndicatorDef> = serde_json::from_str(json)?;
        Self::from_definitions(defs)
    }

    /// The catalog at `path`, or the built-in one when no path is given.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Io`] when the file cannot be read, otherwise as
    /// [`Catalog::from_json`].
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        let Some(path) = path else {
            return Self::standard();
        };
        let json = fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Build and validate a catalog from raw definitions.
    ///
    /// # Errors
    ///
    /// Fails on malformed keys or codes, duplicate keys, a code bound to two
    /// keys, or a cluster left without indicators.
    pub fn from_definitions(
        defs: impl IntoIterator<Item = IndicatorDef>,
    ) -> Result<Self, CatalogError> {
        let mut clusters: BTreeMap<Cluster, Vec<IndicatorDef>> = BTreeMap::new();
        let mut by_key = HashMap::new();
        let mut by_code: HashMap<String, String> = HashMap::new();

        for def in defs {
            if !is_snake_case(&def.key) {
                return Err(CatalogError::MalformedKey(def.key));
            }
            if def.code.is_empty() || def.code.chars().any(char::is_whitespace) {
                return Err(CatalogError::MalformedCode { key: def.key });
            }
            if by_key.contains_key(&def.key) {
                return Err(CatalogError::DuplicateKey { key: def.key });
            }
            if let Some(first) = by_code.get(&def.code) {
                return Err(CatalogError::DuplicateCode {
                    code: def.code.clone(),
                    first: first.clone(),
                    second: def.key,
                });
            }

            by_code.insert(def.code.clone(), def.key.clone());
            let slot = clusters.entry(def.cluster).or_default();
            by_key.insert(def.key.clone(), (def.cluster, slot.len()));
            slot.push(def);
        }

        if let Some(empty) = Cluster::ALL.into_iter().find(|c| !clusters.contains_key(c)) {
            return Err(CatalogError::EmptyCluster(empty));
        }

        Ok(Self { clusters, by_key })
    }

    /// Look up an indicator by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&IndicatorDef> {
        let (cluster, idx) = self.by_key.get(key)?;
        self.clusters.get(cluster).and_then(|defs| defs.get(*idx))
    }

    /// Owning cluster of an indicator key.
    #[must_use]
    pub fn cluster_of(&self, key: &str) -> Option<Cluster> {
        self.by_key.get(key).map(|(cluster, _)| *cluster)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn clusters(&self) -> impl Iterator<Item = (Cluster, &[IndicatorDef])> {
        self.clusters.iter().map(|(c, defs)| (*c, defs.as_slice()))
    }

    /// Every indicator, cluster by cluster.
    pub fn indicators(&self) -> impl Iterator<Item = &IndicatorDef> {
        self.clusters.values().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Catalog dump for client-side configuration.
    #[must_use]
    pub fn metadata(&self) -> IndicatorsMeta {
        self.clusters()
            .map(|(cluster, defs)| {
                (
                    cluster,
                    ClusterMeta {
                        description: cluster.description().to_string(),
                        indicators: defs.iter().map(|d| d.key.clone()).collect(),
                    },
                )
            })
            .collect()
    }
}

fn is_snake_case(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
