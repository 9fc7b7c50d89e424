//! Simulation configuration.
//!
//! Everything is plain data with serde derives so a scenario can be shipped
//! as JSON (from a front end, a test fixture, or a `Restart` command).
//! `Default` gives a 20x20 procedural city with four neighborhoods.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    pub map: MapSpec,
    pub neighborhoods: Vec<NeighborhoodConfig>,
    pub market: MarketConfig,
    pub population: PopulationConfig,
    pub collective: CollectiveConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            map: MapSpec::Procedural {
                rows: 20,
                cols: 20,
                parcels: 280,
            },
            neighborhoods: vec![
                NeighborhoodConfig::named("Riverside", 3.0),
                NeighborhoodConfig::named("Old Town", 2.0),
                NeighborhoodConfig::named("Eastgate", 1.5),
                NeighborhoodConfig::named("Southfield", 1.0),
            ],
            market: MarketConfig::default(),
            population: PopulationConfig::default(),
            collective: CollectiveConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked before the map is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neighborhoods.is_empty() {
            return Err(ConfigError::NoNeighborhoods);
        }
        for n in &self.neighborhoods {
            n.validate()?;
        }

        if let MapSpec::Procedural {
            rows,
            cols,
            parcels,
        } = &self.map
        {
            let capacity = rows.checked_mul(*cols).ok_or(ConfigError::GridTooLarge {
                rows: *rows,
                cols: *cols,
            })?;
            if *parcels == 0 {
                return Err(ConfigError::NoParcels);
            }
            if *parcels > capacity {
                return Err(ConfigError::ParcelCapacity {
                    requested: *parcels,
                    rows: *rows,
                    cols: *cols,
                    capacity,
                });
            }
            if self.neighborhoods.len() > *parcels {
                return Err(ConfigError::TooManyNeighborhoods {
                    neighborhoods: self.neighborhoods.len(),
                    parcels: *parcels,
                });
            }
        }

        self.market.validate()?;
        self.population.validate()?;
        self.collective.validate()
    }
}

// ============================================================================
// Map
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MapSpec {
    /// Grow a connected blob of `parcels` cells from the grid center
    Procedural {
        rows: usize,
        cols: usize,
        parcels: usize,
    },
    /// Designer-authored grid, see [`MapLayout`]
    Layout(MapLayout),
}

/// Rows of optional cells. A cell reads `"<neighborhood>|<ParcelType>"`,
/// e.g. `"2|Residential"` or `"-1|River"` for a cell outside any neighborhood.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapLayout {
    pub layout: Vec<Vec<Option<String>>>,
}

// ============================================================================
// Neighborhoods
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborhoodConfig {
    pub name: String,
    /// Base desirability, also the rent multiplier for new units
    pub desirability: f64,
    pub min_units: u32,
    pub max_units: u32,
    pub min_area: u32,
    pub max_area: u32,
    pub area_per_occupant: f64,
    /// Share of a tower's floors given over to commercial use
    pub p_commercial: f64,
    /// Share of the neighborhood's parcels zoned commercial
    pub commercial_fraction: f64,
    /// Share of the neighborhood's parcels zoned park
    pub park_fraction: f64,
}

impl Default for NeighborhoodConfig {
    fn default() -> Self {
        Self::named("Neighborhood", 1.0)
    }
}

impl NeighborhoodConfig {
    pub fn named(name: impl Into<String>, desirability: f64) -> Self {
        Self {
            name: name.into(),
            desirability,
            min_units: 1,
            max_units: 8,
            min_area: 50,
            max_area: 150,
            area_per_occupant: 40.0,
            p_commercial: 0.2,
            commercial_fraction: 0.1,
            park_fraction: 0.05,
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::Neighborhood {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_units == 0 || self.min_units > self.max_units {
            return Err(self.invalid("unit range must satisfy 1 <= min <= max"));
        }
        if self.min_area == 0 || self.min_area > self.max_area {
            return Err(self.invalid("area range must satisfy 1 <= min <= max"));
        }
        if self.area_per_occupant <= 0.0 {
            return Err(self.invalid("area per occupant must be positive"));
        }
        if self.desirability < 0.0 {
            return Err(self.invalid("desirability must be non-negative"));
        }
        if !(0.0..1.0).contains(&self.p_commercial) {
            return Err(self.invalid("commercial floor share must be in [0, 1)"));
        }
        for f in [self.commercial_fraction, self.park_fraction] {
            if !(0.0..=1.0).contains(&f) {
                return Err(self.invalid("zoning fractions must be in [0, 1]"));
            }
        }
        if self.commercial_fraction + self.park_fraction > 1.0 {
            return Err(self.invalid("zoning fractions sum past 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Market
// ============================================================================

/// How landlords raise rent on a lease anniversary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RentIncreasePolicy {
    /// Always multiply by `rate`
    Fixed { rate: f64 },
    /// Move to the neighborhood trend estimate, clamped to
    /// `[rent * floor, rent * cap]`
    TrendTarget { floor: f64, cap: f64 },
}

/// How unit values are reappraised each appraisal period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppraisalPolicy {
    RentMultiple,
    ComparableSales,
}

impl AppraisalPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RentMultiple => "rent_multiple",
            Self::ComparableSales => "comparable_sales",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub price_per_area: f64,
    pub price_to_rent_ratio: f64,
    /// Months of income an offer or reservation is priced over
    pub pricing_horizon: u32,
    /// Trailing samples in the rent trend regression
    pub trend_window: usize,
    /// Months ahead the trend is extrapolated
    pub trend_horizon: u32,
    pub estimate_sample_size: usize,
    pub offer_sample_size: usize,
    pub vacant_rent_decay: f64,
    pub max_condition_decay: f64,
    pub initial_maintenance: f64,
    pub rent_policy: RentIncreasePolicy,
    pub appraisal_policy: AppraisalPolicy,
    pub appraisal_interval: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            price_per_area: 10.0,
            price_to_rent_ratio: 12.0,
            pricing_horizon: 5 * 12,
            trend_window: 12,
            trend_horizon: 36,
            estimate_sample_size: 10,
            offer_sample_size: 20,
            vacant_rent_decay: 0.98,
            max_condition_decay: 0.02,
            initial_maintenance: 0.01,
            rent_policy: RentIncreasePolicy::TrendTarget {
                floor: 1.02,
                cap: 1.10,
            },
            appraisal_policy: AppraisalPolicy::RentMultiple,
            appraisal_interval: 12,
        }
    }
}

impl MarketConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.price_per_area <= 0.0 || self.price_to_rent_ratio <= 0.0 {
            return Err(ConfigError::Market("prices must be positive".into()));
        }
        if self.trend_window < 2 {
            return Err(ConfigError::Market(
                "trend window needs at least two samples".into(),
            ));
        }
        if self.appraisal_interval == 0 {
            return Err(ConfigError::Market("appraisal interval must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.vacant_rent_decay) {
            return Err(ConfigError::Market("vacant rent decay must be in [0, 1]".into()));
        }
        match self.rent_policy {
            RentIncreasePolicy::Fixed { rate } if rate <= 0.0 => {
                Err(ConfigError::Market("rent increase rate must be positive".into()))
            }
            RentIncreasePolicy::TrendTarget { floor, cap } if floor <= 0.0 || cap < floor => {
                Err(ConfigError::Market("rent policy needs 0 < floor <= cap".into()))
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Population
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantPrefs {
    pub moving_penalty: f64,
    pub min_area: f64,
    pub sample_size: usize,
}

impl Default for TenantPrefs {
    fn default() -> Self {
        Self {
            moving_penalty: 10.0,
            min_area: 50.0,
            sample_size: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub tenants: usize,
    pub landlords: usize,
    pub income_min: u32,
    pub income_max: u32,
    pub prefs: TenantPrefs,
    /// Chance an initial unit goes to a landlord
    pub p_landlord_owned: f64,
    /// Chance an initial unit goes to a tenant investor (otherwise an
    /// occupied unit is owned by one of its occupants)
    pub p_investor_owned: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            tenants: 200,
            landlords: 10,
            income_min: 500,
            income_max: 5000,
            prefs: TenantPrefs::default(),
            p_landlord_owned: 0.33,
            p_investor_owned: 0.33,
        }
    }
}

impl PopulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.income_min == 0 || self.income_min > self.income_max {
            return Err(ConfigError::Population(
                "income range must satisfy 0 < min <= max".into(),
            ));
        }
        if self.p_landlord_owned < 0.0
            || self.p_investor_owned < 0.0
            || self.p_landlord_owned + self.p_investor_owned > 1.0
        {
            return Err(ConfigError::Population(
                "ownership split must be non-negative and sum to at most 1".into(),
            ));
        }
        if self.tenants == 0 && self.landlords == 0 {
            return Err(ConfigError::Population(
                "need at least one tenant or landlord to own units".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Collective
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectiveConfig {
    pub initial_fund: f64,
    pub reserve_fraction: f64,
    pub expense_fraction: f64,
    /// Share of the post-reserve, post-expense revenue paid out as dividends
    pub dividend_fraction: f64,
    /// Share of rent paid to the collective that converts to shares
    pub rent_share: f64,
    /// Months a unit must be held before it can be sold
    pub min_hold_time: u64,
    /// A sale must beat the purchase price by this multiple
    pub min_sale_multiple: f64,
}

impl Default for CollectiveConfig {
    fn default() -> Self {
        Self {
            initial_fund: 500_000.0,
            reserve_fraction: 0.05,
            expense_fraction: 0.05,
            dividend_fraction: 1.0,
            rent_share: 0.1,
            min_hold_time: 5 * 12,
            min_sale_multiple: 1.1,
        }
    }
}

impl CollectiveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fractions = [
            self.reserve_fraction,
            self.expense_fraction,
            self.dividend_fraction,
            self.rent_share,
        ];
        if fractions.iter().any(|f| !(0.0..=1.0).contains(f)) {
            return Err(ConfigError::Collective("fractions must be in [0, 1]".into()));
        }
        if self.reserve_fraction + self.expense_fraction > 1.0 {
            return Err(ConfigError::Collective(
                "reserve and expense fractions sum past 1".into(),
            ));
        }
        if self.initial_fund < 0.0 {
            return Err(ConfigError::Collective("initial fund must be non-negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_parcel_count_past_capacity_fails_fast() {
        let config = SimConfig {
            map: MapSpec::Procedural {
                rows: 4,
                cols: 4,
                parcels: 17,
            },
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ParcelCapacity { capacity: 16, .. })
        ));
    }

    #[test]
    fn test_overflowing_grid_is_rejected() {
        let config = SimConfig {
            map: MapSpec::Procedural {
                rows: usize::MAX,
                cols: 2,
                parcels: 10,
            },
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::GridTooLarge {
                rows: usize::MAX,
                cols: 2
            })
        );
        let json = format!(
            r#"{{"map": {{"kind": "Procedural", "rows": {0}, "cols": {0}, "parcels": 5}}}}"#,
            usize::MAX
        );
        assert!(matches!(
            SimConfig::from_json(&json),
            Err(ConfigError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_zoning_fractions_must_fit() {
        let mut config = SimConfig::default();
        config.neighborhoods[0].commercial_fraction = 0.7;
        config.neighborhoods[0].park_fraction = 0.4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Neighborhood { .. })
        ));
    }

    #[test]
    fn test_zero_zoning_fraction_is_allowed() {
        let mut config = SimConfig::default();
        config.neighborhoods[1].park_fraction = 0.0;
        config.neighborhoods[1].commercial_fraction = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = SimConfig::from_json(
            r#"{
                "seed": 7,
                "map": {"kind": "Procedural", "rows": 10, "cols": 10, "parcels": 40},
                "collective": {"rent_share": 0.25},
                "market": {"rent_policy": {"kind": "Fixed", "rate": 1.05}}
            }"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.collective.rent_share, 0.25);
        assert_eq!(config.collective.reserve_fraction, 0.05);
        assert_eq!(config.market.rent_policy, RentIncreasePolicy::Fixed { rate: 1.05 });
        assert_eq!(config.neighborhoods.len(), 4);
    }

    #[test]
    fn test_from_json_rejects_bad_collective() {
        let err = SimConfig::from_json(
            r#"{"collective": {"reserve_fraction": 0.6, "expense_fraction": 0.6}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Collective(_)));
    }
}
