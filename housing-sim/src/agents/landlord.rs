use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::config::{MarketConfig, RentIncreasePolicy};
use crate::forecast;
use crate::geography::City;
use crate::market::{Offer, Reservation};
use crate::types::{LandlordId, Month, NeighborhoodId, Owner, UnitId};
use crate::units::Unit;

#[cfg(feature = "instrument")]
use crate::types::KeyToU64;

/// A for-profit owner that tracks neighborhood rents, manages its units
/// and bids on units it expects to out-earn their current rent.
#[derive(Debug, Clone)]
pub struct Landlord {
    pub units: BTreeSet<UnitId>,
    /// Mean rent per area observed each tick, per neighborhood
    pub rent_history: Vec<Vec<f64>>,
    /// Forecast rent per area, per neighborhood
    pub trend_ests: Vec<f64>,
    /// Forecast minus latest observation, per neighborhood
    pub invest_ests: Vec<f64>,
    /// Lowest maintenance/income ratio seen in the last estimate
    pub maintenance_ratios: Vec<Option<f64>>,
    /// Bids that carry over between ticks until withdrawn or won
    pub outstanding: BTreeMap<UnitId, f64>,
    pub sales: u32,
}

impl Landlord {
    pub fn new(neighborhoods: usize) -> Self {
        Self {
            units: BTreeSet::new(),
            rent_history: vec![Vec::new(); neighborhoods],
            trend_ests: vec![0.0; neighborhoods],
            invest_ests: vec![0.0; neighborhoods],
            maintenance_ratios: vec![None; neighborhoods],
            outstanding: BTreeMap::new(),
            sales: 0,
        }
    }

    pub fn step<R: Rng>(
        &mut self,
        id: LandlordId,
        month: Month,
        city: &mut City,
        market: &MarketConfig,
        rng: &mut R,
    ) {
        self.estimate_rents(city, market.estimate_sample_size, rng);
        self.estimate_trends(market.trend_window, market.trend_horizon);

        self.maintain_units(city, market.max_condition_decay, rng);
        self.manage_vacant_units(id, month, city, market);
        self.manage_occupied_units(id, month, city, market);

        self.make_offers(id, month, city, market, rng);
    }

    // === ESTIMATION ===

    /// Append this tick's mean rent per area for every neighborhood, from
    /// own occupied units plus a random sample of the neighborhood.
    /// Also records the lowest maintenance/income ratio among them.
    pub fn estimate_rents<R: Rng>(&mut self, city: &City, sample_size: usize, rng: &mut R) {
        for i in 0..self.rent_history.len() {
            let neighborhood = NeighborhoodId(i as u32);
            let own = self
                .units
                .iter()
                .filter_map(|id| city.unit(*id))
                .filter(|u| u.neighborhood == neighborhood);
            let pool = city.neighborhood_units(neighborhood);
            let sampled = pool
                .choose_multiple(rng, sample_size.min(pool.len()))
                .filter_map(|id| city.unit(*id));

            let mut rents = Vec::new();
            let mut ratio: Option<f64> = None;
            for (unit, owned) in own.map(|u| (u, true)).chain(sampled.map(|u| (u, false))) {
                if !owned || !unit.is_vacant() {
                    rents.push(unit.rent_per_area());
                }
                if let Some(r) = unit.maintenance_ratio() {
                    ratio = Some(ratio.map_or(r, |m| m.min(r)));
                }
            }

            if !rents.is_empty() {
                self.rent_history[i].push(rents.iter().sum::<f64>() / rents.len() as f64);
            }
            self.maintenance_ratios[i] = ratio;
        }
    }

    /// Fit a line to the trailing `window` estimates and project `horizon`
    /// months ahead. Until the window fills the latest estimate stands in
    /// for the forecast and nothing looks like an investment.
    pub fn estimate_trends(&mut self, window: usize, horizon: u32) {
        for (i, history) in self.rent_history.iter().enumerate() {
            let Some(&latest) = history.last() else {
                continue;
            };
            match forecast::extrapolate(history, window, horizon) {
                Some(est) => {
                    self.trend_ests[i] = est;
                    self.invest_ests[i] = est - latest;
                }
                None => {
                    self.trend_ests[i] = latest;
                    self.invest_ests[i] = 0.0;
                }
            }
        }
    }

    /// Forecast monthly rent for a unit
    pub fn forecast_rent(&self, unit: &Unit) -> f64 {
        self.trend_ests
            .get(unit.neighborhood.index())
            .copied()
            .unwrap_or(0.0)
            * unit.area
    }

    // === UNIT MANAGEMENT ===

    /// Budget maintenance at the most frugal observed ratio, then let
    /// condition decay and recover
    pub fn maintain_units<R: Rng>(&self, city: &mut City, max_decay: f64, rng: &mut R) {
        for id in &self.units {
            let Some(unit) = city.unit_mut(*id) else {
                continue;
            };
            if let Some(ratio) = self
                .maintenance_ratios
                .get(unit.neighborhood.index())
                .copied()
                .flatten()
            {
                unit.maintenance = ratio * unit.rent;
            }
            let decay = rng.random::<f64>() * max_decay;
            unit.condition = (unit.condition - decay + unit.maintenance).clamp(0.0, 1.0);
        }
    }

    /// Cut rent on every second vacant month. Rent collection does the
    /// counting.
    pub fn manage_vacant_units(
        &self,
        id: LandlordId,
        month: Month,
        city: &mut City,
        market: &MarketConfig,
    ) {
        for unit_id in &self.units {
            let Some(unit) = city.unit_mut(*unit_id) else {
                continue;
            };
            if !unit.is_vacant() {
                continue;
            }
            if unit.months_vacant > 0 && unit.months_vacant % 2 == 0 {
                let old_rent = unit.rent;
                unit.rent *= market.vacant_rent_decay;

                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "rent",
                    tick = month,
                    unit_id = unit_id.to_u64(),
                    landlord_id = id.to_u64(),
                    neighborhood = unit.neighborhood.0,
                    reason = "vacancy",
                    old_rent = old_rent,
                    new_rent = unit.rent,
                );
                let _ = (id, month, old_rent);
            }
        }
    }

    /// Raise rent on full-year lease anniversaries per the configured policy
    pub fn manage_occupied_units(
        &self,
        id: LandlordId,
        month: Month,
        city: &mut City,
        market: &MarketConfig,
    ) {
        for unit_id in &self.units {
            let target = city.unit(*unit_id).map(|u| self.forecast_rent(u));
            let Some(unit) = city.unit_mut(*unit_id) else {
                continue;
            };
            if unit.is_vacant() || !unit.is_lease_anniversary(month) {
                continue;
            }
            let old_rent = unit.rent;
            unit.rent = match market.rent_policy {
                RentIncreasePolicy::Fixed { rate } => old_rent * rate,
                RentIncreasePolicy::TrendTarget { floor, cap } => target
                    .unwrap_or(old_rent)
                    .clamp(old_rent * floor, old_rent * cap),
            };

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "rent",
                tick = month,
                unit_id = unit_id.to_u64(),
                landlord_id = id.to_u64(),
                neighborhood = unit.neighborhood.0,
                reason = "lease",
                old_rent = old_rent,
                new_rent = unit.rent,
            );
            let _ = id;
        }
    }

    // === OFFERS ===

    /// Pick a neighborhood weighted by positive investment estimates, or
    /// uniformly when none is positive. Neighborhoods without units are
    /// never picked.
    pub fn choose_neighborhood<R: Rng>(&self, city: &City, rng: &mut R) -> Option<NeighborhoodId> {
        let candidates: Vec<usize> = (0..self.invest_ests.len())
            .filter(|i| !city.neighborhood_units(NeighborhoodId(*i as u32)).is_empty())
            .collect();
        let chosen = match candidates.choose_weighted(rng, |i| self.invest_ests[*i].max(0.0)) {
            Ok(i) => Some(*i),
            Err(_) => candidates.choose(rng).copied(),
        };
        chosen.map(|i| NeighborhoodId(i as u32))
    }

    /// Revise carried-over bids, then bid on sampled units in a chosen
    /// neighborhood whose forecast rent beats their current rent
    pub fn make_offers<R: Rng>(
        &mut self,
        id: LandlordId,
        month: Month,
        city: &mut City,
        market: &MarketConfig,
        rng: &mut R,
    ) {
        let me = Owner::Landlord(id);
        let horizon = market.pricing_horizon as f64;

        let previous = std::mem::take(&mut self.outstanding);
        for (unit_id, prev) in previous {
            let Some(unit) = city.unit(unit_id) else {
                continue;
            };
            let forecast = self.forecast_rent(unit);
            if unit.owner == Some(me) || forecast <= unit.rent {
                continue;
            }
            let amount = prev.min(forecast * horizon);
            self.submit(me, month, unit_id, amount, true, city);
        }

        let Some(neighborhood) = self.choose_neighborhood(city, rng) else {
            return;
        };
        let pool = city.neighborhood_units(neighborhood);
        let sample: Vec<UnitId> = pool
            .choose_multiple(rng, market.offer_sample_size.min(pool.len()))
            .copied()
            .collect();
        for unit_id in sample {
            if self.units.contains(&unit_id) || self.outstanding.contains_key(&unit_id) {
                continue;
            }
            let Some(unit) = city.unit(unit_id) else {
                continue;
            };
            let forecast = self.forecast_rent(unit);
            if forecast > unit.rent {
                self.submit(me, month, unit_id, forecast * horizon, false, city);
            }
        }
    }

    fn submit(
        &mut self,
        me: Owner,
        month: Month,
        unit_id: UnitId,
        amount: f64,
        revised: bool,
        city: &mut City,
    ) {
        let Some(unit) = city.unit_mut(unit_id) else {
            return;
        };
        unit.offers.push(Offer::new(me, amount));
        self.outstanding.insert(unit_id, amount);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "offer",
            tick = month,
            unit_id = unit_id.to_u64(),
            neighborhood = unit.neighborhood.0,
            bidder = me.label(),
            bidder_id = me.raw_id(),
            amount = amount,
            asking_rent = unit.rent,
            revised = revised,
        );
        let _ = (month, revised);
    }

    /// Lowest price this landlord sells at: forecast income net of
    /// maintenance over the pricing horizon
    pub fn reservation(&self, unit: &Unit, market: &MarketConfig) -> Reservation {
        let forecast = self.forecast_rent(unit);
        Reservation {
            forecast,
            value: (forecast - unit.maintenance) * market.pricing_horizon as f64,
        }
    }

    pub fn occupied_units(&self, city: &City) -> usize {
        self.units
            .iter()
            .filter_map(|id| city.unit(*id))
            .filter(|u| !u.is_vacant())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MapLayout, NeighborhoodConfig};
    use crate::types::TenantId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use slotmap::SlotMap;

    /// One building of `units` identical units in a single neighborhood
    fn city(units: u32, rng: &mut StdRng) -> City {
        let map = MapLayout {
            layout: vec![vec![Some("0|Residential".to_string())]],
        };
        let mut neighb = NeighborhoodConfig::named("n0", 1.0);
        neighb.min_units = units;
        neighb.max_units = units;
        neighb.min_area = 100;
        neighb.max_area = 100;
        let mut city = City::from_layout(&map, vec![neighb]).unwrap();
        city.build_residences(&MarketConfig::default(), rng);
        city
    }

    fn landlord_ids(n: usize) -> Vec<LandlordId> {
        let mut keys: SlotMap<LandlordId, ()> = SlotMap::with_key();
        (0..n).map(|_| keys.insert(())).collect()
    }

    fn own(landlord: &mut Landlord, id: LandlordId, city: &mut City, unit: UnitId) {
        city.unit_mut(unit).unwrap().owner = Some(Owner::Landlord(id));
        landlord.units.insert(unit);
    }

    #[test]
    fn test_trend_waits_for_full_window() {
        let mut landlord = Landlord::new(1);
        landlord.rent_history[0] = vec![10.0, 11.0, 12.0];
        landlord.estimate_trends(4, 2);
        assert_eq!(landlord.trend_ests[0], 12.0);
        assert_eq!(landlord.invest_ests[0], 0.0);

        landlord.rent_history[0].push(13.0);
        landlord.estimate_trends(4, 2);
        assert!((landlord.trend_ests[0] - 15.0).abs() < 1e-9);
        assert!((landlord.invest_ests[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_rents_appends_mean() {
        let mut rng = StdRng::seed_from_u64(21);
        let city = city(4, &mut rng);
        let mut landlord = Landlord::new(1);
        landlord.estimate_rents(&city, 10, &mut rng);
        // All units share area and rent, so every sample agrees
        assert_eq!(landlord.rent_history[0], vec![10.0]);
    }

    #[test]
    fn test_vacant_rent_decays_every_second_month() {
        let mut rng = StdRng::seed_from_u64(22);
        let mut city = city(1, &mut rng);
        let id = landlord_ids(1)[0];
        let mut landlord = Landlord::new(1);
        let unit = city.units.keys().next().unwrap();
        own(&mut landlord, id, &mut city, unit);

        let market = MarketConfig::default();
        landlord.manage_vacant_units(id, 0, &mut city, &market);
        assert_eq!(city.unit(unit).unwrap().rent, 1000.0);
        for month in 1..=2 {
            city.unit_mut(unit).unwrap().collect_rent();
            landlord.manage_vacant_units(id, month, &mut city, &market);
        }
        assert!((city.unit(unit).unwrap().rent - 980.0).abs() < 1e-9);
        assert_eq!(city.unit(unit).unwrap().months_vacant, 2);
    }

    #[test]
    fn test_lease_anniversary_raises_rent_within_policy() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut city = city(1, &mut rng);
        let id = landlord_ids(1)[0];
        let mut landlord = Landlord::new(1);
        let unit = city.units.keys().next().unwrap();
        own(&mut landlord, id, &mut city, unit);
        let mut tenants: SlotMap<TenantId, ()> = SlotMap::with_key();
        city.unit_mut(unit).unwrap().admit(tenants.insert(()), 0);

        // Forecast far above rent: capped
        landlord.trend_ests[0] = 50.0;
        let mut market = MarketConfig::default();
        landlord.manage_occupied_units(id, 6, &mut city, &market);
        assert_eq!(city.unit(unit).unwrap().rent, 1000.0);
        landlord.manage_occupied_units(id, 12, &mut city, &market);
        assert!((city.unit(unit).unwrap().rent - 1100.0).abs() < 1e-9);

        // Forecast below rent: floored
        landlord.trend_ests[0] = 1.0;
        landlord.manage_occupied_units(id, 24, &mut city, &market);
        assert!((city.unit(unit).unwrap().rent - 1122.0).abs() < 1e-9);

        market.rent_policy = RentIncreasePolicy::Fixed { rate: 1.5 };
        landlord.manage_occupied_units(id, 36, &mut city, &market);
        assert!((city.unit(unit).unwrap().rent - 1683.0).abs() < 1e-9);
    }

    #[test]
    fn test_condition_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(24);
        let mut city = city(4, &mut rng);
        let id = landlord_ids(1)[0];
        let mut landlord = Landlord::new(1);
        for unit in city.units.keys().collect::<Vec<_>>() {
            own(&mut landlord, id, &mut city, unit);
        }
        for _ in 0..200 {
            landlord.maintain_units(&mut city, 0.5, &mut rng);
        }
        assert!(city.units.values().all(|u| (0.0..=1.0).contains(&u.condition)));
    }

    #[test]
    fn test_offers_skip_own_units_and_price_underrented() {
        let mut rng = StdRng::seed_from_u64(25);
        let mut city = city(4, &mut rng);
        let ids = landlord_ids(2);
        let mut mine = Landlord::new(1);
        let units: Vec<UnitId> = city.units.keys().collect();
        own(&mut mine, ids[0], &mut city, units[0]);
        city.unit_mut(units[1]).unwrap().rent = 2000.0;

        // Forecast 15/area -> 1500 per unit
        mine.trend_ests[0] = 15.0;
        let market = MarketConfig::default();
        mine.make_offers(ids[0], 1, &mut city, &market, &mut rng);

        assert!(city.unit(units[0]).unwrap().offers.is_empty());
        assert!(city.unit(units[1]).unwrap().offers.is_empty());
        for unit in &units[2..] {
            let offers = &city.unit(*unit).unwrap().offers;
            assert_eq!(offers.len(), 1);
            assert_eq!(offers[0].amount, 1500.0 * 60.0);
            assert_eq!(offers[0].bidder, Owner::Landlord(ids[0]));
        }
        assert_eq!(mine.outstanding.len(), 2);
    }

    #[test]
    fn test_outstanding_bids_revised_down_or_dropped() {
        let mut rng = StdRng::seed_from_u64(26);
        let mut city = city(2, &mut rng);
        let ids = landlord_ids(1);
        let units: Vec<UnitId> = city.units.keys().collect();
        let mut landlord = Landlord::new(1);
        landlord.trend_ests[0] = 15.0;
        landlord.outstanding.insert(units[0], 50_000.0);
        landlord.outstanding.insert(units[1], 200_000.0);
        // Empty the neighborhood pick so only revisions happen
        let market = MarketConfig {
            offer_sample_size: 0,
            ..MarketConfig::default()
        };

        landlord.make_offers(ids[0], 1, &mut city, &market, &mut rng);
        assert_eq!(landlord.outstanding[&units[0]], 50_000.0);
        assert_eq!(landlord.outstanding[&units[1]], 1500.0 * 60.0);

        for unit in &units {
            city.unit_mut(*unit).unwrap().offers.clear();
        }
        own(&mut landlord, ids[0], &mut city, units[0]);
        landlord.trend_ests[0] = 5.0;
        landlord.make_offers(ids[0], 2, &mut city, &market, &mut rng);
        assert!(landlord.outstanding.is_empty());
        assert!(city.units.values().all(|u| u.offers.is_empty()));
    }

    #[test]
    fn test_reservation_nets_out_maintenance() {
        let mut rng = StdRng::seed_from_u64(27);
        let mut city = city(1, &mut rng);
        let unit = city.units.keys().next().unwrap();
        city.unit_mut(unit).unwrap().maintenance = 100.0;
        let mut landlord = Landlord::new(1);
        landlord.trend_ests[0] = 12.0;
        let r = landlord.reservation(city.unit(unit).unwrap(), &MarketConfig::default());
        assert_eq!(r.forecast, 1200.0);
        assert_eq!(r.value, 1100.0 * 60.0);
    }

    #[test]
    fn test_choose_neighborhood_prefers_positive_investment() {
        let mut rng = StdRng::seed_from_u64(28);
        let map = MapLayout {
            layout: vec![vec![
                Some("0|Residential".to_string()),
                Some("1|Residential".to_string()),
            ]],
        };
        let neighborhoods = vec![
            NeighborhoodConfig::named("a", 1.0),
            NeighborhoodConfig::named("b", 1.0),
        ];
        let mut city = City::from_layout(&map, neighborhoods).unwrap();
        city.build_residences(&MarketConfig::default(), &mut rng);

        let mut landlord = Landlord::new(2);
        landlord.invest_ests = vec![-3.0, 2.0];
        for _ in 0..20 {
            assert_eq!(
                landlord.choose_neighborhood(&city, &mut rng),
                Some(NeighborhoodId(1))
            );
        }
        landlord.invest_ests = vec![-3.0, -1.0];
        assert!(landlord.choose_neighborhood(&city, &mut rng).is_some());
    }
}
