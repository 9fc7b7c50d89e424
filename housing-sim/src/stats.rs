// Aggregate statistics recomputed at the end of every tick

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::types::{KeyToU64, NeighborhoodId, Owner};
use crate::world::World;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct Stats {
    pub tick: u64,
    pub tenants: usize,
    /// Fraction of tenants without a home
    pub homeless: f64,
    /// Fraction of tenants with a home; `housed + homeless == 1`
    pub housed: f64,
    /// Fraction of units with nobody living in them
    pub vacancy_rate: f64,
    pub mean_rent_per_area: f64,
    pub mean_adjusted_rent_per_area: f64,
    pub mean_value_per_area: f64,
    pub mean_condition: f64,
    pub mean_months_vacant: f64,
    pub transfers: u64,
    pub collective: CollectiveStats,
    pub landlords: Vec<LandlordStats>,
    pub neighborhoods: Vec<NeighborhoodStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct CollectiveStats {
    pub members: usize,
    pub units: usize,
    pub funds: f64,
    pub property_fund: f64,
    pub value: f64,
    pub last_revenue: f64,
    pub last_payout: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct LandlordStats {
    pub id: u64,
    pub units: usize,
    pub occupied: usize,
    pub sales: u32,
    pub mean_rent_per_area: f64,
    pub outstanding_offers: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct NeighborhoodStats {
    pub id: u32,
    pub name: String,
    pub units: usize,
    pub vacant: usize,
    pub residents: usize,
    pub mean_rent_per_area: f64,
    pub mean_value_per_area: f64,
    pub mean_condition: f64,
    pub collective_units: usize,
}

fn mean(sum: f64, n: usize) -> f64 {
    if n == 0 { 0.0 } else { sum / n as f64 }
}

impl Stats {
    pub fn compute(world: &World) -> Self {
        let units = &world.city.units;
        let n_units = units.len();
        let n_tenants = world.tenants.len();
        let homeless_count = world.tenants.values().filter(|t| !t.is_housed()).count();
        let homeless = mean(homeless_count as f64, n_tenants);

        let mut rent = 0.0;
        let mut adjusted = 0.0;
        let mut value = 0.0;
        let mut condition = 0.0;
        let mut months_vacant = 0.0;
        let mut vacant = 0;
        for unit in units.values() {
            rent += unit.rent_per_area();
            adjusted += unit.current_adjusted_rent(&world.collective) / unit.area;
            value += unit.value_per_area();
            condition += unit.condition;
            months_vacant += unit.months_vacant as f64;
            if unit.is_vacant() {
                vacant += 1;
            }
        }

        let collective = CollectiveStats {
            members: world.collective.members(),
            units: world.collective.units.len(),
            funds: world.collective.funds,
            property_fund: world.collective.property_fund,
            value: world.collective.value(&world.city),
            last_revenue: world.collective.last_revenue,
            last_payout: world.collective.last_payout,
        };

        let landlords = world
            .landlords
            .iter()
            .map(|(id, l)| {
                let owned: Vec<_> = l.units.iter().filter_map(|u| world.city.unit(*u)).collect();
                LandlordStats {
                    id: id.to_u64(),
                    units: owned.len(),
                    occupied: l.occupied_units(&world.city),
                    sales: l.sales,
                    mean_rent_per_area: mean(
                        owned.iter().map(|u| u.rent_per_area()).sum(),
                        owned.len(),
                    ),
                    outstanding_offers: l.outstanding.len(),
                }
            })
            .collect();

        let neighborhoods = (0..world.city.neighborhood_count())
            .map(|i| neighborhood_stats(world, NeighborhoodId(i as u32)))
            .collect();

        Self {
            tick: world.tick,
            tenants: n_tenants,
            homeless,
            housed: 1.0 - homeless,
            vacancy_rate: mean(vacant as f64, n_units),
            mean_rent_per_area: mean(rent, n_units),
            mean_adjusted_rent_per_area: mean(adjusted, n_units),
            mean_value_per_area: mean(value, n_units),
            mean_condition: mean(condition, n_units),
            mean_months_vacant: mean(months_vacant, n_units),
            transfers: world.transfers,
            collective,
            landlords,
            neighborhoods,
        }
    }
}

fn neighborhood_stats(world: &World, neighborhood: NeighborhoodId) -> NeighborhoodStats {
    let units: Vec<_> = world
        .city
        .neighborhood_units(neighborhood)
        .iter()
        .filter_map(|id| world.city.unit(*id))
        .collect();
    let n = units.len();
    NeighborhoodStats {
        id: neighborhood.0,
        name: world.city.neighborhood_name(neighborhood).to_string(),
        units: n,
        vacant: units.iter().filter(|u| u.is_vacant()).count(),
        residents: units.iter().map(|u| u.tenants.len()).sum(),
        mean_rent_per_area: mean(units.iter().map(|u| u.rent_per_area()).sum(), n),
        mean_value_per_area: mean(units.iter().map(|u| u.value_per_area()).sum(), n),
        mean_condition: mean(units.iter().map(|u| u.condition).sum(), n),
        collective_units: units
            .iter()
            .filter(|u| u.owner == Some(Owner::Collective))
            .count(),
    }
}
