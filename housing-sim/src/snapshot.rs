// ============================================================================
// Snapshot - serializable view of the world for front ends and sinks
// ============================================================================

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::stats::Stats;
use crate::types::{KeyToU64, OwnerRef, ParcelType};
use crate::world::World;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct Snapshot {
    pub time: u64,
    pub map: MapSnapshot,
    pub buildings: Vec<BuildingSnapshot>,
    pub units: Vec<UnitSnapshot>,
    pub tenants: Vec<TenantSnapshot>,
    pub stats: Stats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MapSnapshot {
    pub rows: usize,
    pub cols: usize,
    pub parcels: Vec<ParcelSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct ParcelSnapshot {
    pub row: usize,
    pub col: usize,
    pub kind: ParcelType,
    pub neighborhood: Option<u32>,
    pub desirability: f64,
    pub building: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct BuildingSnapshot {
    pub id: String,
    pub row: usize,
    pub col: usize,
    pub units: Vec<u64>,
    pub commercial_floors: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct UnitSnapshot {
    pub id: u64,
    pub label: String,
    pub neighborhood: u32,
    pub rent: f64,
    pub area: f64,
    pub occupancy: usize,
    pub tenants: Vec<u64>,
    pub owner: Option<OwnerRef>,
    pub months_vacant: u32,
    pub value: f64,
    pub condition: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct TenantSnapshot {
    pub id: u64,
    pub income: f64,
    pub unit: Option<u64>,
    pub dividends: f64,
    pub shares: f64,
    pub player: Option<String>,
}

impl Snapshot {
    pub fn capture(world: &World) -> Self {
        let grid = &world.city.grid;
        let parcels = grid
            .iter()
            .map(|((row, col), p)| ParcelSnapshot {
                row,
                col,
                kind: p.kind,
                neighborhood: p.neighborhood.map(|n| n.0),
                desirability: p.weighted_desirability,
                building: p
                    .building
                    .and_then(|b| world.city.building(b))
                    .map(|b| b.label.clone()),
            })
            .collect();

        let buildings = world
            .city
            .buildings
            .iter()
            .map(|b| BuildingSnapshot {
                id: b.label.clone(),
                row: b.parcel.0,
                col: b.parcel.1,
                units: b.units.iter().map(|u| u.to_u64()).collect(),
                commercial_floors: b.n_commercial,
            })
            .collect();

        let units = world
            .city
            .units
            .iter()
            .map(|(id, u)| UnitSnapshot {
                id: id.to_u64(),
                label: u.label.clone(),
                neighborhood: u.neighborhood.0,
                rent: u.rent,
                area: u.area,
                occupancy: u.occupancy,
                tenants: u.tenants.iter().map(|t| t.to_u64()).collect(),
                owner: u.owner.map(OwnerRef::from),
                months_vacant: u.months_vacant,
                value: u.value,
                condition: u.condition,
            })
            .collect();

        let tenants = world
            .tenants
            .iter()
            .map(|(id, t)| TenantSnapshot {
                id: id.to_u64(),
                income: t.income,
                unit: t.unit.map(|u| u.to_u64()),
                dividends: t.dividends,
                shares: world.collective.shares(id),
                player: t.player.clone(),
            })
            .collect();

        Self {
            time: world.tick,
            map: MapSnapshot {
                rows: grid.rows,
                cols: grid.cols,
                parcels,
            },
            buildings,
            units,
            tenants,
            stats: world.stats.clone(),
        }
    }
}
