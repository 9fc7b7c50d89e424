// World state for the housing market simulation

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;

use crate::agents::{Landlord, Tenant};
use crate::collective::Collective;
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::geography::City;
use crate::market::MarketRecord;
use crate::stats::Stats;
use crate::tick;
use crate::types::{LandlordId, Month, Owner, ParcelType, TenantId, UnitId};
use crate::units::Unit;

#[cfg(feature = "instrument")]
use crate::types::KeyToU64;

/// Complete state of the simulation. Entities live in arenas and refer to
/// each other by id.
#[derive(Debug, Clone)]
pub struct World {
    pub tick: Month,
    pub config: SimConfig,

    pub city: City,
    pub tenants: SlotMap<TenantId, Tenant>,
    pub landlords: SlotMap<LandlordId, Landlord>,
    pub collective: Collective,

    /// Units with at least one free place
    pub vacancies: BTreeSet<UnitId>,
    /// Player name -> controlled tenant
    pub players: BTreeMap<String, TenantId>,

    /// Ownership transfers since construction
    pub transfers: u64,
    pub stats: Stats,

    pub rng: StdRng,
}

impl World {
    /// Validate `config`, generate the city and populate it.
    /// Nothing is built if the config is rejected.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let city = City::generate(&config, &mut rng)?;
        let vacancies = city
            .units
            .iter()
            .filter(|(_, u)| u.has_vacancy())
            .map(|(id, _)| id)
            .collect();
        let collective = Collective::new(config.collective.initial_fund);

        let mut world = Self {
            tick: 0,
            config,
            city,
            tenants: SlotMap::with_key(),
            landlords: SlotMap::with_key(),
            collective,
            vacancies,
            players: BTreeMap::new(),
            transfers: 0,
            stats: Stats::default(),
            rng,
        };
        world.populate();
        world.house_tenants();
        world.assign_initial_owners();
        world.stats = Stats::compute(&world);
        Ok(world)
    }

    // === Setup ===

    fn populate(&mut self) {
        let neighborhoods = self.city.neighborhood_count();
        for _ in 0..self.config.population.landlords {
            self.landlords.insert(Landlord::new(neighborhoods));
        }

        let workplaces = self.city.parcels_of_kind(ParcelType::Commercial);
        let (lo, hi) = (
            self.config.population.income_min,
            self.config.population.income_max,
        );
        for _ in 0..self.config.population.tenants {
            let income = self.rng.random_range(lo..=hi) as f64;
            let work = workplaces.choose(&mut self.rng).copied();
            self.tenants.insert(Tenant::new(income, work));
        }
    }

    /// Each tenant, in random order, takes the best unit with room
    fn house_tenants(&mut self) {
        let mut order: Vec<TenantId> = self.tenants.keys().collect();
        order.shuffle(&mut self.rng);
        let prefs = self.config.population.prefs.clone();

        for id in order {
            let Some(tenant) = self.tenants.get(id) else {
                continue;
            };
            let best = self
                .vacancies
                .iter()
                .map(|u| {
                    let d = tenant.desirability_in(id, *u, &self.city, &self.collective, &prefs);
                    (*u, d)
                })
                .fold(None, |best: Option<(UnitId, f64)>, (u, d)| match best {
                    Some((_, bd)) if bd >= d => best,
                    _ => Some((u, d)),
                });
            let Some((unit_id, d)) = best else {
                break;
            };
            if d <= 0.0 {
                continue;
            }

            let lease_month = self.rng.random_range(0..12);
            self.move_in(id, unit_id);
            if let Some(unit) = self.city.unit_mut(unit_id) {
                if unit.tenants.len() == 1 {
                    unit.lease_month = lease_month;
                }
            }
        }
    }

    /// Occupied units go to a landlord, a tenant investor or one of their
    /// occupants; vacant units to a landlord or a tenant investor
    fn assign_initial_owners(&mut self) {
        let landlords: Vec<LandlordId> = self.landlords.keys().collect();
        let tenants: Vec<TenantId> = self.tenants.keys().collect();
        let p_landlord = self.config.population.p_landlord_owned;
        let p_investor = self.config.population.p_investor_owned;
        let units: Vec<UnitId> = self.city.units.keys().collect();

        for unit_id in units {
            let occupants: Vec<TenantId> = self
                .city
                .unit(unit_id)
                .map(|u| u.tenants.iter().copied().collect())
                .unwrap_or_default();
            let roll: f64 = self.rng.random();

            let landlord = landlords.choose(&mut self.rng).copied().map(Owner::Landlord);
            let investor = tenants.choose(&mut self.rng).copied().map(Owner::Tenant);
            let occupier = occupants.choose(&mut self.rng).copied().map(Owner::Tenant);

            let owner = if occupants.is_empty() {
                if roll < 0.5 {
                    landlord.or(investor)
                } else {
                    investor.or(landlord)
                }
            } else if roll < p_landlord {
                landlord.or(investor)
            } else if roll < p_landlord + p_investor {
                investor.or(landlord)
            } else {
                occupier
            };
            if let Some(owner) = owner {
                self.transfer(unit_id, owner);
            }
        }
    }

    // === Entity access ===

    pub fn get_unit(&self, id: UnitId) -> Option<&Unit> {
        self.city.unit(id)
    }

    pub fn get_unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.city.unit_mut(id)
    }

    pub fn get_tenant(&self, id: TenantId) -> Option<&Tenant> {
        self.tenants.get(id)
    }

    pub fn get_tenant_mut(&mut self, id: TenantId) -> Option<&mut Tenant> {
        self.tenants.get_mut(id)
    }

    pub fn get_landlord(&self, id: LandlordId) -> Option<&Landlord> {
        self.landlords.get(id)
    }

    /// Holding set of an owner, if the owner exists
    pub fn holdings(&self, owner: Owner) -> Option<&BTreeSet<UnitId>> {
        match owner {
            Owner::Landlord(id) => self.landlords.get(id).map(|l| &l.units),
            Owner::Tenant(id) => self.tenants.get(id).map(|t| &t.units),
            Owner::Collective => Some(&self.collective.units),
        }
    }

    fn holdings_mut(&mut self, owner: Owner) -> Option<&mut BTreeSet<UnitId>> {
        match owner {
            Owner::Landlord(id) => self.landlords.get_mut(id).map(|l| &mut l.units),
            Owner::Tenant(id) => self.tenants.get_mut(id).map(|t| &mut t.units),
            Owner::Collective => Some(&mut self.collective.units),
        }
    }

    /// Whether `owner` can cover `amount`. Only the collective is budgeted.
    pub fn can_pay(&self, owner: Owner, amount: f64) -> bool {
        match owner {
            Owner::Collective => self.collective.can_pay(amount),
            Owner::Landlord(id) => self.landlords.contains_key(id),
            Owner::Tenant(id) => self.tenants.contains_key(id),
        }
    }

    // === Ownership ===

    /// Move a unit into `new_owner`'s holdings. This is the only way
    /// ownership changes: the unit's owner and both holding sets are
    /// updated together. Returns the previous owner.
    pub fn transfer(&mut self, unit_id: UnitId, new_owner: Owner) -> Option<Owner> {
        let previous = self.city.unit(unit_id)?.owner;
        if let Some(prev) = previous {
            if let Some(held) = self.holdings_mut(prev) {
                let removed = held.remove(&unit_id);
                debug_assert!(removed, "unit missing from {prev:?} holdings");
            }
        }
        let Some(held) = self.holdings_mut(new_owner) else {
            // Unknown buyer: put the unit back where it was
            if let Some(prev) = previous {
                if let Some(held) = self.holdings_mut(prev) {
                    held.insert(unit_id);
                }
            }
            return previous;
        };
        held.insert(unit_id);
        if let Some(unit) = self.city.unit_mut(unit_id) {
            unit.owner = Some(new_owner);
        }
        previous
    }

    // === Tenancy ===

    /// Move a tenant into a unit, leaving their current home first
    pub fn move_in(&mut self, tenant_id: TenantId, unit_id: UnitId) -> bool {
        let Some(current) = self.tenants.get(tenant_id).map(|t| t.unit) else {
            return false;
        };
        if current == Some(unit_id) {
            return true;
        }
        if !self.city.unit(unit_id).is_some_and(|u| u.has_vacancy()) {
            return false;
        }
        if current.is_some() {
            self.move_out(tenant_id);
        }

        let month = self.tick;
        let Some(unit) = self.city.unit_mut(unit_id) else {
            return false;
        };
        unit.admit(tenant_id, month);
        debug_assert!(unit.tenants.len() <= unit.occupancy);
        if !unit.has_vacancy() {
            self.vacancies.remove(&unit_id);
        }
        if let Some(tenant) = self.tenants.get_mut(tenant_id) {
            tenant.unit = Some(unit_id);
            tenant.months_stayed = 0;
            tenant.moved = true;
        }
        true
    }

    /// Take a tenant out of their home, if they have one
    pub fn move_out(&mut self, tenant_id: TenantId) -> Option<UnitId> {
        let tenant = self.tenants.get_mut(tenant_id)?;
        let unit_id = tenant.unit.take()?;
        tenant.months_stayed = 0;
        if let Some(unit) = self.city.unit_mut(unit_id) {
            unit.release(tenant_id);
            self.vacancies.insert(unit_id);
        }
        Some(unit_id)
    }

    // === Simulation Tick ===

    /// Advance one month and return the settled offers.
    ///
    /// Tick phases:
    /// 1. Rent collection - every unit records income and maintenance
    /// 2. Landlords - estimates, rents, maintenance, bids (shuffled)
    /// 3. Tenants - relocation (shuffled)
    /// 4. Appraisal - every `appraisal_interval` months
    /// 5. Collective - levy, dividends, acquisition bids
    /// 6. Settlement - each owner of record clears its units' offers
    /// 7. Statistics
    pub fn step(&mut self) -> Vec<MarketRecord> {
        self.tick += 1;

        // === 1. RENT COLLECTION ===
        tick::collect_rents(self);

        // === 2. LANDLORD PHASE ===
        tick::run_landlord_phase(self);

        // === 3. TENANT PHASE ===
        tick::run_tenant_phase(self);

        // === 4. PERIODIC APPRAISAL ===
        if self.tick % self.config.market.appraisal_interval == 0 {
            tick::run_appraisal(self);
        }

        // === 5. COLLECTIVE PHASE ===
        tick::run_collective_phase(self);

        // === 6. AUCTION SETTLEMENT ===
        let records = tick::settle_offers(self);

        // === 7. STATISTICS ===
        self.stats = Stats::compute(self);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "tick",
            tick = self.tick,
            homeless = self.stats.homeless,
            housed = self.stats.housed,
            vacancy_rate = self.stats.vacancy_rate,
            mean_rent_per_area = self.stats.mean_rent_per_area,
            mean_adjusted_rent_per_area = self.stats.mean_adjusted_rent_per_area,
            mean_value_per_area = self.stats.mean_value_per_area,
            mean_condition = self.stats.mean_condition,
            collective_members = self.stats.collective.members as u64,
            collective_units = self.stats.collective.units as u64,
            sales = records.iter().filter(|r| r.sold).count() as u64,
            transfers = self.transfers,
        );

        records
    }

    // === Invariants ===

    /// Describe every broken structural invariant. Empty when consistent.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for (id, unit) in &self.city.units {
            if unit.tenants.len() > unit.occupancy {
                problems.push(format!(
                    "unit {} holds {} tenants over occupancy {}",
                    unit.label,
                    unit.tenants.len(),
                    unit.occupancy
                ));
            }
            if unit.rent < 0.0 || unit.value < 0.0 {
                problems.push(format!("unit {} has negative rent or value", unit.label));
            }
            if unit.has_vacancy() != self.vacancies.contains(&id) {
                problems.push(format!("unit {} vacancy pool entry is stale", unit.label));
            }
            match unit.owner {
                None => problems.push(format!("unit {} has no owner", unit.label)),
                Some(owner) => {
                    if !self.holdings(owner).is_some_and(|h| h.contains(&id)) {
                        problems.push(format!(
                            "unit {} is missing from its owner's holdings",
                            unit.label
                        ));
                    }
                }
            }
            for tenant_id in &unit.tenants {
                if self.tenants.get(*tenant_id).and_then(|t| t.unit) != Some(id) {
                    problems.push(format!(
                        "unit {} lists a tenant living elsewhere",
                        unit.label
                    ));
                }
            }
        }

        let owners = self
            .landlords
            .iter()
            .map(|(id, l)| (Owner::Landlord(id), &l.units))
            .chain(self.tenants.iter().map(|(id, t)| (Owner::Tenant(id), &t.units)))
            .chain(std::iter::once((Owner::Collective, &self.collective.units)));
        for (owner, units) in owners {
            for unit_id in units {
                if self.city.unit(*unit_id).and_then(|u| u.owner) != Some(owner) {
                    problems.push(format!("{owner:?} holds a unit it does not own"));
                }
            }
        }

        for (id, tenant) in &self.tenants {
            if let Some(unit_id) = tenant.unit {
                if !self.city.unit(unit_id).is_some_and(|u| u.tenants.contains(&id)) {
                    problems.push(format!("tenant {:?} points at a unit without them", id));
                }
            }
        }

        if self.collective.denominator < 0.0 {
            problems.push("collective shares denominator is negative".to_string());
        }
        problems
    }

    /// Player-controlled tenant, if any
    pub fn player_tenant(&self, player: &str) -> Option<TenantId> {
        self.players.get(player).copied()
    }

    /// Log a tenant move
    pub(crate) fn log_relocation(
        &self,
        tenant_id: TenantId,
        from: Option<UnitId>,
        to: Option<UnitId>,
        reason: &str,
    ) {
        #[cfg(feature = "instrument")]
        {
            let income = self.tenants.get(tenant_id).map_or(0.0, |t| t.income);
            tracing::info!(
                target: "relocation",
                tick = self.tick,
                tenant_id = tenant_id.to_u64(),
                income = income,
                from_unit = from.map_or(0, |u| u.to_u64()),
                to_unit = to.map_or(0, |u| u.to_u64()),
                housed = to.is_some(),
                reason = reason,
            );
        }
        let _ = (tenant_id, from, to, reason);
    }
}
