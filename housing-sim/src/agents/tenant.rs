use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::IteratorRandom;

use crate::collective::Collective;
use crate::config::{MarketConfig, TenantPrefs};
use crate::geography::{City, distance};
use crate::market::Reservation;
use crate::types::{Month, Position, TenantId, UnitId};
use crate::units::Unit;

#[derive(Debug, Clone)]
pub struct Tenant {
    /// Monthly income
    pub income: f64,
    /// Current residence
    pub unit: Option<UnitId>,
    /// Units owned as an investor or owner-occupier
    pub units: BTreeSet<UnitId>,
    pub dividends: f64,
    pub months_stayed: u32,
    /// Moved during the current tick
    pub moved: bool,
    pub work: Option<Position>,
    /// Player currently steering this tenant; excluded from automatic steps
    pub player: Option<String>,
}

/// Outcome of a tenant's monthly housing review
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relocation {
    Stay,
    MoveTo { unit: UnitId, desirability: f64 },
    /// Current place is unaffordable and nothing better was found
    MoveOut,
}

impl Tenant {
    pub fn new(income: f64, work: Option<Position>) -> Self {
        Self {
            income,
            unit: None,
            units: BTreeSet::new(),
            dividends: 0.0,
            months_stayed: 0,
            moved: false,
            work,
            player: None,
        }
    }

    pub fn is_housed(&self) -> bool {
        self.unit.is_some()
    }

    /// Rent share this tenant would pay in `unit`, counting themselves
    /// among the occupants
    pub fn rent_share(&self, id: TenantId, unit: &Unit, collective: &Collective) -> f64 {
        let joining = !unit.tenants.contains(&id);
        let n = unit.tenants.len() + usize::from(joining);
        let others = unit.tenants.iter().copied().filter(|t| *t != id);
        let rent = unit.adjusted_rent(collective, others.chain(std::iter::once(id)));
        rent / n as f64
    }

    pub fn can_afford(&self, id: TenantId, unit: &Unit, collective: &Collective) -> bool {
        self.income >= self.rent_share(id, unit, collective)
    }

    /// Score a unit for this tenant. Zero means unaffordable. Cramped units
    /// score below zero, and more income scales the score further out in
    /// whichever direction it points.
    ///
    /// Rent shares under one currency unit are scored as one, so a member
    /// living rent-free in a Collective unit gets a finite ratio equal to
    /// their income.
    pub fn desirability(
        &self,
        id: TenantId,
        unit: &Unit,
        weighted_desirability: f64,
        collective: &Collective,
        prefs: &TenantPrefs,
    ) -> f64 {
        let joining = !unit.tenants.contains(&id);
        let n = (unit.tenants.len() + usize::from(joining)) as f64;
        let rent_per_tenant = self.rent_share(id, unit, collective);
        if self.income < rent_per_tenant {
            return 0.0;
        }

        let ratio = self.income / rent_per_tenant.max(1.0);
        let spaciousness = unit.area / n - prefs.min_area;
        let commute = self
            .work
            .map(|w| distance(w, unit.pos))
            .filter(|d| *d > 0.0)
            .map_or(0.0, |d| 1.0 / d);

        ratio * (spaciousness + weighted_desirability + unit.condition + commute)
    }

    /// Score with the parcel looked up from the city
    pub fn desirability_in(
        &self,
        id: TenantId,
        unit_id: UnitId,
        city: &City,
        collective: &Collective,
        prefs: &TenantPrefs,
    ) -> f64 {
        city.unit(unit_id).map_or(0.0, |unit| {
            self.desirability(
                id,
                unit,
                city.weighted_desirability(unit_id),
                collective,
                prefs,
            )
        })
    }

    /// Decide whether to move this month.
    ///
    /// The unhoused always look, with no moving penalty, and take anything
    /// scoring above zero. The housed look on lease anniversaries or as
    /// soon as their current place becomes unaffordable, and move only when
    /// the best affordable vacancy in the sample beats the current score by
    /// the moving penalty. `vacancies` holds every unit with a free place.
    #[allow(clippy::too_many_arguments)]
    pub fn decide_relocation<R: Rng>(
        &self,
        id: TenantId,
        month: Month,
        city: &City,
        collective: &Collective,
        vacancies: &BTreeSet<UnitId>,
        prefs: &TenantPrefs,
        rng: &mut R,
    ) -> Relocation {
        let home = self.unit.and_then(|u| city.unit(u).map(|unit| (u, unit)));
        let (current, penalty, unaffordable) = match home {
            None => (0.0, 0.0, false),
            Some((unit_id, unit)) => {
                let unaffordable = !self.can_afford(id, unit, collective);
                if !unaffordable && !unit.is_lease_anniversary(month) {
                    return Relocation::Stay;
                }
                let score = self.desirability_in(id, unit_id, city, collective, prefs);
                (score, prefs.moving_penalty, unaffordable)
            }
        };

        let sample = vacancies
            .iter()
            .copied()
            .filter(|u| Some(*u) != self.unit)
            .choose_multiple(rng, prefs.sample_size);
        let best = sample
            .into_iter()
            .filter_map(|u| city.unit(u).map(|unit| (u, unit)))
            .filter(|(_, unit)| self.can_afford(id, unit, collective))
            .map(|(u, _)| (u, self.desirability_in(id, u, city, collective, prefs)))
            .fold(None, |best: Option<(UnitId, f64)>, (u, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((u, d)),
            });

        match best {
            Some((unit, d)) if d - penalty > current => Relocation::MoveTo {
                unit,
                desirability: d,
            },
            _ if unaffordable => Relocation::MoveOut,
            _ => Relocation::Stay,
        }
    }

    /// Tenant owners sell for the rent they would collect over the
    /// pricing horizon
    pub fn reservation(unit: &Unit, market: &MarketConfig) -> Reservation {
        Reservation {
            forecast: unit.rent,
            value: unit.rent * market.pricing_horizon as f64,
        }
    }
}
