use rand::seq::SliceRandom;

use crate::agents::{Relocation, Tenant};
use crate::market::{MarketRecord, OfferStatus, Reservation, clear_offers};
use crate::types::{KeyToU64, LandlordId, Owner, OwnerRef, TenantId, UnitId};
use crate::units::Sale;
use crate::world::World;

// === RENT COLLECTION ===

/// Every unit books this month's income and maintenance
pub fn collect_rents(world: &mut World) {
    for unit in world.city.units.values_mut() {
        unit.collect_rent();
    }
    for tenant in world.tenants.values_mut() {
        if tenant.is_housed() {
            tenant.months_stayed += 1;
        }
    }
}

// === AGENT PHASES ===

pub fn run_landlord_phase(world: &mut World) {
    let mut order: Vec<LandlordId> = world.landlords.keys().collect();
    order.shuffle(&mut world.rng);

    for id in order {
        let Some(landlord) = world.landlords.get_mut(id) else {
            continue;
        };
        landlord.step(
            id,
            world.tick,
            &mut world.city,
            &world.config.market,
            &mut world.rng,
        );
    }
}

/// Automatic tenants review their housing in random order. Tenants steered
/// by a player only move on command.
pub fn run_tenant_phase(world: &mut World) {
    let mut order: Vec<TenantId> = Vec::new();
    for (id, tenant) in world.tenants.iter_mut() {
        if tenant.player.is_none() {
            tenant.moved = false;
            order.push(id);
        }
    }
    order.shuffle(&mut world.rng);
    let prefs = world.config.population.prefs.clone();

    for id in order {
        let Some(tenant) = world.tenants.get(id) else {
            continue;
        };
        let from = tenant.unit;
        let decision = tenant.decide_relocation(
            id,
            world.tick,
            &world.city,
            &world.collective,
            &world.vacancies,
            &prefs,
            &mut world.rng,
        );

        match decision {
            Relocation::Stay => {}
            Relocation::MoveTo { unit, .. } => {
                if world.move_in(id, unit) {
                    let reason = if from.is_some() { "upgrade" } else { "housed" };
                    world.log_relocation(id, from, Some(unit), reason);
                }
            }
            Relocation::MoveOut => {
                world.move_out(id);
                world.log_relocation(id, from, None, "priced_out");
            }
        }
    }
}

// === APPRAISAL ===

/// Refresh parcel desirabilities and unit values, feed the collective's
/// price history and start a new comparable-sales window
pub fn run_appraisal(world: &mut World) {
    let policy = world.config.market.appraisal_policy;
    world.city.update_desirabilities();
    let appraisals = world.city.appraise(policy, &world.config.market);
    world.collective.record_appraisal(&appraisals);
    for unit in world.city.units.values_mut() {
        unit.recently_sold = false;
    }

    #[cfg(feature = "instrument")]
    for a in &appraisals {
        tracing::info!(
            target: "appraisal",
            tick = world.tick,
            neighborhood = a.neighborhood.0,
            name = world.city.neighborhood_name(a.neighborhood),
            policy = policy.as_str(),
            units = a.units as u64,
            sales = a.sales as u64,
            mean_value_per_area = a.mean_value_per_area,
        );
    }
}

pub fn run_collective_phase(world: &mut World) {
    world.collective.step(
        world.tick,
        &mut world.city,
        &mut world.tenants,
        &world.config.collective,
    );
}

// === AUCTION SETTLEMENT ===

/// Clear every unit's pending offers against its owner's reservation.
/// Offers never outlive the tick: every unit leaves with an empty set.
pub fn settle_offers(world: &mut World) -> Vec<MarketRecord> {
    let month = world.tick;
    let with_offers: Vec<UnitId> = world
        .city
        .units
        .iter()
        .filter(|(_, u)| !u.offers.is_empty())
        .map(|(id, _)| id)
        .collect();

    let mut records = Vec::new();
    for unit_id in with_offers {
        let Some(unit) = world.city.unit_mut(unit_id) else {
            continue;
        };
        let mut offers = std::mem::take(&mut unit.offers);
        let Some(seller) = unit.owner else {
            continue;
        };
        offers.retain(|o| o.bidder != seller);
        if offers.is_empty() {
            continue;
        }

        let reservation = owner_reservation(world, seller, unit_id);
        let Some(unit) = world.city.unit(unit_id) else {
            continue;
        };
        let (last_rent, last_value, neighborhood) = (unit.rent, unit.value, unit.neighborhood);
        let forecast = reservation.map_or(unit.rent, |r| r.forecast);
        let reservation = reservation.map(|r| r.value);

        let winner = clear_offers(&mut offers, reservation, |o| {
            world.can_pay(o.bidder, o.amount)
        });

        if let Some(i) = winner {
            let (buyer, price) = (offers[i].bidder, offers[i].amount);
            complete_sale(world, unit_id, seller, buyer, price);
        }

        for offer in &offers {
            let sold = offer.status == OfferStatus::Accepted;

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "sale",
                tick = month,
                unit_id = unit_id.to_u64(),
                neighborhood = neighborhood.0,
                seller = seller.label(),
                seller_id = seller.raw_id(),
                bidder = offer.bidder.label(),
                bidder_id = offer.bidder.raw_id(),
                forecast = forecast,
                reservation = reservation.unwrap_or(f64::NAN),
                last_rent = last_rent,
                last_value = last_value,
                amount = offer.amount,
                status = offer.status.as_str(),
                sold = sold,
            );

            records.push(MarketRecord {
                tick: month,
                unit: unit_id.to_u64(),
                neighborhood: neighborhood.0,
                seller: OwnerRef::from(seller),
                bidder: OwnerRef::from(offer.bidder),
                forecast,
                reservation,
                last_rent,
                last_value,
                amount: offer.amount,
                status: offer.status,
                sold,
            });
        }
    }
    records
}

/// What the owner of record would sell `unit_id` for; `None` is a refusal
fn owner_reservation(world: &World, seller: Owner, unit_id: UnitId) -> Option<Reservation> {
    let unit = world.city.unit(unit_id)?;
    let market = &world.config.market;
    match seller {
        Owner::Landlord(id) => world.landlords.get(id).map(|l| l.reservation(unit, market)),
        Owner::Tenant(_) => Some(Tenant::reservation(unit, market)),
        Owner::Collective => {
            world
                .collective
                .reservation(unit_id, unit, world.tick, &world.config.collective)
        }
    }
}

fn complete_sale(world: &mut World, unit_id: UnitId, seller: Owner, buyer: Owner, price: f64) {
    let month = world.tick;
    world.transfer(unit_id, buyer);
    world.transfers += 1;
    if let Some(unit) = world.city.unit_mut(unit_id) {
        unit.recently_sold = true;
        unit.last_sale = Some(Sale { month, price });
    }

    match seller {
        Owner::Landlord(id) => {
            if let Some(landlord) = world.landlords.get_mut(id) {
                landlord.sales += 1;
            }
        }
        Owner::Collective => world.collective.record_sale(unit_id, month, price),
        Owner::Tenant(_) => {}
    }
    match buyer {
        Owner::Landlord(id) => {
            if let Some(landlord) = world.landlords.get_mut(id) {
                landlord.outstanding.remove(&unit_id);
            }
        }
        Owner::Collective => world.collective.record_purchase(unit_id, month, price),
        Owner::Tenant(_) => {}
    }
}
