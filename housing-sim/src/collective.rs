//! The collective: a cooperative owner funded by its members.
//!
//! Members earn shares by contributing funds or by paying rent on
//! collectively owned units. Shares are each member's weighted
//! contribution over the ledger total, so they always sum to one. Rent
//! revenue pays dividends by share and tops up the property fund, which
//! buys more units.

use std::collections::{BTreeMap, BTreeSet};

use slotmap::SlotMap;

use crate::agents::Tenant;
use crate::config::CollectiveConfig;
use crate::geography::{City, NeighborhoodAppraisal};
use crate::market::{Offer, Reservation};
use crate::types::{Month, NeighborhoodId, Owner, TenantId, UnitId};
use crate::units::{Sale, Unit};

#[cfg(feature = "instrument")]
use crate::types::KeyToU64;

#[derive(Debug, Clone, Default)]
pub struct Collective {
    /// Everything ever paid in, by contribution or levy
    pub funds: f64,
    /// Weighted contribution per member
    pub ledger: BTreeMap<TenantId, f64>,
    /// Sum of the ledger
    pub denominator: f64,
    /// Cash available for acquisitions
    pub property_fund: f64,
    pub last_revenue: f64,
    pub last_payout: f64,
    pub units: BTreeSet<UnitId>,
    /// Mean appraised value per area at each appraisal, per neighborhood
    pub price_history: BTreeMap<NeighborhoodId, Vec<f64>>,
    pub purchases: BTreeMap<UnitId, Sale>,
}

/// Money moved by one collective step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollectiveStep {
    pub revenue: f64,
    pub dividends: f64,
    pub maintenance_ratio: f64,
    pub offers: usize,
}

impl Collective {
    pub fn new(property_fund: f64) -> Self {
        Self {
            property_fund,
            ..Self::default()
        }
    }

    // === SHARES ===

    /// Add `amount` to funds, crediting `amount * p` to the member
    pub fn add_funds(&mut self, member: TenantId, amount: f64, p: f64) {
        self.funds += amount;
        if p > 0.0 {
            *self.ledger.entry(member).or_insert(0.0) += amount * p;
            self.denominator = self.ledger.values().sum();
        }
    }

    /// Direct member contribution; the cash is available for purchases
    pub fn contribute(&mut self, member: TenantId, amount: f64) {
        self.add_funds(member, amount, 1.0);
        self.property_fund += amount;
    }

    pub fn shares(&self, member: TenantId) -> f64 {
        if self.denominator <= 0.0 {
            return 0.0;
        }
        self.ledger.get(&member).copied().unwrap_or(0.0) / self.denominator
    }

    pub fn is_member(&self, member: TenantId) -> bool {
        self.ledger.get(&member).is_some_and(|c| *c > 0.0)
    }

    pub fn members(&self) -> usize {
        self.ledger.values().filter(|c| **c > 0.0).count()
    }

    /// Cash plus appraised value of holdings
    pub fn value(&self, city: &City) -> f64 {
        self.funds
            + self
                .units
                .iter()
                .filter_map(|id| city.unit(*id))
                .map(|u| u.value)
                .sum::<f64>()
    }

    // === MONTHLY STEP ===

    pub fn step(
        &mut self,
        month: Month,
        city: &mut City,
        tenants: &mut SlotMap<TenantId, Tenant>,
        config: &CollectiveConfig,
    ) -> CollectiveStep {
        let revenue = self.collect_levy(city, config.rent_share);
        let maintenance_ratio = self.apply_maintenance(city);
        let dividends = self.pay_dividends(tenants, config);
        let offers = self.make_offers(city);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "collective",
            tick = month,
            revenue = revenue,
            dividends = dividends,
            maintenance_ratio = maintenance_ratio,
            offers = offers as u64,
            funds = self.funds,
            property_fund = self.property_fund,
            members = self.members() as u64,
            units = self.units.len() as u64,
        );
        let _ = month;

        CollectiveStep {
            revenue,
            dividends,
            maintenance_ratio,
            offers,
        }
    }

    /// Convert a share of rent on every occupied owned unit into shares
    /// for its tenants. Returns the rent collected.
    pub fn collect_levy(&mut self, city: &City, rent_share: f64) -> f64 {
        let mut revenue = 0.0;
        let occupied: Vec<(f64, Vec<TenantId>)> = self
            .units
            .iter()
            .filter_map(|id| city.unit(*id))
            .filter(|u| !u.is_vacant())
            .map(|u| (u.rent, u.tenants.iter().copied().collect()))
            .collect();
        for (rent, tenants) in occupied {
            revenue += rent;
            let per_tenant = rent / tenants.len() as f64;
            for t in tenants {
                self.add_funds(t, per_tenant, rent_share);
            }
        }
        self.last_revenue = revenue;
        revenue
    }

    /// Spend on maintenance in proportion to what the portfolio spent per
    /// unit of revenue. Returns the ratio applied.
    pub fn apply_maintenance(&self, city: &mut City) -> f64 {
        if self.last_revenue <= 0.0 {
            return 0.0;
        }
        let spend: f64 = self
            .units
            .iter()
            .filter_map(|id| city.unit(*id))
            .filter(|u| !u.is_vacant())
            .map(|u| u.maintenance)
            .sum();
        let ratio = spend / self.last_revenue;
        for id in &self.units {
            if let Some(unit) = city.unit_mut(*id) {
                unit.maintenance = ratio * unit.rent;
            }
        }
        ratio
    }

    /// Pay members their share of the distributable revenue. The reserve
    /// and anything undistributed go to the property fund.
    pub fn pay_dividends(
        &mut self,
        tenants: &mut SlotMap<TenantId, Tenant>,
        config: &CollectiveConfig,
    ) -> f64 {
        let revenue = self.last_revenue;
        let distributable = revenue * (1.0 - config.reserve_fraction - config.expense_fraction);
        let pool = distributable * config.dividend_fraction;

        let mut paid = 0.0;
        if pool > 0.0 && self.denominator > 0.0 {
            for (member, contribution) in &self.ledger {
                let amount = pool * contribution / self.denominator;
                if amount <= 0.0 {
                    continue;
                }
                if let Some(tenant) = tenants.get_mut(*member) {
                    tenant.dividends += amount;
                    paid += amount;
                }
            }
        }

        self.property_fund += revenue * config.reserve_fraction + (distributable - paid);
        self.last_payout = paid;
        paid
    }

    /// Bid appraised value on affordable units, cheapest relative to rent
    /// first, until the property fund is committed. Units members live
    /// in are preferred; any unit qualifies when none of those fit.
    /// Returns the number of offers placed.
    pub fn make_offers(&self, city: &mut City) -> usize {
        let budget = self.property_fund;
        let affordable = |u: &Unit| {
            u.owner != Some(Owner::Collective) && u.value > 0.0 && u.rent > 0.0 && u.value <= budget
        };
        let mut candidates: Vec<(UnitId, f64, f64)> = city
            .units
            .iter()
            .filter(|(_, u)| affordable(u) && u.tenants.iter().any(|t| self.is_member(*t)))
            .map(|(id, u)| (id, u.value, u.rent))
            .collect();
        if candidates.is_empty() {
            candidates = city
                .units
                .iter()
                .filter(|(_, u)| affordable(u))
                .map(|(id, u)| (id, u.value, u.rent))
                .collect();
        }
        candidates.sort_by(|a, b| {
            (a.1 / a.2)
                .total_cmp(&(b.1 / b.2))
                .then_with(|| a.1.total_cmp(&b.1))
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut remaining = budget;
        let mut offers = 0;
        for (id, value, _) in candidates {
            if value > remaining {
                continue;
            }
            if let Some(unit) = city.unit_mut(id) {
                unit.offers.push(Offer::new(Owner::Collective, value));
                remaining -= value;
                offers += 1;
            }
        }
        offers
    }

    // === SALES ===

    /// Sell only after the holding period, while the neighborhood's prices
    /// are falling, and for more than both the appraisal and the minimum
    /// multiple of the purchase price
    pub fn reservation(
        &self,
        unit_id: UnitId,
        unit: &Unit,
        month: Month,
        config: &CollectiveConfig,
    ) -> Option<Reservation> {
        let purchase = self.purchases.get(&unit_id)?;
        if month.saturating_sub(purchase.month) < config.min_hold_time {
            return None;
        }
        if !self.price_declining(unit.neighborhood) {
            return None;
        }
        Some(Reservation {
            forecast: unit.rent,
            value: unit.value.max(purchase.price * config.min_sale_multiple),
        })
    }

    pub fn can_pay(&self, amount: f64) -> bool {
        self.property_fund >= amount
    }

    pub fn record_purchase(&mut self, unit: UnitId, month: Month, price: f64) {
        self.property_fund -= price;
        self.purchases.insert(unit, Sale { month, price });

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "collective_trade",
            tick = month,
            unit_id = unit.to_u64(),
            side = "buy",
            price = price,
            property_fund = self.property_fund,
        );
    }

    pub fn record_sale(&mut self, unit: UnitId, month: Month, price: f64) {
        self.property_fund += price;
        self.purchases.remove(&unit);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "collective_trade",
            tick = month,
            unit_id = unit.to_u64(),
            side = "sell",
            price = price,
            property_fund = self.property_fund,
        );
        let _ = month;
    }

    // === PRICE TREND ===

    pub fn record_appraisal(&mut self, appraisals: &[NeighborhoodAppraisal]) {
        for a in appraisals {
            self.price_history
                .entry(a.neighborhood)
                .or_default()
                .push(a.mean_value_per_area);
        }
    }

    pub fn price_declining(&self, neighborhood: NeighborhoodId) -> bool {
        match self.price_history.get(&neighborhood).map(Vec::as_slice) {
            Some([.., prev, last]) => last < prev,
            _ => false,
        }
    }
}
