// Housing units: tenancy, rent/maintenance history, pending offers

use std::collections::{BTreeSet, VecDeque};

use crate::collective::Collective;
use crate::market::Offer;
use crate::types::{BuildingId, Month, NeighborhoodId, Owner, Position, TenantId};

/// Months of income/maintenance history kept per unit
pub const HISTORY_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sale {
    pub month: Month,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub label: String,
    pub building: BuildingId,
    pub pos: Position,
    pub neighborhood: NeighborhoodId,

    pub area: f64,
    pub rent: f64,
    pub occupancy: usize,
    pub tenants: BTreeSet<TenantId>,
    /// `None` only while the world is being populated
    pub owner: Option<Owner>,

    pub maintenance: f64,
    /// In [0, 1]
    pub condition: f64,
    pub value: f64,

    /// Month the current lease started (first move-in after a vacancy)
    pub lease_month: Month,
    pub months_vacant: u32,

    pub income_history: VecDeque<f64>,
    pub maintenance_history: VecDeque<f64>,
    pub mean_income: f64,
    pub mean_maintenance: f64,

    pub offers: Vec<Offer>,
    pub recently_sold: bool,
    pub last_sale: Option<Sale>,
}

impl Unit {
    pub fn new(
        label: String,
        building: BuildingId,
        pos: Position,
        neighborhood: NeighborhoodId,
        area: f64,
        rent: f64,
        occupancy: usize,
    ) -> Self {
        Self {
            label,
            building,
            pos,
            neighborhood,
            area,
            rent,
            occupancy: occupancy.max(1),
            tenants: BTreeSet::new(),
            owner: None,
            maintenance: 0.0,
            condition: 1.0,
            value: 0.0,
            lease_month: 0,
            months_vacant: 0,
            income_history: VecDeque::with_capacity(HISTORY_LEN),
            maintenance_history: VecDeque::with_capacity(HISTORY_LEN),
            mean_income: 0.0,
            mean_maintenance: 0.0,
            offers: Vec::new(),
            recently_sold: false,
            last_sale: None,
        }
    }

    pub fn with_maintenance(mut self, maintenance: f64) -> Self {
        self.maintenance = maintenance;
        self
    }

    pub fn is_vacant(&self) -> bool {
        self.tenants.is_empty()
    }

    /// Free places left
    pub fn vacancies(&self) -> usize {
        self.occupancy.saturating_sub(self.tenants.len())
    }

    pub fn has_vacancy(&self) -> bool {
        self.vacancies() > 0
    }

    pub fn rent_per_area(&self) -> f64 {
        self.rent / self.area
    }

    pub fn value_per_area(&self) -> f64 {
        self.value / self.area
    }

    /// Add a tenant. Starts a new lease if the unit was empty.
    /// The caller is responsible for the tenant's residence pointer.
    pub fn admit(&mut self, tenant: TenantId, month: Month) {
        debug_assert!(self.has_vacancy(), "unit {} is over occupancy", self.label);
        if self.tenants.is_empty() {
            self.lease_month = month;
            self.months_vacant = 0;
        }
        self.tenants.insert(tenant);
    }

    pub fn release(&mut self, tenant: TenantId) -> bool {
        self.tenants.remove(&tenant)
    }

    /// Whole years since the lease started, on the anniversary month only
    pub fn is_lease_anniversary(&self, month: Month) -> bool {
        month > self.lease_month && (month - self.lease_month) % 12 == 0
    }

    /// Record this month's income and maintenance, count a vacant month and
    /// refresh the linearly-weighted trailing means
    pub fn collect_rent(&mut self) {
        let income = if self.is_vacant() {
            self.months_vacant += 1;
            0.0
        } else {
            self.rent
        };
        push_bounded(&mut self.income_history, income);
        push_bounded(&mut self.maintenance_history, self.maintenance);
        self.mean_income = weighted_mean(&self.income_history);
        self.mean_maintenance = weighted_mean(&self.maintenance_history);
    }

    /// Trailing maintenance spend per unit of income, if there was income
    pub fn maintenance_ratio(&self) -> Option<f64> {
        (self.mean_income > 0.0).then(|| self.mean_maintenance / self.mean_income)
    }

    /// Rent after the collective's member discount for `tenants`.
    /// Non-collective units always charge nominal rent.
    pub fn adjusted_rent(
        &self,
        collective: &Collective,
        tenants: impl IntoIterator<Item = TenantId>,
    ) -> f64 {
        if self.owner != Some(Owner::Collective) {
            return self.rent;
        }
        let total_share: f64 = tenants.into_iter().map(|t| collective.shares(t)).sum();
        (self.rent - collective.last_revenue * total_share).max(0.0)
    }

    /// Adjusted rent for the current tenants
    pub fn current_adjusted_rent(&self, collective: &Collective) -> f64 {
        self.adjusted_rent(collective, self.tenants.iter().copied())
    }
}

fn push_bounded(history: &mut VecDeque<f64>, value: f64) {
    if history.len() == HISTORY_LEN {
        history.pop_front();
    }
    history.push_back(value);
}

/// Mean with weights rising linearly from oldest (1/n) to newest (1)
pub fn weighted_mean(history: &VecDeque<f64>) -> f64 {
    let n = history.len();
    if n == 0 {
        return 0.0;
    }
    let (num, den) = history
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, v)| {
            let w = (i + 1) as f64 / n as f64;
            (num + w * v, den + w)
        });
    num / den
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn unit() -> Unit {
        Unit::new(
            "0_0__0".into(),
            BuildingId(0),
            (0, 0),
            NeighborhoodId(0),
            100.0,
            1000.0,
            2,
        )
    }

    #[test]
    fn test_weighted_mean_favors_recent() {
        let history: VecDeque<f64> = [0.0, 0.0, 30.0].into_iter().collect();
        // weights 1/3, 2/3, 1 -> 30 / 2
        assert!((weighted_mean(&history) - 15.0).abs() < 1e-9);
        assert_eq!(weighted_mean(&VecDeque::new()), 0.0);
    }

    #[test]
    fn test_collect_rent_records_zero_when_vacant() {
        let mut u = unit().with_maintenance(5.0);
        u.collect_rent();
        assert_eq!(u.income_history.back(), Some(&0.0));
        assert_eq!(u.maintenance_ratio(), None);
        assert_eq!(u.months_vacant, 1);

        let mut tenants: SlotMap<TenantId, ()> = SlotMap::with_key();
        u.admit(tenants.insert(()), 0);
        u.collect_rent();
        assert_eq!(u.income_history.back(), Some(&1000.0));
        assert_eq!(u.months_vacant, 0);
        assert!(u.maintenance_ratio().unwrap() > 0.0);
    }

    #[test]
    fn test_history_window_is_bounded() {
        let mut u = unit();
        for _ in 0..30 {
            u.collect_rent();
        }
        assert_eq!(u.income_history.len(), HISTORY_LEN);
        assert_eq!(u.maintenance_history.len(), HISTORY_LEN);
    }

    #[test]
    fn test_admit_starts_lease_only_when_empty() {
        let mut tenants: SlotMap<TenantId, ()> = SlotMap::with_key();
        let mut u = unit();
        u.months_vacant = 4;
        u.admit(tenants.insert(()), 3);
        assert_eq!((u.lease_month, u.months_vacant), (3, 0));
        u.admit(tenants.insert(()), 7);
        assert_eq!(u.lease_month, 3);
        assert!(!u.has_vacancy());
    }

    #[test]
    fn test_lease_anniversary() {
        let mut u = unit();
        u.lease_month = 2;
        assert!(!u.is_lease_anniversary(2));
        assert!(u.is_lease_anniversary(14));
        assert!(!u.is_lease_anniversary(15));
        assert!(u.is_lease_anniversary(26));
    }

    #[test]
    fn test_adjusted_rent_ignores_non_collective_owners() {
        let mut tenants: SlotMap<TenantId, ()> = SlotMap::with_key();
        let t = tenants.insert(());
        let mut collective = Collective::new(0.0);
        collective.add_funds(t, 100.0, 1.0);
        collective.last_revenue = 400.0;

        let mut u = unit();
        assert_eq!(u.adjusted_rent(&collective, [t]), 1000.0);
        u.owner = Some(Owner::Collective);
        assert_eq!(u.adjusted_rent(&collective, [t]), 600.0);

        collective.last_revenue = 5000.0;
        assert_eq!(u.adjusted_rent(&collective, [t]), 0.0);
    }
}
