use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::types::{Month, Owner, OwnerRef};

// === OFFERS ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
}

impl OfferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Rejected => "rejected",
        }
    }
}

/// A bid against a unit, parked on the unit until settlement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offer {
    pub bidder: Owner,
    pub amount: f64,
    pub status: OfferStatus,
}

impl Offer {
    pub fn new(bidder: Owner, amount: f64) -> Self {
        Self {
            bidder,
            amount,
            status: OfferStatus::Pending,
        }
    }
}

/// What the owner of record is willing to sell for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reservation {
    /// Expected monthly income the owner gives up by selling
    pub forecast: f64,
    /// Minimum acceptable price; offers must beat it strictly
    pub value: f64,
}

// === MARKET ACTIVITY ===

/// One settled offer. A tick's step result is the list of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MarketRecord {
    pub tick: Month,
    pub unit: u64,
    pub neighborhood: u32,
    pub seller: OwnerRef,
    pub bidder: OwnerRef,
    pub forecast: f64,
    /// `None` when the owner refused to sell at any price
    pub reservation: Option<f64>,
    pub last_rent: f64,
    pub last_value: f64,
    pub amount: f64,
    pub status: OfferStatus,
    pub sold: bool,
}
