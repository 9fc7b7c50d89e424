use std::cmp::Ordering;

use super::offers::{Offer, OfferStatus};

// === SINGLE UNIT CLEARING ===

/// Pick the winning offer on one unit and mark every offer's status.
///
/// The winner is the highest bid strictly above `reservation` whose bidder
/// `can_pay`. Equal bids go to the lowest bidder in `Owner` order. Every
/// other offer is rejected. A `None` reservation means the owner will not
/// sell, so everything is rejected.
///
/// Returns the index of the accepted offer.
pub fn clear_offers(
    offers: &mut [Offer],
    reservation: Option<f64>,
    can_pay: impl Fn(&Offer) -> bool,
) -> Option<usize> {
    let winner = reservation.and_then(|reservation| {
        offers
            .iter()
            .enumerate()
            .filter(|(_, o)| o.amount > reservation && can_pay(o))
            .min_by(|(_, a), (_, b)| rank_offers(a, b))
            .map(|(i, _)| i)
    });

    for (i, offer) in offers.iter_mut().enumerate() {
        offer.status = if Some(i) == winner {
            OfferStatus::Accepted
        } else {
            OfferStatus::Rejected
        };
    }
    winner
}

/// Order offers best-first: amount descending, then bidder ascending
pub fn rank_offers(a: &Offer, b: &Offer) -> Ordering {
    b.amount
        .total_cmp(&a.amount)
        .then_with(|| a.bidder.cmp(&b.bidder))
}
