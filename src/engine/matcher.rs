//! Price-time matching and cancellation.
//!
//! ## Matching Rules
//!
//! An incoming order sells `property` for `desired_property`; it walks the
//! market *selling* `desired_property`, cheapest price level first, oldest
//! order first within a level. A level crosses when the taker's inverse
//! price (the most it will pay, in its own units per desired unit) is at
//! least the maker's unit price.
//!
//! ## Directional Rounding
//!
//! Fills are integer token amounts. The units the taker can buy are
//! rounded **down** — rounding up would need more tokens than the taker
//! has. The amount the taker pays for them is rounded **up**, in the
//! maker's favour — rounding down would violate the maker's posted price.
//! When that rounding pushes the effective unit price past the taker's
//! limit, the pair of orders has no representable fill and the maker is
//! skipped.
//!
//! All four ledger movements of a fill are unconditional once the
//! preconditions hold; a failure mid-fill is a consensus bug, not an
//! error to handle.

use tracing::{debug, trace};

use crate::error::ConsensusError;
use crate::ledger::{BalanceLedger, TallyKind};
use crate::orderbook::MetaDexBook;
use crate::records::{CancelLog, TradeLog};
use crate::registry::{ecosystem_of, Ecosystem, PropertyId};
use crate::types::order::{Order, OrderKey, Txid};
use crate::types::price::Rational;
use crate::types::trade::{CancelRecord, MatchOutcome, TradeMatch};

fn invariant(cond: bool, what: &'static str) -> Result<(), ConsensusError> {
    if cond {
        Ok(())
    } else {
        Err(ConsensusError::MatchInvariant(what))
    }
}

/// Match an incoming order against the book, then rest any remainder.
///
/// This is the whole of the ADD path: crossing fills execute immediately
/// with all ledger movement and trade logging, and whatever is left of
/// the order moves into METADEX_RESERVE and onto the book.
///
/// The caller has already validated the order (positive amounts, distinct
/// same-ecosystem properties, funded balance), so every error out of here
/// is fatal.
pub fn add_and_match(
    book: &mut MetaDexBook,
    ledger: &mut BalanceLedger,
    trade_log: &mut impl TradeLog,
    mut order: Order,
) -> Result<MatchOutcome, ConsensusError> {
    debug!(
        "add_and_match: {} (inverse price {})",
        order.describe(),
        order.inverse_price()
    );

    let mut outcome = match_against_book(book, ledger, trade_log, &mut order)?;

    if order.amount_remaining > 0 {
        let addr = order.addr.clone();
        let property = order.property;
        let remaining = order.amount_remaining;
        let price = order.unit_price();

        book.insert(order)?;
        ledger.update(&addr, property, -remaining, TallyKind::Balance)?;
        ledger.update(&addr, property, remaining, TallyKind::MetaDexReserve)?;

        if outcome == MatchOutcome::Nothing {
            outcome = MatchOutcome::Added;
        }
        debug!("inserted residual at {price}: {remaining} of property {property}");
    }

    debug!("add_and_match => {}", outcome.label());
    Ok(outcome)
}

/// The crossing walk. Mutates `new_order.amount_remaining` in place and
/// returns what happened, without touching the taker's reserve.
fn match_against_book(
    book: &mut MetaDexBook,
    ledger: &mut BalanceLedger,
    trade_log: &mut impl TradeLog,
    new_order: &mut Order,
) -> Result<MatchOutcome, ConsensusError> {
    let property_for_sale = new_order.property;
    let property_desired = new_order.desired_property;
    let inverse = new_order.inverse_price();
    let mut outcome = MatchOutcome::Nothing;

    if !book.has_market(property_desired) {
        trace!("nothing selling property {property_desired} on the market");
        return Ok(outcome);
    }

    let mut satisfied = false;

    'prices: for sellers_price in book.price_keys(property_desired) {
        // The taker's inverse price is the most it will pay; the level
        // price is the least the makers accept. Exact comparison, and
        // levels are only skipped, never the whole walk.
        if inverse < sellers_price {
            continue;
        }

        for (key, slab_key) in book.level_entries(property_desired, &sellers_price) {
            let old = book
                .get(slab_key)
                .ok_or(ConsensusError::MatchInvariant("resting order vanished"))?
                .clone();

            invariant(old.unit_price() == sellers_price, "level price mismatch")?;

            // The outer map key structurally guarantees the pair, but a
            // level can hold offers asking for a different property at a
            // coincidentally equal price.
            if old.desired_property != property_for_sale {
                continue;
            }

            trace!("crossing {} against {}", sellers_price, old.describe());

            invariant(old.amount_remaining > 0, "resting order empty")?;
            invariant(new_order.amount_remaining > 0, "incoming order empty")?;
            invariant(
                new_order.property == old.desired_property
                    && old.property == new_order.desired_property,
                "pair mismatch",
            )?;
            invariant(old.unit_price() <= inverse, "maker above taker limit")?;
            invariant(
                new_order.unit_price() <= old.inverse_price(),
                "taker above maker limit",
            )?;

            let seller_amount_forsale = old.amount_remaining;
            let buyer_amount_offered = new_order.amount_remaining;

            // Units of the desired property the taker could buy at the
            // maker's price, rounded down: rounding up would require more
            // tokens than the taker has.
            let r_could_buy = old.inverse_price().checked_mul_int(new_order.amount_remaining)?;
            let i_could_buy = r_could_buy.to_i128(false);
            let n_could_buy = if i_could_buy < old.amount_remaining as i128 {
                i_could_buy as i64
            } else {
                old.amount_remaining
            };

            if n_could_buy == 0 {
                trace!("taker cannot afford one unit at {sellers_price}");
                continue;
            }

            // What the taker pays for them, rounded up in the maker's
            // favour: rounding down would violate the maker's price.
            let r_would_pay = old.unit_price().checked_mul_int(n_could_buy)?;
            let n_would_pay = r_would_pay.to_i64(true)?;

            // The integer rounding can push the realized unit price past
            // the taker's limit; then there is no representable fill.
            let effective_price = Rational::new(n_would_pay as i128, n_could_buy as i128);
            if effective_price > inverse {
                trace!("effective price {effective_price} too expensive, skipping");
                continue;
            }

            let buyer_got = n_could_buy;
            let seller_got = n_would_pay;
            let buyer_left = new_order.amount_remaining - seller_got;
            let seller_left = old.amount_remaining - buyer_got;

            invariant(effective_price >= old.unit_price(), "fill below maker price")?;
            invariant(seller_left >= 0, "seller overfilled")?;
            invariant(buyer_left >= 0, "buyer overpaid")?;
            invariant(
                seller_amount_forsale == seller_left + buyer_got,
                "seller amount not conserved",
            )?;
            invariant(
                buyer_amount_offered == buyer_left + seller_got,
                "buyer amount not conserved",
            )?;

            // Payment property, buyer to seller.
            ledger.update(&new_order.addr, new_order.property, -seller_got, TallyKind::Balance)?;
            ledger.update(&old.addr, old.desired_property, seller_got, TallyKind::Balance)?;

            // Market property, seller's reserve to buyer.
            ledger.update(&old.addr, old.property, -buyer_got, TallyKind::MetaDexReserve)?;
            ledger.update(&new_order.addr, new_order.desired_property, buyer_got, TallyKind::Balance)?;

            outcome = MatchOutcome::Traded;

            trade_log.record_matched_trade(TradeMatch {
                maker_txid: old.txid,
                taker_txid: new_order.txid,
                maker_addr: old.addr.clone(),
                taker_addr: new_order.addr.clone(),
                maker_received_property: old.desired_property,
                maker_received_amount: seller_got,
                taker_received_property: new_order.desired_property,
                taker_received_amount: buyer_got,
                block: new_order.block,
            });

            new_order.amount_remaining = buyer_left;
            if buyer_left > 0 {
                outcome = MatchOutcome::TradedMoreInBuyer;
            }
            if buyer_left == 0 {
                satisfied = true;
            }

            if seller_left > 0 {
                // Same price, same time key: the decremented maker keeps
                // its priority.
                let maker = book
                    .get_mut(slab_key)
                    .ok_or(ConsensusError::MatchInvariant("maker vanished mid-fill"))?;
                maker.amount_remaining = seller_left;
                outcome = MatchOutcome::TradedMoreInSeller;
            } else {
                book.remove(property_desired, &sellers_price, &key)
                    .ok_or(ConsensusError::MatchInvariant("maker vanished mid-fill"))?;
            }

            debug!(
                "traded at {sellers_price}: buyer got {buyer_got}, seller got {seller_got} \
                 (buyer left {buyer_left}, seller left {seller_left})"
            );

            if satisfied {
                break 'prices;
            }
        }
    }

    Ok(outcome)
}

// ============================================================================
// Cancellation
// ============================================================================

/// Release one resting order back to its owner's balance and log it.
fn release_order(
    book: &mut MetaDexBook,
    ledger: &mut BalanceLedger,
    cancel_log: &mut impl CancelLog,
    cancel_txid: Txid,
    block: u32,
    property: PropertyId,
    price: &Rational,
    key: &OrderKey,
) -> Result<(), ConsensusError> {
    let order = book
        .remove(property, price, key)
        .ok_or(ConsensusError::MatchInvariant("cancel target vanished"))?;

    debug!("cancelling {}", order.describe());

    ledger.update(
        &order.addr,
        order.property,
        -order.amount_remaining,
        TallyKind::MetaDexReserve,
    )?;
    ledger.update(
        &order.addr,
        order.property,
        order.amount_remaining,
        TallyKind::Balance,
    )?;

    cancel_log.record_cancel(CancelRecord {
        cancel_txid,
        order_txid: order.txid,
        block,
        property: order.property,
        amount_unreserved: order.amount_remaining,
    });
    Ok(())
}

/// Cancel the sender's offers at exactly one price.
///
/// The price is derived from the cancel amounts the same way an offer's
/// price would be; only the level with that exact rational price is
/// touched, and within it only orders matching the sender and the
/// desired property. Returns how many orders were removed.
#[allow(clippy::too_many_arguments)]
pub fn cancel_at_price(
    book: &mut MetaDexBook,
    ledger: &mut BalanceLedger,
    cancel_log: &mut impl CancelLog,
    cancel_txid: Txid,
    block: u32,
    sender: &str,
    property: PropertyId,
    amount_forsale: i64,
    desired_property: PropertyId,
    amount_desired: i64,
) -> Result<usize, ConsensusError> {
    let cancel_price = Rational::new(amount_desired as i128, amount_forsale as i128);
    debug!(
        "cancel_at_price: {sender} {property}/{desired_property} at {cancel_price}"
    );

    let targets: Vec<OrderKey> = book
        .level_entries(property, &cancel_price)
        .into_iter()
        .filter(|(_, slab_key)| {
            book.get(*slab_key)
                .map(|o| o.addr == sender && o.desired_property == desired_property)
                .unwrap_or(false)
        })
        .map(|(key, _)| key)
        .collect();

    for key in &targets {
        release_order(
            book, ledger, cancel_log, cancel_txid, block, property, &cancel_price, key,
        )?;
    }
    Ok(targets.len())
}

/// Cancel the sender's offers for one pair at every price.
pub fn cancel_all_for_pair(
    book: &mut MetaDexBook,
    ledger: &mut BalanceLedger,
    cancel_log: &mut impl CancelLog,
    cancel_txid: Txid,
    block: u32,
    sender: &str,
    property: PropertyId,
    desired_property: PropertyId,
) -> Result<usize, ConsensusError> {
    debug!("cancel_all_for_pair: {sender} {property}/{desired_property}");

    let mut targets: Vec<(Rational, OrderKey)> = Vec::new();
    for price in book.price_keys(property) {
        for (key, slab_key) in book.level_entries(property, &price) {
            let matches = book
                .get(slab_key)
                .map(|o| o.addr == sender && o.desired_property == desired_property)
                .unwrap_or(false);
            if matches {
                targets.push((price, key));
            }
        }
    }

    for (price, key) in &targets {
        release_order(
            book, ledger, cancel_log, cancel_txid, block, property, price, key,
        )?;
    }
    Ok(targets.len())
}

/// Cancel every offer of the sender in one ecosystem.
pub fn cancel_everything(
    book: &mut MetaDexBook,
    ledger: &mut BalanceLedger,
    cancel_log: &mut impl CancelLog,
    cancel_txid: Txid,
    block: u32,
    sender: &str,
    ecosystem: Ecosystem,
) -> Result<usize, ConsensusError> {
    debug!("cancel_everything: {sender} in {ecosystem:?}");

    let mut targets: Vec<(PropertyId, Rational, OrderKey)> = Vec::new();
    for property in book.properties() {
        if ecosystem_of(property) != ecosystem {
            continue;
        }
        for price in book.price_keys(property) {
            for (key, slab_key) in book.level_entries(property, &price) {
                let matches = book
                    .get(slab_key)
                    .map(|o| o.addr == sender)
                    .unwrap_or(false);
                if matches {
                    targets.push((property, price, key));
                }
            }
        }
    }

    for (property, price, key) in &targets {
        release_order(
            book, ledger, cancel_log, cancel_txid, block, *property, price, key,
        )?;
    }
    Ok(targets.len())
}

// ============================================================================
// Unit Tests
// ============================================================================
