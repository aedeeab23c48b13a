//! Order types for the MetaDEx matching engine.
//!
//! ## Time Priority
//!
//! An order's position in the book is fixed by `(block, idx)` — the block
//! height it arrived in and its sequence index inside that block. The pair
//! is unique across the whole book, so priority ties never arise.
//!
//! ## Prices
//!
//! Prices are never stored; they are derived from the original amounts:
//!
//! - `unit_price = amount_desired / amount_forsale` — cost per offered
//!   unit, in units of the desired property
//! - `inverse_price = amount_forsale / amount_desired` — offered units per
//!   desired unit
//!
//! Partial fills reduce `amount_remaining` only, so an order's price key
//! never changes while it rests.

use std::fmt;

use crate::registry::{is_base_token, PropertyId};
use crate::types::price::{format_amount, format_divisible, Rational, COIN};

/// Opaque 256-bit transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    /// Parse from the 64-character hex form used in snapshots.
    pub fn from_hex(s: &str) -> Option<Txid> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Txid(arr))
    }

    /// Deterministic test/demo hash derived from a counter.
    pub fn from_seed(seed: u64) -> Txid {
        let mut arr = [0u8; 32];
        arr[..8].copy_from_slice(&seed.to_be_bytes());
        Txid(arr)
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// MetaDEx sub-action carried by an order.
///
/// Stored as its wire discriminant in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubAction {
    /// Place a new offer and match it.
    #[default]
    Add,
    /// Cancel the sender's offers at one exact price.
    CancelAtPrice,
    /// Cancel the sender's offers for one pair at every price.
    CancelAllForPair,
    /// Cancel every offer of the sender in one ecosystem.
    CancelEverything,
}

impl SubAction {
    /// Wire discriminant.
    pub fn to_u8(self) -> u8 {
        match self {
            SubAction::Add => 1,
            SubAction::CancelAtPrice => 2,
            SubAction::CancelAllForPair => 3,
            SubAction::CancelEverything => 4,
        }
    }

    /// Decode the wire discriminant.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(SubAction::Add),
            2 => Some(SubAction::CancelAtPrice),
            3 => Some(SubAction::CancelAllForPair),
            4 => Some(SubAction::CancelEverything),
            _ => None,
        }
    }
}

/// Time-priority key: earlier block wins, then lower intra-block index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey {
    /// Block height the order arrived in.
    pub block: u32,
    /// Sequence index inside the block.
    pub idx: u32,
}

/// A limit order, resting or incoming.
///
/// `amount_forsale` and `amount_desired` are immutable once created; they
/// define the price. `amount_remaining` is the unfilled portion of
/// `amount_forsale` and is the only field matching mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Owner address.
    pub addr: String,
    /// Block height the order arrived in.
    pub block: u32,
    /// Sequence index inside the block.
    pub idx: u32,
    /// Hash of the creating transaction.
    pub txid: Txid,
    /// Property offered for sale.
    pub property: PropertyId,
    /// Initial offered amount, in willets.
    pub amount_forsale: i64,
    /// Property requested in exchange.
    pub desired_property: PropertyId,
    /// Initial requested amount, in willets.
    pub amount_desired: i64,
    /// Unfilled portion of `amount_forsale`.
    pub amount_remaining: i64,
    /// Sub-action the creating transaction carried.
    pub subaction: SubAction,
}

impl Order {
    /// Create a new order with nothing filled yet.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        addr: impl Into<String>,
        block: u32,
        idx: u32,
        txid: Txid,
        property: PropertyId,
        amount_forsale: i64,
        desired_property: PropertyId,
        amount_desired: i64,
        subaction: SubAction,
    ) -> Self {
        Order {
            addr: addr.into(),
            block,
            idx,
            txid,
            property,
            amount_forsale,
            desired_property,
            amount_desired,
            amount_remaining: amount_forsale,
            subaction,
        }
    }

    /// Time-priority key.
    #[inline]
    pub fn key(&self) -> OrderKey {
        OrderKey {
            block: self.block,
            idx: self.idx,
        }
    }

    /// Cost per offered unit, in units of the desired property.
    ///
    /// Zero if `amount_forsale` is zero, which validation rejects upstream.
    pub fn unit_price(&self) -> Rational {
        if self.amount_forsale == 0 {
            return Rational::ZERO;
        }
        Rational::new(self.amount_desired as i128, self.amount_forsale as i128)
    }

    /// Offered units yielded per unit of the desired property.
    pub fn inverse_price(&self) -> Rational {
        if self.amount_desired == 0 {
            return Rational::ZERO;
        }
        Rational::new(self.amount_forsale as i128, self.amount_desired as i128)
    }

    /// Whether any of the offer is still unfilled.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.amount_remaining > 0
    }

    /// One-line description for the log, price first.
    pub fn describe(&self) -> String {
        format!(
            "{}: {} in {}/{:03}, txid: {:.10}, trade #{} {} for #{} {}",
            self.unit_price(),
            self.addr,
            self.block,
            self.idx,
            self.txid.to_string(),
            self.property,
            self.amount_forsale,
            self.desired_property,
            self.amount_desired,
        )
    }

    /// Unit price for display, eight decimal places, rounded up.
    ///
    /// Quotes against the base token where possible: offers *for* the base
    /// token show their unit price, offers *of* the base token show the
    /// inverse. Divisible properties are re-scaled by [`COIN`] so the
    /// figure reads in tokens rather than willets. Prices below one willet
    /// per unit render as `0.00000000` and are hidden by interfaces.
    ///
    /// Rounding is always up: a displayed price that was rounded down
    /// would not actually result in a trade when re-submitted.
    pub fn display_unit_price(&self, sale_divisible: bool, desired_divisible: bool) -> String {
        let mut price;
        if is_base_token(self.desired_property) {
            price = self.unit_price();
            if sale_divisible {
                match price.checked_mul_int(COIN) {
                    Ok(p) => price = p,
                    Err(_) => return price.to_string(),
                }
            }
        } else {
            price = self.inverse_price();
            if desired_divisible {
                match price.checked_mul_int(COIN) {
                    Ok(p) => price = p,
                    Err(_) => return price.to_string(),
                }
            }
        }

        if price < Rational::ONE {
            return "0.00000000".to_string();
        }
        match price.to_i64(true) {
            Ok(v) => format_divisible(v),
            Err(_) => price.to_string(),
        }
    }

    /// Human form of the amount still for sale.
    pub fn format_remaining(&self, divisible: bool) -> String {
        format_amount(divisible, self.amount_remaining)
    }

    /// One snapshot line, exactly the persistent layout:
    /// `addr,block,amount_forsale,property,amount_desired,desired_property,subaction,idx,txid,amount_remaining`
    pub fn snapshot_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{}",
            self.addr,
            self.block,
            self.amount_forsale,
            self.property,
            self.amount_desired,
            self.desired_property,
            self.subaction.to_u8(),
            self.idx,
            self.txid,
            self.amount_remaining,
        )
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
