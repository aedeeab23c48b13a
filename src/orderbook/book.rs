//! The MetaDEx order book.
//!
//! ## Architecture
//!
//! A hybrid structure, nested the way matching walks it:
//!
//! - **Slab**: arena holding every resting [`Order`]
//! - **BTreeMap** per property: price levels keyed by exact rational
//!   `unit_price`, ascending
//! - **PriceLevel**: time-ordered index into the slab
//! - **HashMap**: txid to slab key, for O(1) open-order lookup
//!
//! The outer map is keyed by the property each resting order is *selling*
//! — which is what an incoming taker wants, so the taker's lookup key is
//! its `desired_property`.
//!
//! ## Invariants
//!
//! - an order is present iff `amount_remaining > 0`
//! - every order at price key `p` has `unit_price() == p` exactly
//! - `(block, idx)` is unique book-wide
//!
//! Inner levels are created lazily on insert and pruned when the last
//! order leaves, so consumers never observe empty levels or empty
//! property markets.

use std::collections::{BTreeMap, HashMap};

use slab::Slab;
use tracing::debug;

use crate::error::ConsensusError;
use crate::registry::PropertyId;
use crate::types::order::{Order, OrderKey, Txid};
use crate::types::price::Rational;

use super::level::PriceLevel;

/// Price-ordered markets for every property with open offers.
pub type PriceMap = BTreeMap<Rational, PriceLevel>;

/// The book: property → price → time-ordered orders.
#[derive(Debug, Default)]
pub struct MetaDexBook {
    /// Arena for all resting orders.
    orders: Slab<Order>,

    /// Per-property price maps, ascending by exact unit price.
    markets: BTreeMap<PropertyId, PriceMap>,

    /// Open-order index for status queries.
    by_txid: HashMap<Txid, usize>,
}

impl MetaDexBook {
    /// Create an empty book.
    pub fn new() -> Self {
        MetaDexBook::default()
    }

    /// Create a book with arena capacity pre-allocated.
    pub fn with_capacity(order_capacity: usize) -> Self {
        MetaDexBook {
            orders: Slab::with_capacity(order_capacity),
            markets: BTreeMap::new(),
            by_txid: HashMap::with_capacity(order_capacity),
        }
    }

    // ========================================================================
    // Size
    // ========================================================================

    /// Number of resting orders.
    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the book holds no orders.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Whether any offer is selling the given property.
    #[inline]
    pub fn has_market(&self, property: PropertyId) -> bool {
        self.markets.contains_key(&property)
    }

    // ========================================================================
    // Insert / Remove
    // ========================================================================

    /// Place an order at the level determined by its unit price, in time
    /// order.
    ///
    /// Fails with [`ConsensusError::DuplicateOrder`] when an order with
    /// the same `(block, idx)` already rests at that price — valid input
    /// can never produce this.
    pub fn insert(&mut self, order: Order) -> Result<usize, ConsensusError> {
        let property = order.property;
        let price = order.unit_price();
        let key = order.key();
        let txid = order.txid;

        let level = self
            .markets
            .entry(property)
            .or_default()
            .entry(price)
            .or_default();
        if level.contains(&key) {
            return Err(ConsensusError::DuplicateOrder {
                block: key.block,
                idx: key.idx,
            });
        }

        let slab_key = self.orders.insert(order);
        level.insert(key, slab_key);
        self.by_txid.insert(txid, slab_key);
        Ok(slab_key)
    }

    /// Remove one order, pruning its level and market if they empty out.
    pub fn remove(
        &mut self,
        property: PropertyId,
        price: &Rational,
        key: &OrderKey,
    ) -> Option<Order> {
        let market = self.markets.get_mut(&property)?;
        let level = market.get_mut(price)?;
        let slab_key = level.remove(key)?;

        if level.is_empty() {
            market.remove(price);
        }
        if market.is_empty() {
            self.markets.remove(&property);
        }

        let order = self.orders.remove(slab_key);
        self.by_txid.remove(&order.txid);
        Some(order)
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Shared access to an order by slab key.
    #[inline]
    pub fn get(&self, slab_key: usize) -> Option<&Order> {
        self.orders.get(slab_key)
    }

    /// Mutable access to an order by slab key.
    ///
    /// Callers may only mutate `amount_remaining`: the price key and the
    /// time key must never change while the order rests.
    #[inline]
    pub fn get_mut(&mut self, slab_key: usize) -> Option<&mut Order> {
        self.orders.get_mut(slab_key)
    }

    /// The ascending price levels selling one property, if any.
    pub fn prices_for(&self, property: PropertyId) -> Option<&PriceMap> {
        self.markets.get(&property)
    }

    /// Snapshot of the ascending prices in one market.
    ///
    /// Taken by value so the matching loop can mutate levels while it
    /// walks; prices it later finds emptied are simply skipped.
    pub fn price_keys(&self, property: PropertyId) -> Vec<Rational> {
        self.markets
            .get(&property)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of `(time key, slab key)` pairs at one level, oldest
    /// first. Empty if the level does not exist.
    pub fn level_entries(&self, property: PropertyId, price: &Rational) -> Vec<(OrderKey, usize)> {
        self.markets
            .get(&property)
            .and_then(|m| m.get(price))
            .map(|l| l.iter().map(|(k, s)| (*k, *s)).collect())
            .unwrap_or_default()
    }

    /// Properties that currently have offers, ascending.
    pub fn properties(&self) -> Vec<PropertyId> {
        self.markets.keys().copied().collect()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether the order created by `txid` still rests in the book.
    #[inline]
    pub fn is_open(&self, txid: &Txid) -> bool {
        self.by_txid.contains_key(txid)
    }

    /// The resting order created by `txid`, if still open.
    pub fn find_by_txid(&self, txid: &Txid) -> Option<&Order> {
        self.by_txid.get(txid).and_then(|k| self.orders.get(*k))
    }

    /// Sum of `amount_remaining` over an address's offers of one
    /// property. Equals that address's METADEX_RESERVE when the book and
    /// ledger agree.
    pub fn reserved_total(&self, addr: &str, property: PropertyId) -> i128 {
        self.orders
            .iter()
            .filter(|(_, o)| o.property == property && o.addr == addr)
            .map(|(_, o)| o.amount_remaining as i128)
            .sum()
    }

    /// Every resting order in deterministic (property, price, time) order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &Order> {
        self.markets.values().flat_map(move |market| {
            market.values().flat_map(move |level| {
                level
                    .iter()
                    .filter_map(move |(_, slab_key)| self.orders.get(*slab_key))
            })
        })
    }

    /// Dump the whole book to the log, one line per order.
    pub fn debug_print(&self) {
        debug!("<<<");
        for (property, market) in &self.markets {
            debug!(" ## property: {property}");
            for (price, level) in market {
                debug!("  # price level: {price}");
                for (_, slab_key) in level.iter() {
                    if let Some(order) = self.orders.get(*slab_key) {
                        debug!("{price}= {}", order.describe());
                    }
                }
            }
        }
        debug!(">>>");
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
