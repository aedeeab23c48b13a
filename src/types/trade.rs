//! Records produced by matching and cancellation.
//!
//! These are the rows the trade log and cancel log sinks receive. The
//! sinks themselves live in [`crate::records`]; the shapes here are part
//! of the consensus-observable history.

use crate::registry::PropertyId;
use crate::types::order::Txid;

/// What a call to the matching engine did, for the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// No opposing market, or nothing crossed.
    Nothing,
    /// Both sides were fully consumed.
    Traded,
    /// Traded, and the resting side kept a remainder.
    TradedMoreInSeller,
    /// Traded, and the incoming side kept a remainder.
    TradedMoreInBuyer,
    /// Nothing crossed; the full order was placed in the book.
    Added,
    /// An order was cancelled.
    Cancelled,
}

impl MatchOutcome {
    /// Stable label used in the log.
    pub fn label(self) -> &'static str {
        match self {
            MatchOutcome::Nothing => "NOTHING",
            MatchOutcome::Traded => "TRADED",
            MatchOutcome::TradedMoreInSeller => "TRADED_MOREINSELLER",
            MatchOutcome::TradedMoreInBuyer => "TRADED_MOREINBUYER",
            MatchOutcome::Added => "ADDED",
            MatchOutcome::Cancelled => "CANCELLED",
        }
    }
}

/// One executed fill between a resting (maker) and incoming (taker) order.
///
/// Amounts are what each side *received*: the maker got paid in the
/// property it asked for, the taker got the property it was buying. The
/// two properties are always distinct and always sum-conserving per
/// property across the fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeMatch {
    /// Transaction that created the resting order.
    pub maker_txid: Txid,
    /// Transaction that created the incoming order.
    pub taker_txid: Txid,
    /// Owner of the resting order.
    pub maker_addr: String,
    /// Owner of the incoming order.
    pub taker_addr: String,
    /// Property the maker received (what the taker was selling).
    pub maker_received_property: PropertyId,
    /// Amount of it the maker received.
    pub maker_received_amount: i64,
    /// Property the taker received (what the maker was selling).
    pub taker_received_property: PropertyId,
    /// Amount of it the taker received.
    pub taker_received_amount: i64,
    /// Block the fill executed in.
    pub block: u32,
}

/// One cancelled resting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelRecord {
    /// The cancelling transaction.
    pub cancel_txid: Txid,
    /// The order that was cancelled.
    pub order_txid: Txid,
    /// Block the cancellation executed in.
    pub block: u32,
    /// Property that was reserved for the order.
    pub property: PropertyId,
    /// Amount moved back from reserve to balance.
    pub amount_unreserved: i64,
}
