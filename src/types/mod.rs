//! Core data types: orders, prices, trade records.

/// Exact rational price arithmetic and amount formatting.
pub mod price;

/// Orders, sub-actions and time-priority keys.
pub mod order;

/// Trade and cancellation records.
pub mod trade;

pub use order::{Order, OrderKey, SubAction, Txid};
pub use price::{Rational, COIN};
pub use trade::{CancelRecord, MatchOutcome, TradeMatch};
