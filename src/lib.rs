//! # MetaDEx
//!
//! Deterministic on-chain order matching for a token overlay protocol.
//!
//! ## Architecture
//!
//! The core consists of:
//! - **Types**: exact rational prices, orders, trade records
//! - **Ledger**: per-(address, property) balance and reserve tallies
//! - **Registry**: token classes and ecosystems
//! - **OrderBook**: property → price → time-ordered offers
//! - **Engine**: price-time matching with directional rounding
//! - **Tx**: binary payload decoding and per-type dispatch
//!
//! ## Design Principles
//!
//! 1. **Determinism**: every node derives bit-identical balances and book
//!    state from the same transaction stream
//! 2. **No floating point**: consensus paths use exact rational and
//!    checked integer arithmetic only
//! 3. **Synchronous execution**: transactions apply one at a time in
//!    block order; nothing in the core suspends or retries
//! 4. **Explicit state**: book, ledger, registry and log sinks are fields
//!    of [`MetaDex`], never globals, so snapshot and replay are the
//!    caller's to control

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core data types: prices, orders, trade records.
pub mod types;

/// Rejection and consensus-failure errors.
pub mod error;

/// Balance ledger with non-negative tallies.
pub mod ledger;

/// Property registry and ecosystems.
pub mod registry;

/// Order book: nested price-ordered storage.
pub mod orderbook;

/// Matching engine and cancellation.
pub mod engine;

/// Log sinks, chain clock, status queries.
pub mod records;

/// Payload decoding and transaction dispatch.
pub mod tx;

pub use error::{ConsensusError, RejectReason};
pub use ledger::{BalanceLedger, TallyKind};
pub use orderbook::MetaDexBook;
pub use registry::{Ecosystem, InMemoryRegistry, PropertyId, PropertyRegistry};
pub use tx::{Disposition, FeatureSchedule, MetaDex, Transaction};
pub use types::{MatchOutcome, Order, OrderKey, Rational, SubAction, Txid};
