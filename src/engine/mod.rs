//! Matching engine: deterministic price-time crossing and cancellation.
//!
//! ## Design Principles
//!
//! 1. **Determinism**: the same transaction stream always produces the
//!    same ledger, book, and logs, bit for bit
//! 2. **Exact arithmetic**: no floating point, no fixed-point shortcuts
//! 3. **Synchronous execution**: one transaction at a time, run to
//!    completion; nothing here suspends
//! 4. **Price-time priority**: cheapest level first, oldest order first
//!
//! The engine owns no state. Every entry point takes the book, the
//! ledger, and a log sink explicitly, so the enclosing node decides their
//! lifetimes and snapshots them at block boundaries.

pub mod matcher;

pub use matcher::{add_and_match, cancel_all_for_pair, cancel_at_price, cancel_everything};
