//! Order book: nested price-ordered storage for resting offers.
//!
//! ## Layout
//!
//! ```text
//! property → unit_price (exact rational, ascending) → (block, idx) → Order
//! ```
//!
//! Orders live in a slab arena; the nested maps index into it. Levels are
//! created lazily and pruned when empty, so an order is in the book iff
//! its `amount_remaining` is positive.

/// The nested book structure.
pub mod book;

/// Time-ordered queue at one price.
pub mod level;

/// Line snapshots and the SHA-256 consensus hash.
pub mod snapshot;

pub use book::MetaDexBook;
pub use level::PriceLevel;
pub use snapshot::{consensus_hash, read_book, read_ledger, write_book, write_ledger, SnapshotError};
