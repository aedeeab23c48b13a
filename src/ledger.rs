//! Balance ledger: per-(address, property) tallies.
//!
//! ## Columns
//!
//! Each tally has two columns that participate in matching:
//!
//! - `BALANCE` — freely spendable tokens
//! - `METADEX_RESERVE` — tokens locked behind resting orders
//!
//! Both must stay non-negative at all times. An update that would go
//! negative is a [`ConsensusError`]: the dispatcher validates amounts and
//! balances before any mutation, so by the time the ledger is touched a
//! failure can only mean corrupt state.
//!
//! Storage is an ordered map so that snapshot output and totals are
//! deterministic across nodes.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConsensusError;
use crate::registry::PropertyId;

/// Which column of a tally an operation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TallyKind {
    /// Freely spendable tokens.
    Balance,
    /// Tokens locked behind resting MetaDEx orders.
    MetaDexReserve,
}

impl fmt::Display for TallyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TallyKind::Balance => write!(f, "BALANCE"),
            TallyKind::MetaDexReserve => write!(f, "METADEX_RESERVE"),
        }
    }
}

/// One address's holdings of one property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Spendable amount.
    pub balance: i64,
    /// Amount locked behind resting orders.
    pub reserve: i64,
}

impl Tally {
    fn is_empty(&self) -> bool {
        self.balance == 0 && self.reserve == 0
    }

    fn get(&self, kind: TallyKind) -> i64 {
        match kind {
            TallyKind::Balance => self.balance,
            TallyKind::MetaDexReserve => self.reserve,
        }
    }
}

/// The process-wide balance ledger.
#[derive(Debug, Default, Clone)]
pub struct BalanceLedger {
    tallies: BTreeMap<(String, PropertyId), Tally>,
}

impl BalanceLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        BalanceLedger::default()
    }

    /// Current value of one tally column. Missing tallies read as zero.
    pub fn get(&self, addr: &str, property: PropertyId, kind: TallyKind) -> i64 {
        self.tallies
            .get(&(addr.to_string(), property))
            .map(|t| t.get(kind))
            .unwrap_or(0)
    }

    /// Apply a signed delta to one tally column.
    ///
    /// The result must stay non-negative; anything else is a consensus
    /// failure and leaves the ledger untouched.
    pub fn update(
        &mut self,
        addr: &str,
        property: PropertyId,
        delta: i64,
        kind: TallyKind,
    ) -> Result<(), ConsensusError> {
        if delta == 0 {
            return Ok(());
        }
        let key = (addr.to_string(), property);
        let mut tally = self.tallies.get(&key).copied().unwrap_or_default();

        let slot = match kind {
            TallyKind::Balance => &mut tally.balance,
            TallyKind::MetaDexReserve => &mut tally.reserve,
        };
        *slot = match slot.checked_add(delta) {
            Some(v) if v >= 0 => v,
            _ => {
                return Err(ConsensusError::NegativeTally {
                    address: addr.to_string(),
                    property,
                    kind,
                    delta,
                })
            }
        };

        if tally.is_empty() {
            self.tallies.remove(&key);
        } else {
            self.tallies.insert(key, tally);
        }
        Ok(())
    }

    /// Sum of one column over every address, for conservation checks.
    pub fn total(&self, property: PropertyId, kind: TallyKind) -> i128 {
        self.tallies
            .iter()
            .filter(|((_, p), _)| *p == property)
            .map(|(_, t)| t.get(kind) as i128)
            .sum()
    }

    /// Sum of both columns over every address for one property.
    pub fn total_tokens(&self, property: PropertyId) -> i128 {
        self.total(property, TallyKind::Balance) + self.total(property, TallyKind::MetaDexReserve)
    }

    /// Deterministic iteration over all non-empty tallies.
    pub fn iter(&self) -> impl Iterator<Item = (&(String, PropertyId), &Tally)> {
        self.tallies.iter()
    }

    /// Number of non-empty tallies.
    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    /// Whether the ledger holds nothing at all.
    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
