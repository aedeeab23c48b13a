//! Line-oriented persistence for book and ledger state.
//!
//! ## Format
//!
//! One line per resting order, in deterministic (property, price, time)
//! order:
//!
//! ```text
//! addr,block,amount_forsale,property,amount_desired,desired_property,subaction,idx,txid,amount_remaining
//! ```
//!
//! A running SHA-256 over the concatenated line text (line terminators
//! excluded) yields the consensus hash used for cross-node verification:
//! two nodes that disagree on any resting order disagree on the digest.
//!
//! The ledger uses the same style with `addr,property,balance,reserve`
//! lines. Together the two snapshots are the per-block checkpoint the
//! reorg handling of the surrounding node restores from.

use std::io::{self, BufRead, Write};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::ledger::{BalanceLedger, TallyKind};
use crate::types::order::{Order, SubAction, Txid};

use super::book::MetaDexBook;

/// A snapshot that could not be read back.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Underlying reader or writer failed.
    #[error("snapshot i/o: {0}")]
    Io(#[from] io::Error),

    /// A line did not parse as a resting order or tally.
    #[error("malformed snapshot line {line}: {reason}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: &'static str,
    },
}

/// Write every resting order and return the SHA-256 over the line text.
pub fn write_book<W: Write>(book: &MetaDexBook, out: &mut W) -> Result<[u8; 32], SnapshotError> {
    let mut sha = Sha256::new();
    for order in book.iter_ordered() {
        let line = order.snapshot_line();
        sha.update(line.as_bytes());
        writeln!(out, "{line}")?;
    }
    Ok(sha.finalize().into())
}

/// The book's consensus hash, hex-encoded, without writing anywhere.
pub fn consensus_hash(book: &MetaDexBook) -> String {
    let mut sha = Sha256::new();
    for order in book.iter_ordered() {
        sha.update(order.snapshot_line().as_bytes());
    }
    hex::encode(sha.finalize())
}

/// Read a book snapshot back into an empty book.
///
/// Only the book is restored; the matching reserves come back with the
/// ledger snapshot. Fails on the first malformed line.
pub fn read_book<R: BufRead>(input: R) -> Result<MetaDexBook, SnapshotError> {
    let mut book = MetaDexBook::new();
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let order = parse_order_line(&line).map_err(|reason| SnapshotError::Malformed {
            line: i + 1,
            reason,
        })?;
        book.insert(order)
            .map_err(|_| SnapshotError::Malformed {
                line: i + 1,
                reason: "duplicate order key",
            })?;
    }
    Ok(book)
}

fn parse_order_line(line: &str) -> Result<Order, &'static str> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 10 {
        return Err("expected 10 fields");
    }

    let addr = fields[0].to_string();
    let block = fields[1].parse::<u32>().map_err(|_| "bad block")?;
    let amount_forsale = fields[2].parse::<i64>().map_err(|_| "bad amount_forsale")?;
    let property = fields[3].parse::<u32>().map_err(|_| "bad property")?;
    let amount_desired = fields[4].parse::<i64>().map_err(|_| "bad amount_desired")?;
    let desired_property = fields[5].parse::<u32>().map_err(|_| "bad desired_property")?;
    let subaction = fields[6]
        .parse::<u8>()
        .ok()
        .and_then(SubAction::from_u8)
        .ok_or("bad subaction")?;
    let idx = fields[7].parse::<u32>().map_err(|_| "bad idx")?;
    let txid = Txid::from_hex(fields[8]).ok_or("bad txid")?;
    let amount_remaining = fields[9].parse::<i64>().map_err(|_| "bad amount_remaining")?;

    if amount_remaining <= 0 || amount_remaining > amount_forsale {
        return Err("remaining outside (0, amount_forsale]");
    }

    let mut order = Order::new(
        addr,
        block,
        idx,
        txid,
        property,
        amount_forsale,
        desired_property,
        amount_desired,
        subaction,
    );
    order.amount_remaining = amount_remaining;
    Ok(order)
}

/// Write every non-empty tally as `addr,property,balance,reserve`,
/// returning the SHA-256 over the line text.
pub fn write_ledger<W: Write>(
    ledger: &BalanceLedger,
    out: &mut W,
) -> Result<[u8; 32], SnapshotError> {
    let mut sha = Sha256::new();
    for ((addr, property), tally) in ledger.iter() {
        let line = format!("{addr},{property},{},{}", tally.balance, tally.reserve);
        sha.update(line.as_bytes());
        writeln!(out, "{line}")?;
    }
    Ok(sha.finalize().into())
}

/// Read a ledger snapshot back into an empty ledger.
pub fn read_ledger<R: BufRead>(input: R) -> Result<BalanceLedger, SnapshotError> {
    let mut ledger = BalanceLedger::new();
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let malformed = |reason| SnapshotError::Malformed { line: i + 1, reason };

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 4 {
            return Err(malformed("expected 4 fields"));
        }
        let property = fields[1].parse::<u32>().map_err(|_| malformed("bad property"))?;
        let balance = fields[2].parse::<i64>().map_err(|_| malformed("bad balance"))?;
        let reserve = fields[3].parse::<i64>().map_err(|_| malformed("bad reserve"))?;

        ledger
            .update(fields[0], property, balance, TallyKind::Balance)
            .map_err(|_| malformed("negative balance"))?;
        ledger
            .update(fields[0], property, reserve, TallyKind::MetaDexReserve)
            .map_err(|_| malformed("negative reserve"))?;
    }
    Ok(ledger)
}

// ============================================================================
// Unit Tests
// ============================================================================
