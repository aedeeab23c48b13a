//! External interface glue: trade log, cancel log, chain clock, status.
//!
//! The core never writes a database itself; it hands every executed fill
//! and every cancellation to sink traits the node implements. The
//! in-memory sinks here back the tests, the demo binary, and the status
//! queries.

use crate::orderbook::MetaDexBook;
use crate::registry::PropertyId;
use crate::types::order::Txid;
use crate::types::trade::{CancelRecord, TradeMatch};

/// Recorded intent to trade, written before matching runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeIntent {
    /// Transaction placing the order.
    pub txid: Txid,
    /// Order owner.
    pub addr: String,
    /// Property offered.
    pub property: PropertyId,
    /// Property requested.
    pub desired_property: PropertyId,
    /// Block the order arrived in.
    pub block: u32,
    /// Intra-block index.
    pub idx: u32,
}

/// Sink for the trade history.
pub trait TradeLog {
    /// A new order was accepted, before any matching.
    fn record_trade_intent(&mut self, intent: TradeIntent);

    /// A fill executed.
    fn record_matched_trade(&mut self, fill: TradeMatch);
}

/// Sink for cancellations.
pub trait CancelLog {
    /// A resting order was cancelled and its reserve released.
    fn record_cancel(&mut self, cancel: CancelRecord);
}

/// Block-time lookups the core consumes from the chain.
pub trait BlockClock {
    /// Unix timestamp of the block at `height`, if known.
    fn block_time(&self, height: u32) -> Option<i64>;
}

/// In-memory trade history.
#[derive(Debug, Default)]
pub struct MemoryTradeLog {
    /// Accepted orders in arrival order.
    pub intents: Vec<TradeIntent>,
    /// Executed fills in execution order.
    pub matches: Vec<TradeMatch>,
}

impl MemoryTradeLog {
    /// Empty log.
    pub fn new() -> Self {
        MemoryTradeLog::default()
    }

    /// Amounts this order has sold and received across all its fills,
    /// whichever side of each fill it was on.
    pub fn totals_for(&self, txid: &Txid) -> (i64, i64) {
        let mut sold = 0i64;
        let mut received = 0i64;
        for m in &self.matches {
            if m.maker_txid == *txid {
                sold += m.taker_received_amount;
                received += m.maker_received_amount;
            }
            if m.taker_txid == *txid {
                sold += m.maker_received_amount;
                received += m.taker_received_amount;
            }
        }
        (sold, received)
    }
}

impl TradeLog for MemoryTradeLog {
    fn record_trade_intent(&mut self, intent: TradeIntent) {
        self.intents.push(intent);
    }

    fn record_matched_trade(&mut self, fill: TradeMatch) {
        self.matches.push(fill);
    }
}

/// In-memory cancellation history.
#[derive(Debug, Default)]
pub struct MemoryCancelLog {
    /// Cancellations in execution order.
    pub cancels: Vec<CancelRecord>,
}

impl MemoryCancelLog {
    /// Empty log.
    pub fn new() -> Self {
        MemoryCancelLog::default()
    }
}

impl CancelLog for MemoryCancelLog {
    fn record_cancel(&mut self, cancel: CancelRecord) {
        self.cancels.push(cancel);
    }
}

/// Fixed-interval chain clock for tests and the demo.
#[derive(Debug, Clone, Copy)]
pub struct FixedIntervalClock {
    /// Timestamp of block zero.
    pub genesis_time: i64,
    /// Seconds between blocks.
    pub seconds_per_block: i64,
}

impl BlockClock for FixedIntervalClock {
    fn block_time(&self, height: u32) -> Option<i64> {
        Some(self.genesis_time + self.seconds_per_block * i64::from(height))
    }
}

// ============================================================================
// Status queries
// ============================================================================

/// Lifecycle label of an order, derived from book presence and fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Resting, nothing filled.
    Open,
    /// Resting with some fills.
    OpenPartFilled,
    /// Gone from the book with every unit sold.
    Filled,
    /// Gone from the book without a single fill.
    Cancelled,
    /// Gone from the book with some fills.
    CancelledPartFilled,
}

impl OrderStatus {
    /// Label used by the query interface.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::OpenPartFilled => "open part filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::CancelledPartFilled => "cancelled part filled",
        }
    }
}

/// Status of the order created by `txid`.
///
/// Offers gone from the book without being fully sold must have been
/// cancelled; a full sale wins over the cancelled labels.
pub fn order_status(
    book: &MetaDexBook,
    log: &MemoryTradeLog,
    txid: &Txid,
    amount_forsale: i64,
) -> OrderStatus {
    let (total_sold, _) = log.totals_for(txid);
    let open = book.is_open(txid);
    let part_filled = total_sold > 0;
    let filled = total_sold >= amount_forsale;

    if open {
        if part_filled {
            OrderStatus::OpenPartFilled
        } else {
            OrderStatus::Open
        }
    } else if filled {
        OrderStatus::Filled
    } else if part_filled {
        OrderStatus::CancelledPartFilled
    } else {
        OrderStatus::Cancelled
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::order::{Order, SubAction};

    fn fill(maker: u64, taker: u64, maker_amt: i64, taker_amt: i64) -> TradeMatch {
        TradeMatch {
            maker_txid: Txid::from_seed(maker),
            taker_txid: Txid::from_seed(taker),
            maker_addr: "1Maker".into(),
            taker_addr: "1Taker".into(),
            maker_received_property: 1,
            maker_received_amount: maker_amt,
            taker_received_property: 3,
            taker_received_amount: taker_amt,
            block: 100,
        }
    }

    #[test]
    fn test_totals_for_both_roles() {
        let mut log = MemoryTradeLog::new();
        log.record_matched_trade(fill(1, 2, 200, 100));
        log.record_matched_trade(fill(3, 1, 50, 10));

        // As maker of fill 1: sold 100, received 200.
        // As taker of fill 2: sold 50, received 10.
        let (sold, received) = log.totals_for(&Txid::from_seed(1));
        assert_eq!(sold, 150);
        assert_eq!(received, 210);

        let (sold, received) = log.totals_for(&Txid::from_seed(9));
        assert_eq!(sold, 0);
        assert_eq!(received, 0);
    }

    #[test]
    fn test_status_labels() {
        let mut book = MetaDexBook::new();
        let mut log = MemoryTradeLog::new();
        let txid = Txid::from_seed(1);

        // Not in book, no fills: cancelled.
        assert_eq!(order_status(&book, &log, &txid, 100), OrderStatus::Cancelled);

        // In book, no fills: open.
        book.insert(Order::new(
            "1Maker", 100, 0, txid, 3, 100, 1, 200, SubAction::Add,
        ))
        .unwrap();
        assert_eq!(order_status(&book, &log, &txid, 100), OrderStatus::Open);

        // In book with a partial fill: open part filled.
        log.record_matched_trade(fill(1, 2, 80, 40));
        assert_eq!(
            order_status(&book, &log, &txid, 100),
            OrderStatus::OpenPartFilled
        );

        // Removed with partial fill: cancelled part filled.
        let order = book.find_by_txid(&txid).unwrap().clone();
        book.remove(order.property, &order.unit_price(), &order.key());
        assert_eq!(
            order_status(&book, &log, &txid, 100),
            OrderStatus::CancelledPartFilled
        );

        // Fully sold and removed: filled.
        log.record_matched_trade(fill(1, 3, 120, 60));
        assert_eq!(order_status(&book, &log, &txid, 100), OrderStatus::Filled);
    }

    #[test]
    fn test_status_label_strings() {
        assert_eq!(OrderStatus::Open.label(), "open");
        assert_eq!(OrderStatus::OpenPartFilled.label(), "open part filled");
        assert_eq!(OrderStatus::Filled.label(), "filled");
        assert_eq!(OrderStatus::Cancelled.label(), "cancelled");
        assert_eq!(
            OrderStatus::CancelledPartFilled.label(),
            "cancelled part filled"
        );
    }

    #[test]
    fn test_fixed_interval_clock() {
        let clock = FixedIntervalClock {
            genesis_time: 1_000,
            seconds_per_block: 600,
        };
        assert_eq!(clock.block_time(0), Some(1_000));
        assert_eq!(clock.block_time(10), Some(7_000));
    }
}
