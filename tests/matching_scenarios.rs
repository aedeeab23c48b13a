//! End-to-end matching scenarios through the transaction dispatcher.
//!
//! Each scenario drives the full path: payload fields, validation,
//! matching, ledger movement, and the trade/cancel logs.

use metadex::ledger::TallyKind;
use metadex::registry::{Ecosystem, PropertyInfo, PropertyId, PROPERTY_MSC, PROPERTY_TMSC};
use metadex::records::OrderStatus;
use metadex::tx::packet::Payload;
use metadex::tx::tx_type;
use metadex::{MetaDex, Rational, Transaction, Txid};

const MSC: PropertyId = PROPERTY_MSC;
const PROP: PropertyId = 3;

fn trade(
    sender: &str,
    block: u32,
    idx: u32,
    seed: u64,
    property: PropertyId,
    forsale: u64,
    desired_property: PropertyId,
    desired: u64,
) -> Transaction {
    Transaction {
        sender: sender.to_string(),
        receiver: None,
        block,
        idx,
        txid: Txid::from_seed(seed),
        block_time: 1_000_000 + i64::from(block),
        version: 0,
        tx_type: tx_type::METADEX_TRADE,
        payload: Payload::MetaDexTrade {
            property,
            amount_forsale: forsale,
            desired_property,
            amount_desired: desired,
        },
    }
}

fn cancel_price(
    sender: &str,
    block: u32,
    seed: u64,
    property: PropertyId,
    forsale: u64,
    desired_property: PropertyId,
    desired: u64,
) -> Transaction {
    let mut tx = trade(sender, block, 0, seed, property, forsale, desired_property, desired);
    tx.tx_type = tx_type::METADEX_CANCEL_PRICE;
    tx.payload = Payload::MetaDexCancelPrice {
        property,
        amount_forsale: forsale,
        desired_property,
        amount_desired: desired,
    };
    tx
}

/// Fresh core with property 3 (indivisible, main) and funded balances.
fn setup(funding: &[(&str, PropertyId, i64)]) -> MetaDex {
    let mut dex = MetaDex::new();
    let id = dex.registry.put(
        Ecosystem::Main,
        PropertyInfo::fixed("1Issuer", "Quantum", false, 10_000_000),
    );
    assert_eq!(id, PROP);
    dex.registry.put(
        Ecosystem::Test,
        PropertyInfo::fixed("1Issuer", "TestQuantum", false, 10_000_000),
    );
    for (addr, prop, amount) in funding {
        dex.ledger
            .update(addr, *prop, *amount, TallyKind::Balance)
            .unwrap();
    }
    dex
}

fn balance(dex: &MetaDex, addr: &str, prop: PropertyId) -> i64 {
    dex.ledger.get(addr, prop, TallyKind::Balance)
}

fn reserve(dex: &MetaDex, addr: &str, prop: PropertyId) -> i64 {
    dex.ledger.get(addr, prop, TallyKind::MetaDexReserve)
}

#[test]
fn scenario_exact_match() {
    let mut dex = setup(&[("1Maker", PROP, 100), ("1Taker", MSC, 200)]);

    assert!(dex
        .process(&trade("1Maker", 100, 0, 1, PROP, 100, MSC, 200))
        .unwrap()
        .is_valid());
    assert!(dex
        .process(&trade("1Taker", 101, 0, 2, MSC, 200, PROP, 100))
        .unwrap()
        .is_valid());

    // Both fully filled.
    assert!(dex.book.is_empty());
    assert_eq!(balance(&dex, "1Taker", MSC), 0);
    assert_eq!(balance(&dex, "1Taker", PROP), 100);
    assert_eq!(balance(&dex, "1Maker", MSC), 200);
    assert_eq!(reserve(&dex, "1Maker", PROP), 0);

    assert_eq!(dex.order_status(&Txid::from_seed(1), 100), OrderStatus::Filled);
    assert_eq!(dex.order_status(&Txid::from_seed(2), 200), OrderStatus::Filled);
}

#[test]
fn scenario_partial_fill_taker_larger() {
    let mut dex = setup(&[("1Maker", PROP, 50), ("1Taker", MSC, 200)]);

    dex.process(&trade("1Maker", 100, 0, 1, PROP, 50, MSC, 100))
        .unwrap();
    dex.process(&trade("1Taker", 101, 0, 2, MSC, 200, PROP, 100))
        .unwrap();

    // Maker filled, taker residual of 100 resting under MSC.
    assert_eq!(dex.order_status(&Txid::from_seed(1), 50), OrderStatus::Filled);
    assert_eq!(
        dex.order_status(&Txid::from_seed(2), 200),
        OrderStatus::OpenPartFilled
    );

    let residual = dex.book.find_by_txid(&Txid::from_seed(2)).unwrap();
    assert_eq!(residual.property, MSC);
    assert_eq!(residual.amount_remaining, 100);
    assert_eq!(residual.unit_price(), Rational::new(100, 200));
    assert_eq!(reserve(&dex, "1Taker", MSC), 100);
}

#[test]
fn scenario_rounding_down_skip() {
    let mut dex = setup(&[("1Maker", PROP, 3), ("1Taker", MSC, 3)]);

    // Maker: 3 QU for 10 MSC (unit price 10/3).
    dex.process(&trade("1Maker", 100, 0, 1, PROP, 3, MSC, 10))
        .unwrap();
    // Taker: 3 MSC for 1 QU. floor(3 * 3/10) = 0: no fill, residual posts.
    dex.process(&trade("1Taker", 101, 0, 2, MSC, 3, PROP, 1))
        .unwrap();

    assert_eq!(dex.trade_log.matches.len(), 0);
    assert_eq!(dex.book.len(), 2);
    assert_eq!(dex.order_status(&Txid::from_seed(2), 3), OrderStatus::Open);
    assert_eq!(reserve(&dex, "1Taker", MSC), 3);
}

#[test]
fn scenario_effective_price_rejection() {
    let mut dex = setup(&[("1Maker", PROP, 7), ("1Taker", MSC, 3)]);

    // Maker: 7 QU for 22 MSC (22/7). Taker: 3 MSC for 1 QU (inverse 3).
    dex.process(&trade("1Maker", 100, 0, 1, PROP, 7, MSC, 22))
        .unwrap();
    dex.process(&trade("1Taker", 101, 0, 2, MSC, 3, PROP, 1))
        .unwrap();

    assert_eq!(dex.trade_log.matches.len(), 0);
    assert_eq!(dex.book.len(), 2);
}

#[test]
fn scenario_cancel_at_price_is_exact() {
    let mut dex = setup(&[("1Maker", PROP, 200)]);

    dex.process(&trade("1Maker", 100, 0, 1, PROP, 100, MSC, 200))
        .unwrap(); // price 2
    dex.process(&trade("1Maker", 100, 1, 2, PROP, 100, MSC, 300))
        .unwrap(); // price 3

    assert!(dex
        .process(&cancel_price("1Maker", 101, 3, PROP, 100, MSC, 300))
        .unwrap()
        .is_valid());

    // Only the price-3 order went; its reserve came back exactly.
    assert_eq!(dex.book.len(), 1);
    assert!(dex.book.is_open(&Txid::from_seed(1)));
    assert!(!dex.book.is_open(&Txid::from_seed(2)));
    assert_eq!(reserve(&dex, "1Maker", PROP), 100);
    assert_eq!(balance(&dex, "1Maker", PROP), 100);
    assert_eq!(dex.cancel_log.cancels.len(), 1);
    assert_eq!(dex.cancel_log.cancels[0].amount_unreserved, 100);
    assert_eq!(
        dex.order_status(&Txid::from_seed(2), 100),
        OrderStatus::Cancelled
    );
}

#[test]
fn scenario_cancel_everything_scopes_to_ecosystem() {
    const TEST_PROP: PropertyId = 0x8000_0003;
    let mut dex = setup(&[("1Maker", PROP, 300), ("1Maker", TEST_PROP, 200)]);

    for (i, desired) in [100u64, 200, 300].iter().enumerate() {
        dex.process(&trade("1Maker", 100, i as u32, i as u64 + 1, PROP, 100, MSC, *desired))
            .unwrap();
    }
    for (i, desired) in [100u64, 200].iter().enumerate() {
        dex.process(&trade(
            "1Maker",
            100,
            10 + i as u32,
            10 + i as u64,
            TEST_PROP,
            100,
            PROPERTY_TMSC,
            *desired,
        ))
        .unwrap();
    }

    let mut sweep = trade("1Maker", 101, 0, 99, PROP, 1, MSC, 1);
    sweep.tx_type = tx_type::METADEX_CANCEL_ECOSYSTEM;
    sweep.payload = Payload::MetaDexCancelEcosystem { ecosystem: 1 };
    assert!(dex.process(&sweep).unwrap().is_valid());

    // Exactly the three main-ecosystem orders went.
    assert_eq!(dex.book.len(), 2);
    assert_eq!(balance(&dex, "1Maker", PROP), 300);
    assert_eq!(reserve(&dex, "1Maker", PROP), 0);
    assert_eq!(reserve(&dex, "1Maker", TEST_PROP), 200);
    assert_eq!(dex.cancel_log.cancels.len(), 3);
}

#[test]
fn scenario_add_then_cancel_roundtrip() {
    let mut dex = setup(&[("1Maker", PROP, 100)]);
    let before = balance(&dex, "1Maker", PROP);

    dex.process(&trade("1Maker", 100, 0, 1, PROP, 100, MSC, 200))
        .unwrap();
    dex.process(&cancel_price("1Maker", 101, 2, PROP, 100, MSC, 200))
        .unwrap();

    assert_eq!(balance(&dex, "1Maker", PROP), before);
    assert_eq!(reserve(&dex, "1Maker", PROP), 0);
    assert!(dex.book.is_empty());
}

#[test]
fn scenario_self_trade_nets_flat() {
    let mut dex = setup(&[("1Solo", PROP, 100), ("1Solo", MSC, 200)]);

    dex.process(&trade("1Solo", 100, 0, 1, PROP, 100, MSC, 200))
        .unwrap();
    dex.process(&trade("1Solo", 101, 0, 2, MSC, 200, PROP, 100))
        .unwrap();

    // Net balance delta per property is zero; the logs saw the trade.
    assert_eq!(balance(&dex, "1Solo", PROP), 100);
    assert_eq!(balance(&dex, "1Solo", MSC), 200);
    assert_eq!(reserve(&dex, "1Solo", PROP), 0);
    assert_eq!(dex.trade_log.matches.len(), 1);
}

#[test]
fn scenario_price_time_priority_across_fills() {
    let mut dex = setup(&[
        ("1Early", PROP, 100),
        ("1Late", PROP, 100),
        ("1Taker", MSC, 150),
    ]);

    dex.process(&trade("1Early", 100, 0, 1, PROP, 100, MSC, 100))
        .unwrap();
    dex.process(&trade("1Late", 100, 1, 2, PROP, 100, MSC, 100))
        .unwrap();
    dex.process(&trade("1Taker", 101, 0, 3, MSC, 150, PROP, 150))
        .unwrap();

    // Early is consumed fully before Late is touched.
    assert_eq!(dex.trade_log.matches[0].maker_addr, "1Early");
    assert_eq!(dex.trade_log.matches[1].maker_addr, "1Late");
    assert_eq!(reserve(&dex, "1Early", PROP), 0);
    assert_eq!(reserve(&dex, "1Late", PROP), 50);
}

#[test]
fn scenario_fill_prices_stay_within_limits() {
    let mut dex = setup(&[("1Maker", PROP, 1_000), ("1Taker", MSC, 10_000)]);

    dex.process(&trade("1Maker", 100, 0, 1, PROP, 997, MSC, 3_001))
        .unwrap();
    dex.process(&trade("1Taker", 101, 0, 2, MSC, 9_773, PROP, 3_100))
        .unwrap();

    let maker_price = Rational::new(3_001, 997);
    let taker_inverse = Rational::new(9_773, 3_100);
    for m in &dex.trade_log.matches {
        let effective = Rational::new(
            m.maker_received_amount as i128,
            m.taker_received_amount as i128,
        );
        assert!(effective >= maker_price);
        assert!(effective <= taker_inverse);
    }
}

#[test]
fn scenario_conservation_across_stream() {
    let mut dex = setup(&[
        ("1A", PROP, 500),
        ("1B", MSC, 900),
        ("1C", PROP, 250),
        ("1C", MSC, 100),
    ]);
    let prop_total = dex.ledger.total_tokens(PROP);
    let msc_total = dex.ledger.total_tokens(MSC);

    let stream = [
        ("1A", 100u32, 0u32, PROP, 200u64, MSC, 400u64),
        ("1B", 100, 1, MSC, 300, PROP, 150),
        ("1C", 101, 0, PROP, 250, MSC, 125),
        ("1B", 101, 1, MSC, 600, PROP, 300),
        ("1C", 102, 0, MSC, 100, PROP, 33),
    ];
    for (seed, (sender, block, idx, prop, forsale, desired_prop, desired)) in
        stream.into_iter().enumerate()
    {
        dex.process(&trade(
            sender,
            block,
            idx,
            seed as u64 + 1,
            prop,
            forsale,
            desired_prop,
            desired,
        ))
        .unwrap();
    }

    // Tokens are conserved per property across the whole stream.
    assert_eq!(dex.ledger.total_tokens(PROP), prop_total);
    assert_eq!(dex.ledger.total_tokens(MSC), msc_total);

    // Reserves mirror the book exactly.
    for addr in ["1A", "1B", "1C"] {
        for prop in [PROP, MSC] {
            assert_eq!(
                dex.book.reserved_total(addr, prop),
                reserve(&dex, addr, prop) as i128,
                "reserve mismatch for {addr}/{prop}"
            );
        }
    }
}
