//! Stress tests for the MetaDEx core.
//!
//! These tests verify:
//! 1. The engine stays consistent under a large randomized order flow
//! 2. Determinism: identical streams produce identical consensus hashes
//! 3. Throughput stays inside the block-validation budget
//!
//! ## Running Stress Tests
//!
//! ```bash
//! cargo test --release --test stress_test -- --nocapture
//! ```

use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use metadex::ledger::TallyKind;
use metadex::registry::{Ecosystem, PropertyInfo, PropertyId, PROPERTY_MSC};
use metadex::tx::packet::Payload;
use metadex::tx::tx_type;
use metadex::{MetaDex, Transaction, Txid};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

/// Orders per stress run.
const STRESS_ORDER_COUNT: usize = 20_000;

/// Addresses participating in the flow.
const ADDRESS_COUNT: u64 = 50;

const MSC: PropertyId = PROPERTY_MSC;
const PROP: PropertyId = 3;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Deterministic order stream. Same seed, same stream.
fn generate_transactions(count: usize, seed: u64) -> Vec<Transaction> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut txs = Vec::with_capacity(count);

    for i in 0..count {
        let sell_prop = rng.gen_bool(0.5);
        let forsale = rng.gen_range(1u64..5_000);
        let desired = rng.gen_range(1u64..5_000);
        let addr = format!("1Addr{:03}", rng.gen_range(0..ADDRESS_COUNT));

        let payload = if rng.gen_range(0u32..100) < 5 {
            Payload::MetaDexCancelEcosystem { ecosystem: 1 }
        } else if sell_prop {
            Payload::MetaDexTrade {
                property: PROP,
                amount_forsale: forsale,
                desired_property: MSC,
                amount_desired: desired,
            }
        } else {
            Payload::MetaDexTrade {
                property: MSC,
                amount_forsale: forsale,
                desired_property: PROP,
                amount_desired: desired,
            }
        };
        let tx_type_ = match payload {
            Payload::MetaDexCancelEcosystem { .. } => tx_type::METADEX_CANCEL_ECOSYSTEM,
            _ => tx_type::METADEX_TRADE,
        };

        txs.push(Transaction {
            sender: addr,
            receiver: None,
            block: 100 + (i / 16) as u32,
            idx: (i % 16) as u32,
            txid: Txid::from_seed(i as u64 + 1),
            block_time: 1_000_000,
            version: 0,
            tx_type: tx_type_,
            payload,
        });
    }
    txs
}

fn fresh_dex() -> MetaDex {
    let mut dex = MetaDex::new();
    let id = dex.registry.put(
        Ecosystem::Main,
        PropertyInfo::fixed("1Issuer", "Quantum", false, i64::MAX / 2),
    );
    assert_eq!(id, PROP);
    for a in 0..ADDRESS_COUNT {
        let addr = format!("1Addr{a:03}");
        dex.ledger
            .update(&addr, PROP, 10_000_000, TallyKind::Balance)
            .unwrap();
        dex.ledger
            .update(&addr, MSC, 10_000_000, TallyKind::Balance)
            .unwrap();
    }
    dex
}

/// Run a stream to completion and return (hash, accepted, fills).
fn run_stream(seed: u64, count: usize) -> (String, usize, usize) {
    let mut dex = fresh_dex();
    let mut accepted = 0usize;

    for tx in generate_transactions(count, seed) {
        if dex.process(&tx).expect("no consensus failure").is_valid() {
            accepted += 1;
        }
    }
    let fills = dex.trade_log.matches.len();
    (dex.consensus_hash(), accepted, fills)
}

// ============================================================================
// STRESS TESTS
// ============================================================================

/// Main stress test: a large mixed flow of trades and sweeps.
#[test]
fn stress_mixed_flow() {
    println!("\n=== STRESS TEST: {STRESS_ORDER_COUNT} transactions ===\n");

    let mut dex = fresh_dex();
    let txs = generate_transactions(STRESS_ORDER_COUNT, 42);

    let prop_total = dex.ledger.total_tokens(PROP);
    let msc_total = dex.ledger.total_tokens(MSC);

    let start = Instant::now();
    let mut fills = 0usize;
    for tx in &txs {
        dex.process(tx).expect("no consensus failure");
        fills = dex.trade_log.matches.len();
    }
    let elapsed = start.elapsed();

    println!("  transactions:  {STRESS_ORDER_COUNT}");
    println!("  fills:         {fills}");
    println!("  open orders:   {}", dex.book.len());
    println!("  elapsed:       {elapsed:.2?}");
    println!(
        "  throughput:    {:.0} tx/sec",
        STRESS_ORDER_COUNT as f64 / elapsed.as_secs_f64()
    );

    // Some matching must have happened in a crossing flow this size.
    assert!(fills > 0);

    // Conservation and reserve consistency at the end of the run.
    assert_eq!(dex.ledger.total_tokens(PROP), prop_total);
    assert_eq!(dex.ledger.total_tokens(MSC), msc_total);
    for a in 0..ADDRESS_COUNT {
        let addr = format!("1Addr{a:03}");
        for prop in [PROP, MSC] {
            assert_eq!(
                dex.book.reserved_total(&addr, prop),
                dex.ledger.get(&addr, prop, TallyKind::MetaDexReserve) as i128
            );
        }
    }
}

/// Determinism: the same stream replayed from scratch produces the same
/// consensus hash, acceptance count, and fill count.
#[test]
fn stress_determinism_across_replays() {
    let (hash1, accepted1, fills1) = run_stream(42, 5_000);
    let (hash2, accepted2, fills2) = run_stream(42, 5_000);

    assert_eq!(hash1, hash2, "replay must be bit-identical");
    assert_eq!(accepted1, accepted2);
    assert_eq!(fills1, fills2);
}

/// Different seeds should exercise different books.
#[test]
fn stress_seed_sensitivity() {
    let (hash1, ..) = run_stream(42, 2_000);
    let (hash2, ..) = run_stream(43, 2_000);
    assert_ne!(hash1, hash2);
}
