//! MetaDEx demo driver.
//!
//! Builds a small market from raw packets, runs a crossing trade and a
//! cancellation, and prints the resulting balances and the book's
//! consensus hash.

use std::error::Error;

use metadex::ledger::TallyKind;
use metadex::orderbook::consensus_hash;
use metadex::records::{BlockClock, FixedIntervalClock};
use metadex::registry::{PropertyRegistry, PROPERTY_MSC};
use metadex::{MetaDex, Txid};

fn trade_packet(property: u32, forsale: u64, desired_property: u32, desired: u64) -> Vec<u8> {
    let mut pkt = Vec::with_capacity(28);
    pkt.extend_from_slice(&0u16.to_be_bytes());
    pkt.extend_from_slice(&25u16.to_be_bytes());
    pkt.extend_from_slice(&property.to_be_bytes());
    pkt.extend_from_slice(&forsale.to_be_bytes());
    pkt.extend_from_slice(&desired_property.to_be_bytes());
    pkt.extend_from_slice(&desired.to_be_bytes());
    pkt
}

fn create_fixed_packet(name: &str, divisible: bool, amount: u64) -> Vec<u8> {
    let mut pkt = Vec::new();
    pkt.extend_from_slice(&0u16.to_be_bytes());
    pkt.extend_from_slice(&50u16.to_be_bytes());
    pkt.push(1); // main ecosystem
    pkt.extend_from_slice(&(if divisible { 2u16 } else { 1u16 }).to_be_bytes());
    pkt.extend_from_slice(&0u32.to_be_bytes());
    for s in ["Demo", "", name, "", ""] {
        pkt.extend_from_slice(s.as_bytes());
        pkt.push(0);
    }
    pkt.extend_from_slice(&amount.to_be_bytes());
    pkt
}

fn cancel_pair_packet(property: u32, desired_property: u32) -> Vec<u8> {
    let mut pkt = Vec::with_capacity(12);
    pkt.extend_from_slice(&0u16.to_be_bytes());
    pkt.extend_from_slice(&27u16.to_be_bytes());
    pkt.extend_from_slice(&property.to_be_bytes());
    pkt.extend_from_slice(&desired_property.to_be_bytes());
    pkt
}

fn run() -> Result<(), Box<dyn Error>> {
    let clock = FixedIntervalClock {
        genesis_time: 1_700_000_000,
        seconds_per_block: 600,
    };
    let mut dex = MetaDex::new();

    // Seed an MSC balance the way a genesis allocation would.
    dex.ledger
        .update("1Taker", PROPERTY_MSC, 1_000, TallyKind::Balance)?;

    let mut seed = 0u64;
    let mut send = |dex: &mut MetaDex,
                    sender: &str,
                    block: u32,
                    idx: u32,
                    pkt: Vec<u8>|
     -> Result<(), Box<dyn Error>> {
        seed += 1;
        let time = clock.block_time(block).unwrap_or_default();
        let disposition =
            dex.process_packet(sender, None, block, idx, Txid::from_seed(seed), time, &pkt)?;
        println!(
            "  block {block} idx {idx} from {sender}: code {}",
            disposition.code()
        );
        Ok(())
    };

    println!("creating property...");
    send(
        &mut dex,
        "1Maker",
        100,
        0,
        create_fixed_packet("Quantum Units", false, 1_000),
    )?;

    println!("placing maker offer (100 QU for 200 MSC)...");
    send(&mut dex, "1Maker", 101, 0, trade_packet(3, 100, PROPERTY_MSC, 200))?;

    println!("placing taker offer (200 MSC for 100 QU)...");
    send(&mut dex, "1Taker", 102, 0, trade_packet(PROPERTY_MSC, 200, 3, 100))?;

    println!("placing an offer that rests, then cancelling the pair...");
    send(&mut dex, "1Maker", 103, 0, trade_packet(3, 50, PROPERTY_MSC, 500))?;
    send(&mut dex, "1Maker", 104, 0, cancel_pair_packet(3, PROPERTY_MSC))?;

    println!();
    println!("final balances:");
    for addr in ["1Maker", "1Taker"] {
        for (label, prop) in [("MSC", PROPERTY_MSC), ("QU", 3)] {
            let balance = dex.ledger.get(addr, prop, TallyKind::Balance);
            let reserve = dex.ledger.get(addr, prop, TallyKind::MetaDexReserve);
            if balance != 0 || reserve != 0 {
                println!("  {addr} {label}: balance {balance}, reserve {reserve}");
            }
        }
    }

    println!();
    println!("placing one more resting offer to show the book...");
    send(&mut dex, "1Maker", 105, 0, trade_packet(3, 10, PROPERTY_MSC, 35))?;
    dex.book.debug_print();

    println!();
    println!("book depth for property 3:");
    if let Some(levels) = dex.book.prices_for(3) {
        for (price, level) in levels {
            println!("  {} orders at {price}", level.len());
        }
    }
    for order in dex.book.iter_ordered() {
        let sale_div = dex.registry.is_divisible(order.property);
        let desired_div = dex.registry.is_divisible(order.desired_property);
        println!(
            "  {} sells {} at {}",
            order.addr,
            order.format_remaining(sale_div),
            order.display_unit_price(sale_div, desired_div),
        );
    }

    println!();
    println!("open orders: {}", dex.book.len());
    println!("consensus hash: {}", consensus_hash(&dex.book));
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    if let Err(e) = run() {
        eprintln!("fatal: {e}");
        std::process::exit(1);
    }
}
