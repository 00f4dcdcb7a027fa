//! Determinism Test - Golden Master verification.
//!
//! Verifies that the engine produces identical quote streams across runs
//! when given the same wire bytes.

use itch_lob::messages::{
    AddOrderNoMpid, MessageHeader, MessageType, OrderCancel, OrderDelete, OrderExecuted,
    OrderReplace, SystemEvent, WireMessage,
};
use itch_lob::{Engine, FeedConfig, QuoteUpdate, ReaderSource};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

const LOCATES: u16 = 4;

/// Generate a deterministic wire stream over a handful of locates
fn generate_stream(seed: u64, count: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut bytes = Vec::with_capacity(count * 36);
    // order_id -> (locate, remaining)
    let mut live: HashMap<u64, (u16, u32)> = HashMap::new();
    let mut ids: Vec<u64> = Vec::new();
    let mut next_order_id = 1u64;

    SystemEvent {
        header: MessageHeader::new(MessageType::SystemEvent, 0, 0),
        event_code: b'O',
    }
    .encode(&mut bytes);

    for n in 0..count {
        let timestamp = 34_200_000_000_000 + n as u64 * 1_000;

        // 60% add, 40% touch an existing order
        if ids.is_empty() || rng.gen_bool(0.6) {
            let order_id = next_order_id;
            next_order_id += 1;
            let locate = rng.gen_range(1..=LOCATES);
            let shares = rng.gen_range(1..500);
            let bid = rng.gen_bool(0.5);

            AddOrderNoMpid {
                header: MessageHeader::new(MessageType::AddOrderNoMpid, locate, timestamp),
                order_reference_number: order_id,
                buy_sell_indicator: if bid { b'B' } else { b'S' },
                shares,
                stock: *b"DET     ",
                // 950.00 to 1050.00
                price: rng.gen_range(95_000..105_000) * 100,
            }
            .encode(&mut bytes);

            live.insert(order_id, (locate, shares));
            ids.push(order_id);
            continue;
        }

        let idx = rng.gen_range(0..ids.len());
        let order_id = ids[idx];
        let (locate, remaining) = live[&order_id];
        let header = |kind| MessageHeader::new(kind, locate, timestamp);

        match rng.gen_range(0..4) {
            0 => {
                let executed = rng.gen_range(1..=remaining);
                OrderExecuted {
                    header: header(MessageType::OrderExecuted),
                    order_reference_number: order_id,
                    executed_shares: executed,
                    match_number: n as u64,
                }
                .encode(&mut bytes);
                live.insert(order_id, (locate, remaining - executed));
            }
            1 => {
                let canceled = rng.gen_range(1..=remaining);
                OrderCancel {
                    header: header(MessageType::OrderCancel),
                    order_reference_number: order_id,
                    cancelled_shares: canceled,
                }
                .encode(&mut bytes);
                live.insert(order_id, (locate, remaining - canceled));
            }
            2 => {
                OrderDelete {
                    header: header(MessageType::OrderDelete),
                    order_reference_number: order_id,
                }
                .encode(&mut bytes);
                live.insert(order_id, (locate, 0));
            }
            _ => {
                let new_order_id = next_order_id;
                next_order_id += 1;
                let shares = rng.gen_range(1..500);
                OrderReplace {
                    header: header(MessageType::OrderReplace),
                    original_order_reference_number: order_id,
                    new_order_reference_number: new_order_id,
                    shares,
                    price: rng.gen_range(95_000..105_000) * 100,
                }
                .encode(&mut bytes);
                live.insert(order_id, (locate, 0));
                live.insert(new_order_id, (locate, shares));
                ids.push(new_order_id);
            }
        }

        if live[&order_id].1 == 0 {
            ids.swap_remove(idx);
        }
    }

    bytes
}

/// Compute a hash of all quote updates
fn hash_updates(updates: &[QuoteUpdate]) -> u64 {
    let mut hasher = DefaultHasher::new();

    for update in updates {
        update.locate.hash(&mut hasher);
        update.timestamp.hash(&mut hasher);
        for quote in [update.bid, update.ask] {
            quote.price.underlying().hash(&mut hasher);
            quote.quantity.hash(&mut hasher);
        }
    }

    hasher.finish()
}

/// Run the engine over a stream and return hashes
fn run_engine(bytes: &[u8]) -> (u64, u64) {
    let mut engine = Engine::new(ReaderSource::new(bytes), FeedConfig::default());
    let mut updates = Vec::new();

    loop {
        match engine.process_next() {
            Ok(Some(update)) => updates.push(update),
            Ok(None) => {}
            Err(e) => {
                assert!(e.is_closed(), "feed failed: {}", e);
                break;
            }
        }
    }

    (hash_updates(&updates), engine.state_hash())
}

#[test]
fn test_determinism_small() {
    const SEED: u64 = 0xDEADBEEF;
    const COUNT: usize = 1000;
    const RUNS: usize = 10;

    let bytes = generate_stream(SEED, COUNT);

    // Run multiple times and verify identical results
    let (first_update_hash, first_state_hash) = run_engine(&bytes);

    for run in 1..RUNS {
        let (update_hash, state_hash) = run_engine(&bytes);

        assert_eq!(
            update_hash, first_update_hash,
            "Update hash mismatch on run {}", run
        );
        assert_eq!(
            state_hash, first_state_hash,
            "State hash mismatch on run {}", run
        );
    }

    println!("Determinism test passed!");
    println!("  Records: {}", COUNT);
    println!("  Runs: {}", RUNS);
    println!("  Update hash: {:#018x}", first_update_hash);
    println!("  State hash: {:#018x}", first_state_hash);
}

#[test]
fn test_determinism_large() {
    const SEED: u64 = 0xCAFEBABE;
    const COUNT: usize = 100_000;
    const RUNS: usize = 3;

    let bytes = generate_stream(SEED, COUNT);

    let (first_update_hash, first_state_hash) = run_engine(&bytes);

    for run in 1..RUNS {
        let (update_hash, state_hash) = run_engine(&bytes);

        assert_eq!(update_hash, first_update_hash, "Update hash mismatch on run {}", run);
        assert_eq!(state_hash, first_state_hash, "State hash mismatch on run {}", run);
    }

    println!("Large determinism test passed!");
    println!("  Records: {}", COUNT);
    println!("  Update hash: {:#018x}", first_update_hash);
    println!("  State hash: {:#018x}", first_state_hash);
}

#[test]
fn test_different_seeds_produce_different_results() {
    let (hash1, _) = run_engine(&generate_stream(1, 1000));
    let (hash2, _) = run_engine(&generate_stream(2, 1000));

    assert_ne!(hash1, hash2, "Different seeds should produce different results");
}
