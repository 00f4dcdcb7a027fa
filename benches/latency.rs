//! Benchmark harness using Criterion for latency measurement.
//!
//! Measures:
//! - Fast-modulo against hardware division
//! - Add then delete on a warm book
//! - Top-of-book fallback scan across a gap
//! - Feed polling over a synthetic wire stream

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use itch_lob::messages::{
    AddOrderNoMpid, MessageHeader, MessageType, OrderDelete, OrderExecuted, WireMessage,
};
use itch_lob::{
    Book, FastDivisor, Feed, FeedConfig, GranlundFastMod, LemireFastMod, OrderAdd, OrderRemoved,
    Price, ReaderSource, Side,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const TICK: i64 = 1_000_000;

fn book() -> Book {
    let mut book = Book::new(Price::from_underlying(TICK), 64);
    book.warm_up();
    book
}

/// Benchmark: one division by a runtime-constant divisor
fn bench_fastmod(c: &mut Criterion) {
    let mut group = c.benchmark_group("fastmod");
    let mut rng = ChaCha8Rng::seed_from_u64(0xFA57);
    let numerators: Vec<u64> = (0..1024).map(|_| rng.gen()).collect();

    for divisor in [64u64, 1_000_000] {
        let lemire = LemireFastMod::new(divisor);
        let granlund = GranlundFastMod::new(divisor);
        let hardware = black_box(divisor);

        group.bench_with_input(BenchmarkId::new("lemire", divisor), &divisor, |b, _| {
            b.iter(|| numerators.iter().map(|n| lemire.div(*n) ^ lemire.rem(*n)).sum::<u64>())
        });
        group.bench_with_input(BenchmarkId::new("granlund", divisor), &divisor, |b, _| {
            b.iter(|| numerators.iter().map(|n| granlund.div(*n) ^ granlund.rem(*n)).sum::<u64>())
        });
        group.bench_with_input(BenchmarkId::new("hardware", divisor), &divisor, |b, _| {
            b.iter(|| numerators.iter().map(|n| (n / hardware) ^ (n % hardware)).sum::<u64>())
        });
    }

    group.finish();
}

/// Benchmark: Add an order then delete it, with resting depth behind it
fn bench_add_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_remove");

    for depth in [1u64, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut book = book();

            // Pre-populate one tick behind the top
            for i in 0..depth {
                book.add(&OrderAdd {
                    order_id: i,
                    quantity: 100,
                    price: Price::from_underlying(9_999 * TICK),
                    side: Side::Bid,
                })
                .unwrap();
            }

            let mut order_id = 1_000_000u64;

            b.iter(|| {
                order_id += 1;
                book.add(&OrderAdd {
                    order_id,
                    quantity: 100,
                    price: Price::from_underlying(10_000 * TICK),
                    side: Side::Bid,
                })
                .unwrap();
                book.remove(&OrderRemoved { order_id }).unwrap();
                black_box(book.best_bid())
            })
        });
    }

    group.finish();
}

/// Benchmark: Emptying the top when the next level is `gap` ticks away
fn bench_fallback_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("fallback_scan");

    for gap in [1i64, 8, 63] {
        group.bench_with_input(BenchmarkId::from_parameter(gap), &gap, |b, &gap| {
            let mut book = book();
            book.add(&OrderAdd {
                order_id: 0,
                quantity: 100,
                price: Price::from_underlying((10_000 - gap) * TICK),
                side: Side::Bid,
            })
            .unwrap();

            let mut order_id = 1u64;

            b.iter(|| {
                order_id += 1;
                book.add(&OrderAdd {
                    order_id,
                    quantity: 100,
                    price: Price::from_underlying(10_000 * TICK),
                    side: Side::Bid,
                })
                .unwrap();
                book.remove(&OrderRemoved { order_id }).unwrap();
                black_box(book.best_bid())
            })
        });
    }

    group.finish();
}

/// Synthetic add/execute/delete stream for one locate
fn wire_stream(count: u64) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(0xBEEF);
    let mut bytes = Vec::new();

    for order_id in 1..=count {
        let bid = rng.gen_bool(0.5);
        AddOrderNoMpid {
            header: MessageHeader::new(MessageType::AddOrderNoMpid, 1, order_id),
            order_reference_number: order_id,
            buy_sell_indicator: if bid { b'B' } else { b'S' },
            shares: 100,
            stock: *b"BENCH   ",
            // 990.00 to 1010.00, bids below asks
            price: if bid {
                rng.gen_range(9_900..10_000) * 1_000
            } else {
                rng.gen_range(10_001..10_100) * 1_000
            },
        }
        .encode(&mut bytes);
        OrderExecuted {
            header: MessageHeader::new(MessageType::OrderExecuted, 1, order_id),
            order_reference_number: order_id,
            executed_shares: 40,
            match_number: order_id,
        }
        .encode(&mut bytes);
        OrderDelete {
            header: MessageHeader::new(MessageType::OrderDelete, 1, order_id),
            order_reference_number: order_id,
        }
        .encode(&mut bytes);
    }
    bytes
}

/// Benchmark: Decode and apply whole streams
fn bench_feed_poll(c: &mut Criterion) {
    const ORDERS: u64 = 10_000;
    let bytes = wire_stream(ORDERS);

    c.bench_function("feed_poll_30k_records", |b| {
        b.iter(|| {
            let mut feed = Feed::new(ReaderSource::new(&bytes[..]), FeedConfig::default());
            while let Ok(changed) = feed.poll() {
                black_box(changed);
            }
            black_box(feed.stats().book_updates)
        })
    });
}

criterion_group!(
    benches,
    bench_fastmod,
    bench_add_remove,
    bench_fallback_scan,
    bench_feed_poll,
);
criterion_main!(benches);
