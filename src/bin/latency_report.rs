use hdrhistogram::Histogram;
use itch_lob::messages::{
    AddOrderNoMpid, MessageHeader, MessageType, OrderCancel, OrderDelete, OrderExecuted,
    WireMessage,
};
use itch_lob::{Feed, FeedConfig, ReaderSource};
use std::time::Instant;

const ITERATIONS: u64 = 1_000_000;
const LOCATE: u16 = 1;

/// Add, then every fourth order partially executes, every fourth partially
/// cancels and every other one is deleted a little later.
fn synthesize(count: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(count as usize * 36);
    let mut order_id = 0u64;
    let mut records = 0u64;

    while records < count {
        order_id += 1;
        let bid = order_id % 2 == 0;
        // Within twenty cents of $100, bids below and asks above
        let offset = (order_id % 20) as i32 * 100;
        AddOrderNoMpid {
            header: MessageHeader::new(MessageType::AddOrderNoMpid, LOCATE, records),
            order_reference_number: order_id,
            buy_sell_indicator: if bid { b'B' } else { b'S' },
            shares: 100,
            stock: *b"BENCH   ",
            price: if bid { 1_000_000 - offset } else { 1_000_100 + offset },
        }
        .encode(&mut bytes);
        records += 1;

        match order_id % 4 {
            0 => OrderExecuted {
                header: MessageHeader::new(MessageType::OrderExecuted, LOCATE, records),
                order_reference_number: order_id,
                executed_shares: 10,
                match_number: order_id,
            }
            .encode(&mut bytes),
            1 => OrderCancel {
                header: MessageHeader::new(MessageType::OrderCancel, LOCATE, records),
                order_reference_number: order_id,
                cancelled_shares: 10,
            }
            .encode(&mut bytes),
            _ => continue,
        }
        records += 1;

        if order_id > 8 && order_id % 2 == 1 {
            OrderDelete {
                header: MessageHeader::new(MessageType::OrderDelete, LOCATE, records),
                order_reference_number: order_id - 8,
            }
            .encode(&mut bytes);
            records += 1;
        }
    }
    bytes
}

fn main() {
    println!("Preparing Latency Benchmark...");

    let bytes = synthesize(ITERATIONS);
    let mut config = FeedConfig::default();
    config.preallocate = vec![LOCATE];
    let mut feed = Feed::new(ReaderSource::new(&bytes[..]), config);
    if let Some(book) = feed.book_mut(LOCATE) {
        book.warm_up();
    }

    let mut histogram = Histogram::<u64>::new_with_bounds(1, 100_000, 3).unwrap();

    println!("Running {} records...", ITERATIONS);

    let mut total_duration = std::time::Duration::new(0, 0);

    loop {
        // Critical measurement section
        let start = Instant::now();
        let result = std::hint::black_box(feed.poll());
        let elapsed = start.elapsed();

        match result {
            Ok(_) => {}
            Err(e) if e.is_closed() => break,
            Err(e) => panic!("feed failed: {}", e),
        }

        // Outliers above the histogram bound are dropped
        histogram.record(elapsed.as_nanos() as u64).unwrap_or(());
        total_duration += elapsed;
    }

    let stats = feed.stats();
    println!("\n=== Latency Report (ns) ===");
    println!("Total Records: {}", stats.messages);
    println!("Book Updates:  {}", stats.book_updates);
    println!("Throughput: {:.2} records/sec", stats.messages as f64 / total_duration.as_secs_f64());
    println!("---------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("P99.99: {:6} ns", histogram.value_at_quantile(0.9999));
    println!("Max:    {:6} ns", histogram.max());
    println!("---------------------------");

    if let Some(book) = feed.book(LOCATE) {
        println!("Final: bid {} / ask {}", book.best_bid().price, book.best_ask().price);
    }

    println!("\nDistribution:");
    for v in histogram.iter_log(100_000, 2.0) {
        let count = v.count_since_last_iteration();
        if count > 0 {
            println!("{:6} ns: {:10} count", v.value_iterated_to(), count);
        }
    }
}
