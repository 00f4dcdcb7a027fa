//! Engine - Main event loop with CPU pinning and warm-up.
//!
//! Wraps the feed with I/O handling: wire bytes arrive through a byte source
//! (an rtrb ring in the `runtime` configuration) and top-of-book updates
//! leave through an rtrb ring.

use std::hash::Hasher;

use rustc_hash::FxHasher;
use tracing::debug;

use crate::command::{Quote, QuoteUpdate};
use crate::config::FeedConfig;
use crate::error::Result;
use crate::feed::Feed;
use crate::price::{Locate, Price};
use crate::source::ByteSource;

/// The main engine that turns wire records into quote updates.
pub struct Engine<S> {
    /// The underlying dispatcher
    pub feed: Feed<S>,
}

impl<S: ByteSource> Engine<S> {
    pub fn new(source: S, config: FeedConfig) -> Self {
        Self {
            feed: Feed::new(source, config),
        }
    }

    /// Run the engine event loop until the source closes.
    ///
    /// # Arguments
    /// * `output` - Producer end of the quote update ring buffer
    /// * `pin_to_core` - Whether to pin to the last available CPU core
    ///
    /// Updates are dropped when the output ring is full.
    #[cfg(feature = "runtime")]
    pub fn run(
        &mut self,
        output: &mut rtrb::Producer<QuoteUpdate>,
        pin_to_core: bool,
    ) -> Result<()> {
        if pin_to_core {
            self.pin_to_core();
        }

        self.warm_up();

        loop {
            match self.process_next() {
                Ok(Some(update)) => {
                    let _ = output.push(update);
                }
                Ok(None) => {}
                Err(e) if e.is_closed() => {
                    tracing::info!(
                        messages = self.feed.stats().messages,
                        book_updates = self.feed.stats().book_updates,
                        "source closed"
                    );
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read one record. Returns the new top of book if it touched a book.
    ///
    /// This is the main entry point for synchronous usage (testing, benchmarks).
    #[inline]
    pub fn process_next(&mut self) -> Result<Option<QuoteUpdate>> {
        if self.feed.poll()? {
            Ok(self.feed.last_quote())
        } else {
            Ok(None)
        }
    }

    /// Pin the current thread to the last available CPU core.
    ///
    /// The last core is typically isolated from OS interrupts.
    pub fn pin_to_core(&self) -> bool {
        let pinned = core_affinity::get_core_ids()
            .and_then(|core_ids| core_ids.last().copied())
            .map(core_affinity::set_for_current)
            .unwrap_or(false);
        debug!(pinned, "pin to core");
        pinned
    }

    /// Build the configured books and pre-fault their level arrays.
    pub fn warm_up(&mut self) {
        for locate in self.feed.config().preallocate.clone() {
            self.feed.preallocate(locate).warm_up();
        }
    }

    #[inline]
    pub fn best_bid(&self, locate: Locate) -> Option<Quote> {
        self.feed.book(locate).map(|book| book.best_bid())
    }

    #[inline]
    pub fn best_ask(&self, locate: Locate) -> Option<Quote> {
        self.feed.book(locate).map(|book| book.best_ask())
    }

    #[inline]
    pub fn spread(&self, locate: Locate) -> Option<Price> {
        self.feed.book(locate).and_then(|book| book.spread())
    }

    /// Tracked orders across every book.
    pub fn order_count(&self) -> usize {
        self.feed.books().map(|(_, book)| book.order_count()).sum()
    }

    /// Compute state hash for determinism testing.
    pub fn state_hash(&self) -> u64 {
        let mut books: Vec<_> = self.feed.books().collect();
        books.sort_unstable_by_key(|(locate, _)| *locate);

        let mut hasher = FxHasher::default();
        for (locate, book) in books {
            hasher.write_u16(locate);
            for quote in [book.best_bid(), book.best_ask()] {
                hasher.write_i64(quote.price.underlying());
                hasher.write_i64(quote.quantity);
            }
            hasher.write_usize(book.order_count());
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{
        AddOrderNoMpid, MessageHeader, MessageType, OrderCancel, SystemEvent, WireMessage,
    };
    use crate::source::ReaderSource;

    fn add(id: u64, side: u8, shares: u32, price: i32) -> AddOrderNoMpid {
        AddOrderNoMpid {
            header: MessageHeader::new(MessageType::AddOrderNoMpid, 1, id),
            order_reference_number: id,
            buy_sell_indicator: side,
            shares,
            stock: *b"MSFT    ",
            price,
        }
    }

    fn stream() -> Vec<u8> {
        let mut bytes = Vec::new();
        SystemEvent {
            header: MessageHeader::new(MessageType::SystemEvent, 0, 0),
            event_code: b'O',
        }
        .encode(&mut bytes);
        for i in 0..100u64 {
            let side = if i % 2 == 0 { b'B' } else { b'S' };
            // Bids from $100.00 down, asks from $101.01 up, one cent apart
            let offset = (i % 10) as i32 * 100;
            let price = if i % 2 == 0 {
                1_000_000 - offset
            } else {
                1_010_000 + offset
            };
            add(i + 1, side, 100, price).encode(&mut bytes);
        }
        OrderCancel {
            header: MessageHeader::new(MessageType::OrderCancel, 1, 1_000),
            order_reference_number: 1,
            cancelled_shares: 40,
        }
        .encode(&mut bytes);
        bytes
    }

    #[test]
    fn test_engine_creation() {
        let engine = Engine::new(ReaderSource::new(std::io::empty()), FeedConfig::default());
        assert_eq!(engine.order_count(), 0);
        assert_eq!(engine.best_bid(1), None);
        assert_eq!(engine.spread(1), None);
    }

    #[test]
    fn test_engine_process_next() {
        let bytes = stream();
        let mut engine = Engine::new(ReaderSource::new(&bytes[..]), FeedConfig::default());

        // System event does not touch a book
        assert_eq!(engine.process_next().unwrap(), None);

        let update = engine.process_next().unwrap().unwrap();
        assert_eq!(update.locate, 1);
        assert_eq!(update.bid, Quote::new(Price::from_units(100), 100));
        assert_eq!(update.ask, Quote::EMPTY);
    }

    #[test]
    fn test_engine_runs_to_close() {
        let bytes = stream();
        let mut engine = Engine::new(ReaderSource::new(&bytes[..]), FeedConfig::default());

        let mut updates = 0;
        loop {
            match engine.process_next() {
                Ok(Some(_)) => updates += 1,
                Ok(None) => {}
                Err(e) => {
                    assert!(e.is_closed());
                    break;
                }
            }
        }

        assert_eq!(updates, 101);
        assert_eq!(engine.order_count(), 100);
        // Ten orders rest at each price; order 1 lost 40 shares
        assert_eq!(engine.best_bid(1).unwrap(), Quote::new(Price::from_units(100), 960));
        assert_eq!(engine.best_ask(1).unwrap(), Quote::new(Price::from_wire(1_010_100), 1000));
        assert_eq!(engine.spread(1), Some(Price::from_wire(10_100)));
    }

    #[test]
    fn test_engine_state_hash_determinism() {
        let bytes = stream();
        let mut engine1 = Engine::new(ReaderSource::new(&bytes[..]), FeedConfig::default());
        let mut engine2 = Engine::new(ReaderSource::new(&bytes[..]), FeedConfig::default());

        while engine1.process_next().is_ok() {}
        while engine2.process_next().is_ok() {}

        assert_eq!(engine1.state_hash(), engine2.state_hash());

        let empty = Engine::new(ReaderSource::new(std::io::empty()), FeedConfig::default());
        assert_ne!(engine1.state_hash(), empty.state_hash());
    }

    #[test]
    fn test_engine_warm_up() {
        let mut config = FeedConfig::default();
        config.preallocate = vec![1, 2];
        let mut engine = Engine::new(ReaderSource::new(std::io::empty()), config);
        engine.warm_up();
        assert_eq!(engine.feed.books().count(), 2);
        assert_eq!(engine.best_bid(2), Some(Quote::EMPTY));
    }

    #[cfg(feature = "runtime")]
    #[test]
    fn test_engine_run_over_rings() {
        use crate::source::ring_channel;

        let bytes = stream();
        let (mut input, source) = ring_channel(256);
        let (mut output, mut updates) = rtrb::RingBuffer::<QuoteUpdate>::new(1024);

        let writer = std::thread::spawn(move || {
            for byte in bytes {
                while input.push(byte).is_err() {
                    std::hint::spin_loop();
                }
            }
        });

        let mut engine = Engine::new(source, FeedConfig::default());
        engine.run(&mut output, false).unwrap();
        writer.join().unwrap();

        let mut count = 0;
        while updates.pop().is_ok() {
            count += 1;
        }
        assert_eq!(count, 101);
    }
}
