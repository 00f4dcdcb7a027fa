//! Feed - ITCH dispatcher.
//!
//! Each `poll()` consumes exactly one record from the byte source:
//!
//! 1. read the 11-byte header into the receive buffer
//! 2. classify it by type discriminant
//! 3. read the remainder of the record into the same buffer
//! 4. decode, translate to a [`BookEvent`] and apply it to the book for the
//!    record's stock locate
//!
//! Records that do not touch a book are still read in full so the stream
//! stays aligned, then dropped.

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::book::Book;
use crate::command::{
    BookEvent, OrderAdd, OrderCanceled, OrderExecuted, OrderExecutedWithPrice, OrderRemoved,
    OrderReplaced, QuoteUpdate, Side,
};
use crate::config::FeedConfig;
use crate::error::{BookError, FeedError, Result, SourceError};
use crate::messages::{
    AddOrderNoMpid, AddOrderWithMpid, MessageHeader, MessageType, OrderCancel, OrderDelete,
    OrderExecuted as OrderExecutedMessage, OrderExecutedWithPrice as OrderExecutedWithPriceMessage,
    OrderReplace, SystemEvent, WireField, WireMessage, HEADER_SIZE, MAX_MESSAGE_SIZE,
};
use crate::price::{Locate, Price, Quantity};
use crate::source::ByteSource;

// ============================================================================
// Translation
// ============================================================================

/// A record that mutates a book.
pub trait BookMessage: WireMessage {
    fn book_event(&self) -> BookEvent;
}

impl BookMessage for AddOrderNoMpid {
    #[inline]
    fn book_event(&self) -> BookEvent {
        BookEvent::Add(OrderAdd {
            order_id: self.order_reference_number,
            quantity: self.shares as Quantity,
            price: Price::from_wire(self.price),
            side: Side::from_indicator(self.buy_sell_indicator),
        })
    }
}

impl BookMessage for AddOrderWithMpid {
    #[inline]
    fn book_event(&self) -> BookEvent {
        BookEvent::Add(OrderAdd {
            order_id: self.order_reference_number,
            quantity: self.shares as Quantity,
            price: Price::from_wire(self.price),
            side: Side::from_indicator(self.buy_sell_indicator),
        })
    }
}

impl BookMessage for OrderExecutedMessage {
    #[inline]
    fn book_event(&self) -> BookEvent {
        BookEvent::Execute(OrderExecuted {
            order_id: self.order_reference_number,
            executed: self.executed_shares as Quantity,
        })
    }
}

impl BookMessage for OrderExecutedWithPriceMessage {
    #[inline]
    fn book_event(&self) -> BookEvent {
        BookEvent::ExecuteWithPrice(OrderExecutedWithPrice {
            executed: OrderExecuted {
                order_id: self.order_reference_number,
                executed: self.executed_shares as Quantity,
            },
            price: Price::from_wire(self.execution_price),
        })
    }
}

impl BookMessage for OrderCancel {
    #[inline]
    fn book_event(&self) -> BookEvent {
        BookEvent::Cancel(OrderCanceled {
            order_id: self.order_reference_number,
            canceled: self.cancelled_shares as Quantity,
        })
    }
}

impl BookMessage for OrderDelete {
    #[inline]
    fn book_event(&self) -> BookEvent {
        BookEvent::Remove(OrderRemoved {
            order_id: self.order_reference_number,
        })
    }
}

impl BookMessage for OrderReplace {
    #[inline]
    fn book_event(&self) -> BookEvent {
        BookEvent::Replace(OrderReplaced {
            original_order_id: self.original_order_reference_number,
            new_order_id: self.new_order_reference_number,
            quantity: self.shares as Quantity,
            price: Price::from_wire(self.price),
        })
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Message counters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedStats {
    /// Records read, including discarded ones
    pub messages: u64,
    /// Records that mutated a book
    pub book_updates: u64,
    /// Records read only to keep the stream aligned
    pub discarded: u64,
    by_type: [u64; 256],
}

impl FeedStats {
    /// Records seen of one type.
    #[inline]
    pub fn count(&self, kind: MessageType) -> u64 {
        self.by_type[kind as usize]
    }

    /// Non-zero per-type counts in catalog order.
    pub fn by_type(&self) -> impl Iterator<Item = (MessageType, u64)> + '_ {
        MessageType::ALL
            .into_iter()
            .map(|kind| (kind, self.count(kind)))
            .filter(|(_, count)| *count > 0)
    }

    #[inline]
    fn record(&mut self, kind: MessageType) {
        self.messages += 1;
        self.by_type[kind as usize] += 1;
    }
}

impl Default for FeedStats {
    fn default() -> Self {
        Self {
            messages: 0,
            book_updates: 0,
            discarded: 0,
            by_type: [0; 256],
        }
    }
}

// ============================================================================
// Feed
// ============================================================================

/// Decodes records from `S` and maintains one book per stock locate.
///
/// Not thread-safe: the feed is the single writer of every book it owns.
pub struct Feed<S> {
    source: S,
    buffer: [u8; MAX_MESSAGE_SIZE],
    header: MessageHeader,
    config: FeedConfig,
    books: FxHashMap<Locate, Book>,
    stats: FeedStats,
}

impl<S: ByteSource> Feed<S> {
    pub fn new(source: S, config: FeedConfig) -> Self {
        let mut feed = Self {
            source,
            buffer: [0; MAX_MESSAGE_SIZE],
            header: MessageHeader::default(),
            books: FxHashMap::default(),
            config,
            stats: FeedStats::default(),
        };
        for locate in feed.config.preallocate.clone() {
            feed.preallocate(locate);
        }
        feed
    }

    /// Read and apply one record.
    ///
    /// Returns `true` if a book changed, so the caller knows to re-read the
    /// top of book for [`Feed::last_header`]'s locate.
    ///
    /// # Errors
    ///
    /// An unknown type or a source failure leaves the stream misaligned. A
    /// book error means the book has diverged from the venue's. The caller
    /// should stop polling after any of them; [`FeedError::is_closed`]
    /// distinguishes the end of input.
    pub fn poll(&mut self) -> Result<bool> {
        self.source.read_exact(&mut self.buffer[..HEADER_SIZE])?;
        self.header = MessageHeader::read(&self.buffer);

        let Some(kind) = self.header.message_type() else {
            warn!(
                kind = self.header.kind,
                locate = self.header.stock_locate,
                "unrecognised message type"
            );
            return Err(FeedError::UnknownMessageType(self.header.kind));
        };
        self.stats.record(kind);

        match kind {
            MessageType::AddOrderNoMpid => self.dispatch::<AddOrderNoMpid>(),
            MessageType::AddOrderWithMpid => self.dispatch::<AddOrderWithMpid>(),
            MessageType::OrderExecuted => self.dispatch::<OrderExecutedMessage>(),
            MessageType::OrderExecutedWithPrice => self.dispatch::<OrderExecutedWithPriceMessage>(),
            MessageType::OrderCancel => self.dispatch::<OrderCancel>(),
            MessageType::OrderDelete => self.dispatch::<OrderDelete>(),
            MessageType::OrderReplace => self.dispatch::<OrderReplace>(),
            MessageType::SystemEvent => {
                let event = self.read_tail::<SystemEvent>()?;
                debug!(
                    code = ?event.code(),
                    timestamp = event.header.timestamp.nanos(),
                    "system event"
                );
                self.stats.discarded += 1;
                Ok(false)
            }
            other => {
                self.source
                    .read_exact(&mut self.buffer[HEADER_SIZE..other.size()])?;
                debug!(kind = ?other, locate = self.header.stock_locate, "discarded");
                self.stats.discarded += 1;
                Ok(false)
            }
        }
    }

    #[inline]
    fn read_tail<M: WireMessage>(&mut self) -> std::result::Result<M, SourceError> {
        self.source
            .read_exact(&mut self.buffer[HEADER_SIZE..M::SIZE])?;
        Ok(M::decode(&self.buffer[..M::SIZE]))
    }

    #[inline]
    fn dispatch<M: BookMessage>(&mut self) -> Result<bool> {
        let event = self.read_tail::<M>()?.book_event();
        let locate = self.header.stock_locate;
        // Only an add can open a book; anything else on an unseen locate
        // names an order that cannot be resting.
        let book = match event {
            BookEvent::Add(_) => book_for(&mut self.books, &self.config, locate),
            _ => self.books.get_mut(&locate).ok_or(FeedError::Book {
                locate,
                source: BookError::UnknownOrder(event.order_id()),
            })?,
        };
        book.apply(&event)
            .map_err(|source| FeedError::Book { locate, source })?;
        self.stats.book_updates += 1;
        Ok(true)
    }

    /// Build the book for `locate` now rather than on its first record.
    pub fn preallocate(&mut self, locate: Locate) -> &mut Book {
        book_for(&mut self.books, &self.config, locate)
    }

    /// Top of book for the locate of the last record read.
    pub fn last_quote(&self) -> Option<QuoteUpdate> {
        self.quote(self.header.stock_locate)
    }

    pub fn quote(&self, locate: Locate) -> Option<QuoteUpdate> {
        self.books.get(&locate).map(|book| QuoteUpdate {
            locate,
            timestamp: self.header.timestamp.nanos(),
            bid: book.best_bid(),
            ask: book.best_ask(),
        })
    }

    #[inline]
    pub fn book(&self, locate: Locate) -> Option<&Book> {
        self.books.get(&locate)
    }

    #[inline]
    pub fn book_mut(&mut self, locate: Locate) -> Option<&mut Book> {
        self.books.get_mut(&locate)
    }

    /// Every book built so far, in no particular order.
    pub fn books(&self) -> impl Iterator<Item = (Locate, &Book)> + '_ {
        self.books.iter().map(|(locate, book)| (*locate, book))
    }

    /// Header of the most recently read record.
    #[inline]
    pub fn last_header(&self) -> &MessageHeader {
        &self.header
    }

    #[inline]
    pub fn stats(&self) -> &FeedStats {
        &self.stats
    }

    #[inline]
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }
}

fn book_for<'a>(
    books: &'a mut FxHashMap<Locate, Book>,
    config: &FeedConfig,
    locate: Locate,
) -> &'a mut Book {
    books.entry(locate).or_insert_with(|| {
        let book_config = config.book_config(locate);
        info!(
            locate,
            tick_size = %book_config.tick_size,
            max_levels = book_config.max_levels,
            "creating book"
        );
        Book::with_config(book_config)
    })
}
