//! Book - A price-indexed, two-sided L2 limit order book.
//!
//! Each side is a fixed array of [`Level`]s addressed by
//! `(price / tick_size) % max_levels`, plus the tick index of its best
//! level. Adding an order is O(1). Removing quantity is O(1) unless it
//! empties the top level, in which case the next occupied tick is found by
//! checking the adjacent level first and then scanning inward.
//!
//! ## Limitations
//!
//! - Prices further than `max_levels` ticks apart alias onto the same slot.
//!   The book is only meant for instruments whose price action stays inside
//!   that window.
//! - When the top empties on a sparse book the scan can walk up to
//!   `max_levels` slots. Liquid books almost always hit the adjacent level.
//! - Not thread safe: one writer per book, readers on the same thread or
//!   synchronised externally.

use std::fmt;
use std::hint::black_box;

use crate::command::{
    BookEvent, OrderAdd, OrderCanceled, OrderExecuted, OrderExecutedWithPrice, OrderRemoved,
    OrderReplaced, Quote, Side,
};
use crate::config::{BookConfig, IndexRetention};
use crate::error::BookError;
use crate::fastmod::{FastDivisor, GranlundFastMod, LemireFastMod};
use crate::level::Level;
use crate::order_index::{OrderIndex, OrderLocation};
use crate::price::{OrderId, Price, Quantity};

/// Top index of an empty bid side. Any real tick compares `>=` to it.
const EMPTY_BID_TOP: u64 = u64::MIN;
/// Top index of an empty ask side. Any real tick compares `<=` to it.
const EMPTY_ASK_TOP: u64 = u64::MAX;

#[inline]
const fn empty_top(side: Side) -> u64 {
    match side {
        Side::Bid => EMPTY_BID_TOP,
        Side::Ask => EMPTY_ASK_TOP,
    }
}

/// One tick toward the inside of the book: down for bids, up for asks.
#[inline]
const fn step_inward(side: Side, ticks: u64) -> u64 {
    match side {
        Side::Bid => ticks.wrapping_sub(1),
        Side::Ask => ticks.wrapping_add(1),
    }
}

/// One half of the book.
struct BookSide {
    /// Tick index of the best occupied level, or the side's empty sentinel
    top: u64,
    levels: Box<[Level]>,
}

impl BookSide {
    fn new(side: Side, max_levels: usize) -> Self {
        Self {
            top: empty_top(side),
            levels: vec![Level::new(); max_levels].into_boxed_slice(),
        }
    }
}

/// Price-indexed L2 order book for a single instrument.
pub struct Book<D: FastDivisor = LemireFastMod> {
    bids: BookSide,
    asks: BookSide,
    /// Tick size, preprocessed for price -> tick division
    tick: D,
    /// `max_levels`, preprocessed for tick -> slot modulo
    slots: GranlundFastMod,
    index: OrderIndex,
}

impl Book<LemireFastMod> {
    /// Create a book with the default index retention.
    ///
    /// # Panics
    /// Panics if `tick_size` is not positive or `max_levels` is zero.
    pub fn new(tick_size: Price, max_levels: usize) -> Self {
        Self::with_config(&BookConfig {
            tick_size,
            max_levels,
            retention: IndexRetention::default(),
        })
    }

    /// # Panics
    /// Panics if the config has a non-positive tick size or zero levels.
    pub fn with_config(config: &BookConfig) -> Self {
        assert!(
            config.tick_size.underlying() > 0,
            "Book tick size must be positive"
        );
        Self::with_divisor(
            LemireFastMod::new(config.tick_size.underlying() as u64),
            config.max_levels,
            config.retention,
        )
    }
}

impl<D: FastDivisor> Book<D> {
    /// Create a book around an already built tick divisor.
    ///
    /// # Panics
    /// Panics if `max_levels` is zero.
    pub fn with_divisor(tick: D, max_levels: usize, retention: IndexRetention) -> Self {
        assert!(max_levels > 0, "Book must have at least one level per side");
        Self {
            bids: BookSide::new(Side::Bid, max_levels),
            asks: BookSide::new(Side::Ask, max_levels),
            tick,
            slots: GranlundFastMod::new(max_levels as u64),
            index: OrderIndex::new(retention),
        }
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// Add an order to the book.
    ///
    /// If `order_id` is already indexed the existing index entry is kept,
    /// though the quantity is still added to the new price level.
    /// Negative prices have no tick and are rejected untouched.
    pub fn add(&mut self, order: &OrderAdd) -> Result<(), BookError> {
        if order.price.underlying() < 0 {
            return Err(BookError::NegativePrice {
                order_id: order.order_id,
                price: order.price,
            });
        }

        let ticks = self.tick.div(order.price.underlying() as u64);
        let slot = self.slot_of(ticks);

        self.index.register(
            order.order_id,
            OrderLocation {
                side: order.side,
                slot,
                remaining: order.quantity,
            },
        );

        let book_side = self.side_mut(order.side);
        book_side.levels[slot].add(order.quantity);
        book_side.top = match order.side {
            Side::Bid => book_side.top.max(ticks),
            Side::Ask => book_side.top.min(ticks),
        };
        Ok(())
    }

    /// Cancel part of a resting order.
    pub fn cancel(&mut self, order: &OrderCanceled) -> Result<(), BookError> {
        let location = self.locate_mut(order.order_id)?;
        location.remaining -= order.canceled;
        let (side, slot) = (location.side, location.slot);

        self.side_mut(side).levels[slot].cancel(order.canceled);
        self.resolve_side(side, slot);
        Ok(())
    }

    /// Delete whatever is left of a resting order.
    pub fn remove(&mut self, order: &OrderRemoved) -> Result<(), BookError> {
        let location = self.locate_mut(order.order_id)?;
        let remaining = location.remaining;
        location.remaining = 0;
        let (side, slot) = (location.side, location.slot);

        self.side_mut(side).levels[slot].remove(remaining);
        self.index.retire(order.order_id);
        self.resolve_side(side, slot);
        Ok(())
    }

    /// A resting order traded.
    pub fn execute(&mut self, order: &OrderExecuted) -> Result<(), BookError> {
        let location = self.locate_mut(order.order_id)?;
        location.remaining -= order.executed;
        let (side, slot) = (location.side, location.slot);

        self.side_mut(side).levels[slot].execute(order.executed);
        self.resolve_side(side, slot);
        Ok(())
    }

    /// A resting order traded at a print price; the price does not affect
    /// the book.
    #[inline]
    pub fn execute_with_price(&mut self, order: &OrderExecutedWithPrice) -> Result<(), BookError> {
        self.execute(&order.executed)
    }

    /// Replace a resting order with a new id, price and quantity on the
    /// same side: add the new order, then delete the original.
    pub fn replace(&mut self, order: &OrderReplaced) -> Result<(), BookError> {
        let side = self
            .index
            .get(order.original_order_id)
            .ok_or(BookError::UnknownOrder(order.original_order_id))?
            .side;

        self.add(&OrderAdd {
            order_id: order.new_order_id,
            quantity: order.quantity,
            price: order.price,
            side,
        })?;

        self.remove(&OrderRemoved {
            order_id: order.original_order_id,
        })
    }

    /// Apply any book event.
    pub fn apply(&mut self, event: &BookEvent) -> Result<(), BookError> {
        match event {
            BookEvent::Add(order) => self.add(order),
            BookEvent::Execute(order) => self.execute(order),
            BookEvent::ExecuteWithPrice(order) => self.execute_with_price(order),
            BookEvent::Cancel(order) => self.cancel(order),
            BookEvent::Remove(order) => self.remove(order),
            BookEvent::Replace(order) => self.replace(order),
        }
    }

    // ========================================================================
    // Best Price Access
    // ========================================================================

    /// Highest bid and its aggregate quantity, or [`Quote::EMPTY`].
    #[inline]
    pub fn best_bid(&self) -> Quote {
        self.best(Side::Bid)
    }

    /// Lowest ask and its aggregate quantity, or [`Quote::EMPTY`].
    #[inline]
    pub fn best_ask(&self) -> Quote {
        self.best(Side::Ask)
    }

    /// Best quote on a given side
    #[inline]
    pub fn best(&self, side: Side) -> Quote {
        let book_side = self.side(side);
        if book_side.top == empty_top(side) {
            return Quote::EMPTY;
        }
        Quote::new(
            self.tick_to_price(book_side.top),
            book_side.levels[self.slot_of(book_side.top)].quantity(),
        )
    }

    /// Calculate spread (best_ask - best_bid) when both sides are populated
    pub fn spread(&self) -> Option<Price> {
        let (bid, ask) = (self.best_bid(), self.best_ask());
        if bid.is_live() && ask.is_live() {
            Some(ask.price - bid.price)
        } else {
            None
        }
    }

    // ========================================================================
    // Top-of-Book Resolution
    // ========================================================================

    /// After quantity leaves `slot`, move the top inward if that emptied it.
    fn resolve_side(&mut self, side: Side, slot: usize) {
        let slots = self.slots;
        let max_levels = slots.denominator();
        let book_side = self.side_mut(side);

        if book_side.top == empty_top(side)
            || book_side.levels[slot].quantity() != 0
            || slots.rem(book_side.top) as usize != slot
        {
            return;
        }

        // Liquid books almost always have volume one tick behind the top
        book_side.top = step_inward(side, book_side.top);
        if book_side.levels[slots.rem(book_side.top) as usize].quantity() != 0 {
            return;
        }

        for _ in 1..max_levels {
            book_side.top = step_inward(side, book_side.top);
            if book_side.levels[slots.rem(book_side.top) as usize].quantity() != 0 {
                return;
            }
        }

        book_side.top = empty_top(side);
    }

    // ========================================================================
    // Utility Methods
    // ========================================================================

    #[inline]
    fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    #[inline]
    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    #[inline]
    fn slot_of(&self, ticks: u64) -> usize {
        self.slots.rem(ticks) as usize
    }

    #[inline]
    fn tick_to_price(&self, ticks: u64) -> Price {
        Price::from_underlying(ticks.wrapping_mul(self.tick.denominator()) as i64)
    }

    #[inline]
    fn locate_mut(&mut self, order_id: OrderId) -> Result<&mut OrderLocation, BookError> {
        self.index
            .get_mut(order_id)
            .ok_or(BookError::UnknownOrder(order_id))
    }

    /// Aggregate quantity in the slot `price` maps to.
    ///
    /// Prices more than `max_levels` ticks apart share a slot.
    pub fn depth_at(&self, side: Side, price: Price) -> Quantity {
        let ticks = self.tick.div(price.underlying() as u64);
        self.side(side).levels[self.slot_of(ticks)].quantity()
    }

    /// Working quantity of an indexed order
    pub fn remaining(&self, order_id: OrderId) -> Option<Quantity> {
        self.index.get(order_id).map(|location| location.remaining)
    }

    /// Whether an order id is indexed
    #[inline]
    pub fn contains_order(&self, order_id: OrderId) -> bool {
        self.index.get(order_id).is_some()
    }

    /// Number of indexed order ids
    #[inline]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn tick_size(&self) -> Price {
        Price::from_underlying(self.tick.denominator() as i64)
    }

    #[inline]
    pub fn max_levels(&self) -> usize {
        self.slots.denominator() as usize
    }

    /// Check if both sides are empty
    pub fn is_empty(&self) -> bool {
        self.bids.top == EMPTY_BID_TOP && self.asks.top == EMPTY_ASK_TOP
    }

    /// Drop index entries for orders with nothing left working.
    pub fn compact_index(&mut self) -> usize {
        self.index.compact()
    }

    /// Clear all orders from the book
    pub fn clear(&mut self) {
        for side in [Side::Bid, Side::Ask] {
            let book_side = self.side_mut(side);
            book_side.levels.fill(Level::new());
            book_side.top = empty_top(side);
        }
        self.index.clear();
    }

    /// Touch every level so the pages are resident before the first message.
    pub fn warm_up(&mut self) {
        for level in self.bids.levels.iter_mut().chain(self.asks.levels.iter_mut()) {
            *level = black_box(*level);
        }
    }
}

impl<D: FastDivisor> fmt::Debug for Book<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Book")
            .field("tick_size", &self.tick_size())
            .field("max_levels", &self.max_levels())
            .field("best_bid", &self.best_bid())
            .field("best_ask", &self.best_ask())
            .field("order_count", &self.index.len())
            .finish()
    }
}
