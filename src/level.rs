//! Level - The aggregated open quantity at a single price tick.
//!
//! Levels live in pre-allocated slots inside a book side and carry no
//! identity of their own: the side is known by whichever array holds the
//! slot, and the price by the tick index the slot currently represents.
//! The per-verb methods are kept separate so an L3 queue can slot in behind
//! them without touching the book.

use crate::price::Quantity;

/// Aggregated resting quantity at one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Level {
    quantity: Quantity,
}

impl Level {
    /// Create a new empty level
    #[inline]
    pub const fn new() -> Self {
        Self { quantity: 0 }
    }

    /// A new order rests at this level.
    #[inline]
    pub fn add(&mut self, qty: Quantity) {
        self.quantity += qty;
    }

    /// Part of a resting order was cancelled.
    #[inline]
    pub fn cancel(&mut self, qty: Quantity) {
        self.quantity -= qty;
    }

    /// The remainder of a resting order was deleted.
    #[inline]
    pub fn remove(&mut self, qty: Quantity) {
        self.quantity -= qty;
    }

    /// A resting order traded.
    #[inline]
    pub fn execute(&mut self, qty: Quantity) {
        self.quantity -= qty;
    }

    #[inline]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Returns true if nothing rests at this level
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.quantity == 0
    }
}
