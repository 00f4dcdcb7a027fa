//! Book events and quote types.
//!
//! The feed translates wire messages into these protocol-agnostic events.
//! Quotes are what consumers read back out.

use serde::Serialize;

use crate::price::{Locate, OrderId, Price, Quantity};

/// Order side (bid = buy, ask = sell)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Side {
    /// Buy side (bids)
    Bid = 0,
    /// Sell side (asks)
    Ask = 1,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Decode the wire buy/sell indicator. Anything other than `B` is a sell.
    #[inline]
    pub const fn from_indicator(indicator: u8) -> Self {
        if indicator == b'B' {
            Side::Bid
        } else {
            Side::Ask
        }
    }

    /// The wire buy/sell indicator.
    #[inline]
    pub const fn indicator(self) -> u8 {
        match self {
            Side::Bid => b'B',
            Side::Ask => b'S',
        }
    }
}

// ============================================================================
// Book Events
// ============================================================================

/// A new order rests on the book
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderAdd {
    pub order_id: OrderId,
    pub quantity: Quantity,
    pub price: Price,
    pub side: Side,
}

/// A resting order traded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderExecuted {
    pub order_id: OrderId,
    /// Shares executed in this print
    pub executed: Quantity,
}

/// A resting order traded at a price other than its limit.
///
/// The print price is informational; the order is still removed from the
/// level it rests at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderExecutedWithPrice {
    pub executed: OrderExecuted,
    pub price: Price,
}

/// Part of a resting order was cancelled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderCanceled {
    pub order_id: OrderId,
    pub canceled: Quantity,
}

/// The whole remainder of a resting order was deleted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderRemoved {
    pub order_id: OrderId,
}

/// A resting order was replaced by a new one on the same side
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderReplaced {
    pub original_order_id: OrderId,
    pub new_order_id: OrderId,
    pub quantity: Quantity,
    pub price: Price,
}

/// Any event that mutates a book
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookEvent {
    Add(OrderAdd),
    Execute(OrderExecuted),
    ExecuteWithPrice(OrderExecutedWithPrice),
    Cancel(OrderCanceled),
    Remove(OrderRemoved),
    Replace(OrderReplaced),
}

impl BookEvent {
    /// The order the event refers to (the original order for a replace).
    pub fn order_id(&self) -> OrderId {
        match self {
            BookEvent::Add(e) => e.order_id,
            BookEvent::Execute(e) => e.order_id,
            BookEvent::ExecuteWithPrice(e) => e.executed.order_id,
            BookEvent::Cancel(e) => e.order_id,
            BookEvent::Remove(e) => e.order_id,
            BookEvent::Replace(e) => e.original_order_id,
        }
    }
}

// ============================================================================
// Quotes
// ============================================================================

/// Best price and the aggregate quantity resting there
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub price: Price,
    pub quantity: Quantity,
}

impl Quote {
    /// What an empty side reports.
    pub const EMPTY: Quote = Quote {
        price: Price::INVALID,
        quantity: 0,
    };

    #[inline]
    pub const fn new(price: Price, quantity: Quantity) -> Self {
        Self { price, quantity }
    }

    /// Callers must check this before treating the quote as a real price.
    #[inline]
    pub const fn is_live(&self) -> bool {
        self.price.is_valid() && self.quantity != 0
    }
}

/// Top of book for one instrument after a mutating message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuoteUpdate {
    pub locate: Locate,
    /// Nanoseconds since midnight
    pub timestamp: u64,
    pub bid: Quote,
    pub ask: Quote,
}
