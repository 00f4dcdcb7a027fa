//! Order Index - Maps order ids to where they rest and what is left of them.
//!
//! Each entry records the side and slot of the level the order rests in,
//! plus the order's own remaining quantity. The remaining quantity is tracked
//! separately from the level aggregate: a partial execute or cancel is
//! deducted from both, so a later delete only removes what is actually left.

use rustc_hash::FxHashMap;

use crate::command::Side;
use crate::config::IndexRetention;
use crate::price::{OrderId, Quantity};

/// Where an order rests and its working quantity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderLocation {
    pub side: Side,
    /// Index into the side's level array
    pub slot: usize,
    /// Quantity still working for this order
    pub remaining: Quantity,
}

/// OrderId -> OrderLocation
#[derive(Debug, Default)]
pub struct OrderIndex {
    entries: FxHashMap<OrderId, OrderLocation>,
    retention: IndexRetention,
}

impl OrderIndex {
    pub fn new(retention: IndexRetention) -> Self {
        Self {
            entries: FxHashMap::default(),
            retention,
        }
    }

    pub fn with_capacity(retention: IndexRetention, orders: usize) -> Self {
        Self {
            entries: FxHashMap::with_capacity_and_hasher(orders, Default::default()),
            retention,
        }
    }

    /// Record a new order. If the id is already present the existing entry
    /// is kept.
    #[inline]
    pub fn register(&mut self, order_id: OrderId, location: OrderLocation) {
        self.entries.entry(order_id).or_insert(location);
    }

    #[inline]
    pub fn get(&self, order_id: OrderId) -> Option<&OrderLocation> {
        self.entries.get(&order_id)
    }

    #[inline]
    pub fn get_mut(&mut self, order_id: OrderId) -> Option<&mut OrderLocation> {
        self.entries.get_mut(&order_id)
    }

    /// The order has been fully deleted from its level.
    #[inline]
    pub fn retire(&mut self, order_id: OrderId) {
        if self.retention == IndexRetention::EvictOnRemove {
            self.entries.remove(&order_id);
        }
    }

    /// Drop every entry with nothing left working.
    ///
    /// Returns the number of entries removed.
    pub fn compact(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, location| location.remaining > 0);
        before - self.entries.len()
    }

    /// Number of tracked ids, including stale ones under `Retain`.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
