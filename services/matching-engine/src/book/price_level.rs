//! Price level implementation with FIFO queue
//!
//! A price level contains all orders resting at a specific price point.
//! Orders are maintained in FIFO order to enforce time priority: the order
//! that arrived first (lowest id) fills first.

use std::collections::VecDeque;
use types::ids::OrderId;
use types::numeric::Quantity;

/// A price level containing orders at a specific price
///
/// Maintains strict FIFO ordering for time-priority matching.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// Queue of orders at this price level (FIFO order)
    orders: VecDeque<OrderEntry>,
    /// Total quantity available at this level
    total_quantity: u64,
}

/// Entry in the price level queue
#[derive(Debug, Clone)]
struct OrderEntry {
    order_id: OrderId,
    remaining_quantity: Quantity,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_quantity: 0,
        }
    }

    /// Insert an order at the back of the queue (time priority)
    pub fn insert(&mut self, order_id: OrderId, quantity: Quantity) {
        self.orders.push_back(OrderEntry {
            order_id,
            remaining_quantity: quantity,
        });
        self.total_quantity += quantity.as_u64();
    }

    /// Remove an order from the queue by OrderId
    ///
    /// Returns the remaining quantity of the removed order, or None if not found
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Quantity> {
        let position = self
            .orders
            .iter()
            .position(|entry| &entry.order_id == order_id)?;
        let entry = self.orders.remove(position)?;
        self.total_quantity -= entry.remaining_quantity.as_u64();
        Some(entry.remaining_quantity)
    }

    /// Peek at the front order without removing it
    pub fn peek_front(&self) -> Option<(OrderId, Quantity)> {
        self.orders
            .front()
            .map(|entry| (entry.order_id, entry.remaining_quantity))
    }

    /// Look up the remaining quantity of an order at this level
    pub fn get(&self, order_id: &OrderId) -> Option<Quantity> {
        self.orders
            .iter()
            .find(|entry| &entry.order_id == order_id)
            .map(|entry| entry.remaining_quantity)
    }

    /// Reduce the front order by a fill
    ///
    /// The fill must not exceed the front order's remaining quantity. A fully
    /// consumed order is dequeued; a partial fill leaves it at the front with
    /// its id and time priority unchanged. Returns true if the front order
    /// was removed.
    ///
    /// # Panics
    /// Panics if the level is empty or the fill exceeds the front quantity
    pub fn fill_front(&mut self, fill: Quantity) -> bool {
        let entry = self
            .orders
            .front_mut()
            .expect("fill_front on empty price level");
        entry.remaining_quantity = entry.remaining_quantity - fill;
        self.total_quantity -= fill.as_u64();

        if entry.remaining_quantity.is_zero() {
            self.orders.pop_front();
            true
        } else {
            false
        }
    }

    /// Check if the price level is empty
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Get the total quantity at this price level
    pub fn total_quantity(&self) -> u64 {
        self.total_quantity
    }

    /// Get the number of orders at this level
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}
