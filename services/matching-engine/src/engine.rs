//! Order book core
//!
//! Main coordinator for the two book sides, id assignment, cancellation,
//! and the continuous matching loop.

use std::collections::HashMap;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};
use types::trade::Trade;

use crate::book::{AskBook, BidBook};
use crate::matching::crossing;

/// Single-instrument order book
///
/// Owns both sides, the id counter, and the append-only trade log. All
/// validation happens at the caller; the book assumes positive prices and
/// quantities.
pub struct OrderBook {
    bids: BidBook,
    asks: AskBook,
    /// Resting-order lookup for cancels: id → (price, side). Entries are
    /// removed on cancel and on full fill, so a stale id simply misses.
    id_index: HashMap<OrderId, (Price, Side)>,
    /// Next id to assign; starts at 1, never reused
    next_order_id: u64,
    /// Every trade ever produced, in execution order
    trades: Vec<Trade>,
}

impl OrderBook {
    /// Create a new empty order book
    pub fn new() -> Self {
        Self {
            bids: BidBook::new(),
            asks: AskBook::new(),
            id_index: HashMap::new(),
            next_order_id: 1,
            trades: Vec::new(),
        }
    }

    /// Add a resting limit order and return its id
    ///
    /// Does not match; call `match_orders` separately.
    pub fn add_order(&mut self, side: Side, price: Price, quantity: Quantity) -> OrderId {
        let id = OrderId::new(self.next_order_id);
        self.next_order_id += 1;

        let order = Order::new(id, side, price, quantity);
        match side {
            Side::BUY => self.bids.insert(&order),
            Side::SELL => self.asks.insert(&order),
        }
        self.id_index.insert(id, (price, side));
        id
    }

    /// Cancel a resting order
    ///
    /// Returns true if an order was removed. Cancelling a fully-filled or
    /// never-existing id returns false; it is not an error, and a repeated
    /// cancel of the same id also returns false.
    pub fn cancel_order(&mut self, order_id: OrderId) -> bool {
        match self.id_index.remove(&order_id) {
            Some((price, Side::BUY)) => self.bids.remove(&order_id, price),
            Some((price, Side::SELL)) => self.asks.remove(&order_id, price),
            None => false,
        }
    }

    /// Run the continuous matching loop
    ///
    /// Repeatedly crosses the front orders of the best bid and best ask
    /// levels until a side empties or the best bid no longer reaches the
    /// best ask. Execution is always at the resting sell's price, so an
    /// aggressive buy gets price improvement. Partial fills decrement in
    /// place: the survivor keeps its id and time priority.
    ///
    /// Returns the trades produced by this invocation; the same trades are
    /// also appended to the permanent trade log.
    pub fn match_orders(&mut self) -> Vec<Trade> {
        let mut executed = Vec::new();

        loop {
            let (bid_price, buy_id, buy_qty) = match self.bids.front_order() {
                Some(front) => front,
                None => break,
            };
            let (ask_price, sell_id, sell_qty) = match self.asks.front_order() {
                Some(front) => front,
                None => break,
            };

            if !crossing::can_match(bid_price, ask_price) {
                break;
            }

            // Execute at the sell price
            let quantity = buy_qty.min(sell_qty);
            let trade = Trade::new(buy_id, sell_id, ask_price, quantity);
            self.trades.push(trade);
            executed.push(trade);

            if self.bids.fill_front(quantity) {
                self.id_index.remove(&buy_id);
            }
            if self.asks.fill_front(quantity) {
                self.id_index.remove(&sell_id);
            }
        }

        executed
    }

    /// The full append-only trade log, in execution order
    pub fn trade_history(&self) -> &[Trade] {
        &self.trades
    }

    /// Remaining quantity of a resting order, if it is still in the book
    pub fn resting_quantity(&self, order_id: OrderId) -> Option<Quantity> {
        match self.id_index.get(&order_id) {
            Some((price, Side::BUY)) => self.bids.order_quantity(&order_id, *price),
            Some((price, Side::SELL)) => self.asks.order_quantity(&order_id, *price),
            None => None,
        }
    }

    /// Best bid (price, total level quantity)
    pub fn best_bid(&self) -> Option<(Price, u64)> {
        self.bids.best_bid()
    }

    /// Best ask (price, total level quantity)
    pub fn best_ask(&self) -> Option<(Price, u64)> {
        self.asks.best_ask()
    }

    /// Depth snapshot of the bid side (best first)
    pub fn bid_depth(&self, depth: usize) -> Vec<(Price, u64)> {
        self.bids.depth_snapshot(depth)
    }

    /// Depth snapshot of the ask side (best first)
    pub fn ask_depth(&self, depth: usize) -> Vec<(Price, u64)> {
        self.asks.depth_snapshot(depth)
    }

    /// Total resting quantity on the buy side
    pub fn bid_volume(&self) -> u64 {
        self.bids.total_quantity()
    }

    /// Total resting quantity on the sell side
    pub fn ask_volume(&self) -> u64 {
        self.asks.total_quantity()
    }

    /// Check if the buy side is empty
    pub fn bids_empty(&self) -> bool {
        self.bids.is_empty()
    }

    /// Check if the sell side is empty
    pub fn asks_empty(&self) -> bool {
        self.asks.is_empty()
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        Price::from_str(s).unwrap()
    }

    #[test]
    fn test_add_order_assigns_sequential_ids() {
        let mut book = OrderBook::new();

        let id1 = book.add_order(Side::BUY, price("100"), Quantity::new(10));
        let id2 = book.add_order(Side::SELL, price("101"), Quantity::new(5));

        assert_eq!(id1, OrderId::new(1));
        assert_eq!(id2, OrderId::new(2));
    }

    #[test]
    fn test_add_does_not_match() {
        let mut book = OrderBook::new();
        book.add_order(Side::BUY, price("100"), Quantity::new(10));
        book.add_order(Side::SELL, price("100"), Quantity::new(5));

        // Crossed until match_orders runs
        assert!(book.trade_history().is_empty());
        assert!(!book.bids_empty());
        assert!(!book.asks_empty());
    }

    #[test]
    fn test_cancel_existing_order() {
        let mut book = OrderBook::new();
        let id = book.add_order(Side::BUY, price("100"), Quantity::new(10));

        assert!(book.cancel_order(id));
        assert!(book.bids_empty());
    }

    #[test]
    fn test_cancel_unknown_order() {
        let mut book = OrderBook::new();
        assert!(!book.cancel_order(OrderId::new(999)));
    }

    #[test]
    fn test_cancel_is_not_repeatable() {
        let mut book = OrderBook::new();
        let id = book.add_order(Side::SELL, price("100"), Quantity::new(10));

        assert!(book.cancel_order(id));
        assert!(!book.cancel_order(id));
    }

    #[test]
    fn test_cancel_after_full_fill_misses() {
        let mut book = OrderBook::new();
        let buy = book.add_order(Side::BUY, price("100"), Quantity::new(5));
        book.add_order(Side::SELL, price("100"), Quantity::new(5));
        book.match_orders();

        assert!(!book.cancel_order(buy));
    }

    #[test]
    fn test_match_at_sell_price() {
        let mut book = OrderBook::new();
        let buy = book.add_order(Side::BUY, price("101"), Quantity::new(10));
        let sell = book.add_order(Side::SELL, price("100"), Quantity::new(5));

        let trades = book.match_orders();

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].buy_order_id, buy);
        assert_eq!(trades[0].sell_order_id, sell);
        assert_eq!(trades[0].price, price("100"));
        assert_eq!(trades[0].quantity, Quantity::new(5));
    }

    #[test]
    fn test_partial_fill_keeps_priority() {
        let mut book = OrderBook::new();
        let buy = book.add_order(Side::BUY, price("100"), Quantity::new(10));
        book.add_order(Side::SELL, price("100"), Quantity::new(4));
        book.match_orders();

        assert_eq!(book.resting_quantity(buy), Some(Quantity::new(6)));

        // The survivor still matches first at its level
        let late_buy = book.add_order(Side::BUY, price("100"), Quantity::new(10));
        let sell = book.add_order(Side::SELL, price("100"), Quantity::new(6));
        let trades = book.match_orders();

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].buy_order_id, buy);
        assert_eq!(trades[0].sell_order_id, sell);
        assert_eq!(book.resting_quantity(late_buy), Some(Quantity::new(10)));
    }

    #[test]
    fn test_match_never_leaves_crossed_book() {
        let mut book = OrderBook::new();
        book.add_order(Side::BUY, price("102"), Quantity::new(3));
        book.add_order(Side::BUY, price("101"), Quantity::new(3));
        book.add_order(Side::SELL, price("100"), Quantity::new(4));
        book.match_orders();

        if let (Some((bid, _)), Some((ask, _))) = (book.best_bid(), book.best_ask()) {
            assert!(bid < ask, "book must not be crossed after matching");
        }
    }

    #[test]
    fn test_trade_log_is_append_only_across_matches() {
        let mut book = OrderBook::new();
        book.add_order(Side::BUY, price("100"), Quantity::new(5));
        book.add_order(Side::SELL, price("100"), Quantity::new(5));
        book.match_orders();
        let first = book.trade_history().to_vec();

        book.add_order(Side::BUY, price("100"), Quantity::new(1));
        book.add_order(Side::SELL, price("100"), Quantity::new(1));
        book.match_orders();

        assert_eq!(book.trade_history().len(), 2);
        assert_eq!(&book.trade_history()[..1], &first[..]);
    }

    #[test]
    fn test_match_orders_returns_only_new_trades() {
        let mut book = OrderBook::new();
        book.add_order(Side::BUY, price("100"), Quantity::new(5));
        book.add_order(Side::SELL, price("100"), Quantity::new(5));

        assert_eq!(book.match_orders().len(), 1);
        // No intervening adds: nothing new to report
        assert!(book.match_orders().is_empty());
    }
}
