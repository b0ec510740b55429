//! Trade execution types
//!
//! A `Trade` records a completed execution between two resting orders. The
//! originating session sees the full record; everyone else sees the redacted
//! `MarketTrade` view with counterparty identities removed.

use crate::ids::OrderId;
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A completed execution between a buy and a sell order
///
/// Immutable: once appended to the trade log an entry is never mutated or
/// removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
}

impl Trade {
    /// Create a new trade record
    pub fn new(
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            buy_order_id,
            sell_order_id,
            price,
            quantity,
        }
    }

    /// Trade value (price × quantity)
    pub fn value(&self) -> Decimal {
        self.price.as_decimal() * Decimal::from(self.quantity.as_u64())
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TRADE BuyID: {}, SellID: {}, Price: {}, Quantity: {}",
            self.buy_order_id, self.sell_order_id, self.price, self.quantity
        )
    }
}

/// Redacted public view of a trade
///
/// Market data carries price and quantity only — never the order ids of the
/// counterparties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketTrade {
    pub price: Price,
    pub quantity: Quantity,
}

impl From<&Trade> for MarketTrade {
    fn from(trade: &Trade) -> Self {
        Self {
            price: trade.price,
            quantity: trade.quantity,
        }
    }
}

impl fmt::Display for MarketTrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MARKET TRADE Price: {}, Quantity: {}",
            self.price, self.quantity
        )
    }
}
