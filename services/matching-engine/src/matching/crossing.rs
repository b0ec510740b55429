//! Crossing detection logic
//!
//! Determines when a bid and ask can match based on price compatibility.

use types::numeric::Price;

/// Check if a bid and ask can match at given prices
///
/// A buy crosses a sell when the buy price is >= the sell price. The
/// execution price is decided elsewhere (always the resting sell's price).
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}
