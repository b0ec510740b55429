//! Unique identifier types for engine entities
//!
//! Order ids are plain integers assigned sequentially by the book, so they
//! double as arrival order: a lower id always means an earlier order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an order
///
/// Assigned by the order book on insertion, starting at 1 and strictly
/// increasing. Ids are never reused, even after cancellation or a full fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(u64);

impl OrderId {
    /// Create an OrderId from a raw integer
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner integer
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_ordering_tracks_arrival() {
        let earlier = OrderId::new(1);
        let later = OrderId::new(2);
        assert!(earlier < later);
    }

    #[test]
    fn test_order_id_display() {
        assert_eq!(OrderId::new(42).to_string(), "42");
    }

    #[test]
    fn test_order_id_serialization() {
        let id = OrderId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");

        let deserialized: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
