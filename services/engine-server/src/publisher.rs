//! Market data publisher
//!
//! Fans redacted trade events out to every live session except the one that
//! triggered the match. The originator gets the detailed TRADE blocks in its
//! private response; market data never identifies counterparties.
//!
//! The registry is the one structure in the core that may be touched from
//! outside the dispatch task, so it sits behind a mutex. Weak references
//! keep the publisher from extending session lifetimes; expired entries are
//! purged on every broadcast.

use std::sync::{Mutex, Weak};

use types::trade::{MarketTrade, Trade};

use crate::session::SessionHandle;

/// Process-wide fan-out of trade events, one per server
pub struct MarketPublisher {
    sessions: Mutex<Vec<Weak<SessionHandle>>>,
}

impl MarketPublisher {
    /// Create an empty publisher
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Register a session at connection startup
    pub fn register_session(&self, session: Weak<SessionHandle>) {
        self.lock_sessions().push(session);
    }

    /// Broadcast a trade to every live session except the originator
    ///
    /// A session whose queue can no longer accept messages is logged and
    /// skipped; one bad peer never stops the rest of the batch.
    pub fn broadcast_trade(&self, trade: &Trade, origin: &Weak<SessionHandle>) {
        let mut sessions = self.lock_sessions();
        sessions.retain(|weak| weak.strong_count() > 0);

        let message = format!("{}\n\n", MarketTrade::from(trade));

        for weak in sessions.iter() {
            if weak.ptr_eq(origin) {
                continue;
            }
            let session = match weak.upgrade() {
                Some(session) => session,
                None => continue,
            };
            if session.is_disconnected() {
                continue;
            }
            if !session.send_message(message.clone()) {
                tracing::warn!(addr = session.addr(), "failed to queue market trade");
            }
        }
    }

    /// Number of live registered sessions
    pub fn session_count(&self) -> usize {
        let mut sessions = self.lock_sessions();
        sessions.retain(|weak| weak.strong_count() > 0);
        sessions.len()
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, Vec<Weak<SessionHandle>>> {
        // A poisoned registry is still structurally valid; keep serving
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MarketPublisher {
    fn default() -> Self {
        Self::new()
    }
}
