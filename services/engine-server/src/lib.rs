//! Engine server
//!
//! Multi-client TCP front end for the matching engine. Clients speak a
//! line-oriented ASCII protocol; every response and broadcast is terminated
//! by a blank line (`\n\n`).
//!
//! # Architecture
//!
//! ```text
//!  TCP clients
//!      │  lines            ┌────────────┐
//!  ┌───▼────┐  commands    │  dispatch  │   owns the OrderBook;
//!  │ Session├─────────────▶│    task    │   single consumer, so the
//!  └───▲────┘   oneshot    └─────┬──────┘   book needs no locking
//!      │ write queue             │ trades
//!      │                   ┌─────▼──────┐
//!      └───────────────────┤ publisher  │   redacted MARKET TRADE
//!        to all but origin └────────────┘   fan-out
//! ```

pub mod dispatch;
pub mod protocol;
pub mod publisher;
pub mod server;
pub mod session;

pub use server::{EngineServer, DEFAULT_PORT};
