//! Engine dispatch task
//!
//! A single task owns the `OrderBook` and consumes commands from every
//! session over one channel. Serializing all book access through this task
//! is what lets the book itself run without any locking: commands are
//! applied strictly in the order they arrive on the channel.

use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, oneshot};
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::trade::Trade;

use matching_engine::OrderBook;

use crate::publisher::MarketPublisher;
use crate::session::SessionHandle;

/// A command for the dispatch task, with its reply channel
enum EngineCommand {
    Submit {
        side: Side,
        price: Price,
        quantity: Quantity,
        /// The session that placed the order; excluded from the broadcast
        origin: Weak<SessionHandle>,
        reply: oneshot::Sender<(OrderId, Vec<Trade>)>,
    },
    Cancel {
        order_id: OrderId,
        reply: oneshot::Sender<bool>,
    },
}

/// Cloneable handle for sending commands to the dispatch task
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    /// Add an order and run matching
    ///
    /// Returns the assigned id and the trades this order triggered, or None
    /// if the dispatch task has shut down.
    pub async fn submit(
        &self,
        side: Side,
        price: Price,
        quantity: Quantity,
        origin: Weak<SessionHandle>,
    ) -> Option<(OrderId, Vec<Trade>)> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(EngineCommand::Submit {
                side,
                price,
                quantity,
                origin,
                reply,
            })
            .ok()?;
        response.await.ok()
    }

    /// Cancel a resting order; Some(true) if one was removed
    pub async fn cancel(&self, order_id: OrderId) -> Option<bool> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(EngineCommand::Cancel { order_id, reply })
            .ok()?;
        response.await.ok()
    }
}

/// Spawn the dispatch task owning a fresh order book
///
/// The task runs until every `EngineHandle` has been dropped.
pub fn spawn(publisher: Arc<MarketPublisher>) -> EngineHandle {
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut book = OrderBook::new();

        while let Some(command) = rx.recv().await {
            match command {
                EngineCommand::Submit {
                    side,
                    price,
                    quantity,
                    origin,
                    reply,
                } => {
                    let order_id = book.add_order(side, price, quantity);
                    let trades = book.match_orders();
                    tracing::debug!(%order_id, trades = trades.len(), "order matched");

                    // Market data goes out before the private confirmation,
                    // so both views refer to the same book state
                    for trade in &trades {
                        publisher.broadcast_trade(trade, &origin);
                    }

                    let _ = reply.send((order_id, trades));
                }
                EngineCommand::Cancel { order_id, reply } => {
                    let _ = reply.send(book.cancel_order(order_id));
                }
            }
        }

        tracing::debug!("engine dispatch task stopped");
    });

    EngineHandle { tx }
}
