//! Per-connection session dispatch
//!
//! One session per accepted socket. The reader task parses command lines and
//! round-trips them through the engine dispatch task; a dedicated writer task
//! drains the session's outbound queue, so private responses and concurrent
//! market broadcasts are written strictly FIFO and never interleave.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};

use types::numeric::{Price, Quantity};
use types::order::Side;

use crate::dispatch::EngineHandle;
use crate::protocol::{self, Command};
use crate::publisher::MarketPublisher;

/// Delay between acknowledging a DC and closing the socket, so the
/// acknowledgement reaches the client before the connection drops.
const DISCONNECT_FLUSH_DELAY: Duration = Duration::from_millis(100);

/// Shared handle to a live session
///
/// Owned by the server registry and the session's own tasks; the market
/// publisher holds only weak references to it. Queueing a message is all a
/// peer can do with it — the socket itself never leaves the session's tasks.
pub struct SessionHandle {
    addr: String,
    outbound: mpsc::UnboundedSender<String>,
    disconnected: AtomicBool,
}

impl SessionHandle {
    fn new(addr: String, outbound: mpsc::UnboundedSender<String>) -> Arc<Self> {
        Arc::new(Self {
            addr,
            outbound,
            disconnected: AtomicBool::new(false),
        })
    }

    /// Client address string, the session's identity in the registry
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Queue a message for FIFO delivery
    ///
    /// Returns false if the session's writer is already gone.
    pub fn send_message(&self, message: String) -> bool {
        self.outbound.send(message).is_ok()
    }

    /// Whether the session has already run its disconnect handling
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }

    /// Flip the disconnect flag; true only for the first caller
    fn mark_disconnected(&self) -> bool {
        !self.disconnected.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
impl SessionHandle {
    /// Detached handle whose outbound queue is observable in tests
    pub(crate) fn new_for_test(addr: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(addr.to_string(), tx), rx)
    }
}

/// Run the session's disconnect handling exactly once
///
/// Reachable from both the reader (EOF, read error, DC, shutdown) and the
/// writer (write error); the atomic flag makes the second arrival a no-op.
fn handle_disconnect(handle: &SessionHandle, disconnects: &mpsc::UnboundedSender<String>) {
    if !handle.mark_disconnected() {
        return;
    }
    tracing::info!(addr = handle.addr(), "Client disconnected");
    let _ = disconnects.send(handle.addr.clone());
}

/// Spawn the reader and writer tasks for an accepted connection
///
/// Registers the session with the publisher and sends the welcome banner
/// before the first read. Returns the shared handle for the server registry.
pub fn spawn(
    socket: TcpStream,
    addr: String,
    engine: EngineHandle,
    publisher: Arc<MarketPublisher>,
    disconnects: mpsc::UnboundedSender<String>,
    shutdown: watch::Receiver<bool>,
) -> Arc<SessionHandle> {
    let (read_half, write_half) = socket.into_split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let handle = SessionHandle::new(addr, outbound_tx);

    publisher.register_session(Arc::downgrade(&handle));
    tracing::info!(
        addr = handle.addr(),
        total_clients = publisher.session_count(),
        "Client connected"
    );

    handle.send_message(protocol::welcome_message());

    spawn_writer(
        write_half,
        outbound_rx,
        Arc::downgrade(&handle),
        disconnects.clone(),
    );
    spawn_reader(read_half, handle.clone(), engine, disconnects, shutdown);

    handle
}

/// Writer task: drains the outbound queue in order
///
/// Holds only a weak reference to the handle — the queue sender lives inside
/// the handle, so a strong reference here would keep the channel open forever.
fn spawn_writer(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<String>,
    handle: std::sync::Weak<SessionHandle>,
    disconnects: mpsc::UnboundedSender<String>,
) {
    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if let Err(error) = write_half.write_all(message.as_bytes()).await {
                if let Some(handle) = handle.upgrade() {
                    tracing::debug!(addr = handle.addr(), %error, "session write failed");
                    handle_disconnect(&handle, &disconnects);
                }
                return;
            }
        }
        // Queue closed: every strong handle is gone, flush is complete
    });
}

/// Reader task: the session's command loop
fn spawn_reader(
    read_half: OwnedReadHalf,
    handle: Arc<SessionHandle>,
    engine: EngineHandle,
    disconnects: mpsc::UnboundedSender<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if handle.is_disconnected() {
                            break;
                        }
                        if !process_line(&line, &handle, &engine).await {
                            break;
                        }
                    }
                    // EOF or transport error: either way the session ends
                    Ok(None) | Err(_) => break,
                },
            }
        }

        handle_disconnect(&handle, &disconnects);
    });
}

/// Handle one request line; returns false when the session should close
async fn process_line(line: &str, handle: &Arc<SessionHandle>, engine: &EngineHandle) -> bool {
    let command = match protocol::parse_command(line) {
        Ok(command) => command,
        Err(error) => {
            tracing::warn!(addr = handle.addr(), %error, "rejected input");
            handle.send_message(protocol::invalid_input());
            return true;
        }
    };

    match command {
        Command::Buy { price, quantity } => {
            submit_order(Side::BUY, price, quantity, handle, engine).await
        }
        Command::Sell { price, quantity } => {
            submit_order(Side::SELL, price, quantity, handle, engine).await
        }
        Command::Cancel { order_id } => match engine.cancel(order_id).await {
            Some(true) => {
                tracing::info!(addr = handle.addr(), %order_id, "order cancelled");
                handle.send_message(protocol::cancelled(order_id));
                true
            }
            Some(false) => {
                handle.send_message(protocol::order_not_found(order_id));
                true
            }
            None => false,
        },
        Command::Disconnect => {
            handle.send_message(protocol::disconnecting());
            // Give the acknowledgement time to flush before the socket closes
            tokio::time::sleep(DISCONNECT_FLUSH_DELAY).await;
            false
        }
    }
}

/// Add-then-match round trip through the dispatch task
///
/// The dispatch task broadcasts market trades before replying, so by the
/// time the confirmation is queued here every other session already has its
/// MARKET TRADE lines queued.
async fn submit_order(
    side: Side,
    price: Price,
    quantity: Quantity,
    handle: &Arc<SessionHandle>,
    engine: &EngineHandle,
) -> bool {
    tracing::debug!(addr = handle.addr(), ?side, %price, %quantity, "processing order");

    match engine
        .submit(side, price, quantity, Arc::downgrade(handle))
        .await
    {
        Some((order_id, trades)) => {
            handle.send_message(protocol::confirmed(order_id, &trades));
            true
        }
        // Engine gone: the server is shutting down
        None => false,
    }
}
