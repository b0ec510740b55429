//! Engine server
//!
//! Owns the listening socket, the dispatch task, the market publisher, and
//! the registry of live sessions. One loop handles accepts, session
//! disconnect notifications, and shutdown requests; sessions observe
//! shutdown through a watch channel.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};

use crate::dispatch::{self, EngineHandle};
use crate::publisher::MarketPublisher;
use crate::session::{self, SessionHandle};

/// Default listening port
pub const DEFAULT_PORT: u16 = 12345;

/// The multi-client matching engine server
pub struct EngineServer {
    listener: TcpListener,
    publisher: Arc<MarketPublisher>,
    engine: EngineHandle,
    sessions: DashMap<String, Arc<SessionHandle>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    request_tx: mpsc::Sender<&'static str>,
    request_rx: mpsc::Receiver<&'static str>,
    disconnect_tx: mpsc::UnboundedSender<String>,
    disconnect_rx: mpsc::UnboundedReceiver<String>,
}

impl EngineServer {
    /// Bind the listening socket and start the dispatch task
    pub async fn bind(port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        let publisher = Arc::new(MarketPublisher::new());
        let engine = dispatch::spawn(publisher.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (request_tx, request_rx) = mpsc::channel(1);
        let (disconnect_tx, disconnect_rx) = mpsc::unbounded_channel();

        Ok(Self {
            listener,
            publisher,
            engine,
            sessions: DashMap::new(),
            shutdown_tx,
            shutdown_rx,
            request_tx,
            request_rx,
            disconnect_tx,
            disconnect_rx,
        })
    }

    /// The bound address (useful when binding port 0)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A sender that triggers graceful shutdown with a reason string
    pub fn shutdown_requests(&self) -> mpsc::Sender<&'static str> {
        self.request_tx.clone()
    }

    /// Run until a shutdown request arrives
    ///
    /// Accept errors are logged and the loop continues; only an explicit
    /// request (signal, operator command, or a test hook) ends the server.
    pub async fn run(mut self) -> io::Result<()> {
        let port = self.local_addr()?.port();
        print_banner(port);

        loop {
            tokio::select! {
                request = self.request_rx.recv() => {
                    let reason = request.unwrap_or("request channel closed");
                    tracing::info!(reason, "shutdown requested");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => self.start_session(socket, peer),
                    Err(error) => {
                        tracing::error!(%error, "Accept error");
                    }
                },
                Some(addr) = self.disconnect_rx.recv() => {
                    self.remove_session(&addr);
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Construct and register a session for an accepted connection
    fn start_session(&self, socket: tokio::net::TcpStream, peer: SocketAddr) {
        let addr = peer.to_string();
        let handle = session::spawn(
            socket,
            addr.clone(),
            self.engine.clone(),
            self.publisher.clone(),
            self.disconnect_tx.clone(),
            self.shutdown_rx.clone(),
        );
        self.sessions.insert(addr, handle);
    }

    /// Drop a session from the registry; safe to call more than once
    fn remove_session(&self, addr: &str) {
        self.sessions.remove(addr);
        tracing::info!(total_active_clients = self.sessions.len(), "Total active clients");
    }

    /// Flag shutdown, release every session, and close the listener
    fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        self.sessions.clear();
        drop(self.listener);
        tracing::info!("All clients disconnected. Server shutdown complete.");
    }
}

/// Startup banner; exact text is part of the operator interface
fn print_banner(port: u16) {
    println!("=== HFT Matching Engine Server ===");
    println!("Server started on port {port}");
    println!("Press Ctrl+C or type 'shutdown' to gracefully stop the server");
    println!("====================================");
}

/// Resolve process signals into shutdown requests
pub fn spawn_signal_listener(requests: mpsc::Sender<&'static str>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(stream) => stream,
                Err(error) => {
                    tracing::error!(%error, "failed to install SIGTERM handler");
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    let _ = requests.send("SIGINT").await;
                }
                _ = sigterm.recv() => {
                    let _ = requests.send("SIGTERM").await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = requests.send("SIGINT").await;
            }
        }
    });
}

/// Operator commands on standard input
///
/// Only the literal `shutdown` acts; anything else non-empty is logged.
/// Wired up by the entry point rather than `run`, because reading stdin
/// parks a blocking-pool thread for the life of the process.
pub fn spawn_stdin_listener(requests: mpsc::Sender<&'static str>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if input == "shutdown" {
                let _ = requests.send("operator command").await;
                return;
            }
            tracing::warn!(input, "unknown operator command");
        }
    });
}
