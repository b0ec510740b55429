//! End-to-end session tests over real TCP connections
//!
//! Each test binds its own server on an ephemeral port, so order ids start
//! at 1 and books never leak between tests. Messages are read as
//! blank-line-terminated blocks, exactly as a line-based client would.

use std::time::Duration;

use engine_server::EngineServer;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> u16 {
    let server = EngineServer::bind(0).await.expect("bind ephemeral port");
    let port = server.local_addr().expect("local addr").port();
    tokio::spawn(server.run());
    port
}

struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    buffer: String,
}

impl TestClient {
    async fn connect(port: u16) -> Self {
        let stream = timeout(IO_TIMEOUT, TcpStream::connect(("127.0.0.1", port)))
            .await
            .expect("connect timed out")
            .expect("connect failed");
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            buffer: String::new(),
        }
    }

    async fn send_line(&mut self, line: &str) {
        let framed = format!("{line}\n");
        timeout(IO_TIMEOUT, self.writer.write_all(framed.as_bytes()))
            .await
            .expect("write timed out")
            .expect("write failed");
    }

    /// Next blank-line-terminated block, including its terminator
    async fn next_message(&mut self) -> String {
        loop {
            if let Some(pos) = self.buffer.find("\n\n") {
                let message: String = self.buffer.drain(..pos + 2).collect();
                return message;
            }

            let mut line = String::new();
            let n = timeout(IO_TIMEOUT, self.reader.read_line(&mut line))
                .await
                .expect("read timed out")
                .expect("read failed");
            assert!(n > 0, "connection closed while waiting for a message");
            self.buffer.push_str(&line);
        }
    }

    /// Consume the welcome banner (it contains an interior blank line)
    async fn read_welcome(&mut self) {
        loop {
            let message = self.next_message().await;
            if message.contains("====================================\n") && message.ends_with("\n\n")
            {
                let tail = message.trim_end_matches('\n');
                if tail.ends_with("====================================") {
                    return;
                }
            }
        }
    }

    /// True once the server has closed this connection
    async fn closed(&mut self) -> bool {
        let mut line = String::new();
        match timeout(IO_TIMEOUT, self.reader.read_line(&mut line)).await {
            Ok(Ok(0)) => true,
            _ => false,
        }
    }
}

#[tokio::test]
async fn welcome_then_confirmed_order() {
    let port = start_server().await;
    let mut client = TestClient::connect(port).await;
    client.read_welcome().await;

    client.send_line("BUY 100.50 25").await;
    assert_eq!(client.next_message().await, "CONFIRMED OrderID: 1\n\n");

    client.send_line("SELL 101.00 10").await;
    assert_eq!(client.next_message().await, "CONFIRMED OrderID: 2\n\n");
}

#[tokio::test]
async fn invalid_input_leaves_session_usable() {
    let port = start_server().await;
    let mut client = TestClient::connect(port).await;
    client.read_welcome().await;

    for bad in ["HOLD 1 1", "BUY", "BUY abc 5", "BUY 100 0", "BUY -5 10", "CANCEL 0"] {
        client.send_line(bad).await;
        assert_eq!(client.next_message().await, "INVALID INPUT\n\n", "input: {bad}");
    }

    // Still serving after a string of rejects
    client.send_line("BUY 100 5").await;
    assert_eq!(client.next_message().await, "CONFIRMED OrderID: 1\n\n");
}

#[tokio::test]
async fn cancel_hits_then_misses() {
    let port = start_server().await;
    let mut client = TestClient::connect(port).await;
    client.read_welcome().await;

    client.send_line("BUY 99.5 10").await;
    assert_eq!(client.next_message().await, "CONFIRMED OrderID: 1\n\n");

    client.send_line("CANCEL 1").await;
    assert_eq!(client.next_message().await, "CANCELLED OrderID: 1\n\n");

    client.send_line("CANCEL 1").await;
    assert_eq!(client.next_message().await, "ORDER NOT FOUND: 1\n\n");

    client.send_line("CANCEL 42").await;
    assert_eq!(client.next_message().await, "ORDER NOT FOUND: 42\n\n");
}

#[tokio::test]
async fn trade_details_go_to_the_taker() {
    let port = start_server().await;
    let mut client = TestClient::connect(port).await;
    client.read_welcome().await;

    client.send_line("BUY 101 10").await;
    assert_eq!(client.next_message().await, "CONFIRMED OrderID: 1\n\n");

    // Crossing sell executes at its own price and reports both legs
    client.send_line("SELL 100 4").await;
    assert_eq!(client.next_message().await, "CONFIRMED OrderID: 2\n\n");
    assert_eq!(
        client.next_message().await,
        "TRADE BuyID: 1, SellID: 2, Price: 100, Quantity: 4\n\n"
    );
}

#[tokio::test]
async fn market_trades_reach_everyone_but_the_originator() {
    let port = start_server().await;

    let mut alice = TestClient::connect(port).await;
    alice.read_welcome().await;
    let mut bob = TestClient::connect(port).await;
    bob.read_welcome().await;

    alice.send_line("BUY 100 5").await;
    assert_eq!(alice.next_message().await, "CONFIRMED OrderID: 1\n\n");

    bob.send_line("SELL 100 5").await;
    // Bob triggered the match: confirmation first, then the detailed trade
    assert_eq!(bob.next_message().await, "CONFIRMED OrderID: 2\n\n");
    assert_eq!(
        bob.next_message().await,
        "TRADE BuyID: 1, SellID: 2, Price: 100, Quantity: 5\n\n"
    );

    // Alice gets the redacted market line for Bob's trigger
    assert_eq!(
        alice.next_message().await,
        "MARKET TRADE Price: 100, Quantity: 5\n\n"
    );

    // Bob never sees a MARKET TRADE for his own trigger: the next thing on
    // his stream is the response to his next command
    bob.send_line("CANCEL 42").await;
    assert_eq!(bob.next_message().await, "ORDER NOT FOUND: 42\n\n");
}

#[tokio::test]
async fn dc_is_acknowledged_then_closed() {
    let port = start_server().await;
    let mut client = TestClient::connect(port).await;
    client.read_welcome().await;

    client.send_line("DC").await;
    assert_eq!(client.next_message().await, "Disconnecting...\n\n");
    assert!(client.closed().await, "socket should close after the ack");
}

#[tokio::test]
async fn disconnect_does_not_disturb_other_sessions() {
    let port = start_server().await;

    let mut alice = TestClient::connect(port).await;
    alice.read_welcome().await;
    let mut bob = TestClient::connect(port).await;
    bob.read_welcome().await;

    alice.send_line("BUY 100 5").await;
    assert_eq!(alice.next_message().await, "CONFIRMED OrderID: 1\n\n");

    alice.send_line("DC").await;
    assert_eq!(alice.next_message().await, "Disconnecting...\n\n");
    assert!(alice.closed().await);

    // Alice's resting order survives her session; Bob trades against it
    bob.send_line("SELL 100 5").await;
    assert_eq!(bob.next_message().await, "CONFIRMED OrderID: 2\n\n");
    assert_eq!(
        bob.next_message().await,
        "TRADE BuyID: 1, SellID: 2, Price: 100, Quantity: 5\n\n"
    );
}

#[tokio::test]
async fn graceful_shutdown_closes_sessions() {
    let server = EngineServer::bind(0).await.expect("bind ephemeral port");
    let port = server.local_addr().expect("local addr").port();
    let shutdown = server.shutdown_requests();
    let running = tokio::spawn(server.run());

    let mut client = TestClient::connect(port).await;
    client.read_welcome().await;

    shutdown.send("test request").await.expect("request shutdown");

    timeout(IO_TIMEOUT, running)
        .await
        .expect("server did not stop")
        .expect("server task panicked")
        .expect("server returned an error");

    assert!(client.closed().await, "sessions should close on shutdown");
}
