use anyhow::Context;
use engine_server::server::{self, EngineServer, DEFAULT_PORT};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("Starting matching engine server");

    let server = EngineServer::bind(DEFAULT_PORT)
        .await
        .with_context(|| format!("failed to bind port {DEFAULT_PORT}"))?;

    // SIGINT/SIGTERM and the operator's `shutdown` command share one path
    server::spawn_signal_listener(server.shutdown_requests());
    server::spawn_stdin_listener(server.shutdown_requests());

    server.run().await?;

    Ok(())
}
