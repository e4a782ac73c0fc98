//! cdp-bridge - HTTP control API for a browser's remote debugging endpoint.
//!
//! Start the browser with `--remote-debugging-port=9222`, then:
//!
//! ```text
//! cdp-bridge --port 9222 --listen-port 9878
//! curl -XPOST localhost:9878 -d '{"action":"goto","url":"https://example.com"}'
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use cdp_bridge::{Client, Result, control};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// HTTP control API for a browser's remote debugging endpoint.
#[derive(Debug, Parser)]
#[command(name = "cdp-bridge")]
#[command(version)]
struct Args {
    /// Remote debugging host
    #[arg(long, env = "CDP_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Remote debugging port
    #[arg(long, env = "CDP_PORT", default_value_t = 9222)]
    port: u16,

    /// Full endpoint URL; overrides --host and --port
    #[arg(long, env = "CDP_ENDPOINT")]
    endpoint: Option<String>,

    /// Control API bind address
    #[arg(long, env = "CDP_BRIDGE_HOST", default_value = "127.0.0.1")]
    listen_host: String,

    /// Control API port
    #[arg(long, env = "CDP_BRIDGE_PORT", default_value_t = 9878)]
    listen_port: u16,

    /// Command timeout in milliseconds
    #[arg(long, env = "CDP_COMMAND_TIMEOUT_MS", default_value_t = 30_000)]
    command_timeout_ms: u64,

    /// Automatic reconnect attempts before giving up
    #[arg(long, env = "CDP_MAX_RECONNECT_ATTEMPTS", default_value_t = 5)]
    max_reconnect_attempts: u32,

    /// Base reconnect delay in milliseconds (attempt n waits n times this)
    #[arg(long, env = "CDP_RECONNECT_BACKOFF_MS", default_value_t = 2_000)]
    reconnect_backoff_ms: u64,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

fn build_client(args: &Args) -> Result<Client> {
    let mut builder = Client::builder()
        .host(args.host.clone())
        .port(args.port)
        .command_timeout(Duration::from_millis(args.command_timeout_ms))
        .max_reconnect_attempts(args.max_reconnect_attempts)
        .reconnect_backoff(Duration::from_millis(args.reconnect_backoff_ms));

    if let Some(endpoint) = &args.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }

    builder.build()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let client = build_client(&args)?;
    info!(endpoint = %client.endpoint(), "Remote debugging endpoint");

    match client.connect(None).await {
        Ok(target) => info!(id = %target.id, title = %target.title, "Attached at startup"),
        Err(e) => warn!(
            error = %e,
            "Endpoint not ready; will connect on first command"
        ),
    }

    let addr: SocketAddr = format!("{}:{}", args.listen_host, args.listen_port)
        .parse()
        .map_err(|e| cdp_bridge::Error::config(format!("Invalid listen address: {e}")))?;
    let listener = TcpListener::bind(addr).await?;

    control::serve(listener, client.clone(), shutdown_signal()).await?;

    client.close();
    info!("Stopped");
    Ok(())
}
