//! newsflow-gateway-relay — accepts `Push(message)` requests and forwards
//! them to the external HTTP API endpoint.

use anyhow::Context;
use clap::Parser;
use tracing::info;

use newsflow_core::{logging, signals};
use newsflow_relay::{serve, Forwarder};

/// Gateway relay — one-hop bridge from the analyser to the external API.
#[derive(Parser, Debug)]
#[command(name = "newsflow-gateway-relay", version, about)]
struct Cli {
    /// Upstream endpoint every pushed message is forwarded to.
    #[arg(long, env = "HTTP_API_ENDPOINT")]
    http_api_endpoint: String,

    #[arg(long, env = "RELAY_PORT", default_value_t = 50052)]
    relay_port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init("gateway-relay");

    info!(endpoint = %cli.http_api_endpoint, "relay target configured");
    serve(Forwarder::new(cli.http_api_endpoint), cli.relay_port, async {
        signals::wait_for_shutdown_signal().await;
        info!("shutdown signal received");
    })
    .await
    .context("relay server failed")?;

    info!("shutdown complete");
    Ok(())
}
