//! Serve a simulated binary API socket until interrupted
//!
//! Useful for running the `vapi-pt` demo without a forwarding plane:
//!
//! ```text
//! vapi-sim --sock /tmp/api.sock &
//! vapi-pt --sock /tmp/api.sock
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vapi_sim::{SimConfig, SimServer};

#[derive(Parser, Debug)]
#[command(name = "vapi-sim")]
#[command(about = "Simulated VPP binary API socket", long_about = None)]
#[command(version)]
struct Cli {
    /// Path of the socket to serve on
    #[arg(long = "sock", default_value = "/tmp/vapi-sim.sock")]
    socket: PathBuf,

    /// Leave a message out of the message table (repeatable)
    #[arg(long = "hide", value_name = "MESSAGE")]
    hidden: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = cli
        .hidden
        .into_iter()
        .fold(SimConfig::default(), |config, name| config.hide_message(name));

    let server = SimServer::spawn(&cli.socket, config)
        .await
        .with_context(|| format!("Unable to serve on {}", cli.socket.display()))?;

    tokio::signal::ctrl_c()
        .await
        .context("Unable to listen for Ctrl-C")?;

    let stats = server.shutdown().await;
    info!(
        connections = stats.connections_accepted,
        requests = stats.requests.len(),
        "Shutting down"
    );
    Ok(())
}
