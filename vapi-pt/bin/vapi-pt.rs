//! Walk an SRv6 path tracing interface through its lifecycle on a running
//! forwarding plane

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing::error;
use vapi_pt::{PtConfig, Report, logging, run_demo};

#[derive(Parser, Debug)]
#[command(name = "vapi-pt")]
#[command(about = "Manage path tracing interfaces over the VPP binary API", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to VPP binary API socket file
    #[arg(long = "sock")]
    socket: Option<PathBuf>,

    /// RON configuration file (also read from `VAPI_CONFIG`)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let config = match PtConfig::discover(cli.config.as_deref()) {
        Ok(config) => config.with_socket(cli.socket),
        Err(e) => {
            error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    println!("Starting simple client example");
    println!();

    let mut report = Report::new(std::io::stdout());
    match run_demo(&config, &mut report).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}
