//! Skirmish node binary
//!
//! Serves the administrative routes of one worker node. Any node can be told
//! to start a cluster-wide run; it splits the players across every node
//! listed in `cluster.load_test_uris`, itself included.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use skirmish_config::{ConfigLoader, SkirmishConfig};
use skirmish_logging::{
    init_logging, init_simple_tracing, install_panic_logger, log_effective_config,
};
use skirmish_server::Server;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (YAML, or JSON with a .json extension)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Node port, also used to reach the other worker nodes
    #[arg(short, long)]
    port: Option<u16>,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", SkirmishConfig::generate_sample());
        return Ok(());
    }

    let mut config = match ConfigLoader::new().load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            init_simple_tracing("info")?;
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e).context("Failed to load configuration");
        }
    };
    apply_cli_overrides(&mut config, &cli);

    init_logging(&config.logging)?;
    install_panic_logger();
    log_effective_config(&config);

    let server = Server::new(config)?;
    server.start().await
}

/// Apply CLI argument overrides to configuration
fn apply_cli_overrides(config: &mut SkirmishConfig, cli: &Cli) {
    if let Some(bind) = &cli.bind {
        config.server.bind_address = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
}
