//! Concierge REST Server
//!
//! HTTP API for document upload, question answering and query history.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use concierge::config::Config;
use concierge::server::startup::start_server;
use concierge::telemetry;

#[derive(Parser)]
#[command(name = "concierge_server")]
#[command(about = "Concierge REST API Server")]
#[command(version)]
struct Args {
  /// Server bind address (overrides the config file)
  #[arg(long, env = "CONCIERGE_BIND")]
  bind: Option<SocketAddr>,

  /// Path to a YAML config file
  #[arg(short, long, env = "CONCIERGE_CONFIG")]
  config: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  telemetry::init(args.verbose);

  let mut config = Config::load(args.config.as_deref())?;
  if let Some(bind) = args.bind {
    config.server.bind = bind;
  }

  info!(version = env!("CARGO_PKG_VERSION"), bind = %config.server.bind, "starting Concierge REST server");
  start_server(config).await
}
