use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use mapshare_relay::{Relay, RelayConfig, log_format};

#[derive(Parser, Debug)]
#[command(
    name = "mapshare-relay",
    about = "Poll Garmin inReach MapShare feeds and forward positions to CalTopo."
)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long = "config", default_value = "mapshare-relay.toml")]
    config: PathBuf,
    /// Run a single polling round and exit
    #[arg(long = "once", default_value_t = false)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = RelayConfig::load(&args.config)?;
    log_format::init_logging(&config.log_file)?;

    info!("Loaded {} tracker(s) from {}", config.trackers.len(), args.config.display());

    let mut relay = Relay::new(config)?;
    if args.once {
        relay.run_round().await
    } else {
        relay.run().await
    }
}
