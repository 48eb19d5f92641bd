mod client;
mod logging;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::ClientArgs;
use crate::server::ServerArgs;

/// InfoBerry digital signage: display players and their management server.
#[derive(Parser, Debug)]
#[command(name = "infoberry", version)]
#[command(about = "InfoBerry digital signage player and server")]
struct Cli {
    /// Configuration directory (default: $INFOBERRY_CONFIG, ./.infoberry or ~/.infoberry)
    #[arg(long, global = true)]
    config_dir: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a display player
    Client(ClientArgs),
    /// Run the InfoBerry server
    Server(ServerArgs),
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Ctrl+C received, shutting down");
        token.cancel();
    });
    cancel
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ibconfig::init_config(cli.config_dir.as_deref().unwrap_or(""))?;
    logging::init_logging(cli.log_level.as_deref(), &config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        os = %ibutils::get_os_string(),
        config_dir = %config.directory().display(),
        "InfoBerry starting"
    );

    let cancel = shutdown_on_ctrl_c();
    match cli.command {
        Command::Client(args) => client::run(config, args, cancel).await,
        Command::Server(args) => server::run(config, args, cancel).await,
    }
}
