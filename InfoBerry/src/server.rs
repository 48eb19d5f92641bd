//! Mode serveur : base SQLite et API HTTP

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use ibconfig::Config;
use ibserver::Store;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct ServerArgs {
    /// HTTP port (overrides host.http_port)
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn run(config: Arc<Config>, args: ServerArgs, cancel: CancellationToken) -> Result<()> {
    let port = args.port.unwrap_or_else(|| config.get_http_port());
    let store = Store::open(&config.get_database_path()?)?;

    ibserver::serve(store, port, async move { cancel.cancelled().await }).await
}
