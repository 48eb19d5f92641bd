//! Mode player : enregistrement, polling et boucle d'affichage

use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::Args;
use ibclient::{InfoBerryClient, Poller};
use ibconfig::Config;
use ibdisplay::{KioskCommands, KioskDisplay, LogDisplay};
use ibengine::{DisplayDriver, Engine, LocalTime, Registration};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

// Quelques snapshots d'avance suffisent : le moteur consomme plus vite
const SNAPSHOT_QUEUE: usize = 4;

#[derive(Args, Debug)]
pub struct ClientArgs {
    /// InfoBerry server base URL (overrides client.server_url)
    #[arg(long)]
    pub server_url: Option<String>,

    /// Log display calls instead of driving the browser and the screen
    #[arg(long)]
    pub dry_run: bool,
}

/// Serial du player : forcé en configuration, sinon celui du Raspberry Pi,
/// sinon un identifiant généré et mémorisé.
fn resolve_serial(config: &Config) -> Result<String> {
    if let Some(serial) = config.get_player_serial() {
        info!(serial = %serial, "Using configured serial");
        return Ok(serial);
    }
    if let Some(serial) = ibutils::device_serial() {
        info!(serial = %serial, "Using hardware serial");
        return Ok(serial);
    }
    config.get_or_create_player_serial()
}

fn display_driver(config: &Config, dry_run: bool) -> Box<dyn DisplayDriver> {
    if dry_run {
        info!("Dry run: display calls are only logged");
        Box::new(LogDisplay)
    } else {
        Box::new(KioskDisplay::new(KioskCommands::from_config(config)))
    }
}

pub async fn run(config: Arc<Config>, args: ClientArgs, cancel: CancellationToken) -> Result<()> {
    let serial = resolve_serial(&config)?;
    let server_url = args.server_url.unwrap_or_else(|| config.get_server_url());

    let client = InfoBerryClient::builder()
        .server_url(server_url.clone())
        .timeout(config.get_request_timeout()?)
        .build()?;

    let registration = Registration {
        name: config.get_player_name(),
        description: config.get_player_description(),
        serial,
    };

    let poller = Poller::new(Arc::new(client), registration)
        .poll_interval(config.get_poll_interval()?)
        .retry_interval(config.get_registration_retry_interval()?);

    info!(server = %server_url, "Registering with InfoBerry server");
    if !poller.register(&cancel).await {
        info!("Stopped before registration completed");
        return Ok(());
    }

    let (tx, rx) = mpsc::channel(SNAPSHOT_QUEUE);
    let refresh = config.get_refresh_interval();
    if let Some(period) = refresh {
        info!(period = ?period, "Periodic page reload enabled");
    }
    let engine = Engine::new(display_driver(&config, args.dry_run), LocalTime)
        .with_refresh_interval(refresh);

    let tracker = TaskTracker::new();
    tracker.spawn(poller.run(tx, cancel.clone()));
    let engine = tracker.spawn(engine.run(rx, cancel.clone()));
    tracker.close();

    let outcome = engine.await;
    // Le poller s'arrête aussi si le moteur a disparu
    cancel.cancel();
    tracker.wait().await;

    match outcome {
        Ok(_) => {
            info!("Player stopped");
            Ok(())
        }
        Err(e) => {
            error!("Engine task failed: {}", e);
            Err(anyhow!("engine task failed: {}", e))
        }
    }
}
