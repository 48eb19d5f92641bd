//! # ibserver - serveur InfoBerry
//!
//! Stocke les players et leurs playlists dans SQLite et les expose via HTTP :
//! les écrans s'y enregistrent et y récupèrent leur snapshot, les
//! administrateurs y gèrent les playlists et les plannings.
//!
//! ```no_run
//! use ibserver::{Store, serve};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Store::open(Path::new("data/infoberry.db"))?;
//! serve(store, 5000, async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod store;

pub use api::router;
pub use error::{Error, Result};
pub use store::Store;

use std::future::Future;
use std::net::SocketAddr;
use tracing::info;

/// Sert l'API sur `0.0.0.0:port` jusqu'à la résolution de `shutdown`.
pub async fn serve(
    store: Store,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("InfoBerry server running at http://{}", addr);

    axum::serve(listener, router(store).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("InfoBerry server stopped");
    Ok(())
}
