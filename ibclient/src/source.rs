use async_trait::async_trait;
use ibengine::{FetchError, Registration, SnapshotRecord};

use crate::client::InfoBerryClient;

/// Origine des snapshots d'un player.
///
/// Le poller ne connaît que ce trait, ce qui permet de le tester sans
/// serveur HTTP.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn register(&self, registration: &Registration) -> Result<(), FetchError>;
    async fn fetch_snapshot(&self, serial: &str) -> Result<SnapshotRecord, FetchError>;
    async fn ping(&self, serial: &str) -> Result<(), FetchError>;
}

#[async_trait]
impl SnapshotSource for InfoBerryClient {
    async fn register(&self, registration: &Registration) -> Result<(), FetchError> {
        InfoBerryClient::register(self, registration)
            .await
            .map_err(FetchError::from)
    }

    async fn fetch_snapshot(&self, serial: &str) -> Result<SnapshotRecord, FetchError> {
        self.snapshot(serial).await.map_err(FetchError::from)
    }

    async fn ping(&self, serial: &str) -> Result<(), FetchError> {
        InfoBerryClient::ping(self, serial)
            .await
            .map_err(FetchError::from)
    }
}
