//! Tâche de polling : récupère périodiquement le snapshot du player et le
//! transmet à la boucle du moteur.

use std::sync::Arc;
use std::time::Duration;

use ibengine::{FetchError, FetchOutcome, Registration};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::source::SnapshotSource;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_REGISTRATION_RETRY: Duration = Duration::from_secs(30);

pub struct Poller<S: ?Sized> {
    source: Arc<S>,
    registration: Registration,
    poll_interval: Duration,
    retry_interval: Duration,
}

impl<S: SnapshotSource + ?Sized> Poller<S> {
    pub fn new(source: Arc<S>, registration: Registration) -> Self {
        Self {
            source,
            registration,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_interval: DEFAULT_REGISTRATION_RETRY,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    fn serial(&self) -> &str {
        &self.registration.serial
    }

    /// Enregistre le player, en réessayant jusqu'au succès.
    ///
    /// Retourne `false` si `cancel` a été déclenché avant.
    pub async fn register(&self, cancel: &CancellationToken) -> bool {
        loop {
            match self.source.register(&self.registration).await {
                Ok(()) => {
                    info!(serial = %self.serial(), "Player registered");
                    return true;
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        retry_in = ?self.retry_interval,
                        "Registration failed"
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = time::sleep(self.retry_interval) => {}
            }
        }
    }

    /// Un cycle : snapshot, réenregistrement si le serveur a oublié le
    /// player, puis ping.
    pub async fn poll_once(&self) -> FetchOutcome {
        let result = self.source.fetch_snapshot(self.serial()).await;

        if let Err(FetchError::NotRegistered(_)) = &result {
            warn!(serial = %self.serial(), "Server does not know this player, registering again");
            if let Err(err) = self.source.register(&self.registration).await {
                warn!(error = %err, "Registration failed");
            }
        }

        if let Err(err) = self.source.ping(self.serial()).await {
            debug!(error = %err, "Ping failed");
        }

        FetchOutcome::now(result)
    }

    /// Poll toutes les `poll_interval` jusqu'à l'annulation ou la fermeture
    /// du canal. Le premier poll est immédiat.
    pub async fn run(self, tx: mpsc::Sender<FetchOutcome>, cancel: CancellationToken) {
        let mut ticker = time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.poll_interval, "Poller started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.poll_once() => outcome,
            };

            if tx.send(outcome).await.is_err() {
                debug!("Engine loop gone");
                break;
            }
        }

        info!("Poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ibengine::{PlayerRecord, SnapshotRecord};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        responses: Mutex<VecDeque<Result<SnapshotRecord, FetchError>>>,
        failing_registrations: Mutex<usize>,
        registrations: Mutex<usize>,
        pings: Mutex<usize>,
    }

    impl FakeSource {
        fn count(counter: &Mutex<usize>) -> usize {
            *counter.lock().unwrap()
        }
    }

    #[async_trait]
    impl SnapshotSource for FakeSource {
        async fn register(&self, _registration: &Registration) -> Result<(), FetchError> {
            *self.registrations.lock().unwrap() += 1;
            let mut failing = self.failing_registrations.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(FetchError::Transient("connection refused".into()));
            }
            Ok(())
        }

        async fn fetch_snapshot(&self, _serial: &str) -> Result<SnapshotRecord, FetchError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Transient("no more responses".into())))
        }

        async fn ping(&self, _serial: &str) -> Result<(), FetchError> {
            *self.pings.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn registration() -> Registration {
        Registration {
            name: "lobby".into(),
            description: "Lobby screen".into(),
            serial: "abc".into(),
        }
    }

    fn record() -> SnapshotRecord {
        SnapshotRecord {
            player: PlayerRecord {
                id: 1,
                name: "lobby".into(),
                description: None,
                serial: "abc".into(),
                last_ping: None,
                on_time: None,
                off_time: None,
                switch_tab_interval: Some(10),
            },
            media: vec![],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_retries_until_success() {
        let source = Arc::new(FakeSource::default());
        *source.failing_registrations.lock().unwrap() = 2;
        let poller = Poller::new(source.clone(), registration())
            .retry_interval(Duration::from_secs(30));

        let start = time::Instant::now();
        assert!(poller.register(&CancellationToken::new()).await);
        assert_eq!(FakeSource::count(&source.registrations), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_stops_on_cancel() {
        let source = Arc::new(FakeSource::default());
        *source.failing_registrations.lock().unwrap() = usize::MAX;
        let poller = Poller::new(source, registration());

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!poller.register(&cancel).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_registered_triggers_registration() {
        let source = Arc::new(FakeSource::default());
        source
            .responses
            .lock()
            .unwrap()
            .push_back(Err(FetchError::NotRegistered("abc".into())));
        let poller = Poller::new(source.clone(), registration());

        let outcome = poller.poll_once().await;
        assert_eq!(outcome.result, Err(FetchError::NotRegistered("abc".into())));
        assert_eq!(FakeSource::count(&source.registrations), 1);
        assert_eq!(FakeSource::count(&source.pings), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_forwards_every_outcome() {
        let source = Arc::new(FakeSource::default());
        {
            let mut responses = source.responses.lock().unwrap();
            responses.push_back(Ok(record()));
            responses.push_back(Err(FetchError::Transient("timeout".into())));
            responses.push_back(Ok(record()));
        }
        let poller = Poller::new(source.clone(), registration())
            .poll_interval(Duration::from_secs(10));

        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poller.run(tx, cancel.clone()));

        assert!(rx.recv().await.unwrap().result.is_ok());
        assert!(rx.recv().await.unwrap().result.is_err());
        assert!(rx.recv().await.unwrap().result.is_ok());

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(FakeSource::count(&source.pings), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_engine_is_gone() {
        let source = Arc::new(FakeSource::default());
        let poller = Poller::new(source, registration());

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        // Se termine sans annulation
        poller.run(tx, CancellationToken::new()).await;
    }
}
