//! Boucle de rotation d'un player.
//!
//! Le moteur possède seul son [`EngineState`] : les ticks de l'horloge et
//! les snapshots reçus du client sont traités l'un après l'autre sur la même
//! tâche, une réconciliation ne peut donc jamais s'intercaler au milieu d'un
//! tick.
//!
//! Une seconde horloge, optionnelle, recharge périodiquement la page
//! affichée ; elle repart de zéro à chaque changement de média.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::RotationClock;
use crate::display::DisplayDriver;
use crate::model::MediaItem;
use crate::reconciler::{FetchOutcome, Reconciliation, reconcile};
use crate::state::EngineState;
use crate::time::TimeSource;

/// Cadence de réévaluation du planning, indépendante de la rotation.
pub const SCHEDULE_CHECK_PERIOD: Duration = Duration::from_secs(5);

// Ce que le moteur croit être à l'écran
#[derive(Debug, Clone, PartialEq)]
enum Screen {
    Unknown,
    Blanked,
    Showing(MediaItem),
}

pub struct Engine<D, T> {
    state: EngineState,
    clock: RotationClock,
    refresh: RotationClock,
    driver: D,
    time: T,
    screen: Screen,
    retry: bool,
}

impl<D: DisplayDriver, T: TimeSource> Engine<D, T> {
    /// Crée un moteur inactif, sans snapshot.
    pub fn new(driver: D, time: T) -> Self {
        Self {
            state: EngineState::new(),
            clock: RotationClock::new(),
            refresh: RotationClock::new(),
            driver,
            time,
            screen: Screen::Unknown,
            retry: false,
        }
    }

    /// Active le rechargement périodique de la page affichée.
    pub fn with_refresh_interval(mut self, period: Option<Duration>) -> Self {
        self.refresh.set_period(period, Instant::now());
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn clock(&self) -> &RotationClock {
        &self.clock
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Applique un résultat de poll.
    ///
    /// Un changement d'intervalle réarme l'horloge, un changement de planning
    /// prend effet immédiatement et l'écran n'est sollicité que si ce qui
    /// doit être affiché a changé.
    pub fn apply(&mut self, outcome: FetchOutcome) -> Reconciliation {
        let reconciliation = reconcile(&mut self.state, outcome.result, outcome.fetched_at);
        if !reconciliation.applied {
            return reconciliation;
        }

        if reconciliation.interval_changed
            && self.clock.set_period(self.state.interval, Instant::now())
        {
            debug!(deadline = ?self.clock.deadline(), "Rotation clock re-armed");
        }

        self.refresh_activity();
        self.render(false);
        reconciliation
    }

    /// Tick de rotation : avance puis affiche si actif, sinon éteint.
    ///
    /// Après un échec d'affichage, le tick suivant retente le même élément
    /// au lieu d'avancer.
    pub fn tick(&mut self) {
        self.refresh_activity();
        if self.state.active && !self.retry {
            self.state.cursor.advance();
        }
        self.render(self.state.active);
    }

    /// Réévalue le planning sans faire tourner la playlist.
    pub fn check_schedule(&mut self) {
        self.refresh_activity();
        self.render(false);
    }

    /// Recharge l'élément affiché sans faire tourner la playlist.
    ///
    /// Sans effet si l'écran est éteint ou dans un état inconnu.
    pub fn reload_current(&mut self) {
        let Screen::Showing(item) = &self.screen else {
            return;
        };
        let item = item.clone();
        match self.driver.reload(&item) {
            Ok(()) => debug!(media_id = item.id, url = %item.url, "Media reloaded"),
            Err(err) => {
                warn!(media_id = item.id, url = %item.url, error = %err, "Reload failed, retrying on next tick");
                self.screen = Screen::Unknown;
                self.retry = true;
            }
        }
    }

    /// Éteint l'écran à l'arrêt du moteur.
    pub fn shutdown(&mut self) {
        if let Err(err) = self.driver.blank() {
            warn!(error = %err, "Failed to blank display on shutdown");
        }
        self.screen = Screen::Blanked;
    }

    fn refresh_activity(&mut self) -> bool {
        let active = !self.state.is_unknown() && self.state.schedule.is_active_at(self.time.now());
        if active == self.state.active {
            return false;
        }
        self.state.active = active;
        if active {
            info!("Entering schedule window, display active");
        } else {
            info!("Leaving schedule window, display inactive");
        }
        true
    }

    fn render(&mut self, force_show: bool) {
        if self.state.is_unknown() {
            return;
        }

        let target = if self.state.active {
            self.state.current().cloned()
        } else {
            None
        };

        match target {
            Some(item) => {
                if !force_show && matches!(&self.screen, Screen::Showing(shown) if *shown == item) {
                    return;
                }
                let changed = !matches!(&self.screen, Screen::Showing(shown) if *shown == item);
                match self.driver.show(&item) {
                    Ok(()) => {
                        debug!(media_id = item.id, url = %item.url, "Showing media");
                        if changed {
                            self.refresh.restart(Instant::now());
                        }
                        self.screen = Screen::Showing(item);
                        self.retry = false;
                    }
                    Err(err) => {
                        warn!(media_id = item.id, url = %item.url, error = %err, "Display failed, retrying on next tick");
                        self.screen = Screen::Unknown;
                        self.retry = true;
                    }
                }
            }
            None => {
                if self.screen == Screen::Blanked {
                    return;
                }
                match self.driver.blank() {
                    Ok(()) => {
                        debug!("Display blanked");
                        self.screen = Screen::Blanked;
                        self.retry = false;
                    }
                    Err(err) => {
                        warn!(error = %err, "Failed to blank display");
                        self.screen = Screen::Unknown;
                    }
                }
            }
        }
    }

    /// Fait tourner le moteur jusqu'à l'annulation de `cancel`.
    ///
    /// Les snapshots arrivent par `outcomes` ; si le canal se ferme, le
    /// moteur continue sur le dernier état connu. L'écran est éteint avant
    /// de rendre l'état final.
    pub async fn run(
        mut self,
        mut outcomes: mpsc::Receiver<FetchOutcome>,
        cancel: CancellationToken,
    ) -> EngineState {
        let mut schedule_check = time::interval(SCHEDULE_CHECK_PERIOD);
        schedule_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Le premier tick d'un interval est immédiat
        schedule_check.tick().await;

        let mut polling = true;
        info!("Engine started");

        loop {
            let deadline = self.clock.deadline();
            let refresh_deadline = self.refresh.deadline();
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                outcome = outcomes.recv(), if polling => match outcome {
                    Some(outcome) => {
                        self.apply(outcome);
                    }
                    None => {
                        warn!("Snapshot channel closed, rotating on last known state");
                        polling = false;
                    }
                },
                _ = wait_until(deadline) => {
                    if self.clock.fire(Instant::now()) {
                        self.tick();
                    }
                }
                _ = wait_until(refresh_deadline) => {
                    if self.refresh.fire(Instant::now()) {
                        self.reload_current();
                    }
                }
                _ = schedule_check.tick() => self.check_schedule(),
            }
        }

        info!("Engine stopping");
        self.shutdown();
        self.state
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayCall, RecordingDisplay};
    use crate::error::FetchError;
    use crate::record::{MediaRecord, PlayerRecord, SnapshotRecord};
    use crate::time::ManualTime;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn record(on: &str, off: &str, interval: i64, ids: &[i64]) -> SnapshotRecord {
        SnapshotRecord {
            player: PlayerRecord {
                id: 1,
                name: "hall".into(),
                description: None,
                serial: "abc".into(),
                last_ping: None,
                on_time: Some(on.into()),
                off_time: Some(off.into()),
                switch_tab_interval: Some(interval),
            },
            media: ids
                .iter()
                .map(|id| MediaRecord {
                    id: *id,
                    player_id: 1,
                    url: format!("https://example.org/{}", id),
                })
                .collect(),
        }
    }

    fn show(id: i64) -> DisplayCall {
        DisplayCall::Show(MediaItem::new(id, format!("https://example.org/{}", id)))
    }

    fn engine_at(now: NaiveTime) -> (Engine<RecordingDisplay, ManualTime>, RecordingDisplay, ManualTime) {
        let display = RecordingDisplay::new();
        let time = ManualTime::new(now);
        (Engine::new(display.clone(), time.clone()), display, time)
    }

    #[test]
    fn test_no_display_call_before_first_snapshot() {
        let (mut engine, display, _) = engine_at(t(12, 0));
        engine.apply(FetchOutcome::now(Err(FetchError::Transient("down".into()))));
        engine.tick();
        engine.check_schedule();

        assert!(!engine.state().active);
        assert!(display.calls().is_empty());
    }

    #[test]
    fn test_first_snapshot_shows_first_item() {
        let (mut engine, display, _) = engine_at(t(12, 0));
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[1, 2]))));

        assert!(engine.state().active);
        assert_eq!(display.calls(), vec![show(1)]);
        assert!(engine.clock().deadline().is_some());
    }

    #[test]
    fn test_outside_window_blanks() {
        let (mut engine, display, _) = engine_at(t(20, 0));
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[1, 2]))));

        assert!(!engine.state().active);
        assert_eq!(display.calls(), vec![DisplayCall::Blank]);

        // Un tick hors fenêtre n'avance pas et ne rééteint pas
        engine.tick();
        assert_eq!(engine.state().cursor.index(), 0);
        assert_eq!(display.calls(), vec![DisplayCall::Blank]);
    }

    #[test]
    fn test_schedule_transitions() {
        let (mut engine, display, time) = engine_at(t(16, 59));
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[1, 2]))));

        time.set(t(17, 0));
        engine.check_schedule();
        time.set(t(9, 0));
        engine.check_schedule();

        assert_eq!(display.calls(), vec![show(1), DisplayCall::Blank, show(1)]);
    }

    #[test]
    fn test_schedule_change_takes_effect_immediately() {
        let (mut engine, display, _) = engine_at(t(23, 30));
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[1]))));
        engine.apply(FetchOutcome::now(Ok(record("22:00", "06:00", 10, &[1]))));

        assert!(engine.state().active);
        assert_eq!(display.calls(), vec![DisplayCall::Blank, show(1)]);
    }

    #[test]
    fn test_empty_playlist_blanks_while_active() {
        let (mut engine, display, _) = engine_at(t(12, 0));
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[1]))));
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[]))));
        engine.tick();

        assert_eq!(display.calls(), vec![show(1), DisplayCall::Blank]);
    }

    #[test]
    fn test_single_item_is_reshown_on_tick() {
        let (mut engine, display, _) = engine_at(t(12, 0));
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[7]))));
        engine.tick();

        assert_eq!(display.calls(), vec![show(7), show(7)]);
    }

    #[test]
    fn test_render_failure_retries_same_item() {
        let (mut engine, display, _) = engine_at(t(12, 0));
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[1, 2, 3]))));

        display.fail_next_shows(1);
        engine.tick();
        assert_eq!(engine.state().current().map(|m| m.id), Some(2));

        engine.tick();
        assert_eq!(engine.state().current().map(|m| m.id), Some(2));
        engine.tick();
        assert_eq!(engine.state().current().map(|m| m.id), Some(3));

        assert_eq!(display.calls(), vec![show(1), show(2), show(2), show(3)]);
    }

    #[test]
    fn test_reconcile_keeping_current_item_does_not_redraw() {
        let (mut engine, display, _) = engine_at(t(12, 0));
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[1, 2, 3]))));
        engine.tick();
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[2, 3, 4]))));

        assert_eq!(display.calls(), vec![show(1), show(2)]);
        engine.tick();
        assert_eq!(display.calls(), vec![show(1), show(2), show(3)]);
    }

    #[test]
    fn test_reload_current_only_while_showing() {
        let (mut engine, display, time) = engine_at(t(12, 0));
        engine.reload_current();
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[1, 2]))));
        engine.reload_current();

        time.set(t(18, 0));
        engine.check_schedule();
        engine.reload_current();

        assert_eq!(
            display.calls(),
            vec![
                show(1),
                DisplayCall::Reload(MediaItem::new(1, "https://example.org/1")),
                DisplayCall::Blank,
            ]
        );
    }

    #[test]
    fn test_failed_reload_retries_same_item() {
        let (mut engine, display, _) = engine_at(t(12, 0));
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[1, 2]))));

        display.fail_next_shows(1);
        engine.reload_current();
        engine.tick();

        assert_eq!(engine.state().current().map(|m| m.id), Some(1));
        assert_eq!(
            display.calls(),
            vec![
                show(1),
                DisplayCall::Reload(MediaItem::new(1, "https://example.org/1")),
                show(1),
            ]
        );
    }

    #[test]
    fn test_oversized_interval_keeps_previous_state() {
        let (mut engine, display, _) = engine_at(t(12, 0));
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[1, 2]))));

        let reconciliation =
            engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", i64::MAX, &[3]))));

        assert!(!reconciliation.applied);
        assert_eq!(engine.state().interval, Some(Duration::from_secs(10)));
        assert_eq!(engine.state().current().map(|m| m.id), Some(1));
        assert_eq!(display.calls(), vec![show(1)]);
    }

    #[test]
    fn test_failed_blank_is_retried() {
        let (mut engine, display, _) = engine_at(t(20, 0));
        display.fail_next_blanks(1);
        engine.apply(FetchOutcome::now(Ok(record("09:00", "17:00", 10, &[1]))));
        engine.check_schedule();
        engine.check_schedule();

        assert_eq!(display.calls(), vec![DisplayCall::Blank, DisplayCall::Blank]);
    }
}
