//! Fusion d'un snapshot fraîchement récupéré dans l'état du moteur.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cursor::PlaylistDiff;
use crate::error::FetchError;
use crate::model::Snapshot;
use crate::record::SnapshotRecord;
use crate::state::EngineState;

/// Résultat d'un poll transmis par le client au moteur.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub fetched_at: DateTime<Utc>,
    pub result: Result<SnapshotRecord, FetchError>,
}

impl FetchOutcome {
    pub fn now(result: Result<SnapshotRecord, FetchError>) -> Self {
        Self {
            fetched_at: Utc::now(),
            result,
        }
    }
}

/// Ce qui a changé lors d'une réconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub applied: bool,
    pub first_snapshot: bool,
    pub player_changed: bool,
    pub schedule_changed: bool,
    pub interval_changed: bool,
    pub playlist: Option<PlaylistDiff>,
}

impl Reconciliation {
    fn rejected() -> Self {
        Self::default()
    }

    pub fn changed(&self) -> bool {
        self.player_changed
            || self.schedule_changed
            || self.interval_changed
            || self.playlist.is_some()
    }
}

/// Applique un résultat de poll à `state`, champ par champ.
///
/// Un échec (réseau, player inconnu, snapshot invalide) laisse l'état
/// strictement inchangé. L'activité n'est pas recalculée ici : c'est au
/// moteur de le faire avec son horloge murale.
pub fn reconcile(
    state: &mut EngineState,
    result: Result<SnapshotRecord, FetchError>,
    fetched_at: DateTime<Utc>,
) -> Reconciliation {
    let record = match result {
        Ok(record) => record,
        Err(err) => {
            warn!(error = %err, known = !state.is_unknown(), "Keeping last known state");
            return Reconciliation::rejected();
        }
    };

    let snapshot = match Snapshot::try_from(record) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(error = %err, "Rejecting malformed snapshot");
            return Reconciliation::rejected();
        }
    };

    let mut outcome = Reconciliation {
        applied: true,
        first_snapshot: state.is_unknown(),
        ..Default::default()
    };

    let Snapshot {
        player,
        schedule,
        interval,
        items,
    } = snapshot;

    if state.player.as_ref() != Some(&player) {
        info!(player_id = player.id, name = %player.name, "Player identity updated");
        state.player = Some(player);
        outcome.player_changed = true;
    }

    if state.schedule != schedule {
        info!(
            on_time = ?schedule.on_time,
            off_time = ?schedule.off_time,
            "Schedule updated"
        );
        state.schedule = schedule;
        outcome.schedule_changed = true;
    }

    if state.interval != interval {
        info!(
            old = ?state.interval,
            new = ?interval,
            "Rotation interval updated"
        );
        state.interval = interval;
        outcome.interval_changed = true;
    }

    if state.cursor.items() != items.as_slice() {
        let diff = state.cursor.replace(items);
        info!(
            added = ?diff.added,
            removed = ?diff.removed,
            current_kept = diff.current_kept,
            len = state.cursor.len(),
            "Playlist updated"
        );
        outcome.playlist = Some(diff);
    }

    state.last_fetch = Some(fetched_at);
    if !outcome.changed() {
        debug!("Snapshot unchanged");
    }
    outcome
}
