use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::cursor::PlaylistCursor;
use crate::model::{MediaItem, Player};
use crate::schedule::Schedule;

/// État d'exécution d'un player.
///
/// Créé vide (inactif tant qu'aucun snapshot n'a été reçu), modifié
/// uniquement par la réconciliation et par les ticks de rotation, abandonné
/// à l'arrêt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    pub player: Option<Player>,
    pub schedule: Schedule,
    pub interval: Option<Duration>,
    pub cursor: PlaylistCursor,
    pub active: bool,
    pub last_fetch: Option<DateTime<Utc>>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vrai tant qu'aucun snapshot valide n'a été appliqué.
    pub fn is_unknown(&self) -> bool {
        self.player.is_none()
    }

    pub fn current(&self) -> Option<&MediaItem> {
        self.cursor.current()
    }
}
