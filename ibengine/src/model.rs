//! Modèle validé utilisé par le moteur.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::SnapshotError;
use crate::record::{MediaRecord, PlayerRecord, SnapshotRecord};
use crate::schedule::{Schedule, parse_time_of_day};

/// Intervalle de rotation maximal accepté, en secondes (un jour).
pub const MAX_SWITCH_TAB_INTERVAL: i64 = 24 * 60 * 60;

/// Élément affichable d'une playlist. L'URL n'est jamais interprétée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: i64,
    pub url: String,
}

impl MediaItem {
    pub fn new(id: i64, url: impl Into<String>) -> Self {
        Self { id, url: url.into() }
    }
}

impl From<MediaRecord> for MediaItem {
    fn from(record: MediaRecord) -> Self {
        Self {
            id: record.id,
            url: record.url,
        }
    }
}

/// Identité d'un player telle que connue du serveur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub serial: String,
}

/// Copie cohérente de la configuration d'un player à un instant donné.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub player: Player,
    pub schedule: Schedule,
    /// `None` : rotation désactivée.
    pub interval: Option<Duration>,
    pub items: Vec<MediaItem>,
}

impl TryFrom<SnapshotRecord> for Snapshot {
    type Error = SnapshotError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        let SnapshotRecord { player, media } = record;
        let PlayerRecord {
            id,
            name,
            description,
            serial,
            on_time,
            off_time,
            switch_tab_interval,
            ..
        } = player;

        let on_time = match on_time {
            Some(value) => parse_time_of_day("on_time", &value)?,
            None => None,
        };
        let off_time = match off_time {
            Some(value) => parse_time_of_day("off_time", &value)?,
            None => None,
        };

        let interval = match switch_tab_interval {
            None | Some(0) => None,
            Some(secs) if secs < 0 => return Err(SnapshotError::NegativeInterval(secs)),
            Some(secs) if secs > MAX_SWITCH_TAB_INTERVAL => {
                return Err(SnapshotError::IntervalTooLarge(secs));
            }
            Some(secs) => Some(Duration::from_secs(secs as u64)),
        };

        let mut seen = HashSet::with_capacity(media.len());
        let mut items = Vec::with_capacity(media.len());
        for entry in media {
            if entry.player_id != id {
                return Err(SnapshotError::ForeignMedia {
                    media_id: entry.id,
                    owner: entry.player_id,
                    player_id: id,
                });
            }
            if !seen.insert(entry.id) {
                return Err(SnapshotError::DuplicateMedia(entry.id));
            }
            items.push(MediaItem::from(entry));
        }

        Ok(Snapshot {
            player: Player {
                id,
                name,
                description,
                serial,
            },
            schedule: Schedule::new(on_time, off_time),
            interval,
            items,
        })
    }
}
