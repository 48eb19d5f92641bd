//! Représentation « fil » des lignes `players` et `media`.
//!
//! Ces structures sont partagées par le serveur (lignes SQLite sérialisées
//! en JSON) et par le client (désérialisation des réponses `/snapshot`).
//! Elles ne sont pas validées : la conversion vers [`crate::Snapshot`] s'en
//! charge.

use serde::{Deserialize, Deserializer, Serialize, de};

/// Ligne de la table `players`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub serial: String,
    #[serde(default)]
    pub last_ping: Option<String>,
    #[serde(default)]
    pub on_time: Option<String>,
    #[serde(default)]
    pub off_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_interval")]
    pub switch_tab_interval: Option<i64>,
}

/// Ligne de la table `media`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: i64,
    pub player_id: i64,
    pub url: String,
}

/// Réponse de `GET /snapshot` : un player et sa playlist ordonnée.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub player: PlayerRecord,
    #[serde(default)]
    pub media: Vec<MediaRecord>,
}

/// Corps de `POST /register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub description: String,
    pub serial: String,
}

/// Corps de `POST /ping`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialRequest {
    pub serial: String,
}

/// Réglages de planning d'un player (`GET /settings`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSettings {
    #[serde(default)]
    pub on_time: Option<String>,
    #[serde(default)]
    pub off_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_interval")]
    pub switch_tab_interval: Option<i64>,
}

impl From<&PlayerRecord> for PlayerSettings {
    fn from(player: &PlayerRecord) -> Self {
        Self {
            on_time: player.on_time.clone(),
            off_time: player.off_time.clone(),
            switch_tab_interval: player.switch_tab_interval,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntervalValue {
    Int(i64),
    Text(String),
}

// Les intervalles saisis via un formulaire arrivent parfois sous forme de texte
fn deserialize_interval<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IntervalValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntervalValue::Int(n)) => Ok(Some(n)),
        Some(IntervalValue::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse::<i64>().map(Some).map_err(|_| {
                    de::Error::custom(format!("invalid switch_tab_interval '{}'", s))
                })
            }
        }
    }
}
