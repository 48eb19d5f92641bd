//! API HTTP du serveur InfoBerry.
//!
//! Deux familles de routes :
//! - routes player (`/register`, `/snapshot`, `/playlist`, `/settings`, `/ping`)
//!   appelées par les écrans ;
//! - routes `/management/players/...` pour administrer players et playlists.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use ibengine::{
    MAX_SWITCH_TAB_INTERVAL, MediaRecord, PlayerRecord, PlayerSettings, Registration,
    SerialRequest, SnapshotRecord, parse_time_of_day,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::store::Store;

/// Router complet (player + management) sur `store`.
pub fn router(store: Store) -> Router {
    Router::new()
        .merge(player_router())
        .merge(management_router())
        .with_state(store)
}

fn player_router() -> Router<Store> {
    Router::new()
        .route("/", get(index))
        .route("/register", post(register))
        .route("/snapshot", get(snapshot))
        .route("/playlist", get(playlist))
        .route("/settings", get(settings))
        .route("/ping", post(ping))
}

fn management_router() -> Router<Store> {
    Router::new()
        .route("/management/players", get(list_players))
        .route(
            "/management/players/{player_id}",
            get(get_player).delete(delete_player),
        )
        .route("/management/players/{player_id}/media", post(add_media))
        .route(
            "/management/players/{player_id}/media/{media_id}",
            delete(remove_media),
        )
        .route(
            "/management/players/{player_id}/settings",
            post(update_settings),
        )
}

/// Query `?serial=` des routes player.
#[derive(Debug, Deserialize)]
pub struct SerialQuery {
    #[serde(default)]
    pub serial: Option<String>,
}

impl SerialQuery {
    fn require(self) -> Result<String> {
        match self.serial {
            Some(serial) if !serial.trim().is_empty() => Ok(serial),
            _ => Err(Error::bad_request("Missing serial")),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| Error::bad_request(rejection.body_text()))
}

async fn index() -> &'static str {
    "InfoBerry API"
}

async fn register(
    State(store): State<Store>,
    payload: std::result::Result<Json<Registration>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let registration = json_body(payload)?;
    if [
        &registration.name,
        &registration.description,
        &registration.serial,
    ]
    .iter()
    .any(|field| field.trim().is_empty())
    {
        return Err(Error::bad_request(
            "Name, description, and serial are required",
        ));
    }

    let created = store.register(
        &registration.name,
        &registration.description,
        &registration.serial,
    )?;
    let text = if created {
        "New player registered successfully"
    } else {
        "Player already exists"
    };
    Ok((StatusCode::CREATED, message(text)))
}

fn player_for_serial(store: &Store, serial: &str) -> Result<PlayerRecord> {
    store
        .player_by_serial(serial)?
        .ok_or_else(|| Error::PlayerNotFound(serial.to_string()))
}

async fn snapshot(
    State(store): State<Store>,
    Query(query): Query<SerialQuery>,
) -> Result<Json<SnapshotRecord>> {
    let serial = query.require()?;
    let snapshot = store
        .snapshot(&serial)?
        .ok_or_else(|| Error::PlayerNotFound(serial.clone()))?;
    debug!(serial = %serial, media = snapshot.media.len(), "Snapshot served");
    Ok(Json(snapshot))
}

async fn playlist(
    State(store): State<Store>,
    Query(query): Query<SerialQuery>,
) -> Result<Json<Vec<String>>> {
    let serial = query.require()?;
    let player = player_for_serial(&store, &serial)?;
    let urls = store
        .media(player.id)?
        .into_iter()
        .map(|media| media.url)
        .collect();
    Ok(Json(urls))
}

async fn settings(
    State(store): State<Store>,
    Query(query): Query<SerialQuery>,
) -> Result<Json<PlayerSettings>> {
    let serial = query.require()?;
    let player = player_for_serial(&store, &serial)?;
    Ok(Json(PlayerSettings::from(&player)))
}

async fn ping(
    State(store): State<Store>,
    payload: std::result::Result<Json<SerialRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let SerialRequest { serial } = json_body(payload)?;
    if serial.trim().is_empty() {
        return Err(Error::bad_request("Missing serial"));
    }
    if !store.ping(&serial)? {
        return Err(Error::PlayerNotFound(serial));
    }
    Ok(message("Ping Received"))
}

async fn list_players(State(store): State<Store>) -> Result<Json<Vec<PlayerRecord>>> {
    Ok(Json(store.players()?))
}

async fn get_player(
    State(store): State<Store>,
    Path(player_id): Path<i64>,
) -> Result<Json<SnapshotRecord>> {
    let player = store
        .player(player_id)?
        .ok_or_else(|| Error::PlayerNotFound(player_id.to_string()))?;
    let media = store.media(player_id)?;
    Ok(Json(SnapshotRecord { player, media }))
}

async fn delete_player(
    State(store): State<Store>,
    Path(player_id): Path<i64>,
) -> Result<StatusCode> {
    if store.delete_player(player_id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::PlayerNotFound(player_id.to_string()))
    }
}

/// Corps de `POST /management/players/{id}/media`.
#[derive(Debug, Deserialize)]
pub struct NewMedia {
    pub url: String,
}

async fn add_media(
    State(store): State<Store>,
    Path(player_id): Path<i64>,
    payload: std::result::Result<Json<NewMedia>, JsonRejection>,
) -> Result<(StatusCode, Json<MediaRecord>)> {
    let NewMedia { url } = json_body(payload)?;
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::bad_request("Missing url"));
    }
    let media = store.add_media(player_id, url)?;
    Ok((StatusCode::CREATED, Json(media)))
}

async fn remove_media(
    State(store): State<Store>,
    Path((player_id, media_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    store.remove_media(player_id, media_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Valide et normalise une mise à jour de réglages.
///
/// Une chaîne vide laisse le champ inchangé ; les heures sont stockées au
/// format `HH:MM:SS`.
fn validate_settings(update: PlayerSettings) -> Result<PlayerSettings> {
    let normalize = |field: &'static str, value: Option<String>| -> Result<Option<String>> {
        match value {
            Some(value) => Ok(parse_time_of_day(field, &value)
                .map_err(|e| Error::bad_request(e.to_string()))?
                .map(|time| time.format("%H:%M:%S").to_string())),
            None => Ok(None),
        }
    };

    if let Some(interval) = update.switch_tab_interval {
        if !(0..=MAX_SWITCH_TAB_INTERVAL).contains(&interval) {
            return Err(Error::bad_request(format!(
                "switch_tab_interval must be between 0 and {} seconds, got {}",
                MAX_SWITCH_TAB_INTERVAL, interval
            )));
        }
    }

    Ok(PlayerSettings {
        on_time: normalize("on_time", update.on_time)?,
        off_time: normalize("off_time", update.off_time)?,
        switch_tab_interval: update.switch_tab_interval,
    })
}

async fn update_settings(
    State(store): State<Store>,
    Path(player_id): Path<i64>,
    payload: std::result::Result<Json<PlayerSettings>, JsonRejection>,
) -> Result<Json<PlayerRecord>> {
    let update = validate_settings(json_body(payload)?)?;
    let player = store.update_settings(player_id, &update)?;
    Ok(Json(player))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_settings() {
        let settings = validate_settings(PlayerSettings {
            on_time: Some("8:05".into()),
            off_time: Some(String::new()),
            switch_tab_interval: Some(0),
        })
        .unwrap();
        assert_eq!(settings.on_time.as_deref(), Some("08:05:00"));
        assert_eq!(settings.off_time, None);
        assert_eq!(settings.switch_tab_interval, Some(0));

        assert!(
            validate_settings(PlayerSettings {
                switch_tab_interval: Some(-3),
                ..Default::default()
            })
            .is_err()
        );
        assert!(
            validate_settings(PlayerSettings {
                switch_tab_interval: Some(i64::MAX),
                ..Default::default()
            })
            .is_err()
        );
        assert!(
            validate_settings(PlayerSettings {
                off_time: Some("noon".into()),
                ..Default::default()
            })
            .is_err()
        );
    }
}
