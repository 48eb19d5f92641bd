//! Persistance SQLite des players et de leurs playlists

use chrono::Local;
use ibengine::{MediaRecord, PlayerRecord, PlayerSettings, SnapshotRecord};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use crate::error::{Error, Result};

/// Intervalle de rotation attribué aux nouveaux players (secondes)
pub const DEFAULT_SWITCH_TAB_INTERVAL: i64 = 10;

const PLAYER_COLUMNS: &str =
    "id, name, description, serial, last_ping, on_time, off_time, switch_tab_interval";

/// Base des players (une connexion partagée par tous les handlers)
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Ouvre (ou crée) la base à `db_path`
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        info!(path = %db_path.display(), "Opened player database");
        Self::init(conn)
    }

    /// Base éphémère, pour les tests
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Nécessaire pour la suppression en cascade des médias
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS players (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                serial TEXT NOT NULL UNIQUE,
                last_ping TEXT,
                on_time TEXT,
                off_time TEXT,
                switch_tab_interval INTEGER
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS media (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id INTEGER NOT NULL,
                url TEXT NOT NULL,
                FOREIGN KEY (player_id) REFERENCES players(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_media_player ON media(player_id, id)",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enregistre un player. Retourne `false` si le serial était déjà connu.
    pub fn register(&self, name: &str, description: &str, serial: &str) -> Result<bool> {
        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO players (name, description, serial, switch_tab_interval)
             VALUES (?1, ?2, ?3, ?4)",
            params![name, description, serial, DEFAULT_SWITCH_TAB_INTERVAL],
        )?;
        if inserted > 0 {
            info!(serial, name, "New player registered");
        }
        Ok(inserted > 0)
    }

    pub fn players(&self) -> Result<Vec<PlayerRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM players ORDER BY id DESC",
            PLAYER_COLUMNS
        ))?;
        let players = stmt
            .query_map([], row_to_player)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(players)
    }

    pub fn player(&self, id: i64) -> Result<Option<PlayerRecord>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM players WHERE id = ?1", PLAYER_COLUMNS),
                params![id],
                row_to_player,
            )
            .optional()?)
    }

    pub fn player_by_serial(&self, serial: &str) -> Result<Option<PlayerRecord>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM players WHERE serial = ?1", PLAYER_COLUMNS),
                params![serial],
                row_to_player,
            )
            .optional()?)
    }

    /// Médias d'un player dans l'ordre d'insertion (ordre de rotation)
    pub fn media(&self, player_id: i64) -> Result<Vec<MediaRecord>> {
        let conn = self.lock();
        Ok(query_media(&conn, player_id)?)
    }

    /// Player et playlist lus dans une même transaction
    pub fn snapshot(&self, serial: &str) -> Result<Option<SnapshotRecord>> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let player = tx
            .query_row(
                &format!("SELECT {} FROM players WHERE serial = ?1", PLAYER_COLUMNS),
                params![serial],
                row_to_player,
            )
            .optional()?;
        let Some(player) = player else {
            return Ok(None);
        };

        let media = query_media(&tx, player.id)?;
        tx.commit()?;

        Ok(Some(SnapshotRecord { player, media }))
    }

    /// Met à jour `last_ping`. Retourne `false` si le serial est inconnu.
    pub fn ping(&self, serial: &str) -> Result<bool> {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE players SET last_ping = ?1 WHERE serial = ?2",
            params![now, serial],
        )?;
        Ok(updated > 0)
    }

    pub fn delete_player(&self, id: i64) -> Result<bool> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM players WHERE id = ?1", params![id])?;
        if deleted > 0 {
            info!(player_id = id, "Player deleted");
        }
        Ok(deleted > 0)
    }

    /// Ajoute un média en fin de playlist
    pub fn add_media(&self, player_id: i64, url: &str) -> Result<MediaRecord> {
        let conn = self.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM players WHERE id = ?1)",
            params![player_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::PlayerNotFound(player_id.to_string()));
        }

        conn.execute(
            "INSERT INTO media (player_id, url) VALUES (?1, ?2)",
            params![player_id, url],
        )?;
        let media = MediaRecord {
            id: conn.last_insert_rowid(),
            player_id,
            url: url.to_string(),
        };
        info!(player_id, media_id = media.id, url, "Media added");
        Ok(media)
    }

    pub fn remove_media(&self, player_id: i64, media_id: i64) -> Result<()> {
        let conn = self.lock();
        let deleted = conn.execute(
            "DELETE FROM media WHERE id = ?1 AND player_id = ?2",
            params![media_id, player_id],
        )?;
        if deleted == 0 {
            return Err(Error::MediaNotFound {
                player_id,
                media_id,
            });
        }
        info!(player_id, media_id, "Media removed");
        Ok(())
    }

    /// Modifie les réglages de planning ; seuls les champs fournis changent.
    ///
    /// Les valeurs doivent avoir été validées par l'appelant.
    pub fn update_settings(&self, player_id: i64, settings: &PlayerSettings) -> Result<PlayerRecord> {
        {
            let mut conn = self.lock();
            let tx = conn.transaction()?;
            if let Some(on_time) = &settings.on_time {
                tx.execute(
                    "UPDATE players SET on_time = ?1 WHERE id = ?2",
                    params![on_time, player_id],
                )?;
            }
            if let Some(off_time) = &settings.off_time {
                tx.execute(
                    "UPDATE players SET off_time = ?1 WHERE id = ?2",
                    params![off_time, player_id],
                )?;
            }
            if let Some(interval) = settings.switch_tab_interval {
                tx.execute(
                    "UPDATE players SET switch_tab_interval = ?1 WHERE id = ?2",
                    params![interval, player_id],
                )?;
            }
            tx.commit()?;
        }

        self.player(player_id)?
            .ok_or_else(|| Error::PlayerNotFound(player_id.to_string()))
    }
}

fn query_media(conn: &Connection, player_id: i64) -> rusqlite::Result<Vec<MediaRecord>> {
    let mut stmt =
        conn.prepare("SELECT id, player_id, url FROM media WHERE player_id = ?1 ORDER BY id")?;
    let media = stmt
        .query_map(params![player_id], |row| {
            Ok(MediaRecord {
                id: row.get("id")?,
                player_id: row.get("player_id")?,
                url: row.get("url")?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(media)
}

fn row_to_player(row: &Row<'_>) -> rusqlite::Result<PlayerRecord> {
    Ok(PlayerRecord {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        serial: row.get("serial")?,
        last_ping: row.get("last_ping")?,
        on_time: row.get("on_time")?,
        off_time: row.get("off_time")?,
        switch_tab_interval: row.get("switch_tab_interval")?,
    })
}
