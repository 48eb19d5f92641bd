//! # ibengine - moteur de planification et de synchronisation des playlists
//!
//! Pour un player donné, le moteur décide si l'écran doit être allumé,
//! quel média afficher et quand passer au suivant, tout en fusionnant les
//! snapshots de configuration récupérés périodiquement sur le serveur.
//!
//! ## Architecture
//!
//! - [`schedule`] : fenêtre d'affichage (y compris les fenêtres de nuit)
//! - [`PlaylistCursor`] : position dans la playlist, stable par identité
//! - [`RotationClock`] : échéance de la prochaine rotation
//! - [`reconcile`] : fusion champ par champ d'un snapshot dans l'état
//! - [`DisplayDriver`] : abstraction de la surface d'affichage
//! - [`Engine`] : boucle unique qui possède l'état
//!
//! ## Exemple
//!
//! ```no_run
//! use ibengine::{Engine, LocalTime, RecordingDisplay};
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let (tx, rx) = mpsc::channel(8);
//! let cancel = CancellationToken::new();
//! let engine = Engine::new(RecordingDisplay::new(), LocalTime);
//! let handle = tokio::spawn(engine.run(rx, cancel.clone()));
//! // ... le client envoie des FetchOutcome sur `tx`
//! # drop(tx);
//! cancel.cancel();
//! let _final_state = handle.await;
//! # }
//! ```

pub mod clock;
pub mod cursor;
pub mod display;
pub mod engine;
pub mod error;
pub mod model;
pub mod reconciler;
pub mod record;
pub mod schedule;
pub mod state;
pub mod time;

pub use clock::RotationClock;
pub use cursor::{PlaylistCursor, PlaylistDiff};
pub use display::{DisplayCall, DisplayDriver, RecordingDisplay};
pub use engine::{Engine, SCHEDULE_CHECK_PERIOD};
pub use error::{DisplayError, FetchError, Result, SnapshotError};
pub use model::{MAX_SWITCH_TAB_INTERVAL, MediaItem, Player, Snapshot};
pub use reconciler::{FetchOutcome, Reconciliation, reconcile};
pub use record::{
    MediaRecord, PlayerRecord, PlayerSettings, Registration, SerialRequest, SnapshotRecord,
};
pub use schedule::{Schedule, is_active, parse_time_of_day};
pub use state::EngineState;
pub use time::{LocalTime, ManualTime, TimeSource};
