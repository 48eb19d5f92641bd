use thiserror::Error;

/// Échec de récupération d'un snapshot.
///
/// Aucune de ces erreurs n'est fatale : le moteur conserve le dernier
/// état valide et attend le prochain poll.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Transient fetch error: {0}")]
    Transient(String),
    #[error("Player {0} is not registered on the server")]
    NotRegistered(String),
    #[error("Malformed snapshot: {0}")]
    Malformed(String),
}

impl From<SnapshotError> for FetchError {
    fn from(err: SnapshotError) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

/// Incohérence détectée lors de la validation d'un snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("Invalid time for {field}: '{value}'")]
    InvalidTime { field: &'static str, value: String },
    #[error("Negative switch_tab_interval: {0}")]
    NegativeInterval(i64),
    #[error("switch_tab_interval too large: {0}")]
    IntervalTooLarge(i64),
    #[error("Media {media_id} belongs to player {owner}, not {player_id}")]
    ForeignMedia {
        media_id: i64,
        owner: i64,
        player_id: i64,
    },
    #[error("Duplicate media id {0}")]
    DuplicateMedia(i64),
}

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("No command configured for {0}")]
    NotConfigured(&'static str),
    #[error("Failed to run '{command}': {source}")]
    Command {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Display error: {0}")]
    Driver(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;
