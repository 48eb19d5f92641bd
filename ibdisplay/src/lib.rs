//! Pilotes d'affichage pour les players InfoBerry.
//!
//! - [`KioskDisplay`] : navigateur en mode kiosque et alimentation de l'écran
//! - [`LogDisplay`] : journalise les appels, pour les machines sans écran

mod kiosk;

pub use kiosk::{KioskCommands, KioskDisplay};

use ibengine::{DisplayDriver, DisplayError, MediaItem};
use tracing::info;

/// Pilote sans effet qui se contente de journaliser.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDisplay;

impl DisplayDriver for LogDisplay {
    fn show(&mut self, item: &MediaItem) -> Result<(), DisplayError> {
        info!(media_id = item.id, url = %item.url, "[dry-run] show");
        Ok(())
    }

    fn reload(&mut self, item: &MediaItem) -> Result<(), DisplayError> {
        info!(media_id = item.id, url = %item.url, "[dry-run] reload");
        Ok(())
    }

    fn blank(&mut self) -> Result<(), DisplayError> {
        info!("[dry-run] blank");
        Ok(())
    }
}
