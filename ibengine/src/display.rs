//! Interface entre le moteur et la surface d'affichage.

use std::sync::{Arc, Mutex};

use crate::error::DisplayError;
use crate::model::MediaItem;

/// Pilote d'affichage appelé par le moteur.
///
/// Les implémentations ne doivent pas bloquer : le moteur les appelle depuis
/// sa boucle. Une erreur est journalisée par le moteur, qui retentera
/// l'élément courant au tick suivant.
pub trait DisplayDriver: Send {
    fn show(&mut self, item: &MediaItem) -> Result<(), DisplayError>;
    fn blank(&mut self) -> Result<(), DisplayError>;

    /// Recharge l'élément déjà affiché, même si rien n'a changé.
    ///
    /// Par défaut, équivalent à [`DisplayDriver::show`].
    fn reload(&mut self, item: &MediaItem) -> Result<(), DisplayError> {
        self.show(item)
    }
}

impl<D: DisplayDriver + ?Sized> DisplayDriver for Box<D> {
    fn show(&mut self, item: &MediaItem) -> Result<(), DisplayError> {
        (**self).show(item)
    }

    fn blank(&mut self) -> Result<(), DisplayError> {
        (**self).blank()
    }

    fn reload(&mut self, item: &MediaItem) -> Result<(), DisplayError> {
        (**self).reload(item)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    Show(MediaItem),
    Reload(MediaItem),
    Blank,
}

#[derive(Debug, Default)]
struct Recorder {
    calls: Vec<DisplayCall>,
    failing_shows: usize,
    failing_blanks: usize,
}

/// Pilote qui enregistre les appels reçus.
///
/// Les clones partagent le même journal, ce qui permet d'inspecter les
/// appels pendant que le moteur possède le pilote. Les échecs peuvent être
/// injectés pour simuler un navigateur qui ne démarre pas.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    inner: Arc<Mutex<Recorder>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorder> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appels reçus, dans l'ordre (y compris ceux qui ont échoué).
    pub fn calls(&self) -> Vec<DisplayCall> {
        self.lock().calls.clone()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    /// Fait échouer les `count` prochains appels à `show` ou `reload`.
    pub fn fail_next_shows(&self, count: usize) {
        self.lock().failing_shows = count;
    }

    /// Fait échouer les `count` prochains appels à `blank`.
    pub fn fail_next_blanks(&self, count: usize) {
        self.lock().failing_blanks = count;
    }
}

impl DisplayDriver for RecordingDisplay {
    fn show(&mut self, item: &MediaItem) -> Result<(), DisplayError> {
        let mut recorder = self.lock();
        recorder.calls.push(DisplayCall::Show(item.clone()));
        if recorder.failing_shows > 0 {
            recorder.failing_shows -= 1;
            return Err(DisplayError::Driver(format!("cannot show {}", item.url)));
        }
        Ok(())
    }

    fn reload(&mut self, item: &MediaItem) -> Result<(), DisplayError> {
        let mut recorder = self.lock();
        recorder.calls.push(DisplayCall::Reload(item.clone()));
        if recorder.failing_shows > 0 {
            recorder.failing_shows -= 1;
            return Err(DisplayError::Driver(format!("cannot reload {}", item.url)));
        }
        Ok(())
    }

    fn blank(&mut self) -> Result<(), DisplayError> {
        let mut recorder = self.lock();
        recorder.calls.push(DisplayCall::Blank);
        if recorder.failing_blanks > 0 {
            recorder.failing_blanks -= 1;
            return Err(DisplayError::Driver("cannot blank".to_string()));
        }
        Ok(())
    }
}
