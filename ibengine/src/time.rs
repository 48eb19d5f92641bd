//! Source de l'heure murale utilisée pour évaluer les plannings.

use chrono::{Local, NaiveTime};
use std::sync::{Arc, Mutex};

pub trait TimeSource: Send {
    /// Heure locale courante.
    fn now(&self) -> NaiveTime;
}

/// Heure locale du système.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTime;

impl TimeSource for LocalTime {
    fn now(&self) -> NaiveTime {
        Local::now().time()
    }
}

/// Heure fixée manuellement, partagée entre ses clones.
///
/// Sert aux tests et aux simulations : on garde un clone pour déplacer
/// l'heure pendant que le moteur tourne avec l'autre.
#[derive(Debug, Clone)]
pub struct ManualTime {
    inner: Arc<Mutex<NaiveTime>>,
}

impl ManualTime {
    pub fn new(time: NaiveTime) -> Self {
        Self {
            inner: Arc::new(Mutex::new(time)),
        }
    }

    pub fn set(&self, time: NaiveTime) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = time;
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> NaiveTime {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
