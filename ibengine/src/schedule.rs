//! Évaluation de la fenêtre d'affichage d'un player.

use chrono::NaiveTime;

use crate::error::SnapshotError;

/// Fenêtre quotidienne pendant laquelle un player affiche du contenu.
///
/// Une heure d'extinction antérieure à l'heure d'allumage désigne une
/// fenêtre qui traverse minuit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Schedule {
    pub on_time: Option<NaiveTime>,
    pub off_time: Option<NaiveTime>,
}

impl Schedule {
    pub fn new(on_time: Option<NaiveTime>, off_time: Option<NaiveTime>) -> Self {
        Self { on_time, off_time }
    }

    /// Indique si l'écran doit être actif à l'heure `now`.
    pub fn is_active_at(&self, now: NaiveTime) -> bool {
        is_active(self.on_time, self.off_time, now)
    }
}

/// Décide si l'écran est actif à l'heure `now`.
///
/// - une borne absente : toujours actif
/// - `on == off` : toujours actif
/// - `on < off` : actif sur `[on, off)`
/// - `on > off` : actif à partir de `on` ou avant `off` (fenêtre de nuit)
pub fn is_active(on_time: Option<NaiveTime>, off_time: Option<NaiveTime>, now: NaiveTime) -> bool {
    match (on_time, off_time) {
        (Some(on), Some(off)) if on < off => on <= now && now < off,
        (Some(on), Some(off)) if on > off => now >= on || now < off,
        _ => true,
    }
}

/// Parse une heure `HH:MM` ou `HH:MM:SS`.
///
/// Une chaîne vide est traitée comme une borne absente.
pub fn parse_time_of_day(
    field: &'static str,
    value: &str,
) -> Result<Option<NaiveTime>, SnapshotError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map(Some)
        .map_err(|_| SnapshotError::InvalidTime {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_missing_bounds_are_always_active() {
        assert!(is_active(None, None, t(3, 0)));
        assert!(is_active(Some(t(9, 0)), None, t(3, 0)));
        assert!(is_active(None, Some(t(17, 0)), t(20, 0)));
    }

    #[test]
    fn test_equal_bounds_are_always_active() {
        assert!(is_active(Some(t(9, 0)), Some(t(9, 0)), t(9, 0)));
        assert!(is_active(Some(t(9, 0)), Some(t(9, 0)), t(23, 59)));
    }

    #[test]
    fn test_same_day_window() {
        let (on, off) = (Some(t(9, 0)), Some(t(17, 0)));
        assert!(!is_active(on, off, t(8, 59)));
        assert!(is_active(on, off, t(9, 0)));
        assert!(is_active(on, off, t(16, 59)));
        assert!(!is_active(on, off, t(17, 0)));
        assert!(!is_active(on, off, t(20, 0)));
    }

    #[test]
    fn test_overnight_window() {
        let (on, off) = (Some(t(22, 0)), Some(t(6, 0)));
        assert!(is_active(on, off, t(23, 30)));
        assert!(is_active(on, off, t(0, 0)));
        assert!(is_active(on, off, t(5, 59)));
        assert!(!is_active(on, off, t(6, 0)));
        assert!(!is_active(on, off, t(12, 0)));
        assert!(is_active(on, off, t(22, 0)));
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("on_time", "08:30").unwrap(), Some(t(8, 30)));
        assert_eq!(
            parse_time_of_day("on_time", "23:15:00").unwrap(),
            Some(t(23, 15))
        );
        assert_eq!(parse_time_of_day("on_time", "  ").unwrap(), None);
        assert!(matches!(
            parse_time_of_day("off_time", "25:00"),
            Err(SnapshotError::InvalidTime { field: "off_time", .. })
        ));
    }
}
