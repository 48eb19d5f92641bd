//! Horloge de rotation.
//!
//! Un seul minuteur par player, de période `switch_tab_interval`. L'horloge
//! ne dort pas elle-même : elle expose l'échéance suivante, la boucle du
//! moteur attend dessus puis appelle [`RotationClock::fire`].

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct RotationClock {
    period: Option<Duration>,
    deadline: Option<Instant>,
}

impl RotationClock {
    /// Crée une horloge désactivée.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Prochaine échéance, `None` si la rotation est désactivée ou si
    /// l'échéance n'est pas représentable.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Change la période. Une nouvelle période réarme le minuteur à partir de
    /// `now` ; une période identique ne touche pas l'échéance en cours.
    ///
    /// Retourne `true` si l'horloge a été réarmée.
    pub fn set_period(&mut self, period: Option<Duration>, now: Instant) -> bool {
        let period = period.filter(|p| !p.is_zero());
        if period == self.period {
            return false;
        }
        self.period = period;
        self.deadline = period.and_then(|p| now.checked_add(p));
        true
    }

    /// Repart d'une période complète à partir de `now`.
    pub fn restart(&mut self, now: Instant) {
        self.deadline = self.period.and_then(|p| now.checked_add(p));
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Consomme l'échéance si elle est atteinte.
    ///
    /// La suivante est calculée à partir de `now` : un retard de la boucle
    /// ne provoque jamais de ticks de rattrapage.
    pub fn fire(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.deadline = self.period.and_then(|p| now.checked_add(p));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_clock_never_fires() {
        let now = Instant::now();
        let mut clock = RotationClock::new();
        assert_eq!(clock.deadline(), None);
        assert!(!clock.fire(now + Duration::from_secs(3600)));

        assert!(!clock.set_period(Some(Duration::ZERO), now));
        assert_eq!(clock.deadline(), None);
    }

    #[test]
    fn test_fire_rearms_from_now() {
        let start = Instant::now();
        let mut clock = RotationClock::new();
        clock.set_period(Some(Duration::from_secs(10)), start);

        assert!(!clock.fire(start + Duration::from_secs(9)));
        assert!(clock.fire(start + Duration::from_secs(10)));
        assert_eq!(clock.deadline(), Some(start + Duration::from_secs(20)));

        // Retard de 25s : un seul tick, pas de rattrapage
        let late = start + Duration::from_secs(45);
        assert!(clock.fire(late));
        assert!(!clock.fire(late));
        assert_eq!(clock.deadline(), Some(late + Duration::from_secs(10)));
    }

    #[test]
    fn test_period_change_rearms_from_change() {
        let start = Instant::now();
        let mut clock = RotationClock::new();
        clock.set_period(Some(Duration::from_secs(10)), start);

        let change = start + Duration::from_secs(4);
        assert!(clock.set_period(Some(Duration::from_secs(30)), change));
        assert_eq!(clock.deadline(), Some(change + Duration::from_secs(30)));
        assert!(!clock.fire(start + Duration::from_secs(10)));
    }

    #[test]
    fn test_unrepresentable_deadline_disables_clock() {
        let now = Instant::now();
        let mut clock = RotationClock::new();

        assert!(clock.set_period(Some(Duration::MAX), now));
        assert_eq!(clock.period(), Some(Duration::MAX));
        assert_eq!(clock.deadline(), None);
        assert!(!clock.fire(now + Duration::from_secs(3600)));
    }

    #[test]
    fn test_restart_postpones_deadline() {
        let start = Instant::now();
        let mut clock = RotationClock::new();
        clock.restart(start);
        assert_eq!(clock.deadline(), None);

        clock.set_period(Some(Duration::from_secs(60)), start);
        clock.restart(start + Duration::from_secs(50));
        assert!(!clock.fire(start + Duration::from_secs(60)));
        assert_eq!(clock.deadline(), Some(start + Duration::from_secs(110)));
    }

    #[test]
    fn test_same_period_keeps_deadline() {
        let start = Instant::now();
        let mut clock = RotationClock::new();
        clock.set_period(Some(Duration::from_secs(10)), start);

        assert!(!clock.set_period(Some(Duration::from_secs(10)), start + Duration::from_secs(7)));
        assert_eq!(clock.deadline(), Some(start + Duration::from_secs(10)));

        assert!(clock.set_period(None, start + Duration::from_secs(8)));
        assert_eq!(clock.deadline(), None);
    }
}
