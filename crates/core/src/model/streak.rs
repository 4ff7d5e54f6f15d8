use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Consecutive calendar days with at least one finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeStreak {
    current: u32,
    best: u32,
    last_practiced: Option<NaiveDate>,
}

impl PracticeStreak {
    /// Rehydrate a streak from persisted storage.
    #[must_use]
    pub fn from_persisted(current: u32, best: u32, last_practiced: Option<NaiveDate>) -> Self {
        Self {
            current,
            best: best.max(current),
            last_practiced,
        }
    }

    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub fn best(&self) -> u32 {
        self.best
    }

    #[must_use]
    pub fn last_practiced(&self) -> Option<NaiveDate> {
        self.last_practiced
    }

    /// Counts a practice on `day`.
    ///
    /// Practicing again on the same day keeps the streak, the following day
    /// extends it and any gap restarts it at one. Days earlier than the last
    /// recorded practice are ignored.
    pub fn record_practice(&mut self, day: NaiveDate) {
        self.current = match self.last_practiced {
            Some(last) if day <= last => return,
            Some(last) if last.succ_opt() == Some(day) => self.current.saturating_add(1),
            _ => 1,
        };
        self.last_practiced = Some(day);
        if self.current > self.best {
            self.best = self.current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn consecutive_days_extend_the_streak() {
        let mut streak = PracticeStreak::default();
        streak.record_practice(day(1));
        streak.record_practice(day(2));
        streak.record_practice(day(2));
        streak.record_practice(day(3));
        assert_eq!(streak.current(), 3);
        assert_eq!(streak.best(), 3);
        assert_eq!(streak.last_practiced(), Some(day(3)));
    }

    #[test]
    fn gap_restarts_but_best_is_kept() {
        let mut streak = PracticeStreak::default();
        for d in 1..=4 {
            streak.record_practice(day(d));
        }
        streak.record_practice(day(10));
        assert_eq!(streak.current(), 1);
        assert_eq!(streak.best(), 4);

        streak.record_practice(day(11));
        assert_eq!(streak.current(), 2);
        assert_eq!(streak.best(), 4);
    }

    #[test]
    fn earlier_days_are_ignored() {
        let mut streak = PracticeStreak::from_persisted(2, 5, Some(day(9)));
        streak.record_practice(day(3));
        assert_eq!(streak, PracticeStreak::from_persisted(2, 5, Some(day(9))));
    }
}
