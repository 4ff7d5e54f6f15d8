use chrono::{DateTime, Utc};

/// What a pending timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// The notes of the last `Play` have finished sounding.
    PlaybackRelease,
    /// The post-feedback pause is over; the next question is due.
    FeedbackAdvance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub kind: TimerKind,
    pub due: DateTime<Utc>,
    pub generation: u64,
}

/// Cancellable deadlines, at most one per kind.
///
/// Timers carry the session generation they were scheduled in. Draining
/// drops timers from any other generation instead of firing them.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    entries: Vec<Timer>,
}

impl TimerQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `kind`, replacing a pending timer of the same kind.
    pub fn schedule(&mut self, kind: TimerKind, due: DateTime<Utc>, generation: u64) {
        self.cancel(kind);
        self.entries.push(Timer {
            kind,
            due,
            generation,
        });
    }

    /// Returns whether a timer was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let before = self.entries.len();
        self.entries.retain(|t| t.kind != kind);
        before != self.entries.len()
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.entries.iter().any(|t| t.kind == kind)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.entries.iter().map(|t| t.due).min()
    }

    /// Removes every timer due at `now` and returns the kinds belonging to
    /// `generation`, earliest first.
    pub fn drain_due(&mut self, now: DateTime<Utc>, generation: u64) -> Vec<TimerKind> {
        let (mut due, pending): (Vec<Timer>, Vec<Timer>) =
            self.entries.drain(..).partition(|t| t.due <= now);
        self.entries = pending;

        due.sort_by_key(|t| t.due);
        due.into_iter()
            .filter(|t| {
                let current = t.generation == generation;
                if !current {
                    tracing::debug!(
                        kind = ?t.kind,
                        generation = t.generation,
                        "dropping stale timer"
                    );
                }
                current
            })
            .map(|t| t.kind)
            .collect()
    }
}
