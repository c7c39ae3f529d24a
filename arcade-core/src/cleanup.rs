use std::fmt;
use std::time::{Duration, Instant};

/// Anything the cleanup sweep can judge by age and activity.
pub trait TrackedSession {
    fn started_at(&self) -> Instant;
    fn last_activity(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupReason {
    Inactive,
    MaxDurationExceeded,
}

impl fmt::Display for CleanupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupReason::Inactive => f.write_str("Inactivity timeout"),
            CleanupReason::MaxDurationExceeded => f.write_str("Session exceeded maximum duration"),
        }
    }
}

pub struct SessionCleanup {
    pub idle_threshold: Duration, // no actions for this long
    pub max_duration: Duration,   // hard cap on one play-through
}

impl Default for SessionCleanup {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::from_secs(600),
            max_duration: Duration::from_secs(3600),
        }
    }
}

impl SessionCleanup {
    pub fn new(idle_threshold: Duration, max_duration: Duration) -> Self {
        Self {
            idle_threshold,
            max_duration,
        }
    }

    /// Why `session` should be dropped at `now`, if it should.
    pub fn check<S: TrackedSession + ?Sized>(&self, session: &S, now: Instant) -> Option<CleanupReason> {
        if now.saturating_duration_since(session.started_at()) >= self.max_duration {
            return Some(CleanupReason::MaxDurationExceeded);
        }
        if now.saturating_duration_since(session.last_activity()) >= self.idle_threshold {
            return Some(CleanupReason::Inactive);
        }
        None
    }

    /// Keys of every session due for cleanup, with the reason.
    pub fn collect_expired<'a, K, S, I>(&self, sessions: I, now: Instant) -> Vec<(K, CleanupReason)>
    where
        K: Clone + 'a,
        S: TrackedSession + 'a,
        I: IntoIterator<Item = (&'a K, &'a S)>,
    {
        sessions
            .into_iter()
            .filter_map(|(key, session)| self.check(session, now).map(|reason| (key.clone(), reason)))
            .collect()
    }
}
