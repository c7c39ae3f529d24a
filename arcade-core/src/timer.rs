use std::fmt;
use std::time::Duration;

pub const ONE_SECOND: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    Idle,
    Running(u32),
    Expired,
}

/// Whole-second countdown used by the time-boxed games.
///
/// `tick` is expected once per second while running. Time added never
/// raises the remaining time above the initial duration, and time
/// subtracted never takes it below zero.
pub struct GameTimer {
    initial_seconds: u32,
    remaining: u32,
    running: bool,
    on_expire: Option<Box<dyn FnMut() + Send>>,
}

impl GameTimer {
    pub fn new(initial_seconds: u32) -> Self {
        Self {
            initial_seconds,
            remaining: initial_seconds,
            running: false,
            on_expire: None,
        }
    }

    pub fn with_on_expire(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_expire = Some(Box::new(callback));
        self
    }

    pub fn start(&mut self) {
        if self.remaining > 0 {
            self.running = true;
        }
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.remaining = self.initial_seconds;
        self.running = false;
    }

    pub fn add_time(&mut self, seconds: u32) {
        self.remaining = self
            .remaining
            .saturating_add(seconds)
            .min(self.initial_seconds);
    }

    pub fn subtract_time(&mut self, seconds: u32) {
        self.remaining = self.remaining.saturating_sub(seconds);
        if self.remaining == 0 && self.running {
            self.expire();
        }
    }

    pub fn tick(&mut self) -> TimerTick {
        if !self.running {
            return TimerTick::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expire();
            TimerTick::Expired
        } else {
            TimerTick::Running(self.remaining)
        }
    }

    pub fn time_left(&self) -> u32 {
        self.remaining
    }

    pub fn initial_seconds(&self) -> u32 {
        self.initial_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    fn expire(&mut self) {
        self.running = false;
        if let Some(callback) = self.on_expire.as_mut() {
            callback();
        }
    }
}

impl fmt::Debug for GameTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameTimer")
            .field("initial_seconds", &self.initial_seconds)
            .field("remaining", &self.remaining)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

/// Converts a session clock into the once-per-second ticks a `GameTimer`
/// expects.
#[derive(Debug, Clone, Copy)]
pub struct TickSchedule {
    next: Duration,
}

impl TickSchedule {
    pub fn starting_at(now: Duration) -> Self {
        Self {
            next: now + ONE_SECOND,
        }
    }

    /// Number of whole-second ticks that have come due by `now`.
    pub fn due(&mut self, now: Duration) -> u32 {
        let mut ticks = 0;
        while now >= self.next {
            self.next += ONE_SECOND;
            ticks += 1;
        }
        ticks
    }
}

/// Runs every due tick against `timer`; returns true if it expired.
pub fn drive(timer: &mut GameTimer, schedule: &mut TickSchedule, now: Duration) -> bool {
    for _ in 0..schedule.due(now) {
        if timer.tick() == TimerTick::Expired {
            return true;
        }
    }
    false
}
