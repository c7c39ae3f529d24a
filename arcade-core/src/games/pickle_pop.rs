use std::time::Duration;

use arcade_types::{PicklePopSnapshot, TargetKind};
use rand::Rng;
use rand::seq::SliceRandom;

use super::ActionError;
use crate::timer::{self, GameTimer, TickSchedule};

pub const CELL_COUNT: usize = 9;
pub const INITIAL_SECONDS: u32 = 30;
pub const SPAWN_INTERVAL: Duration = Duration::from_millis(700);
pub const NORMAL_POINTS: u32 = 10;
pub const GOLDEN_POINTS: u32 = 50;
pub const GOLDEN_BONUS_SECONDS: u32 = 1;
pub const ROTTEN_PENALTY_POINTS: u32 = 30;
pub const ROTTEN_PENALTY_SECONDS: u32 = 3;
const COMBO_STEP: u32 = 5;
const POINTS_PER_LEVEL: u32 = 300;

fn lifetime(kind: TargetKind) -> Duration {
    match kind {
        TargetKind::Normal => Duration::from_millis(1500),
        TargetKind::Golden => Duration::from_millis(1000),
        TargetKind::Rotten => Duration::from_millis(2000),
    }
}

/// Score multiplier for a combo streak: +1 for every five consecutive hits.
pub fn multiplier(combo: u32) -> u32 {
    1 + combo / COMBO_STEP
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub kind: TargetKind,
    pub expires_at: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopResult {
    Hit { kind: TargetKind, points: u32, combo: u32 },
    Rotten { penalty_points: u32, penalty_seconds: u32 },
    Miss,
}

/// Click-the-target over a fixed 3x3 grid.
#[derive(Debug)]
pub struct PicklePop {
    cells: [Option<Target>; CELL_COUNT],
    combo: u32,
    best_combo: u32,
    score: u32,
    timer: GameTimer,
    schedule: TickSchedule,
    next_spawn: Duration,
    is_over: bool,
}

impl PicklePop {
    pub fn new() -> Self {
        let mut timer = GameTimer::new(INITIAL_SECONDS);
        timer.start();

        Self {
            cells: [None; CELL_COUNT],
            combo: 0,
            best_combo: 0,
            score: 0,
            timer,
            schedule: TickSchedule::starting_at(Duration::ZERO),
            next_spawn: Duration::ZERO,
            is_over: false,
        }
    }

    pub fn pop(&mut self, cell: usize, now: Duration) -> Result<PopResult, ActionError> {
        if cell >= CELL_COUNT {
            return Err(ActionError::OutOfRange {
                index: cell,
                len: CELL_COUNT,
            });
        }
        self.tick_timer(now);
        self.expire_targets(now);
        if self.is_over {
            return Err(ActionError::GameOver);
        }

        let result = match self.cells[cell].take() {
            None => {
                self.combo = 0;
                PopResult::Miss
            }
            Some(Target {
                kind: TargetKind::Rotten,
                ..
            }) => {
                self.combo = 0;
                let penalty_points = self.score.min(ROTTEN_PENALTY_POINTS);
                self.score -= penalty_points;
                self.timer.subtract_time(ROTTEN_PENALTY_SECONDS);
                if self.timer.is_expired() {
                    self.end();
                }
                PopResult::Rotten {
                    penalty_points,
                    penalty_seconds: ROTTEN_PENALTY_SECONDS,
                }
            }
            Some(Target { kind, .. }) => {
                self.combo += 1;
                self.best_combo = self.best_combo.max(self.combo);
                let base = if kind == TargetKind::Golden {
                    self.timer.add_time(GOLDEN_BONUS_SECONDS);
                    GOLDEN_POINTS
                } else {
                    NORMAL_POINTS
                };
                let points = base * multiplier(self.combo);
                self.score += points;
                PopResult::Hit {
                    kind,
                    points,
                    combo: self.combo,
                }
            }
        };

        Ok(result)
    }

    /// Drives the countdown, expires stale targets and spawns new ones.
    /// Returns true when anything visible changed.
    pub fn advance<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) -> bool {
        if self.is_over {
            return false;
        }
        let mut changed = self.tick_timer(now);
        changed |= self.expire_targets(now);
        if self.is_over {
            return true;
        }

        while now >= self.next_spawn {
            let spawn_time = self.next_spawn;
            self.next_spawn += SPAWN_INTERVAL;
            if self.spawn(spawn_time, rng) {
                changed = true;
            }
        }
        changed
    }

    /// Places a target directly. Cells past the grid are ignored.
    pub(crate) fn place(&mut self, cell: usize, kind: TargetKind, now: Duration) {
        if let Some(slot) = self.cells.get_mut(cell) {
            *slot = Some(Target {
                kind,
                expires_at: now + lifetime(kind),
            });
        }
    }

    fn spawn<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) -> bool {
        let free: Vec<usize> = (0..CELL_COUNT).filter(|i| self.cells[*i].is_none()).collect();
        let Some(&cell) = free.choose(rng) else {
            return false;
        };

        let kind = match rng.gen_range(0..100) {
            0..=9 => TargetKind::Golden,
            10..=29 => TargetKind::Rotten,
            _ => TargetKind::Normal,
        };
        self.place(cell, kind, now);
        true
    }

    fn tick_timer(&mut self, now: Duration) -> bool {
        if self.is_over {
            return false;
        }
        let before = self.timer.time_left();
        if timer::drive(&mut self.timer, &mut self.schedule, now) {
            self.end();
        }
        before != self.timer.time_left()
    }

    /// A good pickle left to rot counts as a miss: the combo breaks, the
    /// score does not change.
    fn expire_targets(&mut self, now: Duration) -> bool {
        let mut changed = false;
        for cell in self.cells.iter_mut() {
            if let Some(target) = cell {
                if now >= target.expires_at {
                    if target.kind != TargetKind::Rotten {
                        self.combo = 0;
                    }
                    *cell = None;
                    changed = true;
                }
            }
        }
        changed
    }

    fn end(&mut self) {
        self.is_over = true;
        self.cells = [None; CELL_COUNT];
    }

    pub fn cells(&self) -> &[Option<Target>; CELL_COUNT] {
        &self.cells
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn best_combo(&self) -> u32 {
        self.best_combo
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        1 + self.score / POINTS_PER_LEVEL
    }

    pub fn time_left(&self) -> u32 {
        self.timer.time_left()
    }

    pub fn is_over(&self) -> bool {
        self.is_over
    }

    pub fn snapshot(&self) -> PicklePopSnapshot {
        PicklePopSnapshot {
            cells: self.cells.iter().map(|c| c.map(|t| t.kind)).collect(),
            combo: self.combo,
            time_left: self.timer.time_left(),
        }
    }
}

impl Default for PicklePop {
    fn default() -> Self {
        Self::new()
    }
}
