use std::time::Duration;

use arcade_types::SpeedPickleSnapshot;
use rand::Rng;

use super::ActionError;
use crate::timer::{self, GameTimer, TickSchedule};

pub const INITIAL_SECONDS: u32 = 30;
pub const CORRECT_BONUS_SECONDS: u32 = 1;
pub const WRONG_PENALTY_SECONDS: u32 = 2;
pub const WRONG_PENALTY_POINTS: u32 = 25;
pub const POINTS_PER_LEVEL: u32 = 500;
const MAX_GRID_SIZE: usize = 8;
const BASE_SHADE_DELTA: u32 = 40;
const SHADE_DELTA_STEP: u32 = 4;
const MIN_SHADE_DELTA: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shade {
    pub hue: u32,
    pub saturation: u32,
    pub lightness: u32,
}

impl Shade {
    pub fn css(&self) -> String {
        format!("hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
    }
}

/// Grid side length for a level; grows by one per level up to 8x8.
pub fn grid_size(level: u32) -> usize {
    (2 + level as usize).min(MAX_GRID_SIZE)
}

/// Lightness gap between the odd tile and the rest; narrows with level.
pub fn shade_delta(level: u32) -> u32 {
    BASE_SHADE_DELTA
        .saturating_sub(level.saturating_sub(1) * SHADE_DELTA_STEP)
        .max(MIN_SHADE_DELTA)
}

#[derive(Debug, Clone)]
pub struct Board {
    pub size: usize,
    pub base: Shade,
    pub odd: Shade,
    pub odd_index: usize,
}

impl Board {
    pub fn generate<R: Rng + ?Sized>(level: u32, rng: &mut R) -> Self {
        let size = grid_size(level);
        let delta = shade_delta(level);
        let base = Shade {
            hue: rng.gen_range(80..=140),
            saturation: rng.gen_range(40..=70),
            lightness: rng.gen_range(30..=55),
        };
        let odd = Shade {
            lightness: base.lightness + delta,
            ..base
        };

        Self {
            size,
            base,
            odd,
            odd_index: rng.gen_range(0..size * size),
        }
    }

    pub fn tiles(&self) -> Vec<String> {
        (0..self.size * self.size)
            .map(|i| {
                if i == self.odd_index {
                    self.odd.css()
                } else {
                    self.base.css()
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickResult {
    Correct { points: u32 },
    Wrong { penalty: u32 },
}

/// Shade discrimination: find the odd pickle before time runs out.
#[derive(Debug)]
pub struct SpeedPickle {
    board: Board,
    score: u32,
    level: u32,
    timer: GameTimer,
    schedule: TickSchedule,
    is_over: bool,
}

impl SpeedPickle {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut timer = GameTimer::new(INITIAL_SECONDS);
        timer.start();

        Self {
            board: Board::generate(1, rng),
            score: 0,
            level: 1,
            timer,
            schedule: TickSchedule::starting_at(Duration::ZERO),
            is_over: false,
        }
    }

    pub fn pick<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        now: Duration,
        rng: &mut R,
    ) -> Result<PickResult, ActionError> {
        self.advance(now);
        if self.is_over {
            return Err(ActionError::GameOver);
        }
        let tiles = self.board.size * self.board.size;
        if index >= tiles {
            return Err(ActionError::OutOfRange { index, len: tiles });
        }

        if index == self.board.odd_index {
            let points = 100 * self.level;
            self.score += points;
            self.timer.add_time(CORRECT_BONUS_SECONDS);
            self.level = self.level.max(self.score / POINTS_PER_LEVEL + 1);
            self.board = Board::generate(self.level, rng);
            Ok(PickResult::Correct { points })
        } else {
            // report what was actually taken; the score floors at zero
            let penalty = self.score.min(WRONG_PENALTY_POINTS);
            self.score -= penalty;
            self.timer.subtract_time(WRONG_PENALTY_SECONDS);
            if self.timer.is_expired() {
                self.is_over = true;
            }
            Ok(PickResult::Wrong { penalty })
        }
    }

    /// Returns true when the visible time changed.
    pub fn advance(&mut self, now: Duration) -> bool {
        if self.is_over {
            return false;
        }
        let before = self.timer.time_left();
        if timer::drive(&mut self.timer, &mut self.schedule, now) {
            self.is_over = true;
        }
        before != self.timer.time_left()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn time_left(&self) -> u32 {
        self.timer.time_left()
    }

    pub fn is_over(&self) -> bool {
        self.is_over
    }

    pub fn snapshot(&self) -> SpeedPickleSnapshot {
        SpeedPickleSnapshot {
            grid_size: self.board.size,
            tiles: self.board.tiles(),
            time_left: self.timer.time_left(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn wrong_index(game: &SpeedPickle) -> usize {
        (game.board().odd_index + 1) % (game.board().size * game.board().size)
    }

    #[test]
    fn test_grid_and_contrast_scale_with_level() {
        assert_eq!(grid_size(1), 3);
        assert_eq!(grid_size(4), 6);
        assert_eq!(grid_size(20), 8);
        assert!(shade_delta(1) > shade_delta(5));
        assert_eq!(shade_delta(50), 4);
    }

    #[test]
    fn test_correct_pick_scores_by_level() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut game = SpeedPickle::new(&mut rng);
        let t = Duration::from_millis(100);

        let odd = game.board().odd_index;
        assert_eq!(
            game.pick(odd, t, &mut rng).unwrap(),
            PickResult::Correct { points: 100 }
        );
        assert_eq!(game.score(), 100);
        assert_eq!(game.time_left(), INITIAL_SECONDS); // bonus capped
    }

    #[test]
    fn test_level_rises_every_five_hundred_points() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut game = SpeedPickle::new(&mut rng);
        let t = Duration::ZERO;
        for _ in 0..5 {
            let odd = game.board().odd_index;
            game.pick(odd, t, &mut rng).unwrap();
        }
        assert_eq!(game.score(), 500);
        assert_eq!(game.level(), 2);
        assert_eq!(game.board().size, 4);
    }

    #[test]
    fn test_wrong_pick_never_goes_negative() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut game = SpeedPickle::new(&mut rng);
        let t = Duration::ZERO;

        let wrong = wrong_index(&game);
        assert_eq!(
            game.pick(wrong, t, &mut rng).unwrap(),
            PickResult::Wrong { penalty: 0 }
        );
        assert_eq!(game.score(), 0);
        assert_eq!(game.time_left(), INITIAL_SECONDS - 2);
    }

    #[test]
    fn test_wrong_pick_reports_points_deducted() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut game = SpeedPickle::new(&mut rng);
        let t = Duration::ZERO;

        let odd = game.board().odd_index;
        game.pick(odd, t, &mut rng).unwrap();
        assert_eq!(game.score(), 100);

        let wrong = wrong_index(&game);
        assert_eq!(
            game.pick(wrong, t, &mut rng).unwrap(),
            PickResult::Wrong { penalty: 25 }
        );
        assert_eq!(game.score(), 75);
    }

    #[test]
    fn test_time_left_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut game = SpeedPickle::new(&mut rng);
        let t = Duration::ZERO;

        for _ in 0..20 {
            let wrong = wrong_index(&game);
            match game.pick(wrong, t, &mut rng) {
                Ok(_) => assert!(game.time_left() <= INITIAL_SECONDS),
                Err(ActionError::GameOver) => break,
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        assert_eq!(game.time_left(), 0);
        assert!(game.is_over());
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_timer_expiry_ends_game() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut game = SpeedPickle::new(&mut rng);
        assert!(game.advance(Duration::from_secs(10)));
        assert_eq!(game.time_left(), 20);
        game.advance(Duration::from_secs(30));
        assert!(game.is_over());
        assert_eq!(game.time_left(), 0);
    }
}
