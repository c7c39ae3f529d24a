use std::sync::Arc;
use std::time::Duration;

use arcade_types::{LetterTile, WordScrambleSnapshot};
use rand::Rng;
use rand::seq::SliceRandom;

use super::ActionError;
use crate::timer::{self, GameTimer, TickSchedule};
use crate::vocabulary::Vocabulary;

pub const INITIAL_SECONDS: u32 = 60;
pub const CORRECT_BONUS_SECONDS: u32 = 5;
pub const WRONG_PENALTY_SECONDS: u32 = 3;
pub const HINT_PENALTY: u32 = 15;
const MIN_WORD_POINTS: u32 = 10;
const WORDS_PER_LEVEL: u32 = 3;

/// Points for a solved word of `len` letters.
pub fn word_points(len: usize, time_left: u32, hint_used: bool) -> u32 {
    let earned = len as u32 * 20 + time_left / 2;
    let penalty = if hint_used { HINT_PENALTY } else { 0 };
    earned.saturating_sub(penalty).max(MIN_WORD_POINTS)
}

/// Shuffles the letters of `word`. For words longer than two letters the
/// result differs from the word unless every letter is the same.
pub fn scramble<R: Rng + ?Sized>(word: &str, rng: &mut R) -> Vec<char> {
    let original: Vec<char> = word.chars().collect();
    let mut letters = original.clone();
    letters.shuffle(rng);
    if letters == original && letters.len() > 1 {
        // a one-step rotation only reproduces the input when all letters match
        letters.rotate_left(1);
    }
    letters
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordResult {
    Placed { slot: usize },
    Removed { slot: usize },
    Correct { points: u32, word: String },
    Wrong { penalty_seconds: u32 },
    Hint { slot: usize, letter: char },
    Skipped { word: String },
    Ignored,
}

#[derive(Debug, Clone, Copy)]
struct Tile {
    letter: char,
    used: bool,
}

/// Rebuild the word from its shuffled letters against a 60 second clock.
#[derive(Debug)]
pub struct WordScramble {
    vocabulary: Arc<Vocabulary>,
    solution: Vec<char>,
    tiles: Vec<Tile>,
    slots: Vec<Option<usize>>,
    hint_used: bool,
    words_solved: u32,
    score: u32,
    timer: GameTimer,
    schedule: TickSchedule,
    is_over: bool,
}

impl WordScramble {
    pub fn new<R: Rng + ?Sized>(vocabulary: Arc<Vocabulary>, rng: &mut R) -> Result<Self, ActionError> {
        let word = vocabulary
            .random_word(1, rng)
            .map_err(|e| ActionError::NoWords(e.to_string()))?;
        let mut timer = GameTimer::new(INITIAL_SECONDS);
        timer.start();

        let mut game = Self {
            vocabulary,
            solution: Vec::new(),
            tiles: Vec::new(),
            slots: Vec::new(),
            hint_used: false,
            words_solved: 0,
            score: 0,
            timer,
            schedule: TickSchedule::starting_at(Duration::ZERO),
            is_over: false,
        };
        game.load_word(&word, rng);
        Ok(game)
    }

    fn load_word<R: Rng + ?Sized>(&mut self, word: &str, rng: &mut R) {
        self.solution = word.chars().collect();
        self.tiles = scramble(word, rng)
            .into_iter()
            .map(|letter| Tile { letter, used: false })
            .collect();
        self.slots = vec![None; self.solution.len()];
        self.hint_used = false;
    }

    fn next_word<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), ActionError> {
        let word = self
            .vocabulary
            .random_word(self.level(), rng)
            .map_err(|e| ActionError::NoWords(e.to_string()))?;
        self.load_word(&word, rng);
        Ok(())
    }

    fn ensure_running(&mut self, now: Duration) -> Result<(), ActionError> {
        self.advance(now);
        if self.is_over {
            return Err(ActionError::GameOver);
        }
        Ok(())
    }

    pub fn place(&mut self, tile: usize, now: Duration) -> Result<WordResult, ActionError> {
        self.ensure_running(now)?;
        let Some(entry) = self.tiles.get(tile) else {
            return Err(ActionError::OutOfRange {
                index: tile,
                len: self.tiles.len(),
            });
        };
        if entry.used {
            return Ok(WordResult::Ignored);
        }
        let Some(slot) = self.slots.iter().position(Option::is_none) else {
            return Ok(WordResult::Ignored);
        };

        self.slots[slot] = Some(tile);
        self.tiles[tile].used = true;
        Ok(WordResult::Placed { slot })
    }

    pub fn remove(&mut self, slot: usize, now: Duration) -> Result<WordResult, ActionError> {
        self.ensure_running(now)?;
        if slot >= self.slots.len() {
            return Err(ActionError::OutOfRange {
                index: slot,
                len: self.slots.len(),
            });
        }

        match self.slots[slot].take() {
            Some(tile) => {
                self.tiles[tile].used = false;
                Ok(WordResult::Removed { slot })
            }
            None => Ok(WordResult::Ignored),
        }
    }

    pub fn submit<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) -> Result<WordResult, ActionError> {
        self.ensure_running(now)?;
        if self.slots.iter().any(Option::is_none) {
            return Ok(WordResult::Ignored);
        }

        if self.answer() == self.solution {
            let word: String = self.solution.iter().collect();
            let points = word_points(self.solution.len(), self.timer.time_left(), self.hint_used);
            self.score += points;
            self.words_solved += 1;
            self.timer.add_time(CORRECT_BONUS_SECONDS);
            self.next_word(rng)?;
            Ok(WordResult::Correct { points, word })
        } else {
            self.clear_slots();
            self.timer.subtract_time(WRONG_PENALTY_SECONDS);
            if self.timer.is_expired() {
                self.is_over = true;
            }
            Ok(WordResult::Wrong {
                penalty_seconds: WRONG_PENALTY_SECONDS,
            })
        }
    }

    /// Reveals the next letter: everything from the first wrong or empty
    /// slot onward is cleared and that slot receives the right tile.
    pub fn hint(&mut self, now: Duration) -> Result<WordResult, ActionError> {
        self.ensure_running(now)?;
        let Some(slot) = (0..self.slots.len()).find(|i| self.slot_letter(*i) != Some(self.solution[*i])) else {
            return Ok(WordResult::Ignored);
        };

        for later in slot..self.slots.len() {
            if let Some(tile) = self.slots[later].take() {
                self.tiles[tile].used = false;
            }
        }

        let letter = self.solution[slot];
        let Some(tile) = self.tiles.iter().position(|t| !t.used && t.letter == letter) else {
            return Ok(WordResult::Ignored);
        };
        self.tiles[tile].used = true;
        self.slots[slot] = Some(tile);
        self.hint_used = true;
        Ok(WordResult::Hint { slot, letter })
    }

    pub fn skip<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) -> Result<WordResult, ActionError> {
        self.ensure_running(now)?;
        let word: String = self.solution.iter().collect();
        self.next_word(rng)?;
        Ok(WordResult::Skipped { word })
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

    fn slot_letter(&self, slot: usize) -> Option<char> {
        self.slots[slot].map(|tile| self.tiles[tile].letter)
    }

    fn answer(&self) -> Vec<char> {
        (0..self.slots.len()).filter_map(|i| self.slot_letter(i)).collect()
    }

    fn clear_slots(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(tile) = slot.take() {
                self.tiles[tile].used = false;
            }
        }
    }

    pub fn solution(&self) -> String {
        self.solution.iter().collect()
    }

    pub fn tile_letters(&self) -> Vec<char> {
        self.tiles.iter().map(|t| t.letter).collect()
    }

    pub fn words_solved(&self) -> u32 {
        self.words_solved
    }

    pub fn hint_used(&self) -> bool {
        self.hint_used
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        1 + self.words_solved / WORDS_PER_LEVEL
    }

    pub fn time_left(&self) -> u32 {
        self.timer.time_left()
    }

    pub fn is_over(&self) -> bool {
        self.is_over
    }

    pub fn snapshot(&self) -> WordScrambleSnapshot {
        WordScrambleSnapshot {
            tiles: self
                .tiles
                .iter()
                .map(|t| LetterTile {
                    letter: t.letter.to_string(),
                    used: t.used,
                })
                .collect(),
            slots: (0..self.slots.len())
                .map(|i| self.slot_letter(i).map(String::from))
                .collect(),
            hint_used: self.hint_used,
            words_solved: self.words_solved,
            time_left: self.timer.time_left(),
        }
    }
}
