use std::time::Duration;

use arcade_types::{CardView, PickleMatchSnapshot};
use rand::Rng;
use rand::seq::SliceRandom;

use super::ActionError;

pub const ICONS: [&str; 8] = [
    "pickle", "jar", "cucumber", "dill", "garlic", "pepper", "onion", "vinegar",
];
pub const MATCH_POINTS: u32 = 100;
pub const MISMATCH_REVEAL: Duration = Duration::from_millis(1000);
const MOVES_PER_LEVEL: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: usize,
    pub icon: &'static str,
    pub is_flipped: bool,
    pub is_matched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipResult {
    Revealed,
    Matched { points: u32, completed: bool },
    Mismatch { hide_at: Duration },
    Ignored,
}

/// Memory pairs over a 16 card grid.
#[derive(Debug, Clone)]
pub struct PickleMatch {
    cards: Vec<Card>,
    first_flipped: Option<usize>,
    pending_hide: Option<(usize, usize, Duration)>,
    moves: u32,
    matches: u32,
    score: u32,
}

impl PickleMatch {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut icons: Vec<&'static str> = ICONS.iter().chain(ICONS.iter()).copied().collect();
        icons.shuffle(rng);
        Self::with_layout(&icons)
    }

    pub fn with_layout(icons: &[&'static str]) -> Self {
        let cards = icons
            .iter()
            .enumerate()
            .map(|(id, icon)| Card {
                id,
                icon: *icon,
                is_flipped: false,
                is_matched: false,
            })
            .collect();

        Self {
            cards,
            first_flipped: None,
            pending_hide: None,
            moves: 0,
            matches: 0,
            score: 0,
        }
    }

    pub fn flip(&mut self, index: usize, now: Duration) -> Result<FlipResult, ActionError> {
        if self.is_complete() {
            return Err(ActionError::GameOver);
        }
        if index >= self.cards.len() {
            return Err(ActionError::OutOfRange {
                index,
                len: self.cards.len(),
            });
        }

        // A mismatched pair stays face up until its reveal window closes.
        self.advance(now);
        if self.pending_hide.is_some() {
            return Ok(FlipResult::Ignored);
        }

        let card = &mut self.cards[index];
        if card.is_flipped || card.is_matched {
            return Ok(FlipResult::Ignored);
        }
        card.is_flipped = true;

        let Some(first) = self.first_flipped.take() else {
            self.first_flipped = Some(index);
            return Ok(FlipResult::Revealed);
        };

        self.moves += 1;
        if self.cards[first].icon == self.cards[index].icon {
            self.cards[first].is_matched = true;
            self.cards[index].is_matched = true;
            self.matches += 1;
            self.score += MATCH_POINTS;
            return Ok(FlipResult::Matched {
                points: MATCH_POINTS,
                completed: self.is_complete(),
            });
        }

        let hide_at = now + MISMATCH_REVEAL;
        self.pending_hide = Some((first, index, hide_at));
        Ok(FlipResult::Mismatch { hide_at })
    }

    /// Turns a mismatched pair back over once its reveal window has passed.
    pub fn advance(&mut self, now: Duration) -> bool {
        match self.pending_hide {
            Some((a, b, hide_at)) if now >= hide_at => {
                self.cards[a].is_flipped = false;
                self.cards[b].is_flipped = false;
                self.pending_hide = None;
                true
            }
            _ => false,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn unmatched_count(&self) -> usize {
        self.cards.iter().filter(|c| !c.is_matched).count()
    }

    pub fn is_complete(&self) -> bool {
        self.unmatched_count() == 0
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        1 + self.moves / MOVES_PER_LEVEL
    }

    pub fn snapshot(&self) -> PickleMatchSnapshot {
        PickleMatchSnapshot {
            cards: self
                .cards
                .iter()
                .map(|card| CardView {
                    id: card.id,
                    icon: (card.is_flipped || card.is_matched).then(|| card.icon.to_string()),
                    is_flipped: card.is_flipped,
                    is_matched: card.is_matched,
                })
                .collect(),
            moves: self.moves,
            matches: self.matches,
            is_complete: self.is_complete(),
        }
    }
}
