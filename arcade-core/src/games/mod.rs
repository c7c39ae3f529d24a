pub mod pickle_match;
pub mod pickle_pop;
pub mod reaction;
pub mod sequence_memory;
pub mod speed_pickle;
pub mod word_scramble;

use std::sync::Arc;
use std::time::Duration;

use arcade_types::{ActionOutcome, GameAction, GameError, GameKind, GameSnapshot};
use rand::Rng;
use thiserror::Error;

use crate::vocabulary::Vocabulary;
pub use pickle_match::{FlipResult, PickleMatch};
pub use pickle_pop::{PicklePop, PopResult};
pub use reaction::{ReactResult, ReactionTime};
pub use sequence_memory::{PressResult, SequenceMemory};
pub use speed_pickle::{PickResult, SpeedPickle};
pub use word_scramble::{WordResult, WordScramble};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Game is already over")]
    GameOver,
    #[error("Index {index} is out of range for {len} items")]
    OutOfRange { index: usize, len: usize },
    #[error("Action is not supported by {game}")]
    Unsupported { game: GameKind },
    #[error("{0}")]
    NoWords(String),
}

impl From<ActionError> for GameError {
    fn from(error: ActionError) -> Self {
        match error {
            ActionError::GameOver => GameError::GameAlreadyOver,
            other => GameError::InvalidAction {
                reason: other.to_string(),
            },
        }
    }
}

/// One running game of any kind.
#[derive(Debug)]
pub enum ArcadeGame {
    SequenceMemory(SequenceMemory),
    PickleMatch(PickleMatch),
    SpeedPickle(SpeedPickle),
    PicklePop(PicklePop),
    ReactionTime(ReactionTime),
    WordScramble(WordScramble),
}

impl ArcadeGame {
    pub fn new<R: Rng + ?Sized>(
        kind: GameKind,
        vocabulary: &Arc<Vocabulary>,
        rng: &mut R,
    ) -> Result<Self, ActionError> {
        let game = match kind {
            GameKind::SequenceMemory => ArcadeGame::SequenceMemory(SequenceMemory::new(rng)),
            GameKind::PickleMatch => ArcadeGame::PickleMatch(PickleMatch::new(rng)),
            GameKind::SpeedPickle => ArcadeGame::SpeedPickle(SpeedPickle::new(rng)),
            GameKind::PicklePop => ArcadeGame::PicklePop(PicklePop::new()),
            GameKind::ReactionTime => ArcadeGame::ReactionTime(ReactionTime::new()),
            GameKind::WordScramble => {
                ArcadeGame::WordScramble(WordScramble::new(vocabulary.clone(), rng)?)
            }
        };
        Ok(game)
    }

    pub fn kind(&self) -> GameKind {
        match self {
            ArcadeGame::SequenceMemory(_) => GameKind::SequenceMemory,
            ArcadeGame::PickleMatch(_) => GameKind::PickleMatch,
            ArcadeGame::SpeedPickle(_) => GameKind::SpeedPickle,
            ArcadeGame::PicklePop(_) => GameKind::PicklePop,
            ArcadeGame::ReactionTime(_) => GameKind::ReactionTime,
            ArcadeGame::WordScramble(_) => GameKind::WordScramble,
        }
    }

    /// Applies one player action. `now` is the time since the game started.
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        action: GameAction,
        now: Duration,
        rng: &mut R,
    ) -> Result<ActionOutcome, ActionError> {
        let outcome = match (self, action) {
            (ArcadeGame::SequenceMemory(game), GameAction::PressPad { pad }) => {
                match game.press(pad, rng)? {
                    PressResult::Correct => ActionOutcome::Progress,
                    PressResult::RoundComplete { points } => ActionOutcome::Scored { points },
                    PressResult::Wrong => ActionOutcome::GameOver,
                }
            }
            (ArcadeGame::PickleMatch(game), GameAction::FlipCard { index }) => {
                match game.flip(index, now)? {
                    FlipResult::Revealed => ActionOutcome::Progress,
                    FlipResult::Matched { points, .. } => ActionOutcome::Scored { points },
                    FlipResult::Mismatch { .. } => ActionOutcome::Miss,
                    FlipResult::Ignored => ActionOutcome::Ignored,
                }
            }
            (ArcadeGame::SpeedPickle(game), GameAction::PickTile { index }) => {
                match game.pick(index, now, rng)? {
                    PickResult::Correct { points } => ActionOutcome::Scored { points },
                    PickResult::Wrong { penalty } => ActionOutcome::Penalty {
                        points: penalty,
                        seconds: speed_pickle::WRONG_PENALTY_SECONDS,
                    },
                }
            }
            (ArcadeGame::PicklePop(game), GameAction::PopCell { cell }) => {
                match game.pop(cell, now)? {
                    PopResult::Hit { points, .. } => ActionOutcome::Scored { points },
                    PopResult::Rotten {
                        penalty_points,
                        penalty_seconds,
                    } => ActionOutcome::Penalty {
                        points: penalty_points,
                        seconds: penalty_seconds,
                    },
                    PopResult::Miss => ActionOutcome::Miss,
                }
            }
            (ArcadeGame::ReactionTime(game), GameAction::React) => match game.react(now, rng)? {
                ReactResult::Waiting | ReactResult::Recorded { .. } => ActionOutcome::Progress,
                ReactResult::TooEarly { .. } => ActionOutcome::Miss,
                ReactResult::Finished { score, .. } => ActionOutcome::Scored { points: score },
            },
            (ArcadeGame::WordScramble(game), action) => {
                let result = match action {
                    GameAction::PlaceLetter { tile } => game.place(tile, now)?,
                    GameAction::RemoveLetter { slot } => game.remove(slot, now)?,
                    GameAction::SubmitWord => game.submit(now, rng)?,
                    GameAction::Hint => game.hint(now)?,
                    GameAction::SkipWord => game.skip(now, rng)?,
                    _ => {
                        return Err(ActionError::Unsupported {
                            game: GameKind::WordScramble,
                        });
                    }
                };
                match result {
                    WordResult::Correct { points, .. } => ActionOutcome::Scored { points },
                    WordResult::Wrong { penalty_seconds } => ActionOutcome::Penalty {
                        points: 0,
                        seconds: penalty_seconds,
                    },
                    WordResult::Ignored => ActionOutcome::Ignored,
                    _ => ActionOutcome::Progress,
                }
            }
            (game, _) => return Err(ActionError::Unsupported { game: game.kind() }),
        };

        Ok(outcome)
    }

    /// Moves time-driven state forward. Returns true if the client view changed.
    pub fn advance<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) -> bool {
        match self {
            ArcadeGame::SequenceMemory(_) => false,
            ArcadeGame::PickleMatch(game) => game.advance(now),
            ArcadeGame::SpeedPickle(game) => game.advance(now),
            ArcadeGame::PicklePop(game) => game.advance(now, rng),
            ArcadeGame::ReactionTime(game) => game.advance(now),
            ArcadeGame::WordScramble(game) => game.advance(now),
        }
    }

    pub fn score(&self) -> u32 {
        match self {
            ArcadeGame::SequenceMemory(game) => game.score(),
            ArcadeGame::PickleMatch(game) => game.score(),
            ArcadeGame::SpeedPickle(game) => game.score(),
            ArcadeGame::PicklePop(game) => game.score(),
            ArcadeGame::ReactionTime(game) => game.score(),
            ArcadeGame::WordScramble(game) => game.score(),
        }
    }

    pub fn level(&self) -> u32 {
        match self {
            ArcadeGame::SequenceMemory(game) => game.level(),
            ArcadeGame::PickleMatch(game) => game.level(),
            ArcadeGame::SpeedPickle(game) => game.level(),
            ArcadeGame::PicklePop(game) => game.level(),
            ArcadeGame::ReactionTime(game) => game.level(),
            ArcadeGame::WordScramble(game) => game.level(),
        }
    }

    pub fn is_over(&self) -> bool {
        match self {
            ArcadeGame::SequenceMemory(game) => game.is_over(),
            ArcadeGame::PickleMatch(game) => game.is_complete(),
            ArcadeGame::SpeedPickle(game) => game.is_over(),
            ArcadeGame::PicklePop(game) => game.is_over(),
            ArcadeGame::ReactionTime(game) => game.is_over(),
            ArcadeGame::WordScramble(game) => game.is_over(),
        }
    }

    /// Seconds left on the countdown, for the time-boxed games.
    pub fn time_left(&self) -> Option<u32> {
        match self {
            ArcadeGame::SpeedPickle(game) => Some(game.time_left()),
            ArcadeGame::PicklePop(game) => Some(game.time_left()),
            ArcadeGame::WordScramble(game) => Some(game.time_left()),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        match self {
            ArcadeGame::SequenceMemory(game) => GameSnapshot::SequenceMemory(game.snapshot()),
            ArcadeGame::PickleMatch(game) => GameSnapshot::PickleMatch(game.snapshot()),
            ArcadeGame::SpeedPickle(game) => GameSnapshot::SpeedPickle(game.snapshot()),
            ArcadeGame::PicklePop(game) => GameSnapshot::PicklePop(game.snapshot()),
            ArcadeGame::ReactionTime(game) => GameSnapshot::ReactionTime(game.snapshot()),
            ArcadeGame::WordScramble(game) => GameSnapshot::WordScramble(game.snapshot()),
        }
    }
}
