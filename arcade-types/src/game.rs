use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// The six arcade games. Serialized ids double as score-store game ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum GameKind {
    SequenceMemory,
    PickleMatch,
    SpeedPickle,
    PicklePop,
    ReactionTime,
    WordScramble,
}

impl GameKind {
    pub const ALL: [GameKind; 6] = [
        GameKind::SequenceMemory,
        GameKind::PickleMatch,
        GameKind::SpeedPickle,
        GameKind::PicklePop,
        GameKind::ReactionTime,
        GameKind::WordScramble,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            GameKind::SequenceMemory => "sequence-memory",
            GameKind::PickleMatch => "pickle-match",
            GameKind::SpeedPickle => "speed-pickle",
            GameKind::PicklePop => "pickle-pop",
            GameKind::ReactionTime => "reaction-time",
            GameKind::WordScramble => "word-scramble",
        }
    }

    /// Time-boxed games run a countdown timer alongside the session.
    pub fn is_time_boxed(&self) -> bool {
        matches!(
            self,
            GameKind::SpeedPickle | GameKind::PicklePop | GameKind::WordScramble
        )
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGame(pub String);

impl fmt::Display for UnknownGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown game '{}'", self.0)
    }
}

impl std::error::Error for UnknownGame {}

impl FromStr for GameKind {
    type Err = UnknownGame;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| UnknownGame(s.to_string()))
    }
}

/// Per-screen session state shared by every game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameSessionState {
    pub is_playing: bool,
    pub score: u32,
    pub best_score: u32,
    pub level: u32,
}

impl Default for GameSessionState {
    fn default() -> Self {
        Self {
            is_playing: false,
            score: 0,
            best_score: 0,
            level: 1,
        }
    }
}

/// Player input, routed to whichever game is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
#[ts(export)]
pub enum GameAction {
    PressPad { pad: u8 },
    FlipCard { index: usize },
    PickTile { index: usize },
    PopCell { cell: usize },
    React,
    PlaceLetter { tile: usize },
    RemoveLetter { slot: usize },
    SubmitWord,
    Hint,
    SkipWord,
}

/// What a single action did, as reported to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
#[ts(export)]
pub enum ActionOutcome {
    Progress,
    Scored { points: u32 },
    Penalty { points: u32, seconds: u32 },
    Miss,
    Ignored,
    GameOver,
}
