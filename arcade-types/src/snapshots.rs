use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Client-facing view of a running game. Never contains hidden solutions
/// beyond what the player is meant to see.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "game", rename_all = "kebab-case")]
#[ts(export)]
pub enum GameSnapshot {
    SequenceMemory(SequenceMemorySnapshot),
    PickleMatch(PickleMatchSnapshot),
    SpeedPickle(SpeedPickleSnapshot),
    PicklePop(PicklePopSnapshot),
    ReactionTime(ReactionSnapshot),
    WordScramble(WordScrambleSnapshot),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SequenceMemorySnapshot {
    pub sequence: Vec<u8>,
    pub input_position: usize,
    pub is_over: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CardView {
    pub id: usize,
    pub icon: Option<String>, // only present while face up
    pub is_flipped: bool,
    pub is_matched: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PickleMatchSnapshot {
    pub cards: Vec<CardView>,
    pub moves: u32,
    pub matches: u32,
    pub is_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SpeedPickleSnapshot {
    pub grid_size: usize,
    pub tiles: Vec<String>, // css hsl() colors, row-major
    pub time_left: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum TargetKind {
    Normal,
    Golden,
    Rotten,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PicklePopSnapshot {
    pub cells: Vec<Option<TargetKind>>,
    pub combo: u32,
    pub time_left: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum ReactionPhase {
    Ready,
    Waiting,
    Go,
    TooEarly,
    RoundResult,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReactionSnapshot {
    pub phase: ReactionPhase,
    pub round: u32,
    pub total_rounds: u32,
    pub results_ms: Vec<u32>,
    pub average_ms: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LetterTile {
    pub letter: String,
    pub used: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WordScrambleSnapshot {
    pub tiles: Vec<LetterTile>,
    pub slots: Vec<Option<String>>,
    pub hint_used: bool,
    pub words_solved: u32,
    pub time_left: u32,
}
