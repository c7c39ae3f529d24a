use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{GameKind, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ScoreKind {
    History,
    Best,
}

impl ScoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreKind::History => "history",
            ScoreKind::Best => "best",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "history" => Some(ScoreKind::History),
            "best" => Some(ScoreKind::Best),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScoreRecord {
    pub user_id: UserId,
    pub game_id: GameKind,
    pub score: u32,
    pub timestamp: i64, // milliseconds since the unix epoch
    pub kind: ScoreKind,
}

impl ScoreRecord {
    pub fn history(user_id: impl Into<UserId>, game_id: GameKind, score: u32, timestamp: i64) -> Self {
        Self {
            user_id: user_id.into(),
            game_id,
            score,
            timestamp,
            kind: ScoreKind::History,
        }
    }

    pub fn best(user_id: impl Into<UserId>, game_id: GameKind, score: u32, timestamp: i64) -> Self {
        Self {
            kind: ScoreKind::Best,
            ..Self::history(user_id, game_id, score, timestamp)
        }
    }

    /// Document key: `{game}-{timestamp}-{user}` for history,
    /// `{game}-best-{user}` for the single best record.
    pub fn key(&self) -> String {
        match self.kind {
            ScoreKind::History => format!("{}-{}-{}", self.game_id, self.timestamp, self.user_id),
            ScoreKind::Best => format!("{}-best-{}", self.game_id, self.user_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub record: ScoreRecord,
}

/// Result of persisting a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaveOutcome {
    pub score: u32,
    pub is_new_best: bool,
}
