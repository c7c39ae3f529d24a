use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GameError {
    NoActiveGame,
    GameAlreadyOver,
    InvalidAction { reason: String },
    RateLimitExceeded,
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::NoActiveGame => f.write_str("No active game"),
            GameError::GameAlreadyOver => f.write_str("Game is already over"),
            GameError::InvalidAction { reason } => write!(f, "Invalid action: {}", reason),
            GameError::RateLimitExceeded => f.write_str("Rate limit exceeded"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
