use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{ActionOutcome, GameAction, GameKind, GameSessionState, GameSnapshot, SaveOutcome};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    Authenticate { token: String },
    StartGame { game: GameKind },
    Action { action: GameAction },
    EndGame,
    ResetGame,
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    AuthenticationSuccess { user: crate::User },
    AuthenticationFailed { reason: String },
    GameStarted {
        game: GameKind,
        session: GameSessionState,
        snapshot: GameSnapshot,
    },
    GameUpdate {
        session: GameSessionState,
        snapshot: GameSnapshot,
        outcome: Option<ActionOutcome>,
    },
    GameOver {
        game: GameKind,
        session: GameSessionState,
        snapshot: GameSnapshot,
    },
    ScoreSaved { game: GameKind, outcome: SaveOutcome },
    GameReset,
    Error { message: String },
}
