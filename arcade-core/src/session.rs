use std::sync::Arc;

use arcade_types::{GameKind, GameSessionState, SaveOutcome, ScoreRecord, UserId};
use tracing::{debug, warn};

use crate::game_events::{SessionEvent, SessionEventBus, SessionEventHandler};
use crate::score_store::{ScoreStore, ScoreStoreError};

/// Generic start/score/level/end/reset lifecycle shared by every game.
///
/// `best_score` is a display cache: it follows the highest score seen this
/// session. Whether a finished session is a *new* personal best is decided
/// against `stored_best`, the best score known to be in the store. While
/// that is unknown (never loaded, or the load failed) the save re-reads it.
pub struct GameSession {
    game: GameKind,
    user_id: Option<UserId>,
    store: Arc<dyn ScoreStore>,
    state: GameSessionState,
    stored_best: Option<u32>,
    events: SessionEventBus,
}

impl GameSession {
    pub fn new(game: GameKind, user_id: Option<UserId>, store: Arc<dyn ScoreStore>) -> Self {
        Self {
            game,
            user_id,
            store,
            state: GameSessionState::default(),
            stored_best: None,
            events: SessionEventBus::new(),
        }
    }

    pub fn add_event_handler(&mut self, handler: Box<dyn SessionEventHandler>) {
        self.events.add_handler(handler);
    }

    pub fn game(&self) -> GameKind {
        self.game
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn state(&self) -> &GameSessionState {
        &self.state
    }

    /// Seeds the best-score cache from the store. A failed read leaves the
    /// baseline unknown.
    pub async fn load_best(&mut self) {
        let Some(user_id) = self.user_id.clone() else {
            return;
        };

        match self.store.best_for(&user_id, self.game).await {
            Ok(Some(record)) => {
                self.stored_best = Some(record.score);
                self.state.best_score = self.state.best_score.max(record.score);
            }
            Ok(None) => self.stored_best = Some(0),
            Err(e) => warn!("Failed to load best score for {} on {}: {}", user_id, self.game, e),
        }
    }

    pub fn start_game(&mut self) {
        self.state.is_playing = true;
        self.state.score = 0;
        self.state.level = 1;
        self.events.publish(SessionEvent::GameStarted {
            game: self.game,
            user_id: self.user_id.clone(),
        });
    }

    pub fn update_score(&mut self, score: u32) {
        self.state.score = score;
        self.state.best_score = self.state.best_score.max(score);
    }

    pub fn set_level(&mut self, level: u32) {
        let level = level.max(1);
        if level != self.state.level {
            self.state.level = level;
            self.events.publish(SessionEvent::LevelChanged {
                game: self.game,
                level,
            });
        }
    }

    /// Persists `score` and reports whether it was a new personal best.
    /// Signed-out sessions and store failures both report not-a-best.
    pub async fn save_score(&mut self, score: u32) -> bool {
        match self.prepare_save(score) {
            Some(pending) => pending.persist().await.is_new_best,
            None => false,
        }
    }

    pub async fn end_game(&mut self) -> SaveOutcome {
        let pending = self.finish();
        match pending {
            Some(pending) => pending.persist().await,
            None => SaveOutcome {
                score: self.state.score,
                is_new_best: false,
            },
        }
    }

    /// Stops play and hands back the save to run off the game flow.
    /// Returns `None` when there is no signed-in user.
    pub fn finish(&mut self) -> Option<PendingSave> {
        self.state.is_playing = false;
        self.events.publish(SessionEvent::GameEnded {
            game: self.game,
            user_id: self.user_id.clone(),
            score: self.state.score,
        });
        self.prepare_save(self.state.score)
    }

    pub fn reset_game(&mut self) {
        let best_score = self.state.best_score;
        self.state = GameSessionState {
            best_score,
            ..GameSessionState::default()
        };
        self.events.publish(SessionEvent::GameReset { game: self.game });
    }

    fn prepare_save(&mut self, score: u32) -> Option<PendingSave> {
        let Some(user_id) = self.user_id.clone() else {
            debug!("No user for {} session, skipping score save", self.game);
            return None;
        };

        let is_new_best = self.stored_best.map(|best| score > best);
        if is_new_best == Some(true) {
            self.stored_best = Some(score);
        }

        Some(PendingSave {
            store: self.store.clone(),
            user_id,
            game: self.game,
            score,
            is_new_best,
        })
    }
}

/// A score write that can be awaited in place or spawned.
pub struct PendingSave {
    store: Arc<dyn ScoreStore>,
    user_id: UserId,
    game: GameKind,
    score: u32,
    /// `None` when the stored best is unknown and must be read first.
    is_new_best: Option<bool>,
}

impl PendingSave {
    pub fn score(&self) -> u32 {
        self.score
    }

    pub async fn persist(self) -> SaveOutcome {
        let score = self.score;
        match self.write().await {
            Ok(is_new_best) => SaveOutcome { score, is_new_best },
            Err(e) => {
                warn!(
                    "Failed to save {} score {} for {}: {}",
                    self.game, score, self.user_id, e
                );
                SaveOutcome {
                    score,
                    is_new_best: false,
                }
            }
        }
    }

    async fn write(&self) -> Result<bool, ScoreStoreError> {
        let timestamp = chrono::Utc::now().timestamp_millis();

        self.store
            .save(ScoreRecord::history(
                self.user_id.clone(),
                self.game,
                self.score,
                timestamp,
            ))
            .await?;

        let is_new_best = match self.is_new_best {
            Some(known) => known,
            None => self.beats_stored_best().await,
        };

        if is_new_best {
            self.store
                .save(ScoreRecord::best(
                    self.user_id.clone(),
                    self.game,
                    self.score,
                    timestamp,
                ))
                .await?;
        }

        Ok(is_new_best)
    }

    /// Without a trusted baseline a failed read never counts as a new best,
    /// so a higher stored record is never overwritten.
    async fn beats_stored_best(&self) -> bool {
        match self.store.best_for(&self.user_id, self.game).await {
            Ok(best) => self.score > best.map_or(0, |record| record.score),
            Err(e) => {
                warn!(
                    "Failed to read best score for {} on {}, not writing a best record: {}",
                    self.user_id, self.game, e
                );
                false
            }
        }
    }
}
