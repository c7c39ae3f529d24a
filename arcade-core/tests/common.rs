#![allow(dead_code)]

use arcade_core::{
    GameSession, InMemoryScoreStore, ScoreStore, ScoreStoreError, SessionEvent,
    SessionEventHandler,
};
use arcade_types::{GameKind, ScoreRecord};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_USER: &str = "test-user-alice";

/// Creates a signed-in session backed by a fresh in-memory store
pub fn create_test_session(game: GameKind) -> (GameSession, Arc<InMemoryScoreStore>) {
    let store = Arc::new(InMemoryScoreStore::new());
    let session = GameSession::new(game, Some(TEST_USER.to_string()), store.clone());
    (session, store)
}

/// Creates a signed-out session
pub fn create_anonymous_session(game: GameKind) -> (GameSession, Arc<InMemoryScoreStore>) {
    let store = Arc::new(InMemoryScoreStore::new());
    let session = GameSession::new(game, None, store.clone());
    (session, store)
}

/// Plays one full session ending on `score`
pub async fn play_to_score(session: &mut GameSession, score: u32) -> bool {
    session.start_game();
    session.update_score(score);
    session.end_game().await.is_new_best
}

/// Store whose every call fails
pub struct FailingScoreStore;

#[async_trait]
impl ScoreStore for FailingScoreStore {
    async fn save(&self, _record: ScoreRecord) -> Result<(), ScoreStoreError> {
        Err(ScoreStoreError::Unavailable)
    }

    async fn best_for(
        &self,
        _user_id: &str,
        _game: GameKind,
    ) -> Result<Option<ScoreRecord>, ScoreStoreError> {
        Err(ScoreStoreError::Unavailable)
    }

    async fn leaderboard(
        &self,
        _game: GameKind,
        _limit: u64,
    ) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        Err(ScoreStoreError::Unavailable)
    }

    async fn scores_for_user(&self, _user_id: &str) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        Err(ScoreStoreError::Backend("connection refused".to_string()))
    }
}

/// In-memory store whose first `failures` best-score reads fail
pub struct FlakyBestStore {
    inner: InMemoryScoreStore,
    failures: AtomicUsize,
}

impl FlakyBestStore {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: InMemoryScoreStore::new(),
            failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl ScoreStore for FlakyBestStore {
    async fn save(&self, record: ScoreRecord) -> Result<(), ScoreStoreError> {
        self.inner.save(record).await
    }

    async fn best_for(
        &self,
        user_id: &str,
        game: GameKind,
    ) -> Result<Option<ScoreRecord>, ScoreStoreError> {
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(ScoreStoreError::Unavailable);
        }
        self.inner.best_for(user_id, game).await
    }

    async fn leaderboard(
        &self,
        game: GameKind,
        limit: u64,
    ) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        self.inner.leaderboard(game, limit).await
    }

    async fn scores_for_user(&self, user_id: &str) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        self.inner.scores_for_user(user_id).await
    }
}

/// Event collector for testing event emissions
#[derive(Clone)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_event(&self) -> Option<SessionEvent> {
        self.events.lock().unwrap().last().cloned()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn has_event_type(&self, check_fn: impl Fn(&SessionEvent) -> bool) -> bool {
        self.events.lock().unwrap().iter().any(check_fn)
    }
}

impl SessionEventHandler for EventCollector {
    fn handle_event(&mut self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}
