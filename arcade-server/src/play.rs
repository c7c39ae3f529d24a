use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use arcade_core::{
    ArcadeGame, CleanupReason, GameSession, ScoreStore, SessionCleanup, TrackedSession, Vocabulary,
};
use arcade_types::{GameAction, GameError, GameKind, ServerMessage, User};

use crate::websocket::connection::ConnectionId;

pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// One connection's running game plus the lifecycle wrapped around it.
struct ActiveSession {
    game: ArcadeGame,
    session: GameSession,
    rng: StdRng,
    clock: Instant,
    last_activity: Instant,
    outbox: Outbox,
    ticker: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn now(&self) -> Duration {
        self.clock.elapsed()
    }

    fn sync(&mut self) {
        self.session.update_score(self.game.score());
        self.session.set_level(self.game.level());
    }

    fn send(&self, message: ServerMessage) {
        // the receiver is gone once the socket closes
        let _ = self.outbox.send(message);
    }

    fn send_update(&self, outcome: Option<arcade_types::ActionOutcome>) {
        self.send(ServerMessage::GameUpdate {
            session: self.session.state().clone(),
            snapshot: self.game.snapshot(),
            outcome,
        });
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    /// Ends play and spawns the score save so the caller never waits on it.
    fn finish(&mut self) {
        self.stop_ticker();
        self.sync();

        let game = self.session.game();
        let pending = self.session.finish();
        self.send(ServerMessage::GameOver {
            game,
            session: self.session.state().clone(),
            snapshot: self.game.snapshot(),
        });

        if let Some(pending) = pending {
            let outbox = self.outbox.clone();
            tokio::spawn(async move {
                let outcome = pending.persist().await;
                let _ = outbox.send(ServerMessage::ScoreSaved { game, outcome });
            });
        }
    }
}

impl TrackedSession for ActiveSession {
    fn started_at(&self) -> Instant {
        self.clock
    }

    fn last_activity(&self) -> Instant {
        self.last_activity
    }
}

struct SessionTimes {
    started_at: Instant,
    last_activity: Instant,
}

impl TrackedSession for SessionTimes {
    fn started_at(&self) -> Instant {
        self.started_at
    }

    fn last_activity(&self) -> Instant {
        self.last_activity
    }
}

/// Server-side game sessions, at most one per connection.
pub struct PlayManager {
    sessions: DashMap<ConnectionId, Arc<Mutex<ActiveSession>>>,
    store: Arc<dyn ScoreStore>,
    vocabulary: Arc<Vocabulary>,
    cleanup: SessionCleanup,
    tick_interval: Duration,
}

impl PlayManager {
    pub fn new(store: Arc<dyn ScoreStore>, vocabulary: Arc<Vocabulary>, cleanup: SessionCleanup) -> Self {
        Self {
            sessions: DashMap::new(),
            store,
            vocabulary,
            cleanup,
            tick_interval: TICK_INTERVAL,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn has_session(&self, connection: ConnectionId) -> bool {
        self.sessions.contains_key(&connection)
    }

    fn session_for(&self, connection: ConnectionId) -> Result<Arc<Mutex<ActiveSession>>, GameError> {
        self.sessions
            .get(&connection)
            .map(|entry| entry.value().clone())
            .ok_or(GameError::NoActiveGame)
    }

    /// Starts `kind` for the connection, replacing whatever it was playing.
    pub async fn start_game(
        &self,
        connection: ConnectionId,
        user: Option<&User>,
        kind: GameKind,
        outbox: Outbox,
    ) -> Result<(), GameError> {
        self.teardown(connection).await;

        let mut rng = StdRng::from_entropy();
        let game = ArcadeGame::new(kind, &self.vocabulary, &mut rng)?;

        let mut session = GameSession::new(kind, user.map(|u| u.id.clone()), self.store.clone());
        session.load_best().await;
        session.start_game();

        let now = Instant::now();
        let mut active = ActiveSession {
            game,
            session,
            rng,
            clock: now,
            last_activity: now,
            outbox,
            ticker: None,
        };
        active.sync();
        active.send(ServerMessage::GameStarted {
            game: kind,
            session: active.session.state().clone(),
            snapshot: active.game.snapshot(),
        });

        let active = Arc::new(Mutex::new(active));
        let ticker = spawn_ticker(active.clone(), self.tick_interval);
        active.lock().await.ticker = Some(ticker);
        self.sessions.insert(connection, active);

        info!("Connection {} started {}", connection, kind);
        Ok(())
    }

    pub async fn apply_action(&self, connection: ConnectionId, action: GameAction) -> Result<(), GameError> {
        let active = self.session_for(connection)?;
        let mut active = active.lock().await;

        if !active.session.state().is_playing || active.game.is_over() {
            return Err(GameError::GameAlreadyOver);
        }

        active.last_activity = Instant::now();
        let now = active.now();
        let ActiveSession { game, rng, .. } = &mut *active;
        let outcome = game.apply(action, now, rng)?;
        active.sync();

        if active.game.is_over() {
            active.finish();
        } else {
            active.send_update(Some(outcome));
        }
        Ok(())
    }

    /// Ends the running game and saves its score.
    pub async fn end_game(&self, connection: ConnectionId) -> Result<(), GameError> {
        let (_, active) = self
            .sessions
            .remove(&connection)
            .ok_or(GameError::NoActiveGame)?;
        let mut active = active.lock().await;

        if active.session.state().is_playing {
            active.finish();
        } else {
            active.stop_ticker();
        }
        Ok(())
    }

    /// Drops the running game without saving anything.
    pub async fn reset_game(&self, connection: ConnectionId) -> Result<(), GameError> {
        let (_, active) = self
            .sessions
            .remove(&connection)
            .ok_or(GameError::NoActiveGame)?;
        let mut active = active.lock().await;

        active.stop_ticker();
        active.session.reset_game();
        active.send(ServerMessage::GameReset);
        Ok(())
    }

    pub async fn disconnect(&self, connection: ConnectionId) {
        if self.teardown(connection).await {
            debug!("Dropped game for disconnected connection {}", connection);
        }
    }

    async fn teardown(&self, connection: ConnectionId) -> bool {
        match self.sessions.remove(&connection) {
            Some((_, active)) => {
                active.lock().await.stop_ticker();
                true
            }
            None => false,
        }
    }

    /// Removes idle and overlong sessions. Returns how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let times: Vec<(ConnectionId, SessionTimes)> = self
            .sessions
            .iter()
            .filter_map(|entry| {
                // a locked session is in use right now
                let active = entry.value().try_lock().ok()?;
                Some((
                    *entry.key(),
                    SessionTimes {
                        started_at: active.started_at(),
                        last_activity: active.last_activity(),
                    },
                ))
            })
            .collect();

        let expired = self
            .cleanup
            .collect_expired(times.iter().map(|(id, t)| (id, t)), Instant::now());

        for (connection, reason) in &expired {
            if let Some((_, active)) = self.sessions.remove(connection) {
                let mut active = active.lock().await;
                active.stop_ticker();
                active.send(ServerMessage::Error {
                    message: session_closed_message(*reason),
                });
                info!("Cleaned up session for {}: {}", connection, reason);
            }
        }

        expired.len()
    }
}

fn session_closed_message(reason: CleanupReason) -> String {
    format!("Game closed: {}", reason)
}

fn spawn_ticker(active: Arc<Mutex<ActiveSession>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let mut active = active.lock().await;

            let now = active.now();
            let ActiveSession { game, rng, .. } = &mut *active;
            let changed = game.advance(now, rng);

            if active.game.is_over() {
                // this task is ending on its own; nothing to abort
                active.ticker.take();
                active.finish();
                return;
            }
            if changed {
                active.sync();
                active.send_update(None);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::InMemoryScoreStore;
    use arcade_types::GameSnapshot;
    use tokio::time::timeout;

    fn manager() -> (PlayManager, Arc<InMemoryScoreStore>) {
        let store = Arc::new(InMemoryScoreStore::new());
        let manager = PlayManager::new(
            store.clone(),
            Arc::new(Vocabulary::default()),
            SessionCleanup::default(),
        )
        .with_tick_interval(Duration::from_millis(10));
        (manager, store)
    }

    fn player() -> User {
        User {
            id: "player-1".to_string(),
            email: None,
            display_name: "Gherkin".to_string(),
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> ServerMessage {
        timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("outbox closed")
    }

    #[tokio::test]
    async fn test_start_sends_initial_state() {
        let (manager, _) = manager();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = ConnectionId::new();

        manager
            .start_game(connection, None, GameKind::SequenceMemory, tx)
            .await
            .unwrap();

        match next(&mut rx).await {
            ServerMessage::GameStarted { game, session, .. } => {
                assert_eq!(game, GameKind::SequenceMemory);
                assert!(session.is_playing);
                assert_eq!(session.score, 0);
                assert_eq!(session.level, 1);
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert_eq!(manager.active_count(), 1);
    }

    #[tokio::test]
    async fn test_wrong_pad_ends_game_and_saves() {
        let (manager, store) = manager();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = ConnectionId::new();

        manager
            .start_game(connection, Some(&player()), GameKind::SequenceMemory, tx)
            .await
            .unwrap();
        let first = match next(&mut rx).await {
            ServerMessage::GameStarted {
                snapshot: GameSnapshot::SequenceMemory(snapshot),
                ..
            } => snapshot.sequence[0],
            other => panic!("unexpected message: {:?}", other),
        };

        manager
            .apply_action(connection, GameAction::PressPad { pad: (first + 1) % 4 })
            .await
            .unwrap();

        assert!(matches!(next(&mut rx).await, ServerMessage::GameOver { .. }));
        match next(&mut rx).await {
            ServerMessage::ScoreSaved { game, outcome } => {
                assert_eq!(game, GameKind::SequenceMemory);
                assert_eq!(outcome.score, 0);
                assert!(!outcome.is_new_best);
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert_eq!(store.len().await, 1);

        let again = manager
            .apply_action(connection, GameAction::PressPad { pad: first })
            .await;
        assert!(matches!(again, Err(GameError::GameAlreadyOver)));
    }

    #[tokio::test]
    async fn test_action_without_game() {
        let (manager, _) = manager();
        let result = manager
            .apply_action(ConnectionId::new(), GameAction::React)
            .await;
        assert!(matches!(result, Err(GameError::NoActiveGame)));
    }

    #[tokio::test]
    async fn test_mismatched_action_rejected() {
        let (manager, _) = manager();
        let (tx, _rx) = mpsc::unbounded_channel();
        let connection = ConnectionId::new();
        manager
            .start_game(connection, None, GameKind::ReactionTime, tx)
            .await
            .unwrap();

        let result = manager
            .apply_action(connection, GameAction::PopCell { cell: 0 })
            .await;
        assert!(matches!(result, Err(GameError::InvalidAction { .. })));
    }

    #[tokio::test]
    async fn test_ticker_pushes_countdown() {
        let (manager, _) = manager();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = ConnectionId::new();
        manager
            .start_game(connection, None, GameKind::PicklePop, tx)
            .await
            .unwrap();
        next(&mut rx).await;

        match next(&mut rx).await {
            ServerMessage::GameUpdate { outcome, .. } => assert_eq!(outcome, None),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_restart_and_reset_stop_ticking() {
        let (manager, _) = manager();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = ConnectionId::new();

        manager
            .start_game(connection, None, GameKind::PicklePop, tx.clone())
            .await
            .unwrap();
        manager
            .start_game(connection, None, GameKind::PicklePop, tx)
            .await
            .unwrap();
        assert_eq!(manager.active_count(), 1);

        manager.reset_game(connection).await.unwrap();
        assert!(!manager.has_session(connection));

        while let Ok(message) = rx.try_recv() {
            if matches!(message, ServerMessage::GameReset) {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_end_game_saves_for_user() {
        let (manager, store) = manager();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = ConnectionId::new();
        manager
            .start_game(connection, Some(&player()), GameKind::PickleMatch, tx)
            .await
            .unwrap();

        manager.end_game(connection).await.unwrap();
        assert!(!manager.has_session(connection));

        let mut saved = false;
        for _ in 0..3 {
            if let ServerMessage::ScoreSaved { .. } = next(&mut rx).await {
                saved = true;
                break;
            }
        }
        assert!(saved);
        assert!(store.len().await >= 1);
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_sessions() {
        let store = Arc::new(InMemoryScoreStore::new());
        let manager = PlayManager::new(
            store,
            Arc::new(Vocabulary::default()),
            SessionCleanup::new(Duration::from_millis(20), Duration::from_secs(60)),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let connection = ConnectionId::new();
        manager
            .start_game(connection, None, GameKind::SequenceMemory, tx)
            .await
            .unwrap();

        assert_eq!(manager.cleanup_expired().await, 0);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(manager.cleanup_expired().await, 1);
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_drops_session() {
        let (manager, _) = manager();
        let (tx, _rx) = mpsc::unbounded_channel();
        let connection = ConnectionId::new();
        manager
            .start_game(connection, None, GameKind::WordScramble, tx)
            .await
            .unwrap();

        manager.disconnect(connection).await;
        assert_eq!(manager.active_count(), 0);
    }
}
