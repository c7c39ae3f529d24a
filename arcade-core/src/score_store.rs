use std::collections::HashMap;

use arcade_types::{GameKind, ScoreKind, ScoreRecord};
use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum ScoreStoreError {
    #[error("score store backend error: {0}")]
    Backend(String),
    #[error("score store unavailable")]
    Unavailable,
}

/// Persistence contract consumed by the session controller.
///
/// History records accumulate; the best record for a `(user, game)` pair
/// lives under one key and is overwritten (last write wins).
#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn save(&self, record: ScoreRecord) -> Result<(), ScoreStoreError>;

    async fn best_for(
        &self,
        user_id: &str,
        game: GameKind,
    ) -> Result<Option<ScoreRecord>, ScoreStoreError>;

    /// Best records for a game, score descending.
    async fn leaderboard(
        &self,
        game: GameKind,
        limit: u64,
    ) -> Result<Vec<ScoreRecord>, ScoreStoreError>;

    /// Every record for a user regardless of kind, newest first.
    async fn scores_for_user(&self, user_id: &str) -> Result<Vec<ScoreRecord>, ScoreStoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryScoreStore {
    records: RwLock<HashMap<String, ScoreRecord>>,
}

impl InMemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ScoreStore for InMemoryScoreStore {
    async fn save(&self, record: ScoreRecord) -> Result<(), ScoreStoreError> {
        let mut records = self.records.write().await;
        records.insert(record.key(), record);
        Ok(())
    }

    async fn best_for(
        &self,
        user_id: &str,
        game: GameKind,
    ) -> Result<Option<ScoreRecord>, ScoreStoreError> {
        let key = ScoreRecord::best(user_id, game, 0, 0).key();
        Ok(self.records.read().await.get(&key).cloned())
    }

    async fn leaderboard(
        &self,
        game: GameKind,
        limit: u64,
    ) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        let records = self.records.read().await;
        let mut best: Vec<ScoreRecord> = records
            .values()
            .filter(|r| r.kind == ScoreKind::Best && r.game_id == game)
            .cloned()
            .collect();

        best.sort_by(|a, b| b.score.cmp(&a.score).then(a.timestamp.cmp(&b.timestamp)));
        best.truncate(limit as usize);
        Ok(best)
    }

    async fn scores_for_user(&self, user_id: &str) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        let records = self.records.read().await;
        let mut mine: Vec<ScoreRecord> = records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();

        mine.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(mine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_best_record_is_overwritten() {
        let store = InMemoryScoreStore::new();
        store
            .save(ScoreRecord::best("alice", GameKind::SpeedPickle, 300, 1))
            .await
            .unwrap();
        store
            .save(ScoreRecord::best("alice", GameKind::SpeedPickle, 900, 2))
            .await
            .unwrap();

        let best = store
            .best_for("alice", GameKind::SpeedPickle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(best.score, 900);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_leaderboard_only_best_records_descending() {
        let store = InMemoryScoreStore::new();
        for (user, score) in [("a", 100), ("b", 500), ("c", 250)] {
            store
                .save(ScoreRecord::history(user, GameKind::PicklePop, score, 10))
                .await
                .unwrap();
            store
                .save(ScoreRecord::best(user, GameKind::PicklePop, score, 10))
                .await
                .unwrap();
        }
        store
            .save(ScoreRecord::best("z", GameKind::ReactionTime, 999, 10))
            .await
            .unwrap();

        let board = store.leaderboard(GameKind::PicklePop, 2).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_id, "b");
        assert_eq!(board[1].user_id, "c");
        assert!(board.iter().all(|r| r.kind == ScoreKind::Best));
    }

    #[tokio::test]
    async fn test_scores_for_user_unfiltered_by_kind() {
        let store = InMemoryScoreStore::new();
        store
            .save(ScoreRecord::history("alice", GameKind::WordScramble, 40, 1))
            .await
            .unwrap();
        store
            .save(ScoreRecord::history("alice", GameKind::WordScramble, 80, 2))
            .await
            .unwrap();
        store
            .save(ScoreRecord::best("alice", GameKind::WordScramble, 80, 2))
            .await
            .unwrap();
        store
            .save(ScoreRecord::history("bob", GameKind::WordScramble, 10, 3))
            .await
            .unwrap();

        let mine = store.scores_for_user("alice").await.unwrap();
        assert_eq!(mine.len(), 3);
        assert!(mine.iter().all(|r| r.user_id == "alice"));
    }
}
