use anyhow::Result;
use arcade_core::{ScoreStore, ScoreStoreError};
use arcade_types::{GameKind, LeaderboardEntry, ScoreKind, ScoreRecord};
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::{prelude::*, score_records};

/// SQL-backed score store. Records are keyed the same way as the
/// in-memory store so the best record is overwritten in place.
#[derive(Clone)]
pub struct ScoreRepository {
    db: DatabaseConnection,
}

fn backend(e: DbErr) -> ScoreStoreError {
    ScoreStoreError::Backend(e.to_string())
}

impl ScoreRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_record(model: score_records::Model) -> Result<ScoreRecord, ScoreStoreError> {
        let game_id = model
            .game_id
            .parse::<GameKind>()
            .map_err(|e| ScoreStoreError::Backend(e.to_string()))?;
        let kind = ScoreKind::parse(&model.kind)
            .ok_or_else(|| ScoreStoreError::Backend(format!("unknown score kind '{}'", model.kind)))?;

        Ok(ScoreRecord {
            user_id: model.user_id,
            game_id,
            score: model.score.max(0) as u32,
            timestamp: model.timestamp,
            kind,
        })
    }

    fn models_to_records(
        models: Vec<score_records::Model>,
    ) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        models.into_iter().map(Self::model_to_record).collect()
    }

    /// Ranked leaderboard for a game, rank 1 first.
    pub async fn get_leaderboard(&self, game: GameKind, limit: u64) -> Result<Vec<LeaderboardEntry>> {
        let records = self.leaderboard(game, limit).await?;

        Ok(records
            .into_iter()
            .enumerate()
            .map(|(index, record)| LeaderboardEntry {
                rank: (index + 1) as u32,
                record,
            })
            .collect())
    }
}

#[async_trait]
impl ScoreStore for ScoreRepository {
    async fn save(&self, record: ScoreRecord) -> Result<(), ScoreStoreError> {
        let model = score_records::ActiveModel {
            key: sea_orm::ActiveValue::Set(record.key()),
            user_id: sea_orm::ActiveValue::Set(record.user_id),
            game_id: sea_orm::ActiveValue::Set(record.game_id.id().to_string()),
            score: sea_orm::ActiveValue::Set(record.score.min(i32::MAX as u32) as i32),
            timestamp: sea_orm::ActiveValue::Set(record.timestamp),
            kind: sea_orm::ActiveValue::Set(record.kind.as_str().to_string()),
        };

        ScoreRecords::insert(model)
            .on_conflict(
                OnConflict::column(score_records::Column::Key)
                    .update_columns([
                        score_records::Column::Score,
                        score_records::Column::Timestamp,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn best_for(
        &self,
        user_id: &str,
        game: GameKind,
    ) -> Result<Option<ScoreRecord>, ScoreStoreError> {
        let key = ScoreRecord::best(user_id, game, 0, 0).key();
        let model = ScoreRecords::find_by_id(key)
            .one(&self.db)
            .await
            .map_err(backend)?;

        model.map(Self::model_to_record).transpose()
    }

    async fn leaderboard(
        &self,
        game: GameKind,
        limit: u64,
    ) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        let models = ScoreRecords::find()
            .filter(score_records::Column::GameId.eq(game.id()))
            .filter(score_records::Column::Kind.eq(ScoreKind::Best.as_str()))
            .order_by_desc(score_records::Column::Score)
            .order_by_asc(score_records::Column::Timestamp)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(backend)?;

        Self::models_to_records(models)
    }

    async fn scores_for_user(&self, user_id: &str) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        let models = ScoreRecords::find()
            .filter(score_records::Column::UserId.eq(user_id))
            .order_by_desc(score_records::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(backend)?;

        Self::models_to_records(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use arcade_core::GameSession;
    use migration::{Migrator, MigratorTrait};
    use std::sync::Arc;

    async fn setup_test_db() -> ScoreRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        ScoreRepository::new(db)
    }

    #[tokio::test]
    async fn test_save_and_read_best() {
        let repo = setup_test_db().await;

        repo.save(ScoreRecord::best("alice", GameKind::PicklePop, 420, 1_000))
            .await
            .unwrap();

        let best = repo
            .best_for("alice", GameKind::PicklePop)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(best.score, 420);
        assert_eq!(best.kind, ScoreKind::Best);
        assert!(repo.best_for("bob", GameKind::PicklePop).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_best_record_is_overwritten() {
        let repo = setup_test_db().await;

        repo.save(ScoreRecord::best("alice", GameKind::SpeedPickle, 300, 1))
            .await
            .unwrap();
        repo.save(ScoreRecord::best("alice", GameKind::SpeedPickle, 900, 2))
            .await
            .unwrap();

        let all = repo.scores_for_user("alice").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].score, 900);
        assert_eq!(all[0].timestamp, 2);
    }

    #[tokio::test]
    async fn test_leaderboard() {
        let repo = setup_test_db().await;

        for (user, score) in [("user1", 100), ("user2", 200), ("user3", 50)] {
            repo.save(ScoreRecord::history(user, GameKind::WordScramble, score, 10))
                .await
                .unwrap();
            repo.save(ScoreRecord::best(user, GameKind::WordScramble, score, 10))
                .await
                .unwrap();
        }
        // other games never leak in
        repo.save(ScoreRecord::best("user4", GameKind::ReactionTime, 1000, 10))
            .await
            .unwrap();

        let leaderboard = repo.get_leaderboard(GameKind::WordScramble, 10).await.unwrap();

        assert_eq!(leaderboard.len(), 3);
        assert_eq!(leaderboard[0].record.score, 200);
        assert_eq!(leaderboard[0].rank, 1);
        assert_eq!(leaderboard[0].record.user_id, "user2");
        assert_eq!(leaderboard[1].record.score, 100);
        assert_eq!(leaderboard[2].record.score, 50);
        assert_eq!(leaderboard[2].rank, 3);
    }

    #[tokio::test]
    async fn test_leaderboard_limit() {
        let repo = setup_test_db().await;

        for i in 1..=5u32 {
            repo.save(ScoreRecord::best(
                format!("user{}", i),
                GameKind::SequenceMemory,
                i * 100,
                i as i64,
            ))
            .await
            .unwrap();
        }

        let top = repo.leaderboard(GameKind::SequenceMemory, 3).await.unwrap();
        let scores: Vec<u32> = top.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![500, 400, 300]);
    }

    #[tokio::test]
    async fn test_scores_for_user_newest_first() {
        let repo = setup_test_db().await;

        repo.save(ScoreRecord::history("alice", GameKind::PickleMatch, 100, 1))
            .await
            .unwrap();
        repo.save(ScoreRecord::history("alice", GameKind::PicklePop, 50, 3))
            .await
            .unwrap();
        repo.save(ScoreRecord::history("bob", GameKind::PicklePop, 70, 2))
            .await
            .unwrap();

        let scores = repo.scores_for_user("alice").await.unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].timestamp, 3);
        assert_eq!(scores[1].game_id, GameKind::PickleMatch);
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let repo = Arc::new(setup_test_db().await);
        let mut session = GameSession::new(
            GameKind::SpeedPickle,
            Some("alice".to_string()),
            repo.clone(),
        );
        session.start_game();
        session.update_score(700);
        let outcome = session.end_game().await;
        assert!(outcome.is_new_best);

        let best = repo
            .best_for("alice", GameKind::SpeedPickle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(best.score, 700);
    }
}
