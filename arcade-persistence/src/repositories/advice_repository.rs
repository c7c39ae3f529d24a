use anyhow::{Result, anyhow};
use arcade_types::{AdviceMessage, AdviceRole, AdviceThread, ChatTurn};
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{advice_messages, advice_threads, prelude::*};

const TITLE_MAX_CHARS: usize = 60;

/// Thread title taken from the opening dilemma, cut at a word boundary.
pub fn thread_title(dilemma: &str) -> String {
    let trimmed = dilemma.trim();
    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        return trimmed.to_string();
    }

    let cut: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
    let cut = match cut.rfind(char::is_whitespace) {
        Some(space) if space > 0 => &cut[..space],
        _ => cut.as_str(),
    };
    format!("{}...", cut.trim_end())
}

pub struct AdviceRepository {
    db: DatabaseConnection,
}

impl AdviceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_thread(model: advice_threads::Model) -> AdviceThread {
        AdviceThread {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            model: model.model,
            created_at: model.created_at.to_rfc3339(),
        }
    }

    fn model_to_message(model: advice_messages::Model) -> Result<AdviceMessage> {
        let role = AdviceRole::parse(&model.role)
            .ok_or_else(|| anyhow!("Unknown advice role '{}'", model.role))?;

        Ok(AdviceMessage {
            id: model.id,
            thread_id: model.thread_id,
            role,
            content: model.content,
            created_at: model.created_at.to_rfc3339(),
        })
    }

    /// Stores a new thread and its opening messages in one transaction.
    /// Messages get strictly increasing timestamps in the order given.
    pub async fn create_thread(
        &self,
        user_id: &str,
        title: &str,
        model: &str,
        messages: &[ChatTurn],
    ) -> Result<AdviceThread> {
        let now = chrono::Utc::now();
        let thread_id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        let thread = advice_threads::ActiveModel {
            id: ActiveValue::Set(thread_id),
            user_id: ActiveValue::Set(user_id.to_string()),
            title: ActiveValue::Set(title.to_string()),
            model: ActiveValue::Set(model.to_string()),
            created_at: ActiveValue::Set(now.into()),
        };
        AdviceThreads::insert(thread).exec_without_returning(&txn).await?;

        for (offset, turn) in messages.iter().enumerate() {
            let created_at = now + chrono::Duration::milliseconds(offset as i64);
            let message = advice_messages::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                thread_id: ActiveValue::Set(thread_id),
                role: ActiveValue::Set(turn.role.as_str().to_string()),
                content: ActiveValue::Set(turn.content.clone()),
                created_at: ActiveValue::Set(created_at.into()),
            };
            AdviceMessages::insert(message).exec_without_returning(&txn).await?;
        }

        txn.commit().await?;

        let created = AdviceThreads::find_by_id(thread_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Failed to retrieve created thread"))?;

        Ok(Self::model_to_thread(created))
    }

    /// Records one dilemma and the answer it got.
    pub async fn record_exchange(
        &self,
        user_id: &str,
        model: &str,
        dilemma: &str,
        answer: &str,
    ) -> Result<AdviceThread> {
        let messages = [
            ChatTurn {
                role: AdviceRole::User,
                content: dilemma.to_string(),
            },
            ChatTurn {
                role: AdviceRole::Assistant,
                content: answer.to_string(),
            },
        ];
        self.create_thread(user_id, &thread_title(dilemma), model, &messages)
            .await
    }

    /// A user's threads, newest first.
    pub async fn list_threads(&self, user_id: &str) -> Result<Vec<AdviceThread>> {
        let threads = AdviceThreads::find()
            .filter(advice_threads::Column::UserId.eq(user_id))
            .order_by_desc(advice_threads::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(threads.into_iter().map(Self::model_to_thread).collect())
    }

    /// A thread, only if `user_id` owns it.
    pub async fn find_thread(&self, user_id: &str, thread_id: Uuid) -> Result<Option<AdviceThread>> {
        let thread = AdviceThreads::find_by_id(thread_id)
            .filter(advice_threads::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;

        Ok(thread.map(Self::model_to_thread))
    }

    /// Messages of a thread ordered by creation time, then id.
    pub async fn list_messages(&self, thread_id: Uuid) -> Result<Vec<AdviceMessage>> {
        let messages = AdviceMessages::find()
            .filter(advice_messages::Column::ThreadId.eq(thread_id))
            .order_by_asc(advice_messages::Column::CreatedAt)
            .order_by_asc(advice_messages::Column::Id)
            .all(&self.db)
            .await?;

        messages.into_iter().map(Self::model_to_message).collect()
    }
}
