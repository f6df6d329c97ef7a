use study_core::model::{ChatMessage, UserId};

use super::SqliteRepository;
use super::mapping::map_chat_row;
use crate::realtime::{ChangeKind, ChatEvent};
use crate::repository::{ChatMessageRepository, StorageError};

#[async_trait::async_trait]
impl ChatMessageRepository for SqliteRepository {
    async fn append_message(&self, message: &ChatMessage) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO tutor_chat_messages (id, user_id, sender, body, sent_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(message.id().to_string())
        .bind(message.user_id().to_string())
        .bind(message.sender().as_str())
        .bind(message.body())
        .bind(message.sent_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.feed.publish(ChatEvent {
            kind: ChangeKind::Insert,
            message: message.clone(),
        });

        Ok(())
    }

    async fn messages_for_user(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        // Newest `limit` rows, then flipped back to chronological order.
        let rows = sqlx::query(
            r"
                SELECT id, user_id, sender, body, sent_at
                FROM tutor_chat_messages
                WHERE user_id = ?1
                ORDER BY sent_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(user.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows.iter().rev() {
            out.push(map_chat_row(row)?);
        }

        Ok(out)
    }
}
