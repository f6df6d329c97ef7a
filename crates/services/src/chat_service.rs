use std::sync::Arc;

use study_core::Clock;
use study_core::model::{ChatMessage, ChatSender, MessageId, UserId};
use storage::realtime::{ChatFeed, ChatSubscription};
use storage::repository::ChatMessageRepository;

use crate::error::ChatServiceError;

/// The support-chat thread: persists messages and hands out live
/// subscriptions so an open panel sees tutor replies as they land.
#[derive(Clone)]
pub struct ChatService {
    clock: Clock,
    chat: Arc<dyn ChatMessageRepository>,
    feed: ChatFeed,
}

impl ChatService {
    #[must_use]
    pub fn new(clock: Clock, chat: Arc<dyn ChatMessageRepository>, feed: ChatFeed) -> Self {
        Self { clock, chat, feed }
    }

    /// Store one message on the user's thread. The backend publishes it
    /// to live subscribers as part of the append.
    ///
    /// # Errors
    ///
    /// Returns `ChatServiceError::Chat` for a blank body and
    /// `ChatServiceError::Storage` if the row cannot be stored.
    pub async fn send(
        &self,
        user: UserId,
        sender: ChatSender,
        body: &str,
    ) -> Result<ChatMessage, ChatServiceError> {
        let message = ChatMessage::new(MessageId::new(), user, sender, body, self.clock.now())?;
        self.chat.append_message(&message).await?;
        Ok(message)
    }

    /// The most recent `limit` messages of the thread, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ChatServiceError::Storage` if repository access fails.
    pub async fn history(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, ChatServiceError> {
        let messages = self.chat.messages_for_user(user, limit).await?;
        Ok(messages)
    }

    /// Open a live subscription to the user's thread. Only messages sent
    /// after this call are delivered; pair it with [`Self::history`].
    #[must_use]
    pub fn subscribe(&self, user: UserId) -> ChatSubscription {
        self.feed.subscribe(user)
    }
}
