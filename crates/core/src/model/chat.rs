use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{MessageId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChatError {
    #[error("chat message body cannot be empty")]
    EmptyBody,

    #[error("unknown chat sender: {0}")]
    UnknownSender(String),
}

/// Which side of the support conversation wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatSender {
    Student,
    Tutor,
}

impl ChatSender {
    /// Parses the persisted sender tag.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::UnknownSender` for anything but `student` or
    /// `tutor`.
    pub fn parse(value: &str) -> Result<Self, ChatError> {
        match value {
            "student" => Ok(Self::Student),
            "tutor" => Ok(Self::Tutor),
            other => Err(ChatError::UnknownSender(other.to_string())),
        }
    }

    /// The persisted tag for this sender.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Tutor => "tutor",
        }
    }
}

/// One message in a learner's support-chat thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    id: MessageId,
    user_id: UserId,
    sender: ChatSender,
    body: String,
    sent_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a message with a trimmed, non-empty body.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::EmptyBody` when the body is blank.
    pub fn new(
        id: MessageId,
        user_id: UserId,
        sender: ChatSender,
        body: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Self, ChatError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ChatError::EmptyBody);
        }
        Ok(Self {
            id,
            user_id,
            sender,
            body: body.to_string(),
            sent_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn sender(&self) -> ChatSender {
        self.sender
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn sender_tag_round_trips() {
        assert_eq!(ChatSender::parse("student").unwrap(), ChatSender::Student);
        assert_eq!(ChatSender::parse("tutor").unwrap(), ChatSender::Tutor);
        assert_eq!(ChatSender::Tutor.as_str(), "tutor");
        assert!(ChatSender::parse("admin").is_err());
    }

    #[test]
    fn blank_body_is_rejected() {
        let err = ChatMessage::new(
            MessageId::new(),
            UserId::new(),
            ChatSender::Student,
            "  \n ",
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, ChatError::EmptyBody);
    }
}
