//! Live change feed for the support chat.
//!
//! Backends publish every stored message here; consumers hold a
//! [`ChatSubscription`] and await events. Delivery from the underlying
//! channel is at-least-once, so the subscription filters to its user and
//! drops repeated inserts of the same message id before the caller sees
//! them. Dropping the subscription unsubscribes.

use std::collections::HashSet;
use tokio::sync::broadcast;

use study_core::model::{ChatMessage, MessageId, UserId};

const FEED_CAPACITY: usize = 256;

/// What happened to a chat row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
}

/// One change to a user's chat thread.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub kind: ChangeKind,
    pub message: ChatMessage,
}

/// Process-wide fanout for chat changes, shared by a backend and all of
/// its subscribers.
#[derive(Clone)]
pub struct ChatFeed {
    tx: broadcast::Sender<ChatEvent>,
}

impl ChatFeed {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Publishes an event to every live subscriber. A feed with no
    /// subscribers silently drops the event.
    pub fn publish(&self, event: ChatEvent) {
        let _ = self.tx.send(event);
    }

    /// Opens a subscription scoped to one user's thread.
    #[must_use]
    pub fn subscribe(&self, user: UserId) -> ChatSubscription {
        ChatSubscription {
            user,
            rx: self.tx.subscribe(),
            seen: HashSet::new(),
        }
    }
}

impl Default for ChatFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// An open, owned subscription to one user's chat changes.
pub struct ChatSubscription {
    user: UserId,
    rx: broadcast::Receiver<ChatEvent>,
    seen: HashSet<MessageId>,
}

impl ChatSubscription {
    /// Waits for the next event on this user's thread.
    ///
    /// Returns `None` once the feed has shut down. A repeated insert of an
    /// already delivered message id is skipped; updates always pass. When
    /// the subscriber lags behind the channel it skips ahead to the oldest
    /// retained event instead of failing.
    pub async fn next(&mut self) -> Option<ChatEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if event.message.user_id() != self.user {
                        continue;
                    }
                    match event.kind {
                        ChangeKind::Insert => {
                            if !self.seen.insert(event.message.id()) {
                                continue;
                            }
                        }
                        ChangeKind::Update => {
                            self.seen.insert(event.message.id());
                        }
                    }
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
