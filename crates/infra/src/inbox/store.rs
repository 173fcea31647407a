use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use haulboard_core::UserId;
use haulboard_social::Message;

use crate::error::StoreError;

/// Private message persistence plus per-user read markers.
pub trait MessageStore: Send + Sync {
    fn insert(&self, message: Message) -> Result<(), StoreError>;

    /// Messages received by `recipient` strictly after `after` (all of them
    /// when `after` is `None`).
    fn count_received_after(
        &self,
        recipient: UserId,
        after: Option<DateTime<Utc>>,
    ) -> Result<usize, StoreError>;

    /// Received messages in inbox order (newest first), windowed.
    fn received_window(
        &self,
        recipient: UserId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError>;

    fn last_read(&self, user: UserId) -> Result<Option<DateTime<Utc>>, StoreError>;

    fn set_last_read(&self, user: UserId, at: DateTime<Utc>) -> Result<(), StoreError>;
}

impl<S> MessageStore for Arc<S>
where
    S: MessageStore + ?Sized,
{
    fn insert(&self, message: Message) -> Result<(), StoreError> {
        (**self).insert(message)
    }

    fn count_received_after(
        &self,
        recipient: UserId,
        after: Option<DateTime<Utc>>,
    ) -> Result<usize, StoreError> {
        (**self).count_received_after(recipient, after)
    }

    fn received_window(
        &self,
        recipient: UserId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        (**self).received_window(recipient, offset, limit)
    }

    fn last_read(&self, user: UserId) -> Result<Option<DateTime<Utc>>, StoreError> {
        (**self).last_read(user)
    }

    fn set_last_read(&self, user: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        (**self).set_last_read(user, at)
    }
}

#[derive(Debug, Default)]
struct Mailboxes {
    received: HashMap<UserId, Vec<Message>>,
    last_read: HashMap<UserId, DateTime<Utc>>,
}

/// In-memory message store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    inner: RwLock<Mailboxes>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageStore for InMemoryMessageStore {
    fn insert(&self, message: Message) -> Result<(), StoreError> {
        let mut boxes = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let inbox = boxes.received.entry(message.recipient_id).or_default();
        if inbox.iter().any(|m| m.id == message.id) {
            return Err(StoreError::Conflict(format!("message {} exists", message.id)));
        }
        let at = inbox.partition_point(|m| Message::inbox_order(m, &message).is_lt());
        inbox.insert(at, message);
        Ok(())
    }

    fn count_received_after(
        &self,
        recipient: UserId,
        after: Option<DateTime<Utc>>,
    ) -> Result<usize, StoreError> {
        let boxes = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(boxes.received.get(&recipient).map_or(0, |inbox| match after {
            Some(after) => inbox.iter().filter(|m| m.timestamp > after).count(),
            None => inbox.len(),
        }))
    }

    fn received_window(
        &self,
        recipient: UserId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let boxes = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(boxes
            .received
            .get(&recipient)
            .map(|inbox| inbox.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn last_read(&self, user: UserId) -> Result<Option<DateTime<Utc>>, StoreError> {
        let boxes = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(boxes.last_read.get(&user).copied())
    }

    fn set_last_read(&self, user: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut boxes = self.inner.write().map_err(|_| StoreError::poisoned())?;
        boxes.last_read.insert(user, at);
        Ok(())
    }
}
