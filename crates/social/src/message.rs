use core::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use haulboard_core::{DomainError, DomainResult, MessageId, UserId};

/// Private message between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender_id: UserId,
        recipient_id: UserId,
        body: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(DomainError::validation("message body must not be empty"));
        }
        Ok(Self {
            id: MessageId::new(),
            sender_id,
            recipient_id,
            body,
            timestamp,
        })
    }

    /// Inbox order: newest first, ties broken by id.
    pub fn inbox_order(a: &Message, b: &Message) -> Ordering {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    }
}
