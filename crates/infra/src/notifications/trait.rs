use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use haulboard_core::UserId;

/// A stored notification.
///
/// `timestamp` is seconds since the Unix epoch. Per owner it is strictly
/// increasing in append order and never reused, so it doubles as the polling
/// watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub owner_id: UserId,
    pub name: String,
    pub timestamp: f64,
    pub payload: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationStoreError {
    #[error("storage error: {0}")]
    Storage(String),
}

/// Append-only, owner-scoped notification log.
///
/// Implementations must:
/// - assign each appended notification a timestamp strictly greater than the
///   owner's previous one, even if the clock has not advanced
/// - serialize appends per owner only; different owners must not contend
/// - return `since` results in ascending timestamp order (the append order)
pub trait NotificationStore: Send + Sync {
    fn append(
        &self,
        owner_id: UserId,
        name: &str,
        payload: JsonValue,
    ) -> Result<Notification, NotificationStoreError>;

    /// Every notification for `owner_id` with `timestamp > watermark`, ascending.
    fn since(&self, owner_id: UserId, watermark: f64) -> Result<Vec<Notification>, NotificationStoreError>;
}

impl<S> NotificationStore for Arc<S>
where
    S: NotificationStore + ?Sized,
{
    fn append(
        &self,
        owner_id: UserId,
        name: &str,
        payload: JsonValue,
    ) -> Result<Notification, NotificationStoreError> {
        (**self).append(owner_id, name, payload)
    }

    fn since(&self, owner_id: UserId, watermark: f64) -> Result<Vec<Notification>, NotificationStoreError> {
        (**self).since(owner_id, watermark)
    }
}
