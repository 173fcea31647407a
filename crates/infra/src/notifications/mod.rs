//! Per-user notification stream.
//!
//! Append-only, timestamped events keyed by a symbolic name. Clients poll
//! with the highest timestamp they have seen and receive everything newer.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryNotificationStore;
pub use r#trait::{Notification, NotificationStore, NotificationStoreError};

/// Progress update for a running task: `{task_id, name, progress}`.
pub const TASK_PROGRESS: &str = "task_progress";

/// Terminal state of a task: `{task_id, name, status, result | error}`.
pub const TASK_COMPLETE: &str = "task_complete";

/// Number of messages received since the user last opened the inbox.
pub const UNREAD_MESSAGE_COUNT: &str = "unread_message_count";
