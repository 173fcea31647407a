use thiserror::Error;

use haulboard_core::{TaskId, UserId};

use crate::notifications::NotificationStoreError;

use super::store::TaskStoreError;

#[derive(Debug, Error)]
pub enum TaskError {
    /// An active task with the same name already exists for this owner.
    /// Expected user-facing state, not a system fault.
    #[error("task '{name}' is already running for user {owner_id}")]
    AlreadyRunning { owner_id: UserId, name: String },

    #[error("no job registered under '{0}'")]
    UnknownJob(String),

    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error(transparent)]
    Store(TaskStoreError),

    #[error(transparent)]
    Notification(#[from] NotificationStoreError),
}

impl From<TaskStoreError> for TaskError {
    fn from(err: TaskStoreError) -> Self {
        match err {
            TaskStoreError::NotFound(id) => TaskError::NotFound(id),
            other => TaskError::Store(other),
        }
    }
}
