//! Task storage implementations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use haulboard_core::{TaskId, UserId};

use super::types::{Task, TaskOutcome};

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// An active task already holds the `(owner, name)` slot.
    ActiveExists(TaskId),
}

/// Task store abstraction.
pub trait TaskStore: Send + Sync {
    /// Insert `task` unless an active task with the same `(owner_id, name)`
    /// exists.
    ///
    /// Check and insert must be one atomic step for concurrent callers using
    /// the same key; callers with different keys must not block each other.
    fn insert_if_idle(&self, task: Task) -> Result<InsertOutcome, TaskStoreError>;

    fn get(&self, task_id: TaskId) -> Result<Option<Task>, TaskStoreError>;

    fn find_active(&self, owner_id: UserId, name: &str) -> Result<Option<Task>, TaskStoreError>;

    /// All tasks of an owner, oldest first (history included).
    fn list_for_owner(&self, owner_id: UserId) -> Result<Vec<Task>, TaskStoreError>;

    /// Every active task across owners.
    fn list_active(&self) -> Result<Vec<Task>, TaskStoreError>;

    /// Persist progress. `Ok(None)` when the task is already complete.
    fn record_progress(
        &self,
        task_id: TaskId,
        fraction: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, TaskStoreError>;

    /// Flip the task to complete and release its active slot.
    /// `Ok(None)` when it was already complete.
    fn mark_complete(
        &self,
        task_id: TaskId,
        outcome: TaskOutcome,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, TaskStoreError>;
}

/// Task store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskStoreError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ActiveKey {
    owner_id: UserId,
    name: String,
}

impl ActiveKey {
    fn of(task: &Task) -> Self {
        Self {
            owner_id: task.owner_id,
            name: task.name.clone(),
        }
    }
}

/// In-memory task store for tests/dev.
///
/// `active` is the unique index over `(owner, name)` for incomplete tasks.
/// Its entry lock is the conditional-insert primitive, so only callers
/// hashing to the same shard ever wait on each other.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<TaskId, Task>,
    active: DashMap<ActiveKey, TaskId>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl TaskStore for InMemoryTaskStore {
    fn insert_if_idle(&self, task: Task) -> Result<InsertOutcome, TaskStoreError> {
        match self.active.entry(ActiveKey::of(&task)) {
            Entry::Occupied(slot) => Ok(InsertOutcome::ActiveExists(*slot.get())),
            Entry::Vacant(slot) => {
                let id = task.id;
                self.tasks.insert(id, task);
                slot.insert(id);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    fn get(&self, task_id: TaskId) -> Result<Option<Task>, TaskStoreError> {
        Ok(self.tasks.get(&task_id).map(|t| t.value().clone()))
    }

    fn find_active(&self, owner_id: UserId, name: &str) -> Result<Option<Task>, TaskStoreError> {
        let key = ActiveKey {
            owner_id,
            name: name.to_string(),
        };
        // Copy the id out before touching `tasks`; never hold both maps' guards.
        let Some(task_id) = self.active.get(&key).map(|id| *id.value()) else {
            return Ok(None);
        };
        Ok(self
            .tasks
            .get(&task_id)
            .map(|t| t.value().clone())
            .filter(Task::is_active))
    }

    fn list_for_owner(&self, owner_id: UserId) -> Result<Vec<Task>, TaskStoreError> {
        let mut result: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .map(|t| t.value().clone())
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(result)
    }

    fn list_active(&self) -> Result<Vec<Task>, TaskStoreError> {
        let mut result: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.is_active())
            .map(|t| t.value().clone())
            .collect();
        result.sort_by_key(|t| t.created_at);
        Ok(result)
    }

    fn record_progress(
        &self,
        task_id: TaskId,
        fraction: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, TaskStoreError> {
        let mut task = self
            .tasks
            .get_mut(&task_id)
            .ok_or(TaskStoreError::NotFound(task_id))?;
        if task.record_progress(fraction, at) {
            Ok(Some(task.clone()))
        } else {
            Ok(None)
        }
    }

    fn mark_complete(
        &self,
        task_id: TaskId,
        outcome: TaskOutcome,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, TaskStoreError> {
        let key = self
            .tasks
            .get(&task_id)
            .map(|t| ActiveKey::of(t.value()))
            .ok_or(TaskStoreError::NotFound(task_id))?;

        // Same lock order as `insert_if_idle`: slot first, then the row. The
        // flag and the slot change together while the slot is held.
        let slot = self.active.entry(key);
        let completed = {
            let mut task = self
                .tasks
                .get_mut(&task_id)
                .ok_or(TaskStoreError::NotFound(task_id))?;
            if !task.mark_complete(outcome, at) {
                return Ok(None);
            }
            task.clone()
        };

        // Only free the slot if it still points at this task.
        if let Entry::Occupied(slot) = slot {
            if *slot.get() == task_id {
                slot.remove();
            }
        }
        Ok(Some(completed))
    }
}

impl<S> TaskStore for Arc<S>
where
    S: TaskStore + ?Sized,
{
    fn insert_if_idle(&self, task: Task) -> Result<InsertOutcome, TaskStoreError> {
        (**self).insert_if_idle(task)
    }

    fn get(&self, task_id: TaskId) -> Result<Option<Task>, TaskStoreError> {
        (**self).get(task_id)
    }

    fn find_active(&self, owner_id: UserId, name: &str) -> Result<Option<Task>, TaskStoreError> {
        (**self).find_active(owner_id, name)
    }

    fn list_for_owner(&self, owner_id: UserId) -> Result<Vec<Task>, TaskStoreError> {
        (**self).list_for_owner(owner_id)
    }

    fn list_active(&self) -> Result<Vec<Task>, TaskStoreError> {
        (**self).list_active()
    }

    fn record_progress(
        &self,
        task_id: TaskId,
        fraction: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, TaskStoreError> {
        (**self).record_progress(task_id, fraction, at)
    }

    fn mark_complete(
        &self,
        task_id: TaskId,
        outcome: TaskOutcome,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, TaskStoreError> {
        (**self).mark_complete(task_id, outcome, at)
    }
}
