//! Task bookkeeping: launch, lookup, progress, completion.

use std::sync::Arc;

use serde_json::{Value as JsonValue, json};
use tracing::{debug, info, warn};

use haulboard_core::{SharedClock, TaskId, UserId};

use crate::notifications::{NotificationStore, TASK_COMPLETE, TASK_PROGRESS};

use super::catalog::TaskCatalog;
use super::error::TaskError;
use super::job::{TaskJob, TaskLifecycle};
use super::runner::TaskRunner;
use super::store::{InsertOutcome, TaskStore};
use super::types::{JobFailure, Task, TaskHandle, TaskOutcome};

/// Per-user background task registry.
///
/// Launching is gated by [`TaskStore::insert_if_idle`]: of any number of
/// concurrent launches for one `(owner, name)`, exactly one wins and the rest
/// get [`TaskError::AlreadyRunning`].
pub struct TaskRegistry<S, N> {
    store: S,
    notifications: N,
    runner: TaskRunner,
    clock: SharedClock,
}

impl<S, N> TaskRegistry<S, N>
where
    S: TaskStore + 'static,
    N: NotificationStore + 'static,
{
    pub fn new(store: S, notifications: N, runner: TaskRunner, clock: SharedClock) -> Self {
        Self {
            store,
            notifications,
            runner,
            clock,
        }
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    /// Create a task and start `job` out of band. Returns before the job runs.
    pub fn launch_task(
        self: &Arc<Self>,
        owner_id: UserId,
        name: &str,
        description: &str,
        job: Arc<dyn TaskJob>,
    ) -> Result<TaskHandle, TaskError> {
        let task = Task::new(owner_id, name, description, self.clock.now());

        match self.store.insert_if_idle(task.clone())? {
            InsertOutcome::ActiveExists(existing) => {
                info!(
                    owner_id = %owner_id,
                    task = %name,
                    existing_task_id = %existing,
                    "task already running"
                );
                Err(TaskError::AlreadyRunning {
                    owner_id,
                    name: name.to_string(),
                })
            }
            InsertOutcome::Inserted => {
                info!(owner_id = %owner_id, task = %name, task_id = %task.id, "task launched");
                let lifecycle: Arc<dyn TaskLifecycle> = self.clone();
                let completion = self.runner.spawn(lifecycle, &task, job);
                Ok(TaskHandle::new(task, completion))
            }
        }
    }

    /// Launch the catalog job registered under `name`.
    pub fn launch_registered(
        self: &Arc<Self>,
        catalog: &TaskCatalog,
        owner_id: UserId,
        name: &str,
    ) -> Result<TaskHandle, TaskError> {
        let entry = catalog.get(name)?;
        self.launch_task(owner_id, entry.name(), entry.description(), entry.job())
    }

    pub fn get_active_task(&self, owner_id: UserId, name: &str) -> Result<Option<Task>, TaskError> {
        Ok(self.store.find_active(owner_id, name)?)
    }

    pub fn get_task(&self, task_id: TaskId) -> Result<Option<Task>, TaskError> {
        Ok(self.store.get(task_id)?)
    }

    /// Every task the owner ever launched, oldest first.
    pub fn tasks_for(&self, owner_id: UserId) -> Result<Vec<Task>, TaskError> {
        Ok(self.store.list_for_owner(owner_id)?)
    }

    /// Persist progress (clamped to `[0, 1]`) and publish a `task_progress`
    /// notification. Ignored once the task is complete.
    pub fn set_progress(&self, task_id: TaskId, fraction: f64) -> Result<(), TaskError> {
        let Some(task) = self.store.record_progress(task_id, fraction, self.clock.now())? else {
            debug!(task_id = %task_id, "progress after completion ignored");
            return Ok(());
        };

        self.notifications.append(
            task.owner_id,
            TASK_PROGRESS,
            json!({
                "task_id": task.id,
                "name": task.name,
                "progress": task.progress,
            }),
        )?;
        Ok(())
    }

    /// Mark the task complete and publish `task_complete`.
    ///
    /// Returns `false` without side effects if it was already complete.
    pub fn complete(&self, task_id: TaskId, outcome: TaskOutcome) -> Result<bool, TaskError> {
        let payload_outcome = outcome.clone();
        let Some(task) = self.store.mark_complete(task_id, outcome, self.clock.now())? else {
            return Ok(false);
        };

        self.notifications
            .append(task.owner_id, TASK_COMPLETE, completion_payload(&task, &payload_outcome))?;
        Ok(true)
    }

    /// Fail every active task created more than `max_age` ago.
    ///
    /// Covers runners that died without completing their task; a late
    /// completion from such a runner becomes a no-op.
    pub fn reap_stale(&self, max_age: chrono::Duration) -> Result<usize, TaskError> {
        // A window reaching before the representable range leaves nothing stale.
        let Some(cutoff) = self.clock.now().checked_sub_signed(max_age) else {
            return Ok(0);
        };
        let mut reaped = 0;
        for task in self.store.list_active()? {
            if task.created_at >= cutoff {
                continue;
            }
            if self.complete(task.id, TaskOutcome::failed(JobFailure::Abandoned))? {
                warn!(
                    task_id = %task.id,
                    owner_id = %task.owner_id,
                    task = %task.name,
                    created_at = %task.created_at,
                    "stale task abandoned"
                );
                reaped += 1;
            }
        }
        Ok(reaped)
    }
}

impl<S, N> TaskLifecycle for TaskRegistry<S, N>
where
    S: TaskStore + 'static,
    N: NotificationStore + 'static,
{
    fn report_progress(&self, task_id: TaskId, fraction: f64) -> Result<(), TaskError> {
        self.set_progress(task_id, fraction)
    }

    fn finish(&self, task_id: TaskId, outcome: TaskOutcome) -> Result<bool, TaskError> {
        self.complete(task_id, outcome)
    }
}

fn completion_payload(task: &Task, outcome: &TaskOutcome) -> JsonValue {
    match outcome {
        TaskOutcome::Succeeded { result } => json!({
            "task_id": task.id,
            "name": task.name,
            "status": "succeeded",
            "result": result,
        }),
        TaskOutcome::Failed { error } => json!({
            "task_id": task.id,
            "name": task.name,
            "status": "failed",
            "error": error,
            "message": error.to_string(),
        }),
    }
}
