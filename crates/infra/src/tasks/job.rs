//! Job bodies and the context they run with.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::warn;

use haulboard_core::{TaskId, UserId};

use super::error::TaskError;
use super::types::{JobFailure, TaskOutcome};

/// A unit of background work.
#[async_trait]
pub trait TaskJob: Send + Sync {
    async fn run(&self, ctx: TaskContext) -> Result<JsonValue, JobFailure>;
}

type BoxedJobFuture = Pin<Box<dyn Future<Output = Result<JsonValue, JobFailure>> + Send>>;

struct FnJob<F> {
    f: F,
}

#[async_trait]
impl<F> TaskJob for FnJob<F>
where
    F: Fn(TaskContext) -> BoxedJobFuture + Send + Sync,
{
    async fn run(&self, ctx: TaskContext) -> Result<JsonValue, JobFailure> {
        (self.f)(ctx).await
    }
}

/// Wrap an async closure as a [`TaskJob`].
///
/// ```ignore
/// let job = job_fn(|ctx| async move {
///     ctx.report_progress(0.5);
///     Ok(serde_json::json!({"done": true}))
/// });
/// ```
pub fn job_fn<F, Fut>(f: F) -> Arc<dyn TaskJob>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<JsonValue, JobFailure>> + Send + 'static,
{
    Arc::new(FnJob {
        f: move |ctx: TaskContext| -> BoxedJobFuture { Box::pin(f(ctx)) },
    })
}

/// The registry side of a running task: where progress and completion go.
pub trait TaskLifecycle: Send + Sync {
    fn report_progress(&self, task_id: TaskId, fraction: f64) -> Result<(), TaskError>;

    /// Record the terminal outcome. `Ok(false)` if the task was already complete.
    fn finish(&self, task_id: TaskId, outcome: TaskOutcome) -> Result<bool, TaskError>;
}

/// Handed to a job body for the duration of one run.
#[derive(Clone)]
pub struct TaskContext {
    task_id: TaskId,
    owner_id: UserId,
    name: String,
    lifecycle: Arc<dyn TaskLifecycle>,
}

impl TaskContext {
    pub fn new(
        task_id: TaskId,
        owner_id: UserId,
        name: impl Into<String>,
        lifecycle: Arc<dyn TaskLifecycle>,
    ) -> Self {
        Self {
            task_id,
            owner_id,
            name: name.into(),
            lifecycle,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publish progress. Failures are logged and otherwise ignored.
    pub fn report_progress(&self, fraction: f64) {
        if let Err(e) = self.lifecycle.report_progress(self.task_id, fraction) {
            warn!(
                task_id = %self.task_id,
                task = %self.name,
                error = %e,
                "failed to record task progress"
            );
        }
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("task_id", &self.task_id)
            .field("owner_id", &self.owner_id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
