//! Out-of-band execution of job bodies.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use haulboard_core::TaskId;

use super::job::{TaskContext, TaskJob, TaskLifecycle};
use super::types::{JobFailure, Task, TaskOutcome};

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct TaskRunnerConfig {
    /// Upper bound on a single job body.
    pub timeout: Duration,
    /// Name for logging
    pub name: String,
}

impl Default for TaskRunnerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            name: "task-runner".to_string(),
        }
    }
}

impl TaskRunnerConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Runner statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunnerStats {
    pub launched: u64,
    pub succeeded: u64,
    /// All failures, including timeouts and panics.
    pub failed: u64,
    pub timed_out: u64,
    pub panicked: u64,
    pub running: usize,
}

#[derive(Debug, Default)]
struct Counters {
    launched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    panicked: AtomicU64,
    running: AtomicUsize,
}

/// Spawns job bodies and guarantees each spawn ends in exactly one
/// completion call on its [`TaskLifecycle`].
///
/// No retries. Cloning shares config and counters.
#[derive(Debug, Clone, Default)]
pub struct TaskRunner {
    config: Arc<TaskRunnerConfig>,
    counters: Arc<Counters>,
}

impl TaskRunner {
    pub fn new(config: TaskRunnerConfig) -> Self {
        Self {
            config: Arc::new(config),
            counters: Arc::default(),
        }
    }

    pub fn config(&self) -> &TaskRunnerConfig {
        &self.config
    }

    pub fn stats(&self) -> RunnerStats {
        let c = &self.counters;
        RunnerStats {
            launched: c.launched.load(Ordering::Relaxed),
            succeeded: c.succeeded.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            timed_out: c.timed_out.load(Ordering::Relaxed),
            panicked: c.panicked.load(Ordering::Relaxed),
            running: c.running.load(Ordering::Relaxed),
        }
    }

    /// Start `job` for `task` and return immediately.
    ///
    /// Returns the supervisor's join handle, or `None` when no tokio runtime
    /// is available; in that case the task has already been completed as
    /// failed with [`JobFailure::NoRuntime`].
    pub fn spawn(
        &self,
        lifecycle: Arc<dyn TaskLifecycle>,
        task: &Task,
        job: Arc<dyn TaskJob>,
    ) -> Option<JoinHandle<()>> {
        self.counters.launched.fetch_add(1, Ordering::Relaxed);

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(
                    runner = %self.config.name,
                    task_id = %task.id,
                    task = %task.name,
                    "no async runtime; failing task"
                );
                self.settle(
                    lifecycle.as_ref(),
                    task.id,
                    &task.name,
                    TaskOutcome::failed(JobFailure::NoRuntime),
                );
                return None;
            }
        };

        let ctx = TaskContext::new(task.id, task.owner_id, task.name.clone(), lifecycle.clone());
        self.counters.running.fetch_add(1, Ordering::Relaxed);
        debug!(runner = %self.config.name, task_id = %task.id, task = %task.name, "task spawned");

        let runner = self.clone();
        Some(handle.spawn(async move {
            runner.supervise(lifecycle, ctx, job).await;
        }))
    }

    async fn supervise(self, lifecycle: Arc<dyn TaskLifecycle>, ctx: TaskContext, job: Arc<dyn TaskJob>) {
        let task_id = ctx.task_id();
        let name = ctx.name().to_string();
        let limit = self.config.timeout;
        let started = Instant::now();

        let mut body = tokio::spawn(async move { job.run(ctx).await });

        let outcome = match tokio::time::timeout(limit, &mut body).await {
            Ok(Ok(Ok(result))) => TaskOutcome::succeeded(result),
            Ok(Ok(Err(failure))) => TaskOutcome::failed(failure),
            Ok(Err(join_err)) if join_err.is_panic() => TaskOutcome::failed(JobFailure::Panicked {
                message: panic_message(join_err.into_panic()),
            }),
            Ok(Err(join_err)) => TaskOutcome::failed(JobFailure::error(join_err.to_string())),
            Err(_elapsed) => {
                body.abort();
                TaskOutcome::failed(JobFailure::TimedOut {
                    after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })
            }
        };

        debug!(
            task_id = %task_id,
            task = %name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "job body finished"
        );
        self.settle(lifecycle.as_ref(), task_id, &name, outcome);
        self.counters.running.fetch_sub(1, Ordering::Relaxed);
    }

    fn settle(&self, lifecycle: &dyn TaskLifecycle, task_id: TaskId, name: &str, outcome: TaskOutcome) {
        match &outcome {
            TaskOutcome::Succeeded { .. } => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            TaskOutcome::Failed { error } => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                match error {
                    JobFailure::TimedOut { .. } => {
                        self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
                    }
                    JobFailure::Panicked { .. } => {
                        self.counters.panicked.fetch_add(1, Ordering::Relaxed);
                    }
                    _ => {}
                }
                warn!(task_id = %task_id, task = %name, error = %error, "task failed");
            }
        }

        match lifecycle.finish(task_id, outcome) {
            Ok(true) => info!(runner = %self.config.name, task_id = %task_id, task = %name, "task completed"),
            Ok(false) => debug!(task_id = %task_id, task = %name, "task was already complete"),
            Err(e) => error!(task_id = %task_id, task = %name, error = %e, "failed to record task completion"),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
