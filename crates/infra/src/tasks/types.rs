//! Core task types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;

use haulboard_core::{TaskId, UserId};

/// Why a job body did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobFailure {
    /// The job body returned an error.
    #[error("{message}")]
    Error { message: String },
    /// The job body panicked.
    #[error("job panicked: {message}")]
    Panicked { message: String },
    /// The job body exceeded the runner's time bound and was aborted.
    #[error("job timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },
    /// No async runtime was available to execute the job.
    #[error("no async runtime available to run the job")]
    NoRuntime,
    /// The task was still active past the stale cutoff (runner presumed dead).
    #[error("task abandoned by its runner")]
    Abandoned,
}

impl JobFailure {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Terminal state of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded { result: JsonValue },
    Failed { error: JobFailure },
}

impl TaskOutcome {
    pub fn succeeded(result: JsonValue) -> Self {
        Self::Succeeded { result }
    }

    pub fn failed(error: JobFailure) -> Self {
        Self::Failed { error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded { .. })
    }
}

/// Clamp a progress fraction into `[0, 1]`. NaN counts as no progress.
pub fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// A background task row.
///
/// `complete` only ever moves from `false` to `true`. Rows are kept as
/// history after completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner_id: UserId,
    /// Symbolic key such as `export_posts`.
    pub name: String,
    pub description: String,
    /// Fraction in `[0, 1]`.
    pub progress: f64,
    pub complete: bool,
    pub outcome: Option<TaskOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        owner_id: UserId,
        name: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            owner_id,
            name: name.into(),
            description: description.into(),
            progress: 0.0,
            complete: false,
            outcome: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.complete
    }

    /// Record progress. Returns `false` (and changes nothing) once complete.
    pub fn record_progress(&mut self, fraction: f64, now: DateTime<Utc>) -> bool {
        if self.complete {
            return false;
        }
        self.progress = clamp_fraction(fraction);
        self.updated_at = now;
        true
    }

    /// Mark complete. Returns `false` (and changes nothing) if already complete.
    pub fn mark_complete(&mut self, outcome: TaskOutcome, now: DateTime<Utc>) -> bool {
        if self.complete {
            return false;
        }
        if outcome.is_success() {
            self.progress = 1.0;
        }
        self.complete = true;
        self.outcome = Some(outcome);
        self.updated_at = now;
        self.completed_at = Some(now);
        true
    }
}

/// Returned by a successful launch.
#[derive(Debug)]
pub struct TaskHandle {
    task: Task,
    completion: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub(crate) fn new(task: Task, completion: Option<JoinHandle<()>>) -> Self {
        Self { task, completion }
    }

    pub fn id(&self) -> TaskId {
        self.task.id
    }

    /// The task row as it was when launched.
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Wait until the runner has recorded the task's completion.
    pub async fn finished(self) {
        if let Some(join) = self.completion {
            let _ = join.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_task() -> Task {
        Task::new(UserId::new(), "export_posts", "Exporting posts...", Utc::now())
    }

    #[test]
    fn fractions_are_clamped() {
        assert_eq!(clamp_fraction(-0.5), 0.0);
        assert_eq!(clamp_fraction(0.25), 0.25);
        assert_eq!(clamp_fraction(7.0), 1.0);
        assert_eq!(clamp_fraction(f64::NAN), 0.0);
    }

    #[test]
    fn task_lifecycle() {
        let mut task = new_task();
        assert!(task.is_active());
        assert_eq!(task.progress, 0.0);

        assert!(task.record_progress(0.5, Utc::now()));
        assert_eq!(task.progress, 0.5);

        assert!(task.mark_complete(TaskOutcome::succeeded(json!({"ok": true})), Utc::now()));
        assert!(!task.is_active());
        assert_eq!(task.progress, 1.0);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn completion_is_monotonic() {
        let mut task = new_task();
        assert!(task.mark_complete(TaskOutcome::failed(JobFailure::error("boom")), Utc::now()));

        assert!(!task.mark_complete(TaskOutcome::succeeded(json!(1)), Utc::now()));
        assert!(!task.record_progress(0.9, Utc::now()));
        assert!(task.complete);
        assert_eq!(task.outcome, Some(TaskOutcome::failed(JobFailure::error("boom"))));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let failed = serde_json::to_value(TaskOutcome::failed(JobFailure::TimedOut { after_ms: 50 })).unwrap();
        assert_eq!(
            failed,
            json!({"status": "failed", "error": {"kind": "timed_out", "after_ms": 50}})
        );
    }
}
