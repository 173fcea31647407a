//! Per-user background task pipeline.
//!
//! ## Design
//!
//! - At most one *active* task per `(owner, name)`, enforced by an atomic
//!   conditional insert in the [`TaskStore`]
//! - Job bodies run on their own tokio task, bounded by a timeout
//! - Every launch is completed exactly once: success, error, panic and timeout
//!   all end in [`TaskRegistry::complete`]
//! - Progress and completion are published as notifications, so pollers need
//!   no extra channel
//! - No retries: a failed task is retried by launching it again
//!
//! ## Components
//!
//! - `TaskStore`: persistence with the conditional-insert primitive
//! - `TaskRegistry`: launch / lookup / progress / completion bookkeeping
//! - `TaskRunner`: out-of-band execution with the exactly-once completion contract
//! - `TaskCatalog`: name → job body, fixed at startup
//!
//! A task whose runner process dies stays active until
//! [`TaskRegistry::reap_stale`] fails it.

pub mod catalog;
pub mod error;
pub mod export;
pub mod job;
pub mod registry;
pub mod runner;
pub mod store;
pub mod types;

pub use catalog::{RegisteredJob, TaskCatalog, TaskCatalogBuilder};
pub use error::TaskError;
pub use export::{EXPORT_POSTS, ExportPostsJob};
pub use job::{TaskContext, TaskJob, TaskLifecycle, job_fn};
pub use registry::TaskRegistry;
pub use runner::{RunnerStats, TaskRunner, TaskRunnerConfig};
pub use store::{InMemoryTaskStore, InsertOutcome, TaskStore, TaskStoreError};
pub use types::{JobFailure, Task, TaskHandle, TaskOutcome, clamp_fraction};
