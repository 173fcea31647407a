//! Name → job registry, fixed at startup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::error::TaskError;
use super::job::TaskJob;

/// A job body plus the human-readable description stored on its tasks.
#[derive(Clone)]
pub struct RegisteredJob {
    name: String,
    description: String,
    job: Arc<dyn TaskJob>,
}

impl RegisteredJob {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn job(&self) -> Arc<dyn TaskJob> {
        self.job.clone()
    }
}

impl fmt::Debug for RegisteredJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredJob")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Immutable job catalog. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    jobs: Arc<HashMap<String, RegisteredJob>>,
}

impl TaskCatalog {
    pub fn builder() -> TaskCatalogBuilder {
        TaskCatalogBuilder::default()
    }

    pub fn get(&self, name: &str) -> Result<&RegisteredJob, TaskError> {
        self.jobs
            .get(name)
            .ok_or_else(|| TaskError::UnknownJob(name.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct TaskCatalogBuilder {
    jobs: HashMap<String, RegisteredJob>,
}

impl TaskCatalogBuilder {
    /// Register `job` under `name`. A later registration replaces an earlier one.
    pub fn register(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        job: Arc<dyn TaskJob>,
    ) -> Self {
        let name = name.into();
        self.jobs.insert(
            name.clone(),
            RegisteredJob {
                name,
                description: description.into(),
                job,
            },
        );
        self
    }

    pub fn build(self) -> TaskCatalog {
        TaskCatalog {
            jobs: Arc::new(self.jobs),
        }
    }
}
