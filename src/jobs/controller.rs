// src/jobs/controller.rs

//! Public entry points for the job layer.
//!
//! None of these block on a job: `submit` returns as soon as the worker is
//! spawned, `status` is a snapshot read, `cancel` returns once the status is
//! flipped and the worker signalled. Unknown ids are answered with a
//! `not_found` view or `false`, never an error.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::jobs::JobId;
use crate::jobs::registry::JobRegistry;
use crate::jobs::request::JobRequest;
use crate::jobs::runner::JobRunner;
use crate::jobs::state::{JobSummary, JobView};
use crate::types::JobStatus;

/// Cheap to clone; clones share the same registry and runner.
#[derive(Clone)]
pub struct JobController {
    registry: JobRegistry,
    runner: Arc<JobRunner>,
}

impl JobController {
    /// Controller with a fresh registry.
    pub fn new(config: &ConfigFile) -> Self {
        Self::with_registry(JobRegistry::new(), config)
    }

    /// Controller over an existing registry (e.g. one shared with a web layer).
    pub fn with_registry(registry: JobRegistry, config: &ConfigFile) -> Self {
        let runner = Arc::new(JobRunner::new(registry.clone(), config));
        Self { registry, runner }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Launch a job in the background and return its id.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, request: impl Into<JobRequest>) -> JobId {
        self.runner.start(request.into())
    }

    /// Shorthand for `submit(JobRequest::new(program, args))`.
    pub fn submit_command<I, S>(&self, program: impl Into<String>, args: I) -> JobId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.submit(JobRequest::new(program, args))
    }

    /// Snapshot of a job; the `not_found` view for unknown ids.
    pub fn status(&self, id: &str) -> JobView {
        self.registry
            .get(id)
            .unwrap_or_else(|| JobView::not_found(id))
    }

    /// Mark a job cancelled and ask its worker to stop the process.
    ///
    /// Returns `false` for unknown ids and for jobs that already reached a
    /// terminal status. The process may still be shutting down when this
    /// returns; use [`JobController::wait`] to await the worker.
    pub fn cancel(&self, id: &str) -> bool {
        let flipped = self
            .registry
            .update(id, |state| state.finish(JobStatus::Cancelled, None));

        match flipped {
            None => {
                debug!(job_id = %id, "cancel requested for unknown job");
                false
            }
            Some(false) => {
                debug!(job_id = %id, "cancel requested for finished job");
                false
            }
            Some(true) => {
                let signalled = self.runner.signal_cancel(id);
                info!(job_id = %id, signalled, "job cancelled");
                true
            }
        }
    }

    /// Wait until the worker for `id` has finished, then return the final view.
    ///
    /// Resolves immediately for unknown or already finished jobs.
    pub async fn wait(&self, id: &str) -> JobView {
        if let Some(mut done) = self.runner.completion(id) {
            // An error means the worker dropped its sender, i.e. it is gone.
            let _ = done.wait_for(|finished| *finished).await;
        }
        self.status(id)
    }

    /// All known jobs, oldest first.
    pub fn list(&self) -> Vec<JobSummary> {
        self.registry.list()
    }

    /// Drop a finished job from the registry.
    ///
    /// Returns `false` for unknown ids and for jobs still queued or running.
    pub fn forget(&self, id: &str) -> bool {
        let removed = self.registry.remove_if(id, |state| state.is_terminal());
        if removed.is_some() {
            debug!(job_id = %id, "job removed from registry");
        }
        removed.is_some()
    }

    /// Number of jobs whose worker has not finished yet.
    pub fn active_jobs(&self) -> usize {
        self.runner.active_count()
    }
}
