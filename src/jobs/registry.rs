// src/jobs/registry.rs

//! Shared in-memory job registry.
//!
//! One `RwLock` guards the whole map. All writes for a given job come from
//! that job's worker (plus the status flip done by `cancel`), so contention
//! is limited to map-level operations. Reads clone a `JobView` under the
//! read lock, so callers never see a half-applied update.
//!
//! State is process-local and lost on restart.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::errors::{JobError, Result};
use crate::jobs::JobId;
use crate::jobs::state::{JobState, JobSummary, JobView};

#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<JobId, JobState>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning is ignored: entries are plain data.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, JobState>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, JobState>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new job. Fails if the id is already present.
    pub fn create(&self, state: JobState) -> Result<()> {
        let mut jobs = self.write();
        if jobs.contains_key(state.id()) {
            warn!(job_id = %state.id(), "refusing to overwrite existing job");
            return Err(JobError::DuplicateJob(state.id().to_string()));
        }
        debug!(job_id = %state.id(), status = %state.status(), "job registered");
        jobs.insert(state.id().to_string(), state);
        Ok(())
    }

    /// Snapshot of a job, or `None` if unknown.
    pub fn get(&self, id: &str) -> Option<JobView> {
        self.read().get(id).map(JobState::view)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Apply `mutator` to a job under the write lock.
    ///
    /// Returns `None` (and does nothing) if the id is absent: a job removed
    /// by another caller is not an error for whoever updates it next.
    pub fn update<R>(&self, id: &str, mutator: impl FnOnce(&mut JobState) -> R) -> Option<R> {
        let mut jobs = self.write();
        match jobs.get_mut(id) {
            Some(state) => Some(mutator(state)),
            None => {
                debug!(job_id = %id, "update for unknown job ignored");
                None
            }
        }
    }

    /// Remove a job if `predicate` holds for it.
    pub fn remove_if(&self, id: &str, predicate: impl FnOnce(&JobState) -> bool) -> Option<JobState> {
        let mut jobs = self.write();
        if jobs.get(id).is_some_and(predicate) {
            jobs.remove(id)
        } else {
            None
        }
    }

    pub fn remove(&self, id: &str) -> Option<JobState> {
        self.write().remove(id)
    }

    /// All jobs, oldest first.
    pub fn list(&self) -> Vec<JobSummary> {
        let mut rows: Vec<JobSummary> = self.read().values().map(JobState::summary).collect();
        rows.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        rows
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
