// src/jobs/state.rs

//! Per-job state and the snapshot handed to callers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::jobs::JobId;
use crate::output::{RunStats, StatCounts};
use crate::types::JobStatus;

/// State of one job as held by the registry.
///
/// Status only moves forward: `queued → running → {completed, failed,
/// cancelled}`, and a terminal status is never left. Output is append-only
/// and frozen together with the status. Progress never decreases.
#[derive(Debug, Clone)]
pub struct JobState {
    id: JobId,
    command: String,
    status: JobStatus,
    fragments: Vec<String>,
    progress: u8,
    stats: RunStats,
    exit_code: Option<i32>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl JobState {
    pub fn new(id: JobId, command: impl Into<String>, status: JobStatus) -> Self {
        debug_assert!(!status.is_terminal() && status != JobStatus::NotFound);
        Self {
            id,
            command: command.into(),
            status,
            fragments: Vec::new(),
            progress: 0,
            stats: RunStats::default(),
            exit_code: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `queued → running`. Returns whether the transition happened.
    pub fn mark_running(&mut self) -> bool {
        if self.status == JobStatus::Queued {
            self.status = JobStatus::Running;
            true
        } else {
            false
        }
    }

    /// Append a rendered fragment. Ignored once the job is terminal.
    pub fn append(&mut self, fragment: String) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.fragments.push(fragment);
        true
    }

    /// Replace the tally with the worker's latest copy. Ignored once terminal.
    pub fn set_stats(&mut self, stats: RunStats) {
        if !self.is_terminal() {
            self.stats = stats;
        }
    }

    /// Step heuristic: `+increment`, capped at `cap`, never decreasing.
    pub fn bump_progress(&mut self, increment: u8, cap: u8) {
        if self.is_terminal() {
            return;
        }
        let target = self.progress.saturating_add(increment).min(cap.min(100));
        self.progress = self.progress.max(target);
    }

    /// Raise progress to `value` (clamped to 100); never lowers it.
    pub fn raise_progress(&mut self, value: u8) {
        if self.is_terminal() {
            return;
        }
        self.progress = self.progress.max(value.min(100));
    }

    /// Enter a terminal status. Returns `false` (and changes nothing) if the
    /// job is already terminal or `status` is not a terminal status.
    pub fn finish(&mut self, status: JobStatus, exit_code: Option<i32>) -> bool {
        if self.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.exit_code = exit_code;
        self.progress = 100;
        self.finished_at = Some(Utc::now());
        true
    }

    /// Snapshot for callers.
    pub fn view(&self) -> JobView {
        JobView {
            id: self.id.clone(),
            status: self.status,
            output: self.fragments.concat(),
            progress: self.progress,
            stats: self.stats.reported().clone(),
            exit_code: self.exit_code,
            started_at: Some(self.started_at),
            finished_at: self.finished_at,
        }
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            command: self.command.clone(),
            status: self.status,
            progress: self.progress,
            started_at: self.started_at,
        }
    }
}

/// Consistent, owned snapshot of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub status: JobStatus,
    pub output: String,
    pub progress: u8,
    pub stats: StatCounts,
    pub exit_code: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobView {
    /// The sentinel returned for ids the registry does not know.
    pub fn not_found(id: impl Into<JobId>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::NotFound,
            output: String::new(),
            progress: 0,
            stats: StatCounts::new(),
            exit_code: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One row of `JobController::list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub id: JobId,
    pub command: String,
    pub status: JobStatus,
    pub progress: u8,
    pub started_at: DateTime<Utc>,
}
