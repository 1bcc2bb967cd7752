// src/jobs/mod.rs

//! Background job execution and tracking.
//!
//! - [`controller`] is the façade the rest of an application calls:
//!   submit, status, cancel, wait, list, forget.
//! - [`runner`] owns one Tokio task per job, which launches the process,
//!   feeds each output line through the classifier/renderer and writes the
//!   result into the registry.
//! - [`registry`] is the shared, lock-guarded map of job id → job state.
//! - [`state`] holds the per-job state machine and the `JobView` snapshot.
//! - [`id`] generates unique job ids.
//! - [`request`] describes what to run.
//! - [`diagnostics`] scans output for known failure messages.
//! - [`process`] wraps `tokio::process` (merged output, group termination).

pub mod controller;
pub mod diagnostics;
pub mod id;
pub mod process;
pub mod registry;
pub mod request;
pub mod runner;
pub mod state;

/// Canonical job id type.
pub type JobId = String;

pub use controller::JobController;
pub use registry::JobRegistry;
pub use request::{JobRequest, PlaybookRequest};
pub use runner::JobRunner;
pub use state::{JobState, JobSummary, JobView};
