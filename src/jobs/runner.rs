// src/jobs/runner.rs

//! Job worker: one Tokio task per submitted job.
//!
//! The worker is the only writer of a job's output, progress and stats. It:
//!
//! 1. waits for a launch permit (only when `max_concurrent` is configured),
//! 2. spawns the process with merged stdout/stderr,
//! 3. classifies and renders each line, updating the registry as it goes,
//! 4. waits for exit and settles the terminal status.
//!
//! Cancellation arrives over a oneshot channel; the controller has already
//! flipped the status to `cancelled` by then, so the worker only has to stop
//! the process. Every error is folded into the job (status `failed` plus an
//! error line); nothing propagates out of the task. The worker runs inside a
//! supervising task, so even a panic ends with the job `failed`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use tokio::process::Child;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, oneshot, watch};
use tokio::task::JoinError;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigFile, DiagnosticRule, ProgressSettings, RunnerSettings};
use crate::errors::{JobError, Result};
use crate::jobs::JobId;
use crate::jobs::diagnostics::DiagnosticScanner;
use crate::jobs::id::JobIdGenerator;
use crate::jobs::process::{self, LineResult};
use crate::jobs::registry::JobRegistry;
use crate::jobs::request::JobRequest;
use crate::jobs::state::JobState;
use crate::output::{Classifier, LineTag, Notice, OutputRenderer, RunStats};
use crate::types::JobStatus;

/// Handle kept for a job whose worker is still alive.
///
/// - `cancel` asks the worker to stop the process.
/// - `done` flips to `true` after the worker has settled the job.
struct ActiveJob {
    cancel: Option<oneshot::Sender<()>>,
    done: watch::Receiver<bool>,
}

/// Everything a worker needs, shared across all jobs.
struct WorkerContext {
    registry: JobRegistry,
    classifier: Classifier,
    renderer: OutputRenderer,
    progress: ProgressSettings,
    settings: RunnerSettings,
    diagnostics: Arc<[DiagnosticRule]>,
    permits: Option<Arc<Semaphore>>,
    active: Mutex<HashMap<JobId, ActiveJob>>,
}

/// Launches and supervises job processes.
pub struct JobRunner {
    ctx: Arc<WorkerContext>,
    ids: JobIdGenerator,
}

impl JobRunner {
    pub fn new(registry: JobRegistry, config: &ConfigFile) -> Self {
        let permits = config
            .runner
            .max_concurrent
            .map(|n| Arc::new(Semaphore::new(n)));

        let ctx = WorkerContext {
            registry,
            classifier: Classifier::new(&config.markers),
            renderer: OutputRenderer::new(config.format),
            progress: config.progress,
            settings: config.runner,
            diagnostics: config.diagnostics.clone().into(),
            permits,
            active: Mutex::new(HashMap::new()),
        };

        Self {
            ctx: Arc::new(ctx),
            ids: JobIdGenerator::new(),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.ctx.registry
    }

    /// Register a job and spawn its worker. Returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, request: JobRequest) -> JobId {
        let initial = if self.ctx.permits.is_some() {
            JobStatus::Queued
        } else {
            JobStatus::Running
        };
        let command = request.command_line();
        let label = request.label();

        // Ids carry a sequence number; a clash only happens with entries
        // inserted directly into the registry.
        let id = loop {
            let id = self.ids.next_id(&label);
            let mut state = JobState::new(id.clone(), command.clone(), initial);
            state.append(self.ctx.renderer.notice(Notice::Command(&command)));
            match self.ctx.registry.create(state) {
                Ok(()) => break id,
                Err(e) => warn!(error = %e, "job id collision; drawing a new id"),
            }
        };

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = watch::channel(false);
        self.ctx.lock_active().insert(
            id.clone(),
            ActiveJob {
                cancel: Some(cancel_tx),
                done: done_rx,
            },
        );

        info!(job_id = %id, command = %command, status = %initial, "job submitted");

        let ctx = Arc::clone(&self.ctx);
        let job_id = id.clone();
        tokio::spawn(async move {
            let worker = tokio::spawn(run_job(
                Arc::clone(&ctx),
                job_id.clone(),
                request,
                cancel_rx,
            ));
            if let Err(err) = worker.await {
                error!(job_id = %job_id, error = %err, "job worker aborted");
                ctx.fail_aborted(&job_id, err);
            }
            done_tx.send_replace(true);
            debug!(job_id = %job_id, "job worker finished");
        });

        id
    }

    /// Signal the worker of `id` to stop its process.
    ///
    /// Returns `false` if no live worker exists for `id`.
    pub fn signal_cancel(&self, id: &str) -> bool {
        let sender = self
            .ctx
            .lock_active()
            .get_mut(id)
            .and_then(|job| job.cancel.take());

        match sender {
            Some(tx) => {
                if tx.send(()).is_err() {
                    debug!(job_id = %id, "worker already gone while cancelling");
                }
                true
            }
            None => false,
        }
    }

    /// Receiver that flips to `true` when the worker for `id` is done.
    /// `None` once the worker has already finished (or never existed).
    pub fn completion(&self, id: &str) -> Option<watch::Receiver<bool>> {
        self.ctx.lock_active().get(id).map(|job| job.done.clone())
    }

    /// Number of workers that have not finished yet.
    pub fn active_count(&self) -> usize {
        self.ctx.lock_active().len()
    }
}

impl WorkerContext {
    fn lock_active(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, ActiveJob>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_cancelled(&self, id: &str) -> bool {
        self.registry
            .get(id)
            .is_some_and(|view| view.status == JobStatus::Cancelled)
    }

    /// Settle a job whose worker task panicked or was aborted before it
    /// could conclude the job itself.
    fn fail_aborted(&self, id: &str, err: JoinError) {
        let message = if err.is_panic() {
            let payload = err.into_panic();
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned());
            match detail {
                Some(detail) => format!("internal error: job worker panicked: {detail}"),
                None => "internal error: job worker panicked".to_string(),
            }
        } else {
            "internal error: job worker was aborted".to_string()
        };

        self.append_notice(id, Notice::Error(&message));
        self.registry
            .update(id, |state| state.finish(JobStatus::Failed, None));
        self.lock_active().remove(id);
    }

    fn append_notice(&self, id: &str, notice: Notice<'_>) {
        let fragment = self.renderer.notice(notice);
        self.registry.update(id, |state| state.append(fragment));
    }
}

async fn run_job(
    ctx: Arc<WorkerContext>,
    id: JobId,
    request: JobRequest,
    cancel_rx: oneshot::Receiver<()>,
) {
    let mut worker = Worker {
        stats: RunStats::new(),
        scanner: DiagnosticScanner::new(Arc::clone(&ctx.diagnostics)),
        ctx: Arc::clone(&ctx),
        id: id.clone(),
    };

    let mut cancel = CancelSignal::new(cancel_rx);
    if let Err(err) = worker.run(&request, &mut cancel).await {
        error!(job_id = %id, program = %request.program, error = %err, "job execution error");
        worker.conclude(JobStatus::Failed, None, Some(&err.to_string()));
    }

    ctx.lock_active().remove(&id);
}

struct Worker {
    ctx: Arc<WorkerContext>,
    id: JobId,
    stats: RunStats,
    scanner: DiagnosticScanner,
}

/// How the output loop ended.
enum Interrupt {
    Cancelled,
    TimedOut,
}

/// Result of waiting for a launch slot.
enum Admission {
    Admitted(Option<OwnedSemaphorePermit>),
    Cancelled,
}

/// Cancel request from the controller.
///
/// `requested()` resolves only when a cancel was actually sent; if the
/// sending side is dropped it pends forever.
struct CancelSignal {
    rx: Option<oneshot::Receiver<()>>,
}

impl CancelSignal {
    fn new(rx: oneshot::Receiver<()>) -> Self {
        Self { rx: Some(rx) }
    }

    async fn requested(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            let res = rx.await;
            self.rx = None;
            if res.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

impl Worker {
    async fn run(&mut self, request: &JobRequest, cancel: &mut CancelSignal) -> Result<()> {
        let _permit = match self.admit(cancel).await {
            Admission::Admitted(permit) => permit,
            Admission::Cancelled => {
                info!(job_id = %self.id, "job cancelled while queued");
                return Ok(());
            }
        };

        if self.ctx.is_cancelled(&self.id) {
            info!(job_id = %self.id, "job cancelled before launch");
            return Ok(());
        }
        self.ctx.registry.update(&self.id, JobState::mark_running);

        info!(
            job_id = %self.id,
            program = %request.program,
            args = ?request.args,
            "starting job process"
        );

        let (mut child, mut lines) = process::spawn(request)?;
        let launched_at = Instant::now();
        let deadline = self.ctx.settings.timeout.and_then(|t| {
            let at = launched_at.checked_add(t);
            if at.is_none() {
                warn!(job_id = %self.id, ?t, "timeout out of range; running without one");
            }
            at
        });

        // Output phase: until the output pipe closes.
        match self.pump_output(&mut lines, cancel, deadline, launched_at).await {
            Ok(None) => {}
            Ok(Some(interrupt)) => return self.interrupt(&mut child, interrupt).await,
            Err(err) => {
                process::terminate(&mut child, self.ctx.settings.kill_grace).await;
                return Err(err);
            }
        }
        drop(lines);

        // Exit phase.
        let status = tokio::select! {
            status = child.wait() => status
                .with_context(|| format!("waiting for process of job '{}'", self.id))?,
            _ = cancel.requested() => {
                return self.interrupt(&mut child, Interrupt::Cancelled).await;
            }
            _ = sleep_until_deadline(deadline) => {
                return self.interrupt(&mut child, Interrupt::TimedOut).await;
            }
        };

        let code = status.code();
        info!(
            job_id = %self.id,
            exit_code = ?code,
            success = status.success(),
            "job process exited"
        );

        self.settle_exit(status.success(), code);
        Ok(())
    }

    /// Wait for a launch slot when a concurrency bound is configured.
    async fn admit(&self, cancel: &mut CancelSignal) -> Admission {
        let Some(permits) = self.ctx.permits.clone() else {
            return Admission::Admitted(None);
        };

        debug!(
            job_id = %self.id,
            available = permits.available_permits(),
            "waiting for launch permit"
        );
        tokio::select! {
            permit = permits.acquire_owned() => Admission::Admitted(permit.ok()),
            _ = cancel.requested() => Admission::Cancelled,
        }
    }

    /// Feed every line through classifier → renderer → registry.
    ///
    /// Between lines, a ticker raises progress along the elapsed-time floor.
    /// Returns `Some(_)` if cancellation or the timeout cut the run short.
    async fn pump_output(
        &mut self,
        lines: &mut mpsc::Receiver<LineResult>,
        cancel: &mut CancelSignal,
        deadline: Option<Instant>,
        launched_at: Instant,
    ) -> Result<Option<Interrupt>> {
        let period = self.ctx.progress.tick_period();
        let mut ticker = tokio::time::interval_at(launched_at + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.requested() => return Ok(Some(Interrupt::Cancelled)),

                _ = sleep_until_deadline(deadline) => return Ok(Some(Interrupt::TimedOut)),

                next = lines.recv() => match next {
                    Some(Ok(line)) => self.process_line(&line),
                    Some(Err(e)) => {
                        return Err(JobError::Stream(format!(
                            "reading output of job '{}': {e}",
                            self.id
                        )));
                    }
                    None => return Ok(None),
                },

                _ = ticker.tick() => {
                    let floor = self.ctx.progress.time_floor(launched_at.elapsed());
                    self.ctx.registry.update(&self.id, |state| state.raise_progress(floor));
                }
            }
        }
    }

    fn process_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        debug!(job_id = %self.id, "output: {}", line);

        self.scanner.observe(line);
        let tag = self.ctx.classifier.classify(line);
        let fragment = self.ctx.renderer.render(&tag, &mut self.stats);

        let progress = self.ctx.progress;
        let stats = self.stats.clone();
        self.ctx.registry.update(&self.id, move |state| {
            if let Some(fragment) = fragment {
                state.append(fragment);
            }
            state.set_stats(stats);
            match tag {
                LineTag::StepStart { .. } => {
                    state.bump_progress(progress.step_increment, progress.step_cap)
                }
                LineTag::Summary { .. } => state.raise_progress(100),
                _ => {}
            }
        });
    }

    async fn interrupt(&mut self, child: &mut Child, interrupt: Interrupt) -> Result<()> {
        let grace = self.ctx.settings.kill_grace;
        match interrupt {
            Interrupt::Cancelled => {
                info!(job_id = %self.id, "cancellation requested; stopping process");
                let status = process::terminate(child, grace).await;
                debug!(job_id = %self.id, ?status, "cancelled process stopped");
                // Status is already `cancelled`; nothing left to record.
            }
            Interrupt::TimedOut => {
                let timeout = self.ctx.settings.timeout.unwrap_or(Duration::ZERO);
                warn!(job_id = %self.id, ?timeout, "job timed out; stopping process");
                let status = process::terminate(child, grace).await;
                let message = format!("timed out after {}", format_duration(timeout));
                self.conclude(
                    JobStatus::Failed,
                    status.and_then(|s| s.code()),
                    Some(&message),
                );
            }
        }
        Ok(())
    }

    /// Decide the terminal status from exit code and recap verdict.
    fn settle_exit(&mut self, success: bool, code: Option<i32>) {
        let verdict = self.stats.verdict();

        let status = if success {
            match verdict {
                Some(JobStatus::Failed) => {
                    warn!(
                        job_id = %self.id,
                        "process exited 0 but recap reports failed or unreachable hosts"
                    );
                    JobStatus::Failed
                }
                _ => JobStatus::Completed,
            }
        } else {
            if verdict == Some(JobStatus::Completed) {
                warn!(
                    job_id = %self.id,
                    exit_code = ?code,
                    "process exited non-zero despite a clean recap"
                );
            }
            JobStatus::Failed
        };

        let error = match (success, code) {
            (true, _) => None,
            (false, Some(code)) => Some(format!("process exited with code {code}")),
            (false, None) => Some("process terminated by signal".to_string()),
        };

        self.conclude(status, code.or(Some(-1)), error.as_deref());
    }

    /// Append the error line and any diagnostic hints, then enter `status`.
    ///
    /// A job already cancelled keeps its frozen output and status.
    fn conclude(&mut self, status: JobStatus, exit_code: Option<i32>, error: Option<&str>) {
        if status == JobStatus::Failed {
            if let Some(msg) = error {
                self.ctx.append_notice(&self.id, Notice::Error(msg));
            }
            for hint in self.scanner.hints() {
                debug!(job_id = %self.id, hint, "appending diagnostic hint");
                self.ctx.append_notice(&self.id, Notice::Hint(hint));
            }
        }

        let entered = self
            .ctx
            .registry
            .update(&self.id, |state| state.finish(status, exit_code));

        match entered {
            Some(true) => info!(job_id = %self.id, status = %status, "job finished"),
            Some(false) => debug!(
                job_id = %self.id,
                status = %status,
                "job already terminal; keeping existing status"
            ),
            None => debug!(job_id = %self.id, "job removed before it finished"),
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

fn format_duration(d: Duration) -> String {
    if d.subsec_millis() != 0 || d.as_secs() == 0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{}s", d.as_secs())
    }
}

