// tests/job_cancel_timeout.rs
#![cfg(unix)]

mod common;

use std::time::Duration;

use playjobs::jobs::JobController;
use playjobs::types::JobStatus;

use crate::common::{
    ConfigFileBuilder, ScriptBuilder, TestResult, init_tracing, poll_until, text_controller,
    with_timeout,
};

#[tokio::test]
async fn test_cancel_running_job() -> TestResult {
    init_tracing();
    let controller = text_controller();

    let id = controller.submit(ScriptBuilder::new().line("started").sleep(30.0).build());
    poll_until(&controller, &id, |v| v.output.contains("started")).await;

    assert!(controller.cancel(&id));
    // The status flips before the process is gone.
    assert_eq!(controller.status(&id).status, JobStatus::Cancelled);

    let view = with_timeout(controller.wait(&id)).await;
    assert_eq!(view.status, JobStatus::Cancelled);
    assert_eq!(view.progress, 100);
    assert_eq!(view.exit_code, None);
    assert_eq!(controller.active_jobs(), 0);

    // Second cancel is a no-op.
    assert!(!controller.cancel(&id));
    Ok(())
}

#[tokio::test]
async fn test_cancel_immediately_after_submit() -> TestResult {
    init_tracing();
    let controller = text_controller();

    let id = controller.submit(ScriptBuilder::new().sleep(30.0).build());
    assert!(controller.cancel(&id));

    let view = with_timeout(controller.wait(&id)).await;
    assert_eq!(view.status, JobStatus::Cancelled);
    Ok(())
}

#[tokio::test]
async fn test_output_is_frozen_after_cancel() -> TestResult {
    init_tracing();
    let controller = text_controller();

    let id = controller.submit(
        ScriptBuilder::new()
            .line("before")
            .raw("while true; do printf 'tick\\n'; sleep 0.01; done")
            .build(),
    );
    poll_until(&controller, &id, |v| v.output.contains("tick")).await;

    assert!(controller.cancel(&id));
    let frozen = controller.status(&id).output;

    let view = with_timeout(controller.wait(&id)).await;
    assert_eq!(view.output, frozen);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(controller.status(&id).output, frozen);
    assert!(!frozen.contains("Error:"));
    Ok(())
}

#[tokio::test]
async fn test_cancel_stops_the_whole_process_group() -> TestResult {
    init_tracing();
    let controller = text_controller();
    let dir = tempfile::tempdir()?;
    let pid_file = dir.path().join("child.pid");

    let id = controller.submit(
        ScriptBuilder::new()
            .raw(&format!("sleep 30 & echo $! > '{}'", pid_file.display()))
            .line("spawned")
            .raw("wait")
            .build(),
    );
    poll_until(&controller, &id, |v| v.output.contains("spawned")).await;

    let pid: i32 = std::fs::read_to_string(&pid_file)?.trim().parse()?;
    assert!(controller.cancel(&id));
    with_timeout(controller.wait(&id)).await;

    let gone = with_timeout(async {
        loop {
            if !process_alive(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(gone, "grandchild {pid} survived cancellation");
    Ok(())
}

/// Alive and not a zombie waiting for its new parent to reap it.
fn process_alive(pid: i32) -> bool {
    // SAFETY: signal 0 only checks for existence.
    if unsafe { libc::kill(pid, 0) } != 0 {
        return false;
    }
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => !stat
            .rsplit_once(')')
            .is_some_and(|(_, rest)| rest.trim_start().starts_with('Z')),
        Err(_) => true,
    }
}

#[tokio::test]
async fn test_timeout_fails_the_job() -> TestResult {
    init_tracing();
    let controller = JobController::new(
        &ConfigFileBuilder::new()
            .timeout("300ms")
            .kill_grace("200ms")
            .build(),
    );

    let id = controller.submit(ScriptBuilder::new().line("slow start").sleep(30.0).build());
    let view = with_timeout(controller.wait(&id)).await;

    assert_eq!(view.status, JobStatus::Failed);
    assert_eq!(view.progress, 100);
    assert!(view.output.contains("slow start\n"));
    assert!(
        view.output.contains("Error: timed out after 300ms"),
        "output: {}",
        view.output
    );
    Ok(())
}

#[tokio::test]
async fn test_job_finishing_before_timeout_is_unaffected() -> TestResult {
    init_tracing();
    let controller = JobController::new(&ConfigFileBuilder::new().timeout("5s").build());

    let id = controller.submit(ScriptBuilder::new().line("quick").build());
    let view = with_timeout(controller.wait(&id)).await;

    assert_eq!(view.status, JobStatus::Completed);
    assert!(!view.output.contains("timed out"));
    Ok(())
}

#[tokio::test]
async fn test_max_concurrent_queues_extra_jobs() -> TestResult {
    init_tracing();
    let controller = JobController::new(&ConfigFileBuilder::new().max_concurrent(1).build());

    let first = controller.submit(ScriptBuilder::new().line("first").sleep(0.3).build());
    let second = controller.submit(ScriptBuilder::new().line("second").build());

    poll_until(&controller, &first, |v| v.status == JobStatus::Running).await;
    assert_eq!(controller.status(&second).status, JobStatus::Queued);

    let first_view = with_timeout(controller.wait(&first)).await;
    let second_view = with_timeout(controller.wait(&second)).await;
    assert_eq!(first_view.status, JobStatus::Completed);
    assert_eq!(second_view.status, JobStatus::Completed);
    assert!(second_view.output.contains("second\n"));
    assert!(second_view.started_at < second_view.finished_at);
    Ok(())
}

#[tokio::test]
async fn test_cancel_queued_job_never_launches_it() -> TestResult {
    init_tracing();
    let controller = JobController::new(&ConfigFileBuilder::new().max_concurrent(1).build());

    let blocker = controller.submit(ScriptBuilder::new().sleep(30.0).build());
    let queued = controller.submit(ScriptBuilder::new().line("should not run").build());
    poll_until(&controller, &blocker, |v| v.status == JobStatus::Running).await;

    assert!(controller.cancel(&queued));
    let view = with_timeout(controller.wait(&queued)).await;
    assert_eq!(view.status, JobStatus::Cancelled);
    assert!(!view.output.contains("should not run"));

    assert!(controller.cancel(&blocker));
    with_timeout(controller.wait(&blocker)).await;
    assert_eq!(controller.active_jobs(), 0);
    Ok(())
}

#[tokio::test]
async fn test_wait_on_unknown_job_returns_not_found() -> TestResult {
    init_tracing();
    let controller = text_controller();

    let view = with_timeout(controller.wait("ghost")).await;
    assert_eq!(view.status, JobStatus::NotFound);
    Ok(())
}
