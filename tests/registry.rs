// tests/registry.rs

use std::sync::Arc;
use std::thread;

use playjobs::errors::JobError;
use playjobs::jobs::{JobRegistry, JobState};
use playjobs::types::JobStatus;

fn running(id: &str) -> JobState {
    JobState::new(id.to_string(), "sh -c true", JobStatus::Running)
}

#[test]
fn test_create_and_get() {
    let registry = JobRegistry::new();
    assert!(registry.is_empty());

    registry.create(running("a")).unwrap();
    let view = registry.get("a").unwrap();

    assert_eq!(view.id, "a");
    assert_eq!(view.status, JobStatus::Running);
    assert_eq!(view.output, "");
    assert_eq!(view.progress, 0);
    assert!(view.stats.is_empty());
    assert!(view.started_at.is_some());
    assert_eq!(view.finished_at, None);
    assert!(registry.contains("a"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_duplicate_create_is_rejected_and_keeps_original() {
    let registry = JobRegistry::new();
    registry.create(running("a")).unwrap();
    registry.update("a", |s| s.append("first".to_string()));

    let err = registry.create(running("a")).unwrap_err();
    assert!(matches!(err, JobError::DuplicateJob(ref id) if id == "a"));
    assert_eq!(registry.get("a").unwrap().output, "first");
}

#[test]
fn test_update_of_absent_id_is_a_no_op() {
    let registry = JobRegistry::new();
    let mut called = false;
    let res = registry.update("ghost", |_| called = true);

    assert_eq!(res, None);
    assert!(!called);
    assert!(registry.get("ghost").is_none());
}

#[test]
fn test_terminal_status_is_never_left() {
    let registry = JobRegistry::new();
    registry.create(running("a")).unwrap();

    assert_eq!(
        registry.update("a", |s| s.finish(JobStatus::Cancelled, None)),
        Some(true)
    );
    assert_eq!(
        registry.update("a", |s| s.finish(JobStatus::Completed, Some(0))),
        Some(false)
    );
    assert_eq!(
        registry.update("a", |s| s.finish(JobStatus::Failed, Some(1))),
        Some(false)
    );

    let view = registry.get("a").unwrap();
    assert_eq!(view.status, JobStatus::Cancelled);
    assert_eq!(view.exit_code, None);
    assert_eq!(view.progress, 100);
    assert!(view.finished_at.is_some());
}

#[test]
fn test_finish_rejects_non_terminal_targets() {
    let mut state = running("a");
    assert!(!state.finish(JobStatus::Running, None));
    assert!(!state.finish(JobStatus::Queued, None));
    assert!(!state.finish(JobStatus::NotFound, None));
    assert_eq!(state.status(), JobStatus::Running);
}

#[test]
fn test_output_is_frozen_after_terminal() {
    let registry = JobRegistry::new();
    registry.create(running("a")).unwrap();

    assert_eq!(registry.update("a", |s| s.append("one ".to_string())), Some(true));
    registry.update("a", |s| s.finish(JobStatus::Completed, Some(0)));
    assert_eq!(registry.update("a", |s| s.append("two".to_string())), Some(false));

    assert_eq!(registry.get("a").unwrap().output, "one ");
}

#[test]
fn test_progress_is_capped_and_monotonic() {
    let mut state = running("a");
    for _ in 0..30 {
        state.bump_progress(5, 95);
    }
    assert_eq!(state.progress(), 95);

    state.raise_progress(40);
    assert_eq!(state.progress(), 95);

    state.raise_progress(100);
    assert_eq!(state.progress(), 100);

    state.bump_progress(5, 95);
    assert_eq!(state.progress(), 100);
}

#[test]
fn test_queued_to_running_transition() {
    let mut state = JobState::new("q".to_string(), "cmd", JobStatus::Queued);
    assert!(state.mark_running());
    assert_eq!(state.status(), JobStatus::Running);
    assert!(!state.mark_running());

    assert!(state.finish(JobStatus::Failed, Some(2)));
    assert!(!state.mark_running());
    assert_eq!(state.status(), JobStatus::Failed);
}

#[test]
fn test_remove_if_only_removes_when_predicate_holds() {
    let registry = JobRegistry::new();
    registry.create(running("a")).unwrap();

    assert!(registry.remove_if("a", |s| s.is_terminal()).is_none());
    assert!(registry.contains("a"));

    registry.update("a", |s| s.finish(JobStatus::Completed, Some(0)));
    let removed = registry.remove_if("a", |s| s.is_terminal()).unwrap();
    assert_eq!(removed.id(), "a");
    assert!(!registry.contains("a"));

    assert!(registry.remove_if("a", |_| true).is_none());
    assert!(registry.remove("a").is_none());
}

#[test]
fn test_list_is_sorted_oldest_first() {
    let registry = JobRegistry::new();
    for id in ["c", "a", "b"] {
        registry.create(running(id)).unwrap();
        thread::sleep(std::time::Duration::from_millis(2));
    }

    let ids: Vec<String> = registry.list().into_iter().map(|row| row.id).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[test]
fn test_concurrent_creation_from_many_threads() {
    let registry = Arc::new(JobRegistry::new());
    let mut handles = Vec::new();

    for t in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                let id = format!("job-{t}-{i}");
                registry.create(running(&id)).unwrap();
                registry.update(&id, |s| s.append(format!("{t}:{i}")));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 400);
    assert_eq!(registry.get("job-3-17").unwrap().output, "3:17");
}

#[test]
fn test_clones_share_state() {
    let registry = JobRegistry::new();
    let other = registry.clone();
    registry.create(running("a")).unwrap();
    assert!(other.contains("a"));
}
