// tests/property_output.rs

use proptest::prelude::*;

use playjobs::jobs::JobState;
use playjobs::output::{Classifier, LineTag, OutputRenderer, RunStats};
use playjobs::types::{JobStatus, OutputFormat, ResultKind};

fn kind_strategy() -> impl Strategy<Value = ResultKind> {
    prop_oneof![
        Just(ResultKind::Ok),
        Just(ResultKind::Changed),
        Just(ResultKind::Failed),
        Just(ResultKind::Skipped),
        Just(ResultKind::Unreachable),
    ]
}

// Lines that look like playbook output, mixed with arbitrary noise.
fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ]{0,12}".prop_map(|name| format!("PLAY [{name}] ****")),
        "[a-z ]{0,12}".prop_map(|name| format!("TASK [{name}]")),
        (kind_strategy(), "[a-z0-9]{1,8}", ".{0,20}")
            .prop_map(|(kind, host, payload)| format!("{kind}: [{host}] => {payload}")),
        Just("PLAY RECAP *****".to_string()),
        ("[a-z0-9]{1,8}", 0u64..5, 0u64..5)
            .prop_map(|(host, ok, failed)| format!("{host} : ok={ok} failed={failed}")),
        ".{0,60}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn classify_and_render_never_panic(line in any::<String>()) {
        let classifier = Classifier::default();
        let mut stats = RunStats::new();
        let tag = classifier.classify(&line);
        for format in [OutputFormat::Html, OutputFormat::Text] {
            let fragment = OutputRenderer::new(format).render(&tag, &mut stats);
            prop_assert_eq!(fragment.is_none(), tag == LineTag::Blank);
        }
    }

    #[test]
    fn result_lines_count_exactly_once(kinds in proptest::collection::vec(kind_strategy(), 0..40)) {
        let classifier = Classifier::default();
        let renderer = OutputRenderer::new(OutputFormat::Text);
        let mut stats = RunStats::new();

        for (i, kind) in kinds.iter().enumerate() {
            let tag = classifier.classify(&format!("{kind}: [host{i}]"));
            renderer.render(&tag, &mut stats);
        }

        for kind in [ResultKind::Ok, ResultKind::Changed, ResultKind::Failed, ResultKind::Skipped, ResultKind::Unreachable] {
            let expected = kinds.iter().filter(|k| **k == kind).count() as u64;
            prop_assert_eq!(stats.count(kind), expected);
        }
        prop_assert_eq!(stats.verdict(), None);
    }

    #[test]
    fn recap_counts_sum_over_hosts(rows in proptest::collection::vec((0u64..10, 0u64..3, 0u64..3), 1..8)) {
        let classifier = Classifier::default();
        let renderer = OutputRenderer::new(OutputFormat::Html);
        let mut stats = RunStats::new();

        renderer.render(&classifier.classify("PLAY RECAP ****"), &mut stats);
        for (i, (ok, failed, unreachable)) in rows.iter().enumerate() {
            let line = format!("h{i} : ok={ok} changed=0 unreachable={unreachable} failed={failed}");
            renderer.render(&classifier.classify(&line), &mut stats);
        }

        let ok: u64 = rows.iter().map(|r| r.0).sum();
        let failed: u64 = rows.iter().map(|r| r.1).sum();
        let unreachable: u64 = rows.iter().map(|r| r.2).sum();
        prop_assert_eq!(stats.count(ResultKind::Ok), ok);
        prop_assert_eq!(stats.count(ResultKind::Failed), failed);

        let expected = if failed > 0 || unreachable > 0 {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
        prop_assert_eq!(stats.verdict(), Some(expected));
    }

    #[test]
    fn progress_never_decreases(lines in proptest::collection::vec(line_strategy(), 0..60)) {
        let classifier = Classifier::default();
        let mut state = JobState::new("p".to_string(), "cmd", JobStatus::Running);
        let mut last = 0u8;

        for line in &lines {
            match classifier.classify(line) {
                LineTag::StepStart { .. } => state.bump_progress(5, 95),
                LineTag::Summary { .. } => state.raise_progress(100),
                _ => {}
            }
            prop_assert!(state.progress() >= last);
            prop_assert!(state.progress() <= 100);
            last = state.progress();
        }

        state.finish(JobStatus::Completed, Some(0));
        prop_assert_eq!(state.progress(), 100);
    }
}
