pub mod builders;
pub mod script;

use std::sync::Once;
use std::time::Duration;

use playjobs::jobs::{JobController, JobView};
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Poll `status` until the job is terminal, the way a dashboard would.
///
/// Returns the final view and every view observed on the way.
pub async fn poll_until_terminal(controller: &JobController, id: &str) -> (JobView, Vec<JobView>) {
    with_timeout(async {
        let mut seen = Vec::new();
        loop {
            let view = controller.status(id);
            seen.push(view.clone());
            if view.is_terminal() {
                return (view, seen);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
}

/// Poll until `predicate` holds for the job's view.
pub async fn poll_until<P>(controller: &JobController, id: &str, predicate: P) -> JobView
where
    P: Fn(&JobView) -> bool,
{
    with_timeout(async {
        loop {
            let view = controller.status(id);
            if predicate(&view) {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
}
