#![allow(dead_code, unused_imports)]

pub use playjobs_test_utils::builders::ConfigFileBuilder;
pub use playjobs_test_utils::script::ScriptBuilder;
pub use playjobs_test_utils::{init_tracing, poll_until, poll_until_terminal, with_timeout};

use playjobs::jobs::JobController;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Controller with default settings and plain-text output.
pub fn text_controller() -> JobController {
    JobController::new(&ConfigFileBuilder::new().build())
}
