// src/output/mod.rs

//! Turning playbook-tool output into display state.
//!
//! - [`classifier`] tags a single line (section, step, result, recap, stats,
//!   plain).
//! - [`renderer`] turns a tag into an HTML or text fragment and feeds the
//!   per-job tally.
//! - [`stats`] holds that tally and derives the recap verdict.
//!
//! Nothing in here performs IO or can fail: every line yields a tag, every
//! tag yields (at most) one fragment.

pub mod classifier;
pub mod renderer;
pub mod stats;

pub use classifier::{Classifier, HostCounts, LineTag};
pub use renderer::{Notice, OutputRenderer};
pub use stats::{RunStats, StatCounts};
