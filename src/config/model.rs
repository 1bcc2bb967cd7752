// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::types::OutputFormat;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [runner]
/// timeout = "10m"
/// max_concurrent = 4
///
/// [progress]
/// step_increment = 5
/// step_cap = 95
/// time_scale = "60s"
///
/// [markers]
/// section = "PLAY"
/// step = "TASK"
/// recap = "PLAY RECAP"
///
/// [output]
/// format = "html"
///
/// [[diagnostics]]
/// pattern = "No hosts matched"
/// hint = "No host matched the given pattern."
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub progress: ProgressSection,

    #[serde(default)]
    pub markers: MarkerSection,

    #[serde(default)]
    pub output: OutputSection,

    /// Known failure substrings and the hint appended when they show up in
    /// the output of a failed job. Empty means "use the built-in rules".
    #[serde(default)]
    pub diagnostics: Vec<DiagnosticRule>,
}

/// `[runner]` section. Durations are strings like `"250ms"`, `"3s"`, `"10m"`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Kill a job that runs longer than this. Absent means no timeout.
    #[serde(default)]
    pub timeout: Option<String>,

    /// Upper bound on concurrently running processes. Absent means unbounded.
    #[serde(default)]
    pub max_concurrent: Option<usize>,

    /// Time between SIGTERM and SIGKILL when stopping a process.
    #[serde(default = "default_kill_grace")]
    pub kill_grace: String,
}

fn default_kill_grace() -> String {
    "2s".to_string()
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            timeout: None,
            max_concurrent: None,
            kill_grace: default_kill_grace(),
        }
    }
}

/// `[progress]` section: the step heuristic plus an elapsed-time floor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgressSection {
    #[serde(default = "default_step_increment")]
    pub step_increment: u8,

    #[serde(default = "default_step_cap")]
    pub step_cap: u8,

    /// Run time at which the time floor would reach 100% (it stops at
    /// `step_cap`).
    #[serde(default = "default_time_scale")]
    pub time_scale: String,
}

fn default_step_increment() -> u8 {
    5
}

fn default_step_cap() -> u8 {
    95
}

fn default_time_scale() -> String {
    "60s".to_string()
}

impl Default for ProgressSection {
    fn default() -> Self {
        Self {
            step_increment: default_step_increment(),
            step_cap: default_step_cap(),
            time_scale: default_time_scale(),
        }
    }
}

/// Validated progress settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSettings {
    pub step_increment: u8,
    pub step_cap: u8,
    pub time_scale: Duration,
}

impl ProgressSettings {
    /// Progress implied by elapsed run time alone, capped at `step_cap`.
    pub fn time_floor(&self, elapsed: Duration) -> u8 {
        if self.time_scale.is_zero() {
            return 0;
        }
        let pct = elapsed.as_secs_f64() / self.time_scale.as_secs_f64() * 100.0;
        pct.min(f64::from(self.step_cap)) as u8
    }

    /// How often the time floor is re-evaluated: about once per percent,
    /// but no more than ten times a second.
    pub fn tick_period(&self) -> Duration {
        (self.time_scale / 100).max(Duration::from_millis(100))
    }
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            step_increment: default_step_increment(),
            step_cap: default_step_cap(),
            time_scale: Duration::from_secs(60),
        }
    }
}

/// `[markers]` section: the reserved words that open structural lines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarkerSection {
    #[serde(default = "default_section_marker")]
    pub section: String,

    #[serde(default = "default_step_marker")]
    pub step: String,

    #[serde(default = "default_recap_marker")]
    pub recap: String,
}

fn default_section_marker() -> String {
    "PLAY".to_string()
}

fn default_step_marker() -> String {
    "TASK".to_string()
}

fn default_recap_marker() -> String {
    "PLAY RECAP".to_string()
}

impl Default for MarkerSection {
    fn default() -> Self {
        Self {
            section: default_section_marker(),
            step: default_step_marker(),
            recap: default_recap_marker(),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OutputSection {
    #[serde(default)]
    pub format: OutputFormat,
}

/// One `[[diagnostics]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiagnosticRule {
    pub pattern: String,
    pub hint: String,
}

impl DiagnosticRule {
    pub fn new(pattern: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            hint: hint.into(),
        }
    }

    /// Rules applied when the config file lists none.
    pub fn builtin() -> Vec<DiagnosticRule> {
        vec![
            DiagnosticRule::new(
                "No hosts matched",
                "ERROR: no host matched the given pattern. Check that the hosts exist in the inventory.",
            ),
            DiagnosticRule::new(
                "Could not match supplied host pattern",
                "ERROR: the supplied host pattern does not match any host in the inventory.",
            ),
        ]
    }
}

/// Validated runner settings with durations resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    pub timeout: Option<Duration>,
    pub max_concurrent: Option<usize>,
    pub kill_grace: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            timeout: None,
            max_concurrent: None,
            kill_grace: Duration::from_secs(2),
        }
    }
}

/// Validated configuration.
///
/// Build it through `ConfigFile::try_from(RawConfigFile)` (see `validate.rs`)
/// or take the defaults.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runner: RunnerSettings,
    pub progress: ProgressSettings,
    pub markers: MarkerSection,
    pub format: OutputFormat,
    pub diagnostics: Vec<DiagnosticRule>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        runner: RunnerSettings,
        progress: ProgressSettings,
        markers: MarkerSection,
        format: OutputFormat,
        diagnostics: Vec<DiagnosticRule>,
    ) -> Self {
        Self {
            runner,
            progress,
            markers,
            format,
            diagnostics,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            runner: RunnerSettings::default(),
            progress: ProgressSettings::default(),
            markers: MarkerSection::default(),
            format: OutputFormat::default(),
            diagnostics: DiagnosticRule::builtin(),
        }
    }
}
