// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a job.
///
/// `NotFound` is synthetic: it is only ever produced for status queries on
/// unknown ids and is never stored in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    NotFound,
}

impl JobStatus {
    /// Terminal states are never left once entered.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::NotFound => "not_found",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-host outcome reported by the playbook tool, either on a result line
/// (`ok: [host]`) or as a `key=value` token in the recap block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Ok,
    Changed,
    Failed,
    Skipped,
    Unreachable,
    Rescued,
    Ignored,
}

impl ResultKind {
    /// Kinds that can open a result line (`<kind>: [host] ...`).
    pub const RESULT_PREFIXES: [ResultKind; 5] = [
        ResultKind::Ok,
        ResultKind::Changed,
        ResultKind::Failed,
        ResultKind::Skipped,
        ResultKind::Unreachable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResultKind::Ok => "ok",
            ResultKind::Changed => "changed",
            ResultKind::Failed => "failed",
            ResultKind::Skipped => "skipped",
            ResultKind::Unreachable => "unreachable",
            ResultKind::Rescued => "rescued",
            ResultKind::Ignored => "ignored",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(ResultKind::Ok),
            "changed" => Ok(ResultKind::Changed),
            "failed" => Ok(ResultKind::Failed),
            "skipped" => Ok(ResultKind::Skipped),
            "unreachable" => Ok(ResultKind::Unreachable),
            "rescued" => Ok(ResultKind::Rescued),
            "ignored" => Ok(ResultKind::Ignored),
            other => Err(format!("unknown result kind: {other}")),
        }
    }
}

/// How rendered output fragments are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// HTML fragments for the dashboard.
    #[default]
    Html,
    /// Plain text, one line per fragment.
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "text" => Ok(OutputFormat::Text),
            other => Err(format!(
                "invalid output format: {other} (expected \"html\" or \"text\")"
            )),
        }
    }
}
