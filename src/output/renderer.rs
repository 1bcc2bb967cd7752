// src/output/renderer.rs

//! Display fragments for classified lines.
//!
//! Rendering is total: a payload that looks like JSON but does not parse is
//! shown as literal text, never an error.

use std::fmt::Write as _;

use crate::output::classifier::{HostCounts, LineTag};
use crate::output::stats::RunStats;
use crate::types::{OutputFormat, ResultKind};

/// Lines the job layer writes itself (not produced by the tool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice<'a> {
    /// The command line being run.
    Command(&'a str),
    /// Launch, stream, timeout or exit failures.
    Error(&'a str),
    /// Diagnostic hint for a known failure message.
    Hint(&'a str),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render one tag and fold it into `stats`.
    ///
    /// Returns `None` for blank lines.
    pub fn render(&self, tag: &LineTag, stats: &mut RunStats) -> Option<String> {
        stats.observe(tag);
        self.fragment(tag)
    }

    /// Render a tag without touching any tally.
    pub fn fragment(&self, tag: &LineTag) -> Option<String> {
        match self.format {
            OutputFormat::Html => html_fragment(tag),
            OutputFormat::Text => text_fragment(tag),
        }
    }

    pub fn notice(&self, notice: Notice<'_>) -> String {
        match self.format {
            OutputFormat::Html => match notice {
                Notice::Command(cmd) => {
                    format!(r#"<div class="job-command">Command: {}</div>"#, escape(cmd))
                }
                Notice::Error(msg) => {
                    format!(r#"<div class="job-error">{}</div>"#, escape(msg))
                }
                Notice::Hint(msg) => {
                    format!(r#"<div class="job-hint">{}</div>"#, escape(msg))
                }
            },
            OutputFormat::Text => match notice {
                Notice::Command(cmd) => format!("Command: {cmd}\n\n"),
                Notice::Error(msg) => format!("\nError: {msg}\n"),
                Notice::Hint(msg) => format!("\n{msg}\n"),
            },
        }
    }
}

fn label(kind: ResultKind) -> &'static str {
    match kind {
        ResultKind::Ok => "Success",
        ResultKind::Changed => "Changed",
        ResultKind::Failed => "Failed",
        ResultKind::Skipped => "Skipped",
        ResultKind::Unreachable => "Unreachable",
        ResultKind::Rescued => "Rescued",
        ResultKind::Ignored => "Ignored",
    }
}

/// Pretty-print a payload when it is a JSON object; `None` otherwise.
fn pretty_json(payload: &str) -> Option<String> {
    let trimmed = payload.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

fn html_fragment(tag: &LineTag) -> Option<String> {
    let out = match tag {
        LineTag::Blank => return None,
        LineTag::SectionStart { name } => {
            format!(r#"<div class="job-section">Play: {}</div>"#, escape(name))
        }
        LineTag::StepStart { name } => {
            format!(r#"<div class="job-step">Task: {}</div>"#, escape(name))
        }
        LineTag::Result {
            kind,
            host,
            payload,
        } => {
            let mut out = format!(
                r#"<div class="job-result job-result-{}"><div class="job-result-head"><span class="job-result-label">{}</span><span class="job-result-host">Host: {}</span></div>"#,
                kind,
                label(*kind),
                escape(host)
            );
            if let Some(payload) = payload {
                match pretty_json(payload) {
                    Some(pretty) => {
                        let _ = write!(out, r#"<pre class="job-payload">{}</pre>"#, escape(&pretty));
                    }
                    None => {
                        let _ = write!(
                            out,
                            r#"<div class="job-payload-text">{}</div>"#,
                            escape(payload)
                        );
                    }
                }
            }
            out.push_str("</div>");
            out
        }
        LineTag::Summary { inline } => {
            let mut out = r#"<div class="job-recap">Recap</div>"#.to_string();
            if let Some(counts) = inline {
                out.push_str(&html_counts(counts));
            }
            out
        }
        LineTag::StatsLine(counts) => html_counts(counts),
        LineTag::Plain(text) => format!(r#"<div class="job-line">{}</div>"#, escape(text)),
    };
    Some(out)
}

fn html_counts(counts: &HostCounts) -> String {
    let mut out = String::from(r#"<div class="job-stats">"#);
    if !counts.host.is_empty() {
        let _ = write!(
            out,
            r#"<div class="job-stats-host">Host: {}</div>"#,
            escape(&counts.host)
        );
    }
    for (kind, value) in &counts.counts {
        let _ = write!(
            out,
            r#"<span class="job-stat job-stat-{kind}">{kind}: {value}</span>"#
        );
    }
    out.push_str("</div>");
    out
}

fn text_fragment(tag: &LineTag) -> Option<String> {
    let out = match tag {
        LineTag::Blank => return None,
        LineTag::SectionStart { name } => format!("\n== Play: {name} ==\n"),
        LineTag::StepStart { name } => format!("-- Task: {name}\n"),
        LineTag::Result {
            kind,
            host,
            payload,
        } => match payload {
            Some(payload) => {
                let body = pretty_json(payload).unwrap_or_else(|| payload.clone());
                format!("{kind}: [{host}] => {body}\n")
            }
            None => format!("{kind}: [{host}]\n"),
        },
        LineTag::Summary { inline } => {
            let mut out = String::from("\n== Recap ==\n");
            if let Some(counts) = inline {
                out.push_str(&text_counts(counts));
            }
            out
        }
        LineTag::StatsLine(counts) => text_counts(counts),
        LineTag::Plain(text) => format!("{text}\n"),
    };
    Some(out)
}

fn text_counts(counts: &HostCounts) -> String {
    let tokens: Vec<String> = counts
        .counts
        .iter()
        .map(|(kind, value)| format!("{kind}={value}"))
        .collect();
    if counts.host.is_empty() {
        format!("{}\n", tokens.join(" "))
    } else {
        format!("{} : {}\n", counts.host, tokens.join(" "))
    }
}

/// Minimal HTML text escaping.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
