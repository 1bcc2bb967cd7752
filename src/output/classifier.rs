// src/output/classifier.rs

//! Line classifier for playbook-tool output.
//!
//! The tool prints a small set of structural lines:
//!
//! ```text
//! PLAY [webservers] ***********************************************
//! TASK [Install nginx] ********************************************
//! ok: [web1] => {"changed": false}
//! PLAY RECAP ******************************************************
//! web1 : ok=2 changed=1 unreachable=0 failed=0 skipped=0
//! ```
//!
//! Everything else is `Plain`.

use regex::Regex;

use crate::config::MarkerSection;
use crate::types::ResultKind;

/// Per-host `key=value` counts from a recap line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCounts {
    /// Host name; empty when the line carried counts only.
    pub host: String,
    /// Recognised counts in line order. Unknown keys are dropped.
    pub counts: Vec<(ResultKind, u64)>,
}

/// Structural tag for one line of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineTag {
    /// Whitespace only; renders to nothing.
    Blank,
    SectionStart {
        name: String,
    },
    StepStart {
        name: String,
    },
    Result {
        kind: ResultKind,
        host: String,
        /// Text after `" => "`, if any. May look like JSON; the renderer
        /// decides whether it is.
        payload: Option<String>,
    },
    /// The recap marker. Some tools print counts on the marker line itself.
    Summary {
        inline: Option<HostCounts>,
    },
    StatsLine(HostCounts),
    Plain(String),
}

/// Classifies lines against a configurable set of marker words.
#[derive(Debug, Clone)]
pub struct Classifier {
    markers: MarkerSection,
    stat_token: Regex,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&MarkerSection::default())
    }
}

impl Classifier {
    pub fn new(markers: &MarkerSection) -> Self {
        Self {
            markers: markers.clone(),
            stat_token: Regex::new(r"^([A-Za-z_]+)=(\d+)$").expect("static regex is valid"),
        }
    }

    /// Classify a single line (trailing newline already removed).
    ///
    /// Total: never panics, every input maps to some tag.
    pub fn classify(&self, line: &str) -> LineTag {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return LineTag::Blank;
        }

        // Recap before section: the default recap marker starts with the
        // section marker.
        if let Some(rest) = strip_marker(trimmed, &self.markers.recap) {
            let rest = rest.trim_matches(|c: char| c == '*' || c.is_whitespace());
            let inline = if rest.is_empty() {
                None
            } else {
                self.parse_counts(rest)
            };
            return LineTag::Summary { inline };
        }

        if let Some(name) = strip_marker(trimmed, &self.markers.section).and_then(bracketed) {
            return LineTag::SectionStart { name };
        }

        if let Some(name) = strip_marker(trimmed, &self.markers.step).and_then(bracketed) {
            return LineTag::StepStart { name };
        }

        if let Some(tag) = classify_result(trimmed) {
            return tag;
        }

        if let Some(counts) = self.parse_counts(trimmed) {
            return LineTag::StatsLine(counts);
        }

        LineTag::Plain(line.trim_end().to_string())
    }

    /// Parse `host : ok=1 changed=0 ...` (or the same without the host).
    ///
    /// Every token after the host must be `key=<digits>`, and at least one
    /// key must be a known result kind.
    fn parse_counts(&self, text: &str) -> Option<HostCounts> {
        let (host, stats_text) = match text.split_once(" : ") {
            Some((host, rest)) => (host.trim().to_string(), rest),
            None => {
                let first = text.split_whitespace().next()?;
                if self.stat_token.is_match(first) {
                    (String::new(), text)
                } else {
                    (first.to_string(), &text[first.len()..])
                }
            }
        };

        let mut counts = Vec::new();
        let mut tokens = 0usize;
        for token in stats_text.split_whitespace() {
            tokens += 1;
            let caps = self.stat_token.captures(token)?;
            let Ok(value) = caps[2].parse::<u64>() else {
                return None;
            };
            if let Ok(kind) = caps[1].parse::<ResultKind>() {
                counts.push((kind, value));
            }
        }

        if tokens == 0 || counts.is_empty() {
            return None;
        }

        Some(HostCounts { host, counts })
    }
}

/// `<kind>: [host] => payload`
fn classify_result(line: &str) -> Option<LineTag> {
    for kind in ResultKind::RESULT_PREFIXES {
        let Some(rest) = line
            .strip_prefix(kind.as_str())
            .and_then(|r| r.strip_prefix(':'))
        else {
            continue;
        };

        let (head, payload) = match rest.split_once(" => ") {
            Some((head, payload)) => (head, Some(payload.trim())),
            None => (rest, None),
        };

        let head = head.trim();
        let host = match head.strip_prefix('[') {
            Some(inner) => match inner.find(']') {
                Some(end) => inner[..end].trim().to_string(),
                None => inner.trim().to_string(),
            },
            None => head.to_string(),
        };

        let payload = payload.filter(|p| !p.is_empty()).map(str::to_string);

        return Some(LineTag::Result {
            kind,
            host,
            payload,
        });
    }
    None
}

/// Strip a marker word, requiring a word boundary after it
/// (`PLAYBOOK` does not match `PLAY`).
fn strip_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(marker)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() || c == '[' || c == '*' => Some(rest),
        Some(_) => None,
    }
}

/// Extract the name from `[name] ****`.
fn bracketed(rest: &str) -> Option<String> {
    let inner = rest.trim_start().strip_prefix('[')?;
    let end = inner.rfind(']')?;
    Some(inner[..end].trim().to_string())
}
