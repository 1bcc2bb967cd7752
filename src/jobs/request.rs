// src/jobs/request.rs

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::jobs::id::label_for;

/// What to run: a program path and its argument vector.
///
/// The process inherits the environment and working directory of the host
/// process; nothing else is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub program: String,
    pub args: Vec<String>,
    /// Prefix for the job id. Defaults to the program's base name.
    pub label: Option<String>,
}

impl JobRequest {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => label_for(&self.program),
        }
    }

    /// Human-readable command line (for the output header and logs).
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| quote(part))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(part: &str) -> String {
    if !part.is_empty() && !part.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
        return part.to_string();
    }
    format!("'{}'", part.replace('\'', r"'\''"))
}

/// Convenience builder for a playbook-tool invocation:
/// `<tool> <playbook> [-i inventory] [--limit h1,h2] [-e <json>]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybookRequest {
    pub tool: String,
    pub playbook: PathBuf,
    pub inventory: Option<PathBuf>,
    pub hosts: Vec<String>,
    pub extra_vars: Map<String, Value>,
}

impl PlaybookRequest {
    pub fn new(playbook: impl Into<PathBuf>) -> Self {
        Self {
            tool: "ansible-playbook".to_string(),
            playbook: playbook.into(),
            inventory: None,
            hosts: Vec::new(),
            extra_vars: Map::new(),
        }
    }

    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    pub fn inventory(mut self, inventory: impl Into<PathBuf>) -> Self {
        self.inventory = Some(inventory.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.hosts.push(host.into());
        self
    }

    pub fn extra_var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_vars.insert(key.into(), value.into());
        self
    }
}

impl From<PlaybookRequest> for JobRequest {
    fn from(req: PlaybookRequest) -> Self {
        let playbook = req.playbook.to_string_lossy().into_owned();
        let mut args = vec![playbook.clone()];

        if let Some(inventory) = &req.inventory {
            args.push("-i".to_string());
            args.push(inventory.to_string_lossy().into_owned());
        }
        if !req.hosts.is_empty() {
            args.push("--limit".to_string());
            args.push(req.hosts.join(","));
        }
        if !req.extra_vars.is_empty() {
            args.push("-e".to_string());
            args.push(Value::Object(req.extra_vars).to_string());
        }

        JobRequest::new(req.tool, args).with_label(label_for(&playbook))
    }
}
