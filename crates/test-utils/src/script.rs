//! Fake playbook runs as `sh -c` scripts.

use playjobs::jobs::JobRequest;

/// Builds a shell script that prints the given lines and exits.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    steps: Vec<String>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print `text` on stdout.
    pub fn line(mut self, text: &str) -> Self {
        self.steps.push(format!("printf '%s\\n' {}", sh_quote(text)));
        self
    }

    /// Print `text` on stderr.
    pub fn stderr_line(mut self, text: &str) -> Self {
        self.steps.push(format!("printf '%s\\n' {} >&2", sh_quote(text)));
        self
    }

    pub fn sleep(mut self, seconds: f32) -> Self {
        self.steps.push(format!("sleep {seconds}"));
        self
    }

    pub fn exit(mut self, code: i32) -> Self {
        self.steps.push(format!("exit {code}"));
        self
    }

    /// Append a raw shell snippet.
    pub fn raw(mut self, snippet: &str) -> Self {
        self.steps.push(snippet.to_string());
        self
    }

    pub fn script(&self) -> String {
        self.steps.join("\n")
    }

    pub fn build(self) -> JobRequest {
        JobRequest::new("sh", ["-c".to_string(), self.script()]).with_label("script")
    }
}

fn sh_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}
