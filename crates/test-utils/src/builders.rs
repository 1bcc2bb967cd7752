#![allow(dead_code)]

use playjobs::config::{ConfigFile, DiagnosticRule, RawConfigFile};
use playjobs::types::OutputFormat;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the defaults except for the output format, which is `text`
/// so assertions can match plain lines.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.output.format = OutputFormat::Text;
        Self { config }
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.output.format = format;
        self
    }

    pub fn timeout(mut self, duration: &str) -> Self {
        self.config.runner.timeout = Some(duration.to_string());
        self
    }

    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.config.runner.max_concurrent = Some(n);
        self
    }

    pub fn kill_grace(mut self, duration: &str) -> Self {
        self.config.runner.kill_grace = duration.to_string();
        self
    }

    pub fn step_progress(mut self, increment: u8, cap: u8) -> Self {
        self.config.progress.step_increment = increment;
        self.config.progress.step_cap = cap;
        self
    }

    pub fn time_scale(mut self, duration: &str) -> Self {
        self.config.progress.time_scale = duration.to_string();
        self
    }

    pub fn diagnostic(mut self, pattern: &str, hint: &str) -> Self {
        self.config.diagnostics.push(DiagnosticRule::new(pattern, hint));
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
