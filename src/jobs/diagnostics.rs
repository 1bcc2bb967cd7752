// src/jobs/diagnostics.rs

//! Best-effort hints for failed jobs.
//!
//! Lines are scanned as they stream past; when a job ends failed, the hints
//! of every rule whose pattern was seen are appended to its output. This is
//! plain substring matching over tool messages and may miss or misfire.

use std::sync::Arc;

use crate::config::DiagnosticRule;

#[derive(Debug, Clone)]
pub struct DiagnosticScanner {
    rules: Arc<[DiagnosticRule]>,
    matched: Vec<bool>,
}

impl DiagnosticScanner {
    pub fn new(rules: Arc<[DiagnosticRule]>) -> Self {
        let matched = vec![false; rules.len()];
        Self { rules, matched }
    }

    pub fn observe(&mut self, line: &str) {
        for (rule, hit) in self.rules.iter().zip(self.matched.iter_mut()) {
            if !*hit && line.contains(rule.pattern.as_str()) {
                *hit = true;
            }
        }
    }

    /// Hints for matched rules, in rule order.
    pub fn hints(&self) -> Vec<&str> {
        self.rules
            .iter()
            .zip(&self.matched)
            .filter(|(_, hit)| **hit)
            .map(|(rule, _)| rule.hint.as_str())
            .collect()
    }
}
