// src/jobs/id.rs

//! Job id generation.
//!
//! Ids read `<label>_<YYYYmmdd_HHMMSS>_<seq>`. The timestamp keeps them
//! human-sortable; the sequence number keeps two submissions within the same
//! second apart.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;

use crate::jobs::JobId;

#[derive(Debug, Default)]
pub struct JobIdGenerator {
    seq: AtomicU64,
}

impl JobIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self, label: &str) -> JobId {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        format!("{}_{}_{}", sanitize(label), stamp, seq)
    }
}

/// Base name of a program or file path, used as the default job label.
pub fn label_for(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "job".to_string())
}

fn sanitize(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "job".to_string()
    } else {
        cleaned
    }
}
