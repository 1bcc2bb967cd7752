// src/output/stats.rs

//! Running per-job outcome tally.

use std::collections::BTreeMap;

use crate::output::classifier::{HostCounts, LineTag};
use crate::types::{JobStatus, ResultKind};

/// Outcome kind → count.
pub type StatCounts = BTreeMap<ResultKind, u64>;

/// Two tallies are kept:
///
/// - `live`: one increment per result line, as the run progresses.
/// - `recap`: the per-host recap counts, summed across hosts.
///
/// Once a recap has been seen it is the authoritative view; the live tally
/// only stands in while the run is still going (or when the tool never
/// prints a recap).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    live: StatCounts,
    recap: StatCounts,
    recap_seen: bool,
    recap_hosts: usize,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one classified line into the tally.
    ///
    /// Exactly one increment per result line; recap counts are summed across
    /// hosts, saturating at `u64::MAX`.
    pub fn observe(&mut self, tag: &LineTag) {
        match tag {
            LineTag::Result { kind, .. } => {
                let count = self.live.entry(*kind).or_insert(0);
                *count = count.saturating_add(1);
            }
            LineTag::Summary { inline } => {
                self.recap_seen = true;
                if let Some(counts) = inline {
                    self.add_recap(counts);
                }
            }
            LineTag::StatsLine(counts) => self.add_recap(counts),
            _ => {}
        }
    }

    fn add_recap(&mut self, host: &HostCounts) {
        self.recap_hosts += 1;
        for (kind, value) in &host.counts {
            let total = self.recap.entry(*kind).or_insert(0);
            *total = total.saturating_add(*value);
        }
    }

    /// Counts as reported to callers.
    pub fn reported(&self) -> &StatCounts {
        if self.recap_hosts > 0 {
            &self.recap
        } else {
            &self.live
        }
    }

    pub fn live(&self) -> &StatCounts {
        &self.live
    }

    pub fn recap(&self) -> &StatCounts {
        &self.recap
    }

    pub fn count(&self, kind: ResultKind) -> u64 {
        self.reported().get(&kind).copied().unwrap_or(0)
    }

    pub fn recap_seen(&self) -> bool {
        self.recap_seen || self.recap_hosts > 0
    }

    /// Verdict derived from the recap: `Failed` if any failure or unreachable
    /// host was counted, else `Completed`. `None` until a recap shows up.
    pub fn verdict(&self) -> Option<JobStatus> {
        if !self.recap_seen() {
            return None;
        }
        if self.count(ResultKind::Failed) > 0 || self.count(ResultKind::Unreachable) > 0 {
            Some(JobStatus::Failed)
        } else {
            Some(JobStatus::Completed)
        }
    }
}
