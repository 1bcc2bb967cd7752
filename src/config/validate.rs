// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{
    ConfigFile, DiagnosticRule, ProgressSettings, RawConfigFile, RunnerSettings,
};
use crate::errors::{JobError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::JobError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let progress = resolve_progress(&raw)?;
        validate_markers(&raw)?;
        let runner = resolve_runner(&raw)?;
        let diagnostics = resolve_diagnostics(&raw)?;

        Ok(ConfigFile::new_unchecked(
            runner,
            progress,
            raw.markers,
            raw.output.format,
            diagnostics,
        ))
    }
}

/// Longest accepted `[runner].timeout`.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Longest accepted `[progress].time_scale`.
pub const MAX_TIME_SCALE: Duration = Duration::from_secs(24 * 60 * 60);

fn resolve_progress(cfg: &RawConfigFile) -> Result<ProgressSettings> {
    let p = &cfg.progress;
    if p.step_increment == 0 {
        return Err(JobError::Config(
            "[progress].step_increment must be >= 1 (got 0)".to_string(),
        ));
    }
    if p.step_cap == 0 || p.step_cap > 100 {
        return Err(JobError::Config(format!(
            "[progress].step_cap must be within 1..=100 (got {})",
            p.step_cap
        )));
    }

    let time_scale = parse_duration(&p.time_scale)
        .map_err(|e| JobError::Config(format!("[progress].time_scale: {e}")))?;
    if time_scale.is_zero() || time_scale > MAX_TIME_SCALE {
        return Err(JobError::Config(format!(
            "[progress].time_scale must be within 1ms..=24h (got {})",
            p.time_scale
        )));
    }

    Ok(ProgressSettings {
        step_increment: p.step_increment,
        step_cap: p.step_cap,
        time_scale,
    })
}

fn validate_markers(cfg: &RawConfigFile) -> Result<()> {
    let m = &cfg.markers;
    for (key, value) in [("section", &m.section), ("step", &m.step), ("recap", &m.recap)] {
        if value.trim().is_empty() {
            return Err(JobError::Config(format!(
                "[markers].{key} must not be empty"
            )));
        }
    }
    if m.section == m.step {
        return Err(JobError::Config(format!(
            "[markers].section and [markers].step must differ (both are '{}')",
            m.section
        )));
    }
    Ok(())
}

fn resolve_runner(cfg: &RawConfigFile) -> Result<RunnerSettings> {
    let r = &cfg.runner;

    if r.max_concurrent == Some(0) {
        return Err(JobError::Config(
            "[runner].max_concurrent must be >= 1 (got 0)".to_string(),
        ));
    }

    let timeout = match &r.timeout {
        Some(s) => Some(
            resolve_timeout(s).map_err(|e| JobError::Config(format!("[runner].timeout: {e}")))?,
        ),
        None => None,
    };

    let kill_grace = parse_duration(&r.kill_grace)
        .map_err(|e| JobError::Config(format!("[runner].kill_grace: {e}")))?;

    Ok(RunnerSettings {
        timeout,
        max_concurrent: r.max_concurrent,
        kill_grace,
    })
}

fn resolve_diagnostics(cfg: &RawConfigFile) -> Result<Vec<DiagnosticRule>> {
    if cfg.diagnostics.is_empty() {
        return Ok(DiagnosticRule::builtin());
    }
    for (idx, rule) in cfg.diagnostics.iter().enumerate() {
        if rule.pattern.is_empty() {
            return Err(JobError::Config(format!(
                "[[diagnostics]] entry #{} has an empty pattern",
                idx + 1
            )));
        }
    }
    Ok(cfg.diagnostics.clone())
}

/// Parse and range-check a job timeout (`[runner].timeout` or `--timeout`).
pub fn resolve_timeout(s: &str) -> std::result::Result<Duration, String> {
    let timeout = parse_duration(s)?;
    if timeout.is_zero() {
        return Err("must be greater than zero".to_string());
    }
    if timeout > MAX_TIMEOUT {
        return Err(format!("'{s}' is longer than the 30 day maximum"));
    }
    Ok(timeout)
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is out of range"))
}
