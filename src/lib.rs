// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod logging;
pub mod output;
pub mod types;

use std::io::Write;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_default, parse_duration, resolve_timeout};
use crate::jobs::{JobController, JobRequest};
use crate::types::JobStatus;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (+ CLI overrides)
/// - the job controller
/// - a status poll loop that streams newly appended output to stdout
/// - Ctrl-C → cancel
///
/// Returns the job's terminal status.
pub async fn run(args: CliArgs) -> Result<JobStatus> {
    let cfg = load_config(&args)?;

    if args.dry_run {
        print_dry_run(&cfg, &args);
        return Ok(JobStatus::Completed);
    }

    let Some((program, rest)) = args.command.split_first() else {
        bail!("no command given; usage: playjobs [OPTIONS] -- <PROGRAM> [ARGS...]");
    };
    let poll_interval = parse_duration(&args.poll_interval)
        .map_err(|e| anyhow::anyhow!("--poll-interval: {e}"))?;
    if poll_interval.is_zero() {
        bail!("--poll-interval must be greater than zero");
    }

    let controller = JobController::new(&cfg);
    let job_id = controller.submit(JobRequest::new(program.clone(), rest.iter().cloned()));
    info!(job_id = %job_id, "following job");

    let mut printed = 0usize;
    let mut ticker = tokio::time::interval(poll_interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancel_sent = false;

    let view = loop {
        tokio::select! {
            _ = ticker.tick() => {}
            res = &mut ctrl_c, if !cancel_sent => {
                cancel_sent = true;
                match res {
                    Ok(()) => {
                        info!(job_id = %job_id, "Ctrl+C received; cancelling job");
                        controller.cancel(&job_id);
                    }
                    Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
                }
            }
        }

        let view = controller.status(&job_id);
        printed = print_new_output(&view.output, printed)?;

        if view.is_terminal() {
            break controller.wait(&job_id).await;
        }
    };
    print_new_output(&view.output, printed)?;

    eprintln!(
        "job {} {} (progress {}%, exit code {})",
        view.id,
        view.status,
        view.progress,
        view.exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    if !view.stats.is_empty() {
        let parts: Vec<String> = view
            .stats
            .iter()
            .map(|(kind, n)| format!("{kind}={n}"))
            .collect();
        eprintln!("stats: {}", parts.join(" "));
    }

    Ok(view.status)
}

fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut cfg = load_or_default(&args.config)?;

    if let Some(format) = args.format {
        cfg.format = format;
    }
    if let Some(ref timeout) = args.timeout {
        let timeout = resolve_timeout(timeout).map_err(|e| anyhow::anyhow!("--timeout: {e}"))?;
        cfg.runner.timeout = Some(timeout);
    }

    debug!(?cfg, "effective configuration");
    Ok(cfg)
}

/// Write whatever was appended to `output` since byte offset `printed`.
///
/// Output is append-only, so the old length is always a char boundary.
fn print_new_output(output: &str, printed: usize) -> Result<usize> {
    if let Some(fresh) = output.get(printed..) {
        if !fresh.is_empty() {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(fresh.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(output.len().max(printed))
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &ConfigFile, args: &CliArgs) {
    println!("playjobs dry-run");
    println!("  output.format = {:?}", cfg.format);
    match cfg.runner.timeout {
        Some(t) => println!("  runner.timeout = {t:?}"),
        None => println!("  runner.timeout = none"),
    }
    match cfg.runner.max_concurrent {
        Some(n) => println!("  runner.max_concurrent = {n}"),
        None => println!("  runner.max_concurrent = unbounded"),
    }
    println!("  runner.kill_grace = {:?}", cfg.runner.kill_grace);
    println!(
        "  progress = +{} per step, capped at {}, time scale {:?}",
        cfg.progress.step_increment, cfg.progress.step_cap, cfg.progress.time_scale
    );
    println!(
        "  markers = section {:?}, step {:?}, recap {:?}",
        cfg.markers.section, cfg.markers.step, cfg.markers.recap
    );
    println!();

    println!("diagnostics ({}):", cfg.diagnostics.len());
    for rule in &cfg.diagnostics {
        println!("  - {:?} => {}", rule.pattern, rule.hint);
    }

    if let Some((program, rest)) = args.command.split_first() {
        let request = JobRequest::new(program.clone(), rest.iter().cloned());
        println!();
        println!("command: {}", request.command_line());
    }

    debug!("dry-run complete (no execution)");
}
