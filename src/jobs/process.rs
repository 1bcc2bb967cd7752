// src/jobs/process.rs

//! Process plumbing for job workers.
//!
//! - The child runs in its own process group so that cancelling a job also
//!   stops whatever the tool forked.
//! - stdout and stderr share one pipe, so lines are read back in the order
//!   the process wrote them.

use std::io::{self, PipeReader};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::{JobError, Result};
use crate::jobs::request::JobRequest;

/// Line from the merged output stream, or the read error that ended it.
pub type LineResult = io::Result<String>;

/// Spawn the requested program with stdout and stderr on a single pipe.
///
/// Returns the child and the line stream read from that pipe. The stream
/// closes once every holder of the write end (the child and anything it
/// forked) has exited or closed it.
pub fn spawn(request: &JobRequest) -> Result<(Child, mpsc::Receiver<LineResult>)> {
    let launch_error = |source| JobError::Launch {
        program: request.program.clone(),
        source,
    };

    let (reader, writer) = io::pipe().map_err(launch_error)?;
    let writer_err = writer.try_clone().map_err(launch_error)?;

    let mut cmd = Command::new(&request.program);
    cmd.args(&request.args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(writer))
        .stderr(Stdio::from(writer_err))
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(launch_error)?;
    // Our copies of the write end must go, or the stream never sees EOF.
    drop(cmd);

    let lines = merged_lines(reader).map_err(launch_error)?;
    Ok((child, lines))
}

/// Read the shared output pipe into a line channel.
#[cfg(unix)]
fn merged_lines(reader: PipeReader) -> io::Result<mpsc::Receiver<LineResult>> {
    use std::os::fd::OwnedFd;
    use tokio::net::unix::pipe;

    let pipe = pipe::Receiver::from_owned_fd(OwnedFd::from(reader))?;
    let (tx, rx) = mpsc::channel::<LineResult>(256);
    tokio::spawn(pump_lines(pipe, tx));
    Ok(rx)
}

#[cfg(not(unix))]
fn merged_lines(reader: PipeReader) -> io::Result<mpsc::Receiver<LineResult>> {
    use std::io::BufRead;

    let (tx, rx) = mpsc::channel::<LineResult>(256);
    tokio::task::spawn_blocking(move || {
        let mut reader = io::BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let next = match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => Ok(decode_line(&buf)),
                Err(e) => Err(e),
            };
            let failed = next.is_err();
            if tx.blocking_send(next).is_err() || failed {
                break;
            }
        }
    });
    Ok(rx)
}

fn decode_line(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

#[cfg(unix)]
async fn pump_lines<R>(pipe: R, tx: mpsc::Sender<LineResult>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(Ok(decode_line(&buf))).await.is_err() {
                    // Worker stopped listening (cancelled or finished).
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }

    debug!("output pipe closed");
}

/// Ask the process group to stop, escalating to SIGKILL after `grace`.
pub async fn terminate(child: &mut Child, grace: Duration) -> Option<ExitStatus> {
    signal_group(child, Signal::Term);
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status.ok(),
        Err(_) => {
            warn!(pid = ?child.id(), "process ignored SIGTERM; killing");
            signal_group(child, Signal::Kill);
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill child process");
            }
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(status) => status.ok(),
                Err(_) => None,
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: Signal) {
    let sig = match signal {
        Signal::Term => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    if let Some(pid) = child.id() {
        // SAFETY: kill(2) with a negative pid targets the process group we
        // created at spawn time; it has no memory-safety preconditions.
        unsafe {
            libc::kill(-(pid as i32), sig);
        }
    }
}

#[cfg(not(unix))]
fn signal_group(_child: &Child, _signal: Signal) {}
