#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    io::{self, BufRead, BufReader, Read, Write},
    path::Path,
    process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio},
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{
    cancel::CancelHandle,
    console::{Buffer, Console},
    executor,
    result::{ErrorKind, ExecutionError, ExecutionResult},
};
use crate::config::SandboxLimits;

/// Subcommand a worker program answers to.
pub const WORKER_COMMAND: &str = "sandbox-worker";

/// How long past the timeout a worker may take to report its own timeout
/// before it is killed.
const KILL_GRACE: Duration = Duration::from_millis(250);

/// How often the deadline and cancel flag are checked while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What the parent sends on the worker's stdin.
#[derive(Debug, Serialize, Deserialize)]
struct Request {
    /// JavaScript to run
    code:   String,
    /// bounds for the run
    limits: SandboxLimits,
}

/// One JSON line on the worker's stdout.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event {
    /// a console line, sent as soon as it is printed
    Line {
        /// line text without its newline
        text: String,
    },
    /// the run is over
    Finished {
        /// the worker's own view of the run
        result: ExecutionResult,
    },
}

/// Drop guard that kills and reaps the worker unless it was already
/// collected.
struct WorkerGuard(Option<Child>);

impl WorkerGuard {
    /// Takes the worker's stdin pipe.
    fn stdin(&mut self) -> Option<ChildStdin> {
        self.0.as_mut().and_then(|child| child.stdin.take())
    }

    /// Takes the worker's stdout pipe.
    fn stdout(&mut self) -> Option<ChildStdout> {
        self.0.as_mut().and_then(|child| child.stdout.take())
    }

    /// Waits for a worker that has already closed its output.
    fn wait(&mut self) -> Option<ExitStatus> {
        self.0.take().and_then(|mut child| child.wait().ok())
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.0.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Runs `code` in a child process started from `program`, killing it once
/// the timeout (plus a short grace period) passes or `cancel` fires.
///
/// Console lines stream back as they are printed, so a killed run still
/// reports what it printed before the kill.
pub(crate) fn evaluate(
    program: &Path,
    code: &str,
    limits: &SandboxLimits,
    cancel: &CancelHandle,
) -> ExecutionResult {
    let started = Instant::now();
    let mut output = Buffer::new(limits.max_output_bytes());

    let request = Request {
        code:   code.to_string(),
        limits: limits.clone(),
    };
    let request = match serde_json::to_vec(&request) {
        Ok(request) => request,
        Err(e) => return failed(&output, worker_error(format!("could not encode request: {e}"))),
    };

    let child = Command::new(program)
        .arg(WORKER_COMMAND)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn();
    let mut guard = match child {
        Ok(child) => WorkerGuard(Some(child)),
        Err(e) => {
            let message = format!("could not start {}: {e}", program.display());
            return failed(&output, worker_error(message));
        }
    };

    let (Some(mut stdin), Some(stdout)) = (guard.stdin(), guard.stdout()) else {
        return failed(&output, worker_error("worker pipes unavailable".to_string()));
    };

    thread::spawn(move || {
        let _ = stdin.write_all(&request);
    });

    let (tx, rx) = mpsc::channel();
    let reader = thread::spawn(move || {
        for line in BufReader::new(stdout).lines() {
            let Ok(line) = line else { break };
            if tx.send(serde_json::from_str::<Event>(&line)).is_err() {
                break;
            }
        }
    });

    let deadline = Instant::now() + limits.timeout() + KILL_GRACE;
    let stopped = loop {
        if cancel.is_cancelled() {
            break ExecutionError::cancelled();
        }
        let now = Instant::now();
        if now >= deadline {
            tracing::debug!("Killing sandbox worker past its deadline");
            break ExecutionError::timed_out(limits.timeout());
        }

        match rx.recv_timeout(POLL_INTERVAL.min(deadline - now)) {
            Ok(Ok(Event::Line { text })) => output.write_line(&text),
            Ok(Ok(Event::Finished { result })) => return result,
            Ok(Err(e)) => break worker_error(format!("unreadable worker message: {e}")),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                let status = guard
                    .wait()
                    .map_or_else(|| "unknown status".to_string(), |s| s.to_string());
                break worker_error(format!("worker stopped without a result ({status})"));
            }
        }
    };

    drop(guard);
    let _ = reader.join();
    for event in rx.try_iter().flatten() {
        match event {
            Event::Line { text } => output.write_line(&text),
            Event::Finished { result } => return result,
        }
    }

    tracing::debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        kind = %stopped.kind,
        "Sandbox worker stopped"
    );
    failed(&output, stopped)
}

/// A worker-side failure, logged as it is built.
fn worker_error(message: String) -> ExecutionError {
    tracing::warn!("Sandbox worker failed: {message}");
    ExecutionError::new(ErrorKind::HostError, message)
}

/// A failed run keeping whatever the worker printed first.
fn failed(output: &Buffer, error: ExecutionError) -> ExecutionResult {
    ExecutionResult::failed(output.contents(), error)
}

/// Serves one request read from stdin: runs the code in this process,
/// streaming each console line and then the result to stdout as JSON lines.
pub fn serve() -> Result<()> {
    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .context("Could not read sandbox request")?;
    let request: Request =
        serde_json::from_str(&raw).context("Could not parse sandbox request")?;

    let console = Console::new(request.limits.max_output_bytes()).with_tee(|line| {
        let _ = emit(&Event::Line {
            text: line.to_string(),
        });
    });
    let result = executor::evaluate_with(
        &request.code,
        &request.limits,
        &CancelHandle::new(),
        console,
    );

    emit(&Event::Finished { result }).context("Could not report sandbox result")
}

/// Writes `event` as one line and flushes it.
fn emit(event: &Event) -> Result<()> {
    let line = serde_json::to_string(event)?;
    let mut out = io::stdout().lock();
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}
