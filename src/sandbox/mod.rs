//! # Sandboxed JavaScript execution
//!
//! Every evaluation gets its own QuickJS runtime and context, built for that
//! call and dropped when it returns. The context has the standard library
//! builtins and nothing else: no filesystem, process or network objects. A
//! small prelude provides `console` and `print`, which write into an
//! in-memory buffer instead of the host's streams.
//!
//! Evaluations are bounded by [`SandboxLimits`]: a wall-clock timeout
//! enforced from the engine's interrupt hook, a heap limit and a stack limit.
//! Failures come back as data inside [`ExecutionResult`], never as panics.
//!
//! The interrupt hook only runs between bytecode instructions, so a single
//! long native call (a huge sort, a backtracking regex) can overrun it. A
//! sandbox given a worker program runs each evaluation in a child process
//! instead (`<program> sandbox-worker`) and kills it once the timeout passes.
//! Without one, evaluations run on the calling thread.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Cancellation handles
mod cancel;
/// Console shim and output capture
mod console;
/// QuickJS driver
mod executor;
/// Result and error types
mod result;
/// Child-process isolation
mod worker;

pub use cancel::CancelHandle;
use cancel::CancelOnDrop;
pub use console::TRUNCATION_NOTICE;
pub use result::{ErrorKind, ExecutionError, ExecutionResult};
pub use worker::{WORKER_COMMAND, serve as serve_worker};

use std::path::{Path, PathBuf};

use crate::config::{self, Config, SandboxLimits};

/// Executes self-contained units of JavaScript in isolation.
///
/// A `Sandbox` only holds limits and an optional worker program; it is
/// cheap to clone and share across threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sandbox {
    /// Bounds applied to every evaluation
    limits: SandboxLimits,
    /// Program that serves `sandbox-worker` requests, if evaluations should
    /// run out of process
    worker: Option<PathBuf>,
}

impl Sandbox {
    /// Creates a sandbox with the given limits that evaluates on the calling
    /// thread.
    pub fn new(limits: SandboxLimits) -> Self {
        Self {
            limits,
            worker: None,
        }
    }

    /// Creates a sandbox using the limits and worker program of `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            limits: config.limits().clone(),
            worker: config.worker().map(Path::to_path_buf),
        }
    }

    /// Creates a sandbox using the process-wide configuration.
    pub fn from_env() -> Self {
        Self::from_config(config::get())
    }

    /// Returns the limits in force.
    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    /// Returns the worker program, if evaluations run out of process.
    pub fn worker(&self) -> Option<&Path> {
        self.worker.as_deref()
    }

    /// Runs every evaluation in a child process started from `program`,
    /// which must answer the `sandbox-worker` subcommand.
    pub fn with_worker(mut self, program: impl Into<PathBuf>) -> Self {
        self.worker = Some(program.into());
        self
    }

    /// Runs `code`, blocking the calling thread for at most the configured
    /// timeout.
    pub fn execute(&self, code: &str) -> ExecutionResult {
        self.execute_with_cancel(code, &CancelHandle::new())
    }

    /// Runs `code`, stopping early if `cancel` fires.
    pub fn execute_with_cancel(&self, code: &str, cancel: &CancelHandle) -> ExecutionResult {
        match &self.worker {
            Some(program) => worker::evaluate(program, code, &self.limits, cancel),
            None => executor::evaluate(code, &self.limits, cancel),
        }
    }

    /// Runs `code` on tokio's blocking pool. Dropping the returned future
    /// cancels the evaluation.
    pub async fn execute_async(&self, code: impl Into<String>) -> ExecutionResult {
        let code = code.into();
        let cancel = CancelHandle::new();
        let guard = CancelOnDrop::new(cancel.clone());
        let sandbox = self.clone();

        let joined =
            tokio::task::spawn_blocking(move || sandbox.execute_with_cancel(&code, &cancel)).await;
        guard.disarm();

        match joined {
            Ok(result) => result,
            Err(e) => ExecutionResult::failed(
                String::new(),
                ExecutionError::new(ErrorKind::HostError, format!("sandbox task failed: {e}")),
            ),
        }
    }
}
