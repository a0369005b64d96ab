#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::OnceLock,
    time::Duration,
};

use serde::{Deserialize, Serialize};

/// Default wall-clock budget for a single sandboxed evaluation.
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default heap ceiling for a sandbox runtime.
const DEFAULT_MEMORY_LIMIT_BYTES: usize = 64 * 1024 * 1024;

/// Default interpreter stack ceiling. Kept well below the 2 MiB stacks of
/// tokio's blocking pool threads.
const DEFAULT_MAX_STACK_BYTES: usize = 512 * 1024;

/// Default cap on captured console output.
const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Resource bounds applied to every sandboxed evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxLimits {
    /// Wall-clock timeout; the evaluation is interrupted once it elapses.
    timeout:            Duration,
    /// Heap limit handed to the JavaScript runtime.
    memory_limit_bytes: usize,
    /// Interpreter stack limit handed to the JavaScript runtime.
    max_stack_bytes:    usize,
    /// Console output beyond this many bytes is dropped.
    max_output_bytes:   usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            timeout:            Duration::from_millis(DEFAULT_TIMEOUT_MS),
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            max_stack_bytes:    DEFAULT_MAX_STACK_BYTES,
            max_output_bytes:   DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl SandboxLimits {
    /// Returns the evaluation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the heap limit in bytes.
    pub fn memory_limit_bytes(&self) -> usize {
        self.memory_limit_bytes
    }

    /// Returns the interpreter stack limit in bytes.
    pub fn max_stack_bytes(&self) -> usize {
        self.max_stack_bytes
    }

    /// Returns the captured output cap in bytes.
    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }

    /// Returns new limits with a custom timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns new limits with a custom heap limit.
    pub fn with_memory_limit_bytes(mut self, bytes: usize) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    /// Returns new limits with a custom stack limit.
    pub fn with_max_stack_bytes(mut self, bytes: usize) -> Self {
        self.max_stack_bytes = bytes;
        self
    }

    /// Returns new limits with a custom output cap.
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }
}

/// Score-keeping policy knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePolicy {
    /// When set, submissions made after a lesson is complete no longer count
    /// as attempts; they only add to the time spent.
    pub freeze_after_completion: bool,
}

/// Crate configuration: sandbox limits, worker program and score policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Resource bounds for sandboxed evaluation.
    limits: SandboxLimits,
    /// Program that runs evaluations out of process, if any.
    worker: Option<PathBuf>,
    /// Score-keeping policy.
    score:  ScorePolicy,
}

/// Parses an environment variable, falling back to `default` when it is
/// unset, blank, or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring unparsable value for {key}: {raw:?}");
                default
            }
        },
        _ => default,
    }
}

/// Parses a boolean flag from the environment. Accepts `1/0`, `true/false`,
/// `yes/no` and `on/off` in any case.
fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .map(|s| s.trim().to_ascii_lowercase())
        .as_deref()
    {
        Ok("1" | "true" | "yes" | "on") => true,
        Ok("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

impl Config {
    /// Builds a configuration from `TSGRADE_*` environment variables, using
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let limits = SandboxLimits {
            timeout:            Duration::from_millis(env_or(
                "TSGRADE_TIMEOUT_MS",
                DEFAULT_TIMEOUT_MS,
            )),
            memory_limit_bytes: env_or("TSGRADE_MEMORY_LIMIT_BYTES", DEFAULT_MEMORY_LIMIT_BYTES),
            max_stack_bytes:    env_or("TSGRADE_MAX_STACK_BYTES", DEFAULT_MAX_STACK_BYTES),
            max_output_bytes:   env_or("TSGRADE_MAX_OUTPUT_BYTES", DEFAULT_MAX_OUTPUT_BYTES),
        };
        let score = ScorePolicy {
            freeze_after_completion: env_flag("TSGRADE_FREEZE_AFTER_COMPLETION", false),
        };

        let worker = std::env::var_os("TSGRADE_WORKER")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Self {
            limits,
            worker,
            score,
        }
    }

    /// Returns the sandbox limits.
    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    /// Returns the worker program, if one is configured.
    pub fn worker(&self) -> Option<&Path> {
        self.worker.as_deref()
    }

    /// Returns the score policy.
    pub fn score_policy(&self) -> &ScorePolicy {
        &self.score
    }

    /// Returns a new config with different sandbox limits.
    pub fn with_limits(mut self, limits: SandboxLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Returns a new config that runs evaluations through `program`.
    pub fn with_worker(mut self, program: impl Into<PathBuf>) -> Self {
        self.worker = Some(program.into());
        self
    }

    /// Returns a new config with a different score policy.
    pub fn with_score_policy(mut self, score: ScorePolicy) -> Self {
        self.score = score;
        self
    }
}

/// Process-wide, read-only configuration.
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Returns the process-wide configuration, reading the environment on first
/// use.
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Installs `config` as the process-wide configuration. Returns `false` if a
/// configuration was already in place.
pub fn install(config: Config) -> bool {
    CONFIG.set(config).is_ok()
}
