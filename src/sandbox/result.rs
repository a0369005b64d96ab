#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};

/// Why a sandboxed evaluation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The source is not syntactically valid.
    CompileError,
    /// An uncaught throw or unhandled rejection, or the runtime ran out of
    /// heap or stack.
    RuntimeError,
    /// The evaluation ran past its wall-clock budget and was interrupted.
    Timeout,
    /// The sandbox itself could not be built or driven.
    HostError,
    /// The caller cancelled the evaluation while it was running.
    Cancelled,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::CompileError => "CompileError",
            ErrorKind::RuntimeError => "RuntimeError",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::HostError => "HostError",
            ErrorKind::Cancelled => "Cancelled",
        };
        write!(f, "{name}")
    }
}

/// A classified evaluation failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ExecutionError {
    /// Failure class
    pub kind:    ErrorKind,
    /// Human readable detail, usually the engine's own error text
    pub message: String,
}

impl ExecutionError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The error reported once the wall-clock budget `limit` is spent.
    pub(crate) fn timed_out(limit: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("execution exceeded {} ms", limit.as_millis()),
        )
    }

    /// The error reported when the caller cancels a run.
    pub(crate) fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "execution was cancelled")
    }
}

/// Outcome of running one unit of JavaScript.
///
/// A failed result always carries an error; the two constructors are the only
/// way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the script ran to completion
    success:      bool,
    /// Everything printed through the console shim, trailing whitespace
    /// trimmed
    output:       String,
    /// Set exactly when `success` is false
    error:        Option<ExecutionError>,
    /// Script completion value, if it survives `JSON.stringify`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    return_value: Option<serde_json::Value>,
}

impl ExecutionResult {
    /// A successful run.
    pub fn succeeded(output: impl Into<String>, return_value: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            output: trim_output(output.into()),
            error: None,
            return_value,
        }
    }

    /// A failed run, keeping whatever was printed before the failure.
    pub fn failed(output: impl Into<String>, error: ExecutionError) -> Self {
        Self {
            success:      false,
            output:       trim_output(output.into()),
            error:        Some(error),
            return_value: None,
        }
    }

    /// Whether the script ran to completion.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Captured console output.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&ExecutionError> {
        self.error.as_ref()
    }

    /// Failure class, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Script completion value.
    pub fn return_value(&self) -> Option<&serde_json::Value> {
        self.return_value.as_ref()
    }
}

/// Reads a field that is there as `Some`, so a `null` completion value stays
/// distinct from no value at all.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Drops trailing whitespace from captured output.
fn trim_output(mut output: String) -> String {
    let len = output.trim_end().len();
    output.truncate(len);
    output
}
