use std::io;
use std::time::Duration;

/// Errors surfaced by collaborator adapters.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The external program could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
    /// The external program exited unsuccessfully.
    #[error("{program} failed with status {status}: {stderr}")]
    Exit {
        /// Program that failed.
        program: String,
        /// Exit code, or "terminated" when killed by a signal.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },
    /// The external program did not finish in time and was killed.
    #[error("{program} timed out after {}s", .after.as_secs())]
    TimedOut {
        /// Program that was killed.
        program: String,
        /// Timeout that expired.
        after: Duration,
    },
    /// Filesystem interaction failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Path involved in the failed operation.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Generic failure surfaced by the collaborator.
    #[error("{message}")]
    Failure {
        /// Human-readable error message.
        message: String,
    },
}

impl ToolError {
    /// Helper to construct a failure from any displayable message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}

/// Convenience result alias for collaborator operations.
pub type ToolResult<T> = std::result::Result<T, ToolError>;
