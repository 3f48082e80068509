//! Core library for producing visual diffs of WAD assets between revisions.
//!
//! The crate is layered around four responsibilities:
//! - resolving a revision expression into a `(from, to)` range
//! - enumerating changed assets under that range
//! - materializing each side of an asset into a private workspace
//! - orchestrating the external render and diff collaborators

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

/// Change set enumeration and name filtering.
pub mod changes;
/// Per-run context threaded through the pipeline.
pub mod context;
/// Materialization of one revision of one asset.
pub mod materialize;
/// Run driver and collaborator strategies.
pub mod orchestrator;
/// Revision expression parsing.
pub mod range;
/// Git repository access built on libgit2.
pub mod repository;
/// Tracing subscriber setup.
pub mod telemetry;
/// Ephemeral extraction directory with guaranteed cleanup.
pub mod workspace;

pub use wadiff_api as api;
pub use wadiff_tool_api as tools;

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying git operation failed.
    #[error("git error: {source}")]
    Git {
        /// Original libgit2 error bubbled up by the core library.
        #[from]
        source: git2::Error,
    },
    /// Provided path does not correspond to a git repository.
    #[error("path does not reference a git repository: {path}")]
    NotARepository {
        /// Path that failed to resolve to a repository.
        path: String,
    },
    /// Bare repositories have no work tree to compare against.
    #[error("repository at {path} is bare and unsupported")]
    BareRepository {
        /// Path of the repository lacking a working tree.
        path: String,
    },
    /// Asset directory lies outside the repository work tree.
    #[error("{path} is outside the repository work tree")]
    OutsideRepository {
        /// Offending directory.
        path: String,
    },
    /// A revision token could not be resolved to a tree.
    #[error("unknown revision '{revision}': {source}")]
    UnknownRevision {
        /// Token as supplied by the user.
        revision: String,
        /// Resolution failure reported by libgit2.
        #[source]
        source: git2::Error,
    },
    /// Name filter is not a valid pattern.
    #[error("invalid name pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern as supplied by the user.
        pattern: String,
        /// Compilation failure.
        #[source]
        source: regex::Error,
    },
    /// The ephemeral workspace could not be created.
    #[error("failed to create workspace under {path}: {source}")]
    Workspace {
        /// Parent directory of the workspace.
        path: String,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
    /// Signal cleanup handler could not be installed.
    #[error("failed to install signal handler: {source}")]
    Signal {
        /// Source I/O error returned by the runtime.
        #[source]
        source: std::io::Error,
    },
    /// The workspace was removed by signal cleanup.
    #[error("workspace {path} was removed after a termination signal")]
    Terminating {
        /// The purged workspace.
        path: String,
    },
    /// Filesystem interaction failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Filesystem path involved in the failed operation.
        path: String,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
}
