//! State shared by every stage of one run.

use std::path::{Path, PathBuf};

use wadiff_api::{DiffStrategy, RenderOptions, RetrievalPolicy};

use crate::repository::Repository;
use crate::workspace::EphemeralWorkspace;

/// Directory under the work tree that receives artifacts when none is given.
pub const DEFAULT_OUT_DIR: &str = "images";

/// User-selected behavior for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Passthrough options for the collaborators.
    pub render: RenderOptions,
    /// When collaborators are invoked.
    pub strategy: DiffStrategy,
    /// How missing historical content is treated.
    pub retrieval: RetrievalPolicy,
    /// Sub-directory of the work tree the run is limited to, `/`-separated.
    pub asset_dir: Option<String>,
    /// Case-insensitive regular expression applied to relative paths.
    pub name_pattern: Option<String>,
    /// Artifact directory; `<work tree>/images` when unset.
    pub out_dir: Option<PathBuf>,
}

/// Everything a pipeline stage may consult, borrowed for the run's duration.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'run> {
    /// Repository being compared.
    pub repository: &'run Repository,
    /// Directory holding extracted content.
    pub workspace: &'run EphemeralWorkspace,
    /// Options selected for this run.
    pub options: &'run RunOptions,
}

impl<'run> RunContext<'run> {
    /// Bundle the borrowed run state.
    #[must_use]
    pub const fn new(
        repository: &'run Repository,
        workspace: &'run EphemeralWorkspace,
        options: &'run RunOptions,
    ) -> Self {
        Self {
            repository,
            workspace,
            options,
        }
    }

    /// Work tree root.
    #[must_use]
    pub fn root(&self) -> &'run Path {
        self.repository.root()
    }

    /// Asset directory as a pathspec, `None` for the whole work tree.
    #[must_use]
    pub fn asset_dir(&self) -> Option<&'run str> {
        self.options
            .asset_dir
            .as_deref()
            .map(|dir| dir.trim_matches('/'))
            .filter(|dir| !dir.is_empty() && *dir != ".")
    }

    /// Where artifacts are written.
    #[must_use]
    pub fn out_dir(&self) -> PathBuf {
        self.options
            .out_dir
            .clone()
            .unwrap_or_else(|| self.root().join(DEFAULT_OUT_DIR))
    }
}
