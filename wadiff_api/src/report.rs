use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::change::{Absence, ChangeEntry, MaterializedFile};
use super::revision::{RevisionId, RevisionRange};

/// Outcome for a single changed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReport {
    /// The asset that changed.
    pub entry: ChangeEntry,
    /// Materialized "before" side.
    pub from: MaterializedFile,
    /// Materialized "after" side.
    pub to: MaterializedFile,
    /// Diff artifacts written for this asset.
    #[serde(default)]
    pub artifacts: Vec<PathBuf>,
    /// Failure that stopped this asset, if any.
    #[serde(default)]
    pub error: Option<String>,
}

impl AssetReport {
    /// Start a report for a materialized pair.
    pub const fn new(entry: ChangeEntry, from: MaterializedFile, to: MaterializedFile) -> Self {
        Self {
            entry,
            from,
            to,
            artifacts: Vec::new(),
            error: None,
        }
    }

    /// True when the asset was processed without a fatal failure.
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    /// The range that was compared.
    pub range: RevisionRange,
    /// Per-asset outcomes in enumeration order.
    #[serde(default)]
    pub assets: Vec<AssetReport>,
    /// Artifacts produced by a batch invocation.
    #[serde(default)]
    pub batch_artifacts: Vec<PathBuf>,
    /// Failure not attributable to a single asset.
    #[serde(default)]
    pub failure: Option<String>,
}

impl DiffReport {
    /// An empty report for `range`.
    pub const fn new(range: RevisionRange) -> Self {
        Self {
            range,
            assets: Vec::new(),
            batch_artifacts: Vec::new(),
            failure: None,
        }
    }

    /// True when the change set was empty.
    pub fn no_differences(&self) -> bool {
        self.assets.is_empty()
    }

    /// True when every asset was processed without a fatal failure.
    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && self.assets.iter().all(AssetReport::succeeded)
    }

    /// Every artifact written during the run.
    pub fn artifacts(&self) -> impl Iterator<Item = &PathBuf> + '_ {
        self.assets
            .iter()
            .flat_map(|asset| asset.artifacts.iter())
            .chain(self.batch_artifacts.iter())
    }
}

/// User-visible milestones emitted while a run progresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum ProgressEvent {
    /// The change set under the range was empty.
    NoDifferences {
        /// Range that was compared.
        range: RevisionRange,
    },
    /// Processing of one asset is starting.
    Asset {
        /// 1-based position in the change set.
        index: usize,
        /// Size of the change set.
        total: usize,
        /// Path of the asset relative to the work tree.
        path: String,
        /// "Before" revision.
        from: RevisionId,
        /// "After" revision.
        to: RevisionId,
    },
    /// One side of an asset has no content.
    Absent {
        /// Path of the asset relative to the work tree.
        path: String,
        /// Revision lacking the content.
        revision: RevisionId,
        /// Why the content is missing.
        absence: Absence,
    },
    /// A diff artifact was written.
    Artifact {
        /// Location of the artifact.
        path: PathBuf,
    },
}
