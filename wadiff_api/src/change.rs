use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::revision::RevisionId;

/// File name suffix of candidate assets, compared case-insensitively.
pub const ASSET_SUFFIX: &str = ".wad";

/// One asset that differs between the two sides of a range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Path relative to the repository work tree, `/`-separated.
    pub relative_path: String,
    /// File name without directories or the asset suffix.
    pub base_name: String,
}

impl ChangeEntry {
    /// Build an entry from a repository-relative path.
    pub fn new(relative_path: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let base_name = base_name_of(&relative_path);
        Self {
            relative_path,
            base_name,
        }
    }

    /// Directory components of the relative path, if any.
    pub fn parent_dir(&self) -> Option<&str> {
        self.relative_path
            .rsplit_once('/')
            .map(|(parent, _)| parent)
            .filter(|parent| !parent.is_empty())
    }
}

/// True when `path` carries the asset suffix.
pub fn is_asset_path(path: &str) -> bool {
    strip_suffix_ignore_case(path, ASSET_SUFFIX).is_some()
}

fn base_name_of(relative_path: &str) -> String {
    let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    strip_suffix_ignore_case(file_name, ASSET_SUFFIX)
        .unwrap_or(file_name)
        .to_owned()
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let split = text.len().checked_sub(suffix.len())?;
    let tail = text.get(split..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &text[..split])
}

/// Why a materialized side has no content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Absence {
    /// The asset is not present in the live work tree.
    MissingInWorkspace,
    /// The revision's tree has no entry for the asset.
    MissingAtRevision,
    /// The revision or its content could not be read.
    RetrievalFailed {
        /// Message reported by the version-control layer.
        reason: String,
    },
}

impl Absence {
    /// True for absences of historical content, which the strict policy treats as fatal.
    pub const fn is_historical(&self) -> bool {
        !matches!(self, Self::MissingInWorkspace)
    }
}

/// One side of an asset pair, ready to hand to collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedFile {
    /// Revision the content was taken from.
    pub revision: RevisionId,
    /// The asset this side belongs to.
    pub asset: ChangeEntry,
    /// Readable file with the content, `None` when the side has no content.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Reason `path` is `None`.
    #[serde(default)]
    pub absence: Option<Absence>,
}

impl MaterializedFile {
    /// A side backed by a readable file.
    pub fn present(revision: RevisionId, asset: ChangeEntry, path: impl Into<PathBuf>) -> Self {
        Self {
            revision,
            asset,
            path: Some(path.into()),
            absence: None,
        }
    }

    /// A side without content.
    pub const fn absent(revision: RevisionId, asset: ChangeEntry, absence: Absence) -> Self {
        Self {
            revision,
            asset,
            path: None,
            absence: Some(absence),
        }
    }

    /// Path to the content, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
