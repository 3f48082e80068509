use std::fmt;

use serde::{Deserialize, Serialize};

/// Token naming the repository's currently checked-out revision.
pub const HEAD: &str = "HEAD";

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "token")]
pub enum RevisionId {
    /// Live, possibly uncommitted state of the work tree.
    Workspace,
    /// Opaque version-control token (hash, branch name, `HEAD~2`, ...).
    Commit(String),
}

impl RevisionId {
    /// Construct a historical revision from any token.
    pub fn commit(token: impl Into<String>) -> Self {
        Self::Commit(token.into())
    }

    /// The currently checked-out revision.
    pub fn head() -> Self {
        Self::Commit(HEAD.to_owned())
    }

    /// Returns true for the live work tree sentinel.
    pub const fn is_workspace(&self) -> bool {
        matches!(self, Self::Workspace)
    }

    /// Label safe to embed in a file name. Distinct revisions may share one.
    pub fn file_label(&self) -> String {
        file_label(&self.to_string())
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workspace => f.write_str("workspace"),
            Self::Commit(token) => f.write_str(token),
        }
    }
}

/// The pair of revisions compared by one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRange {
    /// The "before" side.
    pub from: RevisionId,
    /// The "after" side; `Workspace` unless two endpoints were given.
    pub to: RevisionId,
}

impl RevisionRange {
    /// Construct a range from explicit endpoints.
    pub const fn new(from: RevisionId, to: RevisionId) -> Self {
        Self { from, to }
    }

    /// Range comparing `from` against the live work tree.
    pub const fn against_workspace(from: RevisionId) -> Self {
        Self::new(from, RevisionId::Workspace)
    }

    /// True when both endpoints are historical and the work tree is irrelevant.
    pub const fn is_historical(&self) -> bool {
        !self.to.is_workspace()
    }
}

/// Canonical expression form: `R` against the work tree, `A..B` otherwise.
impl fmt::Display for RevisionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.to.is_workspace() {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}..{}", self.from, self.to)
        }
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn file_label(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_depends_on_target() {
        let single = RevisionRange::against_workspace(RevisionId::commit("abc123"));
        assert_eq!(single.to_string(), "abc123");
        assert!(!single.is_historical());

        let pair = RevisionRange::new(RevisionId::commit("abc123"), RevisionId::commit("def456"));
        assert_eq!(pair.to_string(), "abc123..def456");
        assert!(pair.is_historical());
    }

    #[test]
    fn file_label_replaces_path_separators() {
        assert_eq!(file_label("origin/main~2"), "origin_main_2");
        assert_eq!(RevisionId::head().file_label(), "HEAD");
        assert_eq!(RevisionId::Workspace.file_label(), "workspace");
    }

    #[test]
    fn revision_serializes_with_kind_tag() {
        let json = serde_json::to_string(&RevisionId::commit("abc")).expect("serialize revision");
        assert_eq!(json, r#"{"kind":"commit","token":"abc"}"#);

        let decoded: RevisionId =
            serde_json::from_str(r#"{"kind":"workspace"}"#).expect("deserialize workspace");
        assert_eq!(decoded, RevisionId::Workspace);
    }
}
