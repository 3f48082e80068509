//! Parsing of user-supplied revision expressions.

use std::fmt;

use wadiff_api::{RevisionId, RevisionRange, HEAD};

/// Separator between the two endpoints of a range expression.
pub const RANGE_SEPARATOR: &str = "..";

/// A revision expression before defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionExpr {
    /// No expression: the checked-out revision against the work tree.
    Empty,
    /// One revision, compared against the work tree.
    Single(String),
    /// Two historical endpoints.
    Range(String, String),
}

impl RevisionExpr {
    /// Parse an optional expression.
    ///
    /// `None`, the empty string and `.` are all [`RevisionExpr::Empty`]. The
    /// expression is split at the first `..` before either side is trimmed; an
    /// empty side of a range stands for `HEAD`.
    #[must_use]
    pub fn parse(expression: Option<&str>) -> Self {
        let Some(expression) = expression else {
            return Self::Empty;
        };

        if let Some((from, to)) = expression.split_once(RANGE_SEPARATOR) {
            return Self::Range(endpoint(from), endpoint(to));
        }

        match expression.trim() {
            "" | "." => Self::Empty,
            token => Self::Single(token.to_owned()),
        }
    }

    /// Build an expression from separately supplied revision and target.
    ///
    /// A non-empty `target` always yields a range, without splitting `commit`.
    #[must_use]
    pub fn from_parts(commit: Option<&str>, target: Option<&str>) -> Self {
        match target.map(str::trim).filter(|target| !target.is_empty()) {
            Some(target) => Self::Range(endpoint(commit.unwrap_or_default()), target.to_owned()),
            None => Self::parse(commit),
        }
    }

    /// True when the user supplied no expression.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Apply defaults and produce the concrete range.
    #[must_use]
    pub fn into_range(self) -> RevisionRange {
        match self {
            Self::Empty => RevisionRange::against_workspace(RevisionId::head()),
            Self::Single(revision) => {
                RevisionRange::against_workspace(RevisionId::Commit(revision))
            }
            Self::Range(from, to) => {
                RevisionRange::new(RevisionId::Commit(from), RevisionId::Commit(to))
            }
        }
    }
}

impl fmt::Display for RevisionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Single(revision) => f.write_str(revision),
            Self::Range(from, to) => write!(f, "{from}{RANGE_SEPARATOR}{to}"),
        }
    }
}

/// Parse `expression` straight into a range.
#[must_use]
pub fn parse(expression: &str) -> RevisionRange {
    RevisionExpr::parse(Some(expression)).into_range()
}

fn endpoint(side: &str) -> String {
    match side.trim() {
        "" => HEAD.to_owned(),
        token => token.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_forms_default_to_head_against_workspace() {
        for expression in [None, Some(""), Some("."), Some("  ")] {
            let range = RevisionExpr::parse(expression).into_range();
            assert_eq!(range.from, RevisionId::head(), "{expression:?}");
            assert_eq!(range.to, RevisionId::Workspace, "{expression:?}");
        }
    }

    #[test]
    fn single_token_compares_against_workspace() {
        let range = parse("abc123");
        assert_eq!(range.from, RevisionId::commit("abc123"));
        assert_eq!(range.to, RevisionId::Workspace);
    }

    #[test]
    fn two_endpoints_are_both_historical() {
        let range = parse("abc123..def456");
        assert_eq!(range.from, RevisionId::commit("abc123"));
        assert_eq!(range.to, RevisionId::commit("def456"));
        assert!(range.is_historical());
    }

    #[test]
    fn split_happens_before_trimming() {
        assert_eq!(
            RevisionExpr::parse(Some(" main .. feature ")),
            RevisionExpr::Range("main".into(), "feature".into())
        );
    }

    #[test]
    fn missing_range_side_means_head() {
        assert_eq!(
            RevisionExpr::parse(Some("v1.0..")),
            RevisionExpr::Range("v1.0".into(), "HEAD".into())
        );
        assert_eq!(
            RevisionExpr::parse(Some("..v2.0")),
            RevisionExpr::Range("HEAD".into(), "v2.0".into())
        );
    }

    #[test]
    fn explicit_pair_takes_precedence_over_splitting() {
        assert_eq!(
            RevisionExpr::from_parts(Some("abc123"), Some("def456")),
            RevisionExpr::Range("abc123".into(), "def456".into())
        );
        assert_eq!(
            RevisionExpr::from_parts(None, Some("def456")),
            RevisionExpr::Range("HEAD".into(), "def456".into())
        );
        assert_eq!(
            RevisionExpr::from_parts(Some("a..b"), None),
            RevisionExpr::Range("a".into(), "b".into())
        );
        assert_eq!(
            RevisionExpr::from_parts(Some("abc123"), Some(" ")),
            RevisionExpr::Single("abc123".into())
        );
    }

    #[test]
    fn canonical_form_reparses_to_same_range() {
        let expressions = [
            RevisionExpr::parse(None),
            RevisionExpr::parse(Some("abc123")),
            RevisionExpr::parse(Some("abc123..def456")),
            RevisionExpr::from_parts(Some("HEAD~3"), Some("origin/main")),
        ];
        for expression in expressions {
            let range = expression.into_range();
            assert_eq!(parse(&range.to_string()), range);
        }
    }

    #[test]
    fn display_round_trips_expression() {
        assert_eq!(RevisionExpr::Empty.to_string(), "");
        let range = RevisionExpr::Range("a".into(), "b".into());
        assert_eq!(RevisionExpr::parse(Some(range.to_string().as_str())), range);
    }
}
