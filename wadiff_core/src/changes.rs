//! Listing of changed assets under a revision range.

use regex::{Regex, RegexBuilder};
use tracing::debug;
use wadiff_api::{is_asset_path, ChangeEntry, RevisionRange};

use crate::context::RunContext;
use crate::{Error, Result};

/// Optional case-insensitive filter over repository-relative paths.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    pattern: Option<Regex>,
}

impl NameFilter {
    /// Compile `pattern`. `None` or an empty pattern matches every path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] when the pattern is not a valid
    /// regular expression.
    pub fn new(pattern: Option<&str>) -> Result<Self> {
        let pattern = match pattern.filter(|pattern| !pattern.is_empty()) {
            Some(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| Error::InvalidPattern {
                        pattern: pattern.to_owned(),
                        source,
                    })?,
            ),
            None => None,
        };
        Ok(Self { pattern })
    }

    /// True when `path` passes the filter.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.pattern
            .as_ref()
            .map_or(true, |pattern| pattern.is_match(path))
    }
}

/// Assets under the run's asset directory that differ across `range`.
///
/// Order follows the repository diff; nothing is sorted or deduplicated.
///
/// # Errors
///
/// Returns [`Error::UnknownRevision`] when an endpoint cannot be resolved,
/// or any repository failure while computing the change set.
pub fn enumerate(
    range: &RevisionRange,
    ctx: &RunContext<'_>,
    filter: &NameFilter,
) -> Result<Vec<ChangeEntry>> {
    let entries: Vec<ChangeEntry> = ctx
        .repository
        .changed_paths(range, ctx.asset_dir())?
        .into_iter()
        .filter(|path| is_asset_path(path) && filter.matches(path))
        .map(ChangeEntry::new)
        .collect();
    debug!(range = %range, count = entries.len(), "enumerated changed assets");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_empty_pattern_matches_everything() -> Result<()> {
        for pattern in [None, Some("")] {
            let filter = NameFilter::new(pattern)?;
            assert!(filter.matches("maps/e1m1.wad"));
            assert!(filter.matches("anything"));
        }
        Ok(())
    }

    #[test]
    fn pattern_is_case_insensitive() -> Result<()> {
        let filter = NameFilter::new(Some("map0[1-5]"))?;
        assert!(filter.matches("doom2/MAP05.WAD"));
        assert!(!filter.matches("doom2/map06.wad"));
        Ok(())
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = NameFilter::new(Some("e1m(")).expect_err("unbalanced group");
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "e1m("));
    }
}
