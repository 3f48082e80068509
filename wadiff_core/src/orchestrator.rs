//! Drives one comparison from revision expression to diff artifacts.
//!
//! A run acquires a private workspace, resolves the range, enumerates the
//! changed assets and materializes both sides of each one. The pair is then
//! handed to the selected [`DiffStrategy`]:
//!
//! - `PerAsset` renders each side into the workspace, pairs the images by
//!   file name and diffs every pair into the output directory. The first
//!   collaborator failure stops the run. Assets of the run sharing a base
//!   name get artifacts prefixed with their directory.
//! - `Batch` collects every present side and makes a single diff-only
//!   renderer invocation after the loop.
//!
//! Collaborator failures are recorded in the returned [`DiffReport`].
//! Failures of the environment (workspace, output directory, repository)
//! are returned as errors.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use wadiff_api::{
    file_label, Absence, AssetReport, ChangeEntry, DiffReport, DiffStrategy, MaterializedFile,
    ProgressEvent, RetrievalPolicy,
};
use wadiff_tool_api::{ToolResult, Toolchain};

use crate::changes::{enumerate, NameFilter};
use crate::context::{RunContext, RunOptions};
use crate::materialize::materialize;
use crate::range::RevisionExpr;
use crate::repository::{display_path, Repository};
use crate::workspace::EphemeralWorkspace;
use crate::{Error, Result};

/// Workspace sub-directory receiving per-asset renders.
const RENDER_DIR: &str = "render";

/// Runs comparisons against one repository with one set of collaborators.
#[derive(Debug)]
pub struct Orchestrator<'a> {
    repository: &'a Repository,
    toolchain: &'a Toolchain,
    workspace_parent: Option<PathBuf>,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator whose workspaces live in the system temporary directory.
    #[must_use]
    pub const fn new(repository: &'a Repository, toolchain: &'a Toolchain) -> Self {
        Self {
            repository,
            toolchain,
            workspace_parent: None,
        }
    }

    /// Create workspaces under `parent` instead.
    #[must_use]
    pub fn with_workspace_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.workspace_parent = Some(parent.into());
        self
    }

    /// Compare the assets changed under `expression`.
    ///
    /// `progress` observes every milestone, in order, as it happens. The
    /// workspace is removed before this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error when the workspace or output directory cannot be
    /// created, the name pattern is invalid, the range cannot be enumerated,
    /// or extracted content cannot be written.
    pub fn run(
        &self,
        expression: &RevisionExpr,
        options: &RunOptions,
        progress: &mut dyn FnMut(&ProgressEvent),
    ) -> Result<DiffReport> {
        let workspace = match &self.workspace_parent {
            Some(parent) => EphemeralWorkspace::acquire_in(parent)?,
            None => EphemeralWorkspace::acquire()?,
        };

        let outcome = {
            let ctx = RunContext::new(self.repository, &workspace, options);
            self.drive(&ctx, expression, progress)
        };
        let released = workspace.release();

        let report = outcome?;
        released?;
        Ok(report)
    }

    fn drive(
        &self,
        ctx: &RunContext<'_>,
        expression: &RevisionExpr,
        progress: &mut dyn FnMut(&ProgressEvent),
    ) -> Result<DiffReport> {
        let range = expression.clone().into_range();
        let filter = NameFilter::new(ctx.options.name_pattern.as_deref())?;
        let entries = enumerate(&range, ctx, &filter)?;
        let mut report = DiffReport::new(range.clone());

        if entries.is_empty() {
            info!(range = %range, "no differences found");
            progress(&ProgressEvent::NoDifferences { range });
            return Ok(report);
        }
        info!(
            range = %range,
            assets = entries.len(),
            strategy = %ctx.options.strategy,
            "comparing assets"
        );

        let out_dir = ctx.out_dir();
        fs::create_dir_all(&out_dir).map_err(|source| Error::Io {
            path: display_path(&out_dir),
            source,
        })?;
        let naming = ArtifactNaming::new(expression, &range.to_string(), &entries);

        let mut batch = BatchInputs::default();
        let total = entries.len();
        for (index, entry) in entries.into_iter().enumerate() {
            progress(&ProgressEvent::Asset {
                index: index + 1,
                total,
                path: entry.relative_path.clone(),
                from: range.from.clone(),
                to: range.to.clone(),
            });
            let from = materialize(ctx, &range.from, &entry)?;
            let to = materialize(ctx, &range.to, &entry)?;

            let mut asset = AssetReport::new(entry, from, to);
            let refused = report_absences(&asset, ctx.options.retrieval, progress);
            if let Some(reason) = refused {
                error!(asset = %asset.entry.relative_path, %reason, "strict retrieval failed");
                asset.error = Some(reason);
                report.assets.push(asset);
                return Ok(report);
            }

            match ctx.options.strategy {
                DiffStrategy::PerAsset => {
                    let mut artifacts = Vec::new();
                    let result = self.diff_asset(ctx, &asset, &out_dir, &naming, &mut artifacts);
                    asset.artifacts = artifacts;
                    for artifact in &asset.artifacts {
                        progress(&ProgressEvent::Artifact {
                            path: artifact.clone(),
                        });
                    }
                    if let Err(err) = result {
                        let path = &asset.entry.relative_path;
                        error!(asset = %path, error = %err, "collaborator failed");
                        asset.error = Some(err.to_string());
                        report.assets.push(asset);
                        return Ok(report);
                    }
                }
                DiffStrategy::Batch => batch.push(&asset),
            }
            report.assets.push(asset);
        }

        match ctx.options.strategy {
            DiffStrategy::PerAsset => self.show(ctx, &mut report),
            DiffStrategy::Batch => self.diff_batch(ctx, &batch, &out_dir, &mut report, progress),
        }
        Ok(report)
    }

    /// Render both sides of `asset` and diff each pair of images.
    fn diff_asset(
        &self,
        ctx: &RunContext<'_>,
        asset: &AssetReport,
        out_dir: &Path,
        naming: &ArtifactNaming,
        artifacts: &mut Vec<PathBuf>,
    ) -> ToolResult<()> {
        let options = &ctx.options.render;
        let render_root = ctx
            .workspace
            .path()
            .join(RENDER_DIR)
            .join(file_label(&asset.entry.relative_path));
        let before = self
            .toolchain
            .renderer
            .render(asset.from.path(), &render_root.join("from"), options)?;
        let after = self
            .toolchain
            .renderer
            .render(asset.to.path(), &render_root.join("to"), options)?;
        debug!(
            asset = %asset.entry.relative_path,
            before = before.len(),
            after = after.len(),
            "rendered asset"
        );

        for (name, (before, after)) in pair_by_name(before, after) {
            let out = out_dir.join(naming.name(&asset.entry, &name));
            let written = self.toolchain.differencer.diff(
                before.as_deref(),
                after.as_deref(),
                &out,
                options,
            )?;
            artifacts.extend(written);
        }
        Ok(())
    }

    fn diff_batch(
        &self,
        ctx: &RunContext<'_>,
        batch: &BatchInputs,
        out_dir: &Path,
        report: &mut DiffReport,
        progress: &mut dyn FnMut(&ProgressEvent),
    ) {
        match self
            .toolchain
            .batch
            .render_diff(&batch.from, &batch.to, out_dir, &ctx.options.render)
        {
            Ok(images) => {
                for image in &images {
                    progress(&ProgressEvent::Artifact {
                        path: image.clone(),
                    });
                }
                report.batch_artifacts = images;
            }
            Err(err) => {
                error!(error = %err, "batch diff failed");
                report.failure = Some(err.to_string());
            }
        }
    }

    fn show(&self, ctx: &RunContext<'_>, report: &mut DiffReport) {
        if !ctx.options.render.show {
            return;
        }
        let mut artifacts: Vec<PathBuf> = report.artifacts().cloned().collect();
        if artifacts.is_empty() {
            return;
        }
        artifacts.sort();
        if let Err(err) = self.toolchain.viewer.show(&artifacts, &ctx.options.render) {
            error!(error = %err, "viewer failed");
            report.failure = Some(err.to_string());
        }
    }
}

/// Present sides collected by the batch strategy.
#[derive(Debug, Default)]
struct BatchInputs {
    from: Vec<PathBuf>,
    to: Vec<PathBuf>,
}

impl BatchInputs {
    fn push(&mut self, asset: &AssetReport) {
        self.from.extend(asset.from.path().map(Path::to_path_buf));
        self.to.extend(asset.to.path().map(Path::to_path_buf));
    }
}

/// Emit an event for every absent side and apply the retrieval policy.
///
/// Returns the reason the run must stop, if the policy refuses an absence.
fn report_absences(
    asset: &AssetReport,
    policy: RetrievalPolicy,
    progress: &mut dyn FnMut(&ProgressEvent),
) -> Option<String> {
    let mut refused = None;
    for side in [&asset.from, &asset.to] {
        let Some(absence) = &side.absence else {
            continue;
        };
        progress(&ProgressEvent::Absent {
            path: asset.entry.relative_path.clone(),
            revision: side.revision.clone(),
            absence: absence.clone(),
        });

        let path = &asset.entry.relative_path;
        if let Absence::RetrievalFailed { reason } = absence {
            warn!(asset = %path, revision = %side.revision, %reason, "treating side as empty");
        } else {
            debug!(asset = %path, revision = %side.revision, "side has no content");
        }

        if policy == RetrievalPolicy::Strict && absence.is_historical() && refused.is_none() {
            refused = Some(describe_absence(side));
        }
    }
    refused
}

fn describe_absence(side: &MaterializedFile) -> String {
    let path = &side.asset.relative_path;
    match &side.absence {
        Some(Absence::RetrievalFailed { reason }) => {
            format!("cannot retrieve {path} at {}: {reason}", side.revision)
        }
        Some(Absence::MissingAtRevision) => format!("{path} does not exist at {}", side.revision),
        Some(Absence::MissingInWorkspace) => format!("{path} does not exist in the work tree"),
        None => format!("{path} is present at {}", side.revision),
    }
}

/// Pair images from both sides by file name, in name order.
fn pair_by_name(
    before: Vec<PathBuf>,
    after: Vec<PathBuf>,
) -> BTreeMap<OsString, (Option<PathBuf>, Option<PathBuf>)> {
    let mut pairs: BTreeMap<OsString, (Option<PathBuf>, Option<PathBuf>)> = BTreeMap::new();
    for image in before {
        if let Some(name) = image.file_name().map(ToOwned::to_owned) {
            pairs.entry(name).or_default().0 = Some(image);
        }
    }
    for image in after {
        if let Some(name) = image.file_name().map(ToOwned::to_owned) {
            pairs.entry(name).or_default().1 = Some(image);
        }
    }
    pairs
}

/// Names of the per-asset artifacts written during one run.
#[derive(Debug)]
struct ArtifactNaming {
    label: Option<String>,
    shared: HashMap<String, usize>,
}

impl ArtifactNaming {
    /// `range` labels the artifacts only when the user gave an expression.
    fn new(expression: &RevisionExpr, range: &str, entries: &[ChangeEntry]) -> Self {
        let mut shared: HashMap<String, usize> = HashMap::new();
        for entry in entries {
            *shared.entry(entry.base_name.to_lowercase()).or_default() += 1;
        }
        shared.retain(|_, count| *count > 1);
        if !shared.is_empty() {
            warn!(
                names = shared.len(),
                "assets share base names, prefixing artifacts with their directory"
            );
        }
        Self {
            label: (!expression.is_empty()).then(|| file_label(range)),
            shared,
        }
    }

    /// `<stem>[-<label>]-<image file name>`, where the stem is the base name,
    /// qualified by the parent directory when another asset shares it.
    fn name(&self, entry: &ChangeEntry, image: &OsString) -> String {
        let image = image.to_string_lossy();
        let stem = match entry.parent_dir() {
            Some(parent) if self.shared.contains_key(&entry.base_name.to_lowercase()) => {
                format!("{}_{}", file_label(parent), entry.base_name)
            }
            _ => entry.base_name.clone(),
        };
        match &self.label {
            Some(label) => format!("{stem}-{label}-{image}"),
            None => format!("{stem}-{image}"),
        }
    }
}
