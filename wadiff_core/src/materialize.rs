//! Turning one revision of one asset into a readable file.

use std::path::PathBuf;

use tracing::debug;
use wadiff_api::{Absence, ChangeEntry, MaterializedFile, RevisionId, ASSET_SUFFIX};

use crate::context::RunContext;
use crate::repository::BlobContent;
use crate::Result;

/// Produce the content of `asset` as it exists at `revision`.
///
/// The work tree is aliased in place. Historical content is extracted into
/// the run's workspace at a path derived from the asset, the revision and
/// the stored blob. Two extractions share a path only when their bytes are
/// identical, however the revision tokens sanitize.
///
/// Missing content is reported through [`MaterializedFile::absence`], never
/// as an error.
///
/// # Errors
///
/// Returns [`crate::Error::Io`] when extracted content cannot be written
/// into the workspace, and [`crate::Error::Terminating`] once signal cleanup
/// has removed it.
pub fn materialize(
    ctx: &RunContext<'_>,
    revision: &RevisionId,
    asset: &ChangeEntry,
) -> Result<MaterializedFile> {
    let token = match revision {
        RevisionId::Workspace => return Ok(from_work_tree(ctx, asset)),
        RevisionId::Commit(token) => token,
    };

    let blob = match ctx.repository.read_file_at(token, &asset.relative_path) {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            return Ok(MaterializedFile::absent(
                revision.clone(),
                asset.clone(),
                Absence::MissingAtRevision,
            ))
        }
        Err(err) => {
            return Ok(MaterializedFile::absent(
                revision.clone(),
                asset.clone(),
                Absence::RetrievalFailed {
                    reason: err.to_string(),
                },
            ))
        }
    };

    let target = extraction_path(ctx, revision, asset, &blob);
    ctx.workspace.store(&target, &blob.bytes)?;
    debug!(
        asset = %asset.relative_path,
        revision = %revision,
        path = %target.display(),
        "extracted asset"
    );

    Ok(MaterializedFile::present(revision.clone(), asset.clone(), target))
}

fn from_work_tree(ctx: &RunContext<'_>, asset: &ChangeEntry) -> MaterializedFile {
    let path = asset
        .relative_path
        .split('/')
        .fold(ctx.root().to_path_buf(), |path, part| path.join(part));
    if path.is_file() {
        MaterializedFile::present(RevisionId::Workspace, asset.clone(), path)
    } else {
        MaterializedFile::absent(
            RevisionId::Workspace,
            asset.clone(),
            Absence::MissingInWorkspace,
        )
    }
}

/// `<workspace>/<parent dirs>/<base name>-<revision label>-<blob id>.wad`
fn extraction_path(
    ctx: &RunContext<'_>,
    revision: &RevisionId,
    asset: &ChangeEntry,
    blob: &BlobContent,
) -> PathBuf {
    let dir = asset
        .parent_dir()
        .into_iter()
        .flat_map(|parent| parent.split('/'))
        .fold(ctx.workspace.path().to_path_buf(), |path, part| path.join(part));
    dir.join(format!(
        "{}-{}-{}{ASSET_SUFFIX}",
        asset.base_name,
        revision.file_label(),
        blob.id
    ))
}
