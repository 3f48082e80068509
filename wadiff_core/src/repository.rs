//! Repository access built on top of libgit2.

use std::fmt;
use std::path::{Path, PathBuf};

use git2::{Diff, DiffOptions, ErrorClass, ErrorCode, Repository as GitRepository, Tree};
use tracing::debug;
use wadiff_api::{RevisionId, RevisionRange};

use crate::{Error, Result};

/// Handle to the repository whose assets are compared.
pub struct Repository {
    inner: GitRepository,
    root: PathBuf,
}

impl Repository {
    /// Open a repository from the given filesystem path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be canonicalized, does not resolve
    /// to a git repository, or resolves to a bare repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let original = path.as_ref();
        let canonical = std::fs::canonicalize(original).map_err(|source| Error::Io {
            path: display_path(original),
            source,
        })?;

        let repo = match GitRepository::discover(&canonical) {
            Ok(repo) => repo,
            Err(err)
                if err.class() == ErrorClass::Repository && err.code() == ErrorCode::NotFound =>
            {
                return Err(Error::NotARepository {
                    path: display_path(&canonical),
                })
            }
            Err(err) => return Err(Error::from(err)),
        };

        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::BareRepository {
                path: display_path(&canonical),
            })?;
        let root = std::fs::canonicalize(&root).map_err(|source| Error::Io {
            path: display_path(&root),
            source,
        })?;

        Ok(Self { inner: repo, root })
    }

    /// Returns the absolute path to the work tree root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Express `dir` as a pathspec relative to the work tree root.
    ///
    /// Returns `None` when `dir` is the root itself.
    ///
    /// # Errors
    ///
    /// Returns an error when `dir` does not exist or lies outside the work tree.
    pub fn scope_for(&self, dir: impl AsRef<Path>) -> Result<Option<String>> {
        let dir = dir.as_ref();
        let canonical = std::fs::canonicalize(dir).map_err(|source| Error::Io {
            path: display_path(dir),
            source,
        })?;
        let relative = canonical
            .strip_prefix(&self.root)
            .map_err(|_| Error::OutsideRepository {
                path: display_path(&canonical),
            })?;

        let parts: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok((!parts.is_empty()).then(|| parts.join("/")))
    }

    /// Paths that differ between `range.from` and `range.to`, limited to `scope`.
    ///
    /// When `range.to` is the workspace the comparison target is the work tree
    /// including staged changes; otherwise two trees are compared and the work
    /// tree is never read. Order is the order libgit2 reports deltas in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRevision`] when an endpoint cannot be resolved,
    /// or any libgit2 failure while computing the diff.
    pub fn changed_paths(&self, range: &RevisionRange, scope: Option<&str>) -> Result<Vec<String>> {
        let mut opts = DiffOptions::new();
        opts.include_typechange(true);
        if let Some(scope) = scope {
            opts.pathspec(scope);
        }

        let diff = self.diff(range, &mut opts)?;
        let mut paths = Vec::with_capacity(diff.deltas().len());
        for delta in diff.deltas() {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(git_path);
            if let Some(path) = path {
                paths.push(path);
            }
        }
        debug!(range = %range, count = paths.len(), "listed changed paths");
        Ok(paths)
    }

    /// Blob stored at `path` in the tree of `revision`, `None` when the tree has no such file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRevision`] when the revision cannot be resolved,
    /// or any libgit2 failure while reading the object.
    pub fn read_file_at(&self, revision: &str, path: &str) -> Result<Option<BlobContent>> {
        let tree = self.tree(revision)?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
            Err(err) => return Err(Error::from(err)),
        };

        let object = entry.to_object(&self.inner)?;
        match object.into_blob() {
            Ok(blob) => Ok(Some(BlobContent {
                id: blob.id().to_string(),
                bytes: blob.content().to_vec(),
            })),
            Err(_) => Ok(None),
        }
    }

    fn diff(&self, range: &RevisionRange, opts: &mut DiffOptions) -> Result<Diff<'_>> {
        let diff = match (&range.from, &range.to) {
            (RevisionId::Workspace, RevisionId::Workspace) => {
                self.inner.diff_tree_to_tree(None, None, Some(opts))?
            }
            (RevisionId::Commit(from), RevisionId::Workspace) => {
                let from = self.tree(from)?;
                self.inner.diff_tree_to_workdir_with_index(Some(&from), Some(opts))?
            }
            (RevisionId::Workspace, RevisionId::Commit(to)) => {
                let to = self.tree(to)?;
                opts.reverse(true);
                self.inner.diff_tree_to_workdir_with_index(Some(&to), Some(opts))?
            }
            (RevisionId::Commit(from), RevisionId::Commit(to)) => {
                let from = self.tree(from)?;
                let to = self.tree(to)?;
                self.inner
                    .diff_tree_to_tree(Some(&from), Some(&to), Some(opts))?
            }
        };
        Ok(diff)
    }

    fn tree(&self, revision: &str) -> Result<Tree<'_>> {
        self.inner
            .revparse_single(revision)
            .and_then(|object| object.peel_to_tree())
            .map_err(|source| Error::UnknownRevision {
                revision: revision.to_owned(),
                source,
            })
    }
}

/// A file as stored in the object database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobContent {
    /// Hex object id; equal ids mean equal bytes.
    pub id: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

/// `/`-separated form of a repository path.
fn git_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) fn display_path(path: &Path) -> String {
    path.to_path_buf()
        .into_os_string()
        .to_string_lossy()
        .into_owned()
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{IndexAddOption, Repository as GitRepository};
    use tempfile::TempDir;

    #[test]
    fn read_file_at_distinguishes_missing_path_from_unknown_revision() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let git_repo = GitRepository::init(temp.path())?;
        write_file(temp.path().join("e1m1.wad"), b"PWAD one");
        stage_and_commit(&git_repo, "Initial commit")?;

        let repo = Repository::open(temp.path())?;
        let blob = repo.read_file_at("HEAD", "e1m1.wad")?.expect("committed file");
        assert_eq!(blob.bytes, b"PWAD one");
        assert_eq!(blob.id.len(), 40);
        assert_eq!(repo.read_file_at("HEAD", "e1m2.wad")?, None);
        assert!(matches!(
            repo.read_file_at("no-such-branch", "e1m1.wad"),
            Err(Error::UnknownRevision { .. })
        ));
        Ok(())
    }

    #[test]
    fn scope_for_is_relative_to_root() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        GitRepository::init(temp.path())?;
        std::fs::create_dir_all(temp.path().join("maps/doom2")).expect("create dirs");

        let repo = Repository::open(temp.path())?;
        assert_eq!(repo.scope_for(temp.path())?, None);
        assert_eq!(
            repo.scope_for(temp.path().join("maps/doom2"))?.as_deref(),
            Some("maps/doom2")
        );

        let outside = TempDir::new().expect("tempdir");
        assert!(matches!(
            repo.scope_for(outside.path()),
            Err(Error::OutsideRepository { .. })
        ));
        Ok(())
    }

    #[test]
    fn open_non_repository_returns_error() {
        let temp = TempDir::new().expect("tempdir");
        let err = Repository::open(temp.path());
        assert!(matches!(err, Err(Error::NotARepository { .. })));
    }

    fn write_file(path: std::path::PathBuf, contents: &[u8]) {
        std::fs::write(path, contents).expect("write file");
    }

    fn stage_and_commit(repo: &GitRepository, message: &str) -> Result<()> {
        let mut index = repo.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.write()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let signature = git2::Signature::now("Test User", "test@example.com")?;

        let parents = match repo.head() {
            Ok(head) => head
                .peel_to_commit()
                .map_or_else(|_| Vec::new(), |parent| vec![parent]),
            Err(err)
                if matches!(
                    (err.class(), err.code()),
                    (
                        git2::ErrorClass::Reference,
                        git2::ErrorCode::NotFound | git2::ErrorCode::UnbornBranch
                    )
                ) =>
            {
                Vec::new()
            }
            Err(err) => return Err(Error::from(err)),
        };

        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parent_refs,
        )?;
        Ok(())
    }
}
