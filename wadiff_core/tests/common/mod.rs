#![allow(dead_code)]

use std::fs;
use std::path::Path;

use git2::{IndexAddOption, Repository as GitRepository};
use wadiff_core::{Error, Result};

pub fn write_file(path: impl AsRef<Path>, contents: &[u8]) {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write file");
}

pub fn remove_file(path: impl AsRef<Path>) {
    fs::remove_file(path).expect("remove file");
}

pub fn is_empty_dir(path: impl AsRef<Path>) -> bool {
    fs::read_dir(path)
        .expect("read dir")
        .next()
        .is_none()
}

/// Stage additions, modifications and deletions across the whole work tree.
pub fn stage_all(repo: &GitRepository) -> Result<()> {
    let mut index = repo.index()?;
    index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"], None)?;
    index.write()?;
    Ok(())
}

/// Stage a single path without touching the rest of the index.
pub fn stage_path(repo: &GitRepository, path: &str) -> Result<()> {
    let mut index = repo.index()?;
    index.add_path(Path::new(path))?;
    index.write()?;
    Ok(())
}

/// Commit everything in the work tree and return the new commit id.
pub fn commit_all(repo: &GitRepository, message: &str) -> Result<String> {
    stage_all(repo)?;
    let mut index = repo.index()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let signature = git2::Signature::now("Test", "test@example.com")?;

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
    let oid = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parent_refs,
    )?;
    Ok(oid.to_string())
}
