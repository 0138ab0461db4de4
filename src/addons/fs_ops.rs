//! Filesystem helpers shared by the retrieval strategies.
//!
//! Every strategy builds the add-on tree inside a staging directory next to
//! its final location and commits it with a rename, so a failed attempt never
//! leaves a partially populated add-on directory behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{error, warn};

/// Version-control metadata directories that are never treated as add-on content.
pub const VCS_DIRECTORIES: &[&str] = &[".git", ".hg", ".svn"];

/// Creates a staging directory inside `root`, removed when dropped.
pub fn staging_dir(root: &Path) -> io::Result<TempDir> {
    fs::create_dir_all(root)?;
    tempfile::Builder::new()
        .prefix(".addon-staging-")
        .tempdir_in(root)
}

/// Moves the staged tree at `staged` to `target`, replacing any existing tree.
///
/// The previous tree is restored if the final rename fails. If restoring
/// fails too, the previous tree is left in its backup directory.
pub fn commit_dir(staged: &Path, target: &Path) -> io::Result<()> {
    commit_dir_with(staged, target, |from, to| fs::rename(from, to))
}

fn commit_dir_with<R>(staged: &Path, target: &Path, mut rename: R) -> io::Result<()>
where
    R: FnMut(&Path, &Path) -> io::Result<()>,
{
    if !target.exists() {
        return rename(staged, target);
    }

    let parent = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no parent"))?;
    let backup = tempfile::Builder::new()
        .prefix(".addon-previous-")
        .tempdir_in(parent)?;
    let previous = backup.path().join("previous");

    rename(target, &previous)?;
    if let Err(e) = rename(staged, target) {
        if let Err(restore) = rename(&previous, target) {
            let kept = backup.keep();
            error!(
                "[ADDON-INSTALL] Could not restore {:?} ({}); previous tree kept at {:?}",
                target,
                restore,
                kept.join("previous")
            );
        }
        return Err(e);
    }

    Ok(())
}

/// Recursively copies a directory, skipping version-control metadata.
///
/// Symbolic links are followed. Dangling links and links back to a
/// directory being copied are skipped.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    let mut ancestors = vec![fs::canonicalize(src)?];
    copy_tree(src, dst, &mut ancestors)
}

fn copy_tree(src: &Path, dst: &Path, ancestors: &mut Vec<PathBuf>) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        let file_type = if entry.file_type()?.is_symlink() {
            match fs::metadata(&src_path) {
                Ok(target) => target.file_type(),
                Err(e) => {
                    warn!("[ADDON-INSTALL] Skipping dangling link {:?}: {}", src_path, e);
                    continue;
                }
            }
        } else {
            entry.file_type()?
        };

        if file_type.is_dir() {
            if is_vcs_dir(&src_path) {
                continue;
            }
            let real = fs::canonicalize(&src_path)?;
            if ancestors.contains(&real) {
                warn!("[ADDON-INSTALL] Skipping link cycle at {:?}", src_path);
                continue;
            }
            ancestors.push(real);
            copy_tree(&src_path, &dst_path, ancestors)?;
            ancestors.pop();
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

/// Returns true if the path names a version-control metadata directory.
#[must_use]
pub fn is_vcs_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| VCS_DIRECTORIES.contains(&n))
}

/// Returns true if the directory exists and has at least one entry.
#[must_use]
pub fn is_populated(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Lists files under `root` whose extension matches one of `extensions`
/// case-insensitively, skipping version-control directories.
pub fn find_files_with_extension(root: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                if !is_vcs_dir(&path) {
                    pending.push(path);
                }
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
            {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}
