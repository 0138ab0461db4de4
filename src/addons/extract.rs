//! Zip archive extraction.
//!
//! Archives come in two layouts: flat (content at the top level) and
//! wrapped (a single `<repo>-<ref>/` directory holding everything, as
//! produced by code-hosting "download as zip" links). Both end up as
//! `destination_root/<addon_name>/<content>`.

use super::fs_ops::{commit_dir, staging_dir};
use super::types::AddonError;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory created inside the staging area to receive archive entries.
const UNPACK_DIR: &str = "unpacked";

/// Entries added by macOS archivers that are never add-on content.
const IGNORED_TOP_LEVEL: &[&str] = &["__MACOSX"];

/// Extracts `archive` into `destination_root/<addon_name>/`.
///
/// Replaces any existing tree at that location. The staging area is removed
/// on every exit path.
pub fn extract_archive(
    archive: &Path,
    destination_root: &Path,
    addon_name: &str,
) -> Result<PathBuf, AddonError> {
    info!(
        "[ADDON-INSTALL] Extracting {:?} for '{}' into {:?}",
        archive, addon_name, destination_root
    );

    let staging = staging_dir(destination_root)?;
    let unpacked = staging.path().join(UNPACK_DIR);
    fs::create_dir_all(&unpacked)?;

    let files = unpack_zip(archive, &unpacked)?;
    if files == 0 {
        return Err(AddonError::Extraction(format!(
            "Archive {:?} contains no files",
            archive
        )));
    }
    debug!("[ADDON-INSTALL] Unpacked {} file(s)", files);

    let content_root = match single_wrapper_dir(&unpacked)? {
        Some(wrapper) => {
            debug!("[ADDON-INSTALL] Stripping wrapper directory {:?}", wrapper);
            wrapper
        }
        None => unpacked,
    };

    let target = destination_root.join(addon_name);
    commit_dir(&content_root, &target)?;

    info!("[ADDON-INSTALL] Extracted '{}' to {:?}", addon_name, target);
    Ok(target)
}

/// Writes every entry of the archive below `dest`, returning the file count.
fn unpack_zip(archive_path: &Path, dest: &Path) -> Result<usize, AddonError> {
    let file = File::open(archive_path).map_err(|e| {
        AddonError::Extraction(format!("Failed to open archive {:?}: {}", archive_path, e))
    })?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| AddonError::Extraction(format!("Invalid or corrupt zip: {}", e)))?;

    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| AddonError::Extraction(format!("Failed to read entry {}: {}", i, e)))?;

        let Some(relative) = entry.enclosed_name() else {
            warn!("[ADDON-INSTALL] Skipping unsafe archive entry: {}", entry.name());
            continue;
        };

        let output_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)?;
        } else {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&output_path)?;
            io::copy(&mut entry, &mut outfile).map_err(|e| {
                AddonError::Extraction(format!("Failed to extract {}: {}", entry.name(), e))
            })?;
            count += 1;
        }
    }

    Ok(count)
}

/// Returns the wrapper directory if `dir` holds exactly one directory and
/// nothing else of interest.
fn single_wrapper_dir(dir: &Path) -> io::Result<Option<PathBuf>> {
    let entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_none_or(|n| !IGNORED_TOP_LEVEL.contains(&n))
        })
        .collect();

    if let [only] = entries.as_slice() {
        if only.file_type()?.is_dir() {
            return Ok(Some(only.path()));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(*name, SimpleFileOptions::default())
                    .expect("add dir");
            } else {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .expect("start file");
                writer.write_all(content.as_bytes()).expect("write entry");
            }
        }
        writer.finish().expect("finish zip");
    }

    #[test]
    fn test_flat_archive() {
        let dir = TempDir::new().expect("temp dir");
        let archive = dir.path().join("flat.zip");
        write_zip(&archive, &[("README", "flat"), ("src/lib.py", "pass")]);

        let dest = dir.path().join("installed");
        let target = extract_archive(&archive, &dest, "NonGitHubMock").expect("extract");

        assert_eq!(target, dest.join("NonGitHubMock"));
        assert!(target.join("README").is_file());
        assert!(target.join("src/lib.py").is_file());
    }

    #[test]
    fn test_wrapped_archive_is_flattened() {
        let dir = TempDir::new().expect("temp dir");
        let archive = dir.path().join("wrapped.zip");
        write_zip(
            &archive,
            &[
                ("repo-main/", ""),
                ("repo-main/README", "wrapped"),
                ("repo-main/src/lib.py", "pass"),
            ],
        );

        let dest = dir.path().join("installed");
        let target = extract_archive(&archive, &dest, "TestAddon").expect("extract");

        assert!(target.join("README").is_file());
        assert!(target.join("src/lib.py").is_file());
        assert!(!target.join("repo-main").exists());
    }

    #[test]
    fn test_single_top_level_file_is_not_a_wrapper() {
        let dir = TempDir::new().expect("temp dir");
        let archive = dir.path().join("single.zip");
        write_zip(&archive, &[("README", "only")]);

        let dest = dir.path().join("installed");
        let target = extract_archive(&archive, &dest, "Single").expect("extract");
        assert!(target.join("README").is_file());
    }

    #[test]
    fn test_corrupt_archive_leaves_nothing_behind() {
        let dir = TempDir::new().expect("temp dir");
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, b"definitely not a zip").expect("write");

        let dest = dir.path().join("installed");
        let result = extract_archive(&archive, &dest, "Broken");

        assert!(matches!(result, Err(AddonError::Extraction(_))));
        assert!(!dest.join("Broken").exists());
        let leftovers: Vec<_> = fs::read_dir(&dest).expect("read dest").collect();
        assert!(leftovers.is_empty(), "staging was not cleaned: {:?}", leftovers);
    }

    #[test]
    fn test_missing_archive() {
        let dir = TempDir::new().expect("temp dir");
        let result = extract_archive(&dir.path().join("absent.zip"), dir.path(), "Absent");
        assert!(matches!(result, Err(AddonError::Extraction(_))));
    }

    #[test]
    fn test_empty_archive_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let archive = dir.path().join("empty.zip");
        write_zip(&archive, &[("only-dir/", "")]);

        let result = extract_archive(&archive, dir.path(), "Empty");
        assert!(matches!(result, Err(AddonError::Extraction(_))));
        assert!(!dir.path().join("Empty").exists());
    }
}
