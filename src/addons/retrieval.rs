//! Retrieval strategies.
//!
//! Each strategy produces `installation_path/<name>/` or fails leaving that
//! directory as it found it.

use super::extract::extract_archive;
use super::fs_ops::{commit_dir, copy_dir_recursive, is_populated, staging_dir};
use super::git::VersionControl;
use super::resolver::{self, SourceKind};
use super::transport::ArchiveTransport;
use super::types::{AddonError, ResolvedMethod};
use std::path::{Path, PathBuf};
use tracing::info;

/// Inputs shared by every strategy.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalRequest<'a> {
    /// Source location.
    pub source: &'a str,
    /// Branch or ref.
    pub branch: &'a str,
    /// Add-on name (installation subdirectory).
    pub addon_name: &'a str,
    /// Installation root.
    pub installation_path: &'a Path,
}

impl RetrievalRequest<'_> {
    /// Final location of the add-on.
    #[must_use]
    pub fn target(&self) -> PathBuf {
        self.installation_path.join(self.addon_name)
    }
}

/// A way of getting an add-on onto disk.
pub trait Retriever {
    /// The method this strategy implements.
    fn method(&self) -> ResolvedMethod;

    /// Places the add-on at [`RetrievalRequest::target`].
    fn retrieve(&self, request: &RetrievalRequest<'_>) -> Result<(), AddonError>;
}

/// Version-control checkout.
pub struct GitRetriever<'a> {
    /// Version-control client.
    git: &'a dyn VersionControl,
}

impl<'a> GitRetriever<'a> {
    /// Creates a git strategy.
    #[must_use]
    pub fn new(git: &'a dyn VersionControl) -> Self {
        Self { git }
    }
}

impl Retriever for GitRetriever<'_> {
    fn method(&self) -> ResolvedMethod {
        ResolvedMethod::Git
    }

    fn retrieve(&self, request: &RetrievalRequest<'_>) -> Result<(), AddonError> {
        let staging = staging_dir(request.installation_path)?;
        let checkout = staging.path().join("checkout");

        self.git
            .clone_ref(request.source, request.branch, &checkout)?;

        if !is_populated(&checkout) {
            return Err(AddonError::Retrieval(format!(
                "Checkout of {} at '{}' is empty",
                request.source, request.branch
            )));
        }

        commit_dir(&checkout, &request.target())?;
        info!("[ADDON-INSTALL] Checked out '{}' with git", request.addon_name);
        Ok(())
    }
}

/// Archive download and extraction.
pub struct ArchiveRetriever<'a> {
    /// Transport for remote archives.
    transport: &'a dyn ArchiveTransport,
}

impl<'a> ArchiveRetriever<'a> {
    /// Creates an archive strategy.
    #[must_use]
    pub fn new(transport: &'a dyn ArchiveTransport) -> Self {
        Self { transport }
    }
}

impl Retriever for ArchiveRetriever<'_> {
    fn method(&self) -> ResolvedMethod {
        ResolvedMethod::Zip
    }

    fn retrieve(&self, request: &RetrievalRequest<'_>) -> Result<(), AddonError> {
        let kind = resolver::classify(request.source);

        if kind.is_remote() {
            let url = resolver::archive_url(request.source, request.branch);
            // Removed on drop, whichever way extraction goes.
            let download = self.transport.download(&url)?;
            extract_archive(download.path(), request.installation_path, request.addon_name)?;
            return Ok(());
        }

        let archive = resolver::local_path(request.source)
            .filter(|_| kind == SourceKind::LocalArchive)
            .ok_or_else(|| {
                AddonError::Retrieval(format!("{} is not an archive", request.source))
            })?;
        if !archive.is_file() {
            return Err(AddonError::Retrieval(format!(
                "Archive {:?} does not exist",
                archive
            )));
        }

        extract_archive(&archive, request.installation_path, request.addon_name)?;
        Ok(())
    }
}

/// Direct copy of a local directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyRetriever;

impl Retriever for CopyRetriever {
    fn method(&self) -> ResolvedMethod {
        ResolvedMethod::Copy
    }

    fn retrieve(&self, request: &RetrievalRequest<'_>) -> Result<(), AddonError> {
        let source = resolver::local_path(request.source)
            .filter(|p| p.is_dir())
            .ok_or_else(|| {
                AddonError::Retrieval(format!("{} is not a local directory", request.source))
            })?;

        let staging = staging_dir(request.installation_path)?;
        let copy = staging.path().join("copy");

        copy_dir_recursive(&source, &copy).map_err(|e| {
            AddonError::Retrieval(format!("Failed to copy {:?}: {}", source, e))
        })?;

        if !is_populated(&copy) {
            return Err(AddonError::Retrieval(format!(
                "Source directory {:?} has no add-on content",
                source
            )));
        }

        commit_dir(&copy, &request.target())?;
        info!("[ADDON-INSTALL] Copied '{}' from {:?}", request.addon_name, source);
        Ok(())
    }
}
