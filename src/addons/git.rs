//! Version-control capability.
//!
//! The installer only needs two things from git: whether it can be used at
//! all, and a way to check out a ref of a repository into a directory.

use super::types::AddonError;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Version-control client used for checkouts.
pub trait VersionControl: Send + Sync {
    /// Returns true if the client can be used.
    fn available(&self) -> bool;

    /// Clones `reference` of `source` into `destination`.
    fn clone_ref(&self, source: &str, reference: &str, destination: &Path)
        -> Result<(), AddonError>;
}

/// Git client driving the `git` executable.
///
/// Availability is probed with `git --version` on first use.
#[derive(Debug, Clone)]
pub struct GitCli {
    /// Executable name or path.
    executable: PathBuf,
    /// Whether `git --version` succeeded.
    available: OnceLock<bool>,
}

impl GitCli {
    /// Uses `git` from PATH.
    #[must_use]
    pub fn detect() -> Self {
        Self::with_executable("git")
    }

    /// Uses a specific git executable.
    #[must_use]
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            available: OnceLock::new(),
        }
    }

    /// Returns the executable this client runs.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn probe(&self) -> bool {
        match Command::new(&self.executable).arg("--version").output() {
            Ok(output) if output.status.success() => {
                debug!(
                    "[ADDON-GIT] Found {}",
                    String::from_utf8_lossy(&output.stdout).trim()
                );
                true
            }
            Ok(_) => false,
            Err(e) => {
                debug!("[ADDON-GIT] {:?} not usable: {}", self.executable, e);
                false
            }
        }
    }

    /// Runs git with `args`, returning stderr on failure.
    fn run(&self, args: &[&OsStr]) -> Result<(), String> {
        let output = Command::new(&self.executable)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| format!("Failed to run git: {}", e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}

impl VersionControl for GitCli {
    fn available(&self) -> bool {
        *self.available.get_or_init(|| self.probe())
    }

    /// Clones `reference` of `source`.
    ///
    /// Branches and tags are cloned directly. Anything else (a commit) is
    /// checked out after a full clone.
    fn clone_ref(
        &self,
        source: &str,
        reference: &str,
        destination: &Path,
    ) -> Result<(), AddonError> {
        if !self.available() {
            return Err(AddonError::Retrieval("git is not available".to_string()));
        }
        if reference.starts_with('-') {
            return Err(AddonError::Retrieval(format!(
                "Invalid git reference '{}'",
                reference
            )));
        }

        info!(
            "[ADDON-GIT] Cloning {} at '{}' into {:?}",
            source, reference, destination
        );

        let source_arg = OsStr::new(source);
        let dest_arg = destination.as_os_str();

        let by_branch = self.run(&[
            OsStr::new("clone"),
            OsStr::new("--recurse-submodules"),
            OsStr::new("--branch"),
            OsStr::new(reference),
            OsStr::new("--"),
            source_arg,
            dest_arg,
        ]);
        let Err(branch_error) = by_branch else {
            return Ok(());
        };
        debug!(
            "[ADDON-GIT] '{}' is not a branch or tag ({}), cloning and checking out",
            reference, branch_error
        );

        if destination.exists() {
            fs::remove_dir_all(destination)?;
        }

        let fail = |step: &str, stderr: String| {
            warn!("[ADDON-GIT] {} failed: {}", step, stderr);
            AddonError::Retrieval(format!(
                "git {} of {} at '{}' failed: {}",
                step, source, reference, stderr
            ))
        };

        self.run(&[
            OsStr::new("clone"),
            OsStr::new("--"),
            source_arg,
            dest_arg,
        ])
        .map_err(|e| fail("clone", e))?;

        self.run(&[
            OsStr::new("-C"),
            dest_arg,
            OsStr::new("checkout"),
            OsStr::new("--quiet"),
            OsStr::new(reference),
            OsStr::new("--"),
        ])
        .map_err(|e| fail("checkout", e))?;

        self.run(&[
            OsStr::new("-C"),
            dest_arg,
            OsStr::new("submodule"),
            OsStr::new("update"),
            OsStr::new("--init"),
            OsStr::new("--recursive"),
        ])
        .map_err(|e| fail("submodule update", e))?;

        Ok(())
    }
}
