//! Macro scripts.
//!
//! Add-ons may ship macro scripts anywhere in their tree; after install those
//! are copied flat into the macro directory. Macro-only add-ons carry a
//! [`MacroCapability`] that installs themselves.

use super::fs_ops::find_files_with_extension;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File extensions identifying macro scripts (matched case-insensitively).
pub const MACRO_EXTENSIONS: &[&str] = &["FCMacro", "macro"];

/// Result reported by a macro capability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroInstallOutcome {
    /// Whether the macro was installed.
    pub success: bool,
    /// Non-fatal problems encountered.
    pub warnings: Vec<String>,
}

impl MacroInstallOutcome {
    /// Successful outcome with no warnings.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            warnings: Vec::new(),
        }
    }

    /// Failed outcome with a reason.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            warnings: vec![reason.into()],
        }
    }
}

/// Something that can install a macro into a directory.
pub trait MacroCapability: Send + Sync {
    /// Installs into `destination`, which already exists.
    fn install(&self, destination: &Path) -> MacroInstallOutcome;
}

/// A macro script on disk, with optional companion files (icons, data).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroFile {
    /// Path to the macro script.
    pub script: PathBuf,
    /// Companion files copied next to the script.
    pub extra_files: Vec<PathBuf>,
}

impl MacroFile {
    /// Creates a macro from a script path.
    #[must_use]
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            extra_files: Vec::new(),
        }
    }

    /// Adds a companion file.
    #[must_use]
    pub fn with_extra_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.extra_files.push(path.into());
        self
    }
}

impl MacroCapability for MacroFile {
    fn install(&self, destination: &Path) -> MacroInstallOutcome {
        let Some(file_name) = self.script.file_name() else {
            return MacroInstallOutcome::failed(format!(
                "Macro path {:?} has no file name",
                self.script
            ));
        };

        if let Err(e) = fs::copy(&self.script, destination.join(file_name)) {
            return MacroInstallOutcome::failed(format!(
                "Failed to copy macro {:?}: {}",
                self.script, e
            ));
        }

        let mut outcome = MacroInstallOutcome::ok();
        for extra in &self.extra_files {
            let copied = extra
                .file_name()
                .ok_or_else(|| "no file name".to_string())
                .and_then(|name| {
                    fs::copy(extra, destination.join(name)).map_err(|e| e.to_string())
                });
            if let Err(e) = copied {
                outcome
                    .warnings
                    .push(format!("Could not copy {:?}: {}", extra, e));
            }
        }

        outcome
    }
}

/// Macro files copied out of an installed add-on.
#[derive(Debug, Clone, Default)]
pub struct MacroExtraction {
    /// Destination paths of copied macros.
    pub copied: Vec<PathBuf>,
    /// Problems that did not stop the install.
    pub warnings: Vec<String>,
}

/// Copies every macro script under `tree` into `macro_dir`.
///
/// The originals stay in place. Finding no macros is not an error.
pub fn extract_macros(tree: &Path, macro_dir: &Path) -> MacroExtraction {
    let mut extraction = MacroExtraction::default();

    let macros = match find_files_with_extension(tree, MACRO_EXTENSIONS) {
        Ok(found) => found,
        Err(e) => {
            warn!("[ADDON-MACRO] Could not scan {:?}: {}", tree, e);
            extraction
                .warnings
                .push(format!("Could not scan {:?} for macros: {}", tree, e));
            return extraction;
        }
    };

    if macros.is_empty() {
        debug!("[ADDON-MACRO] No macros in {:?}", tree);
        return extraction;
    }

    if let Err(e) = fs::create_dir_all(macro_dir) {
        warn!("[ADDON-MACRO] Could not create {:?}: {}", macro_dir, e);
        extraction
            .warnings
            .push(format!("Could not create macro directory {:?}: {}", macro_dir, e));
        return extraction;
    }

    for source in macros {
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let destination = macro_dir.join(file_name);
        match fs::copy(&source, &destination) {
            Ok(_) => {
                info!("[ADDON-MACRO] Copied {:?} to {:?}", source, destination);
                extraction.copied.push(destination);
            }
            Err(e) => {
                warn!("[ADDON-MACRO] Failed to copy {:?}: {}", source, e);
                extraction
                    .warnings
                    .push(format!("Failed to copy macro {:?}: {}", source, e));
            }
        }
    }

    extraction
}
