//! Add-on installers.
//!
//! [`AddonInstaller`] drives a single install: validate, resolve a method,
//! retrieve, refresh metadata, extract macros. [`MacroInstaller`] hands a
//! macro-only add-on to its own macro capability.

use super::git::{GitCli, VersionControl};
use super::macros::{self, MacroInstallOutcome};
use super::metadata::{self, FileMetadataParser, MetadataParser};
use super::resolver;
use super::retrieval::{
    ArchiveRetriever, CopyRetriever, GitRetriever, RetrievalRequest, Retriever,
};
use super::transport::{ArchiveTransport, HttpTransport};
use super::types::{Addon, AddonError, InstallMethod, Installable, ResolvedMethod};
use super::validate::{check_siblings, required_fields};
use crate::config::{self, InstallerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Installation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    /// Installer constructed, not yet run.
    Created,
    /// Descriptor passed validation.
    Validated,
    /// At least one retrieval method is usable.
    MethodResolved,
    /// Add-on files are in place.
    Retrieved,
    /// Metadata refresh attempted.
    MetadataUpdated,
    /// Macro extraction attempted.
    MacrosExtracted,
    /// Installation complete.
    Done,
    /// Installation failed.
    Failed,
}

/// Progress and outcome of an installation.
#[derive(Debug, Clone)]
pub struct InstallProgress {
    /// Current phase.
    pub phase: InstallPhase,
    /// Method that produced the installed files.
    pub method: Option<ResolvedMethod>,
    /// Error message if failed.
    pub error: Option<String>,
    /// Non-fatal problems.
    pub warnings: Vec<String>,
    /// Macro files copied into the macro directory.
    pub macros: Vec<PathBuf>,
}

impl Default for InstallProgress {
    fn default() -> Self {
        Self {
            phase: InstallPhase::Created,
            method: None,
            error: None,
            warnings: Vec::new(),
            macros: Vec::new(),
        }
    }
}

impl InstallProgress {
    /// Moves to the next phase.
    fn advance(&mut self, phase: InstallPhase) {
        debug!("[ADDON-INSTALL] {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Sets the phase to failed with error message.
    fn set_failed(&mut self, error: String) {
        self.phase = InstallPhase::Failed;
        self.error = Some(error);
    }
}

/// Single-use installer for one add-on.
///
/// The descriptor is borrowed mutably: a successful run records the
/// installed version on it through [`Installable::set_installed_version`].
pub struct AddonInstaller<'a> {
    /// Add-on being installed.
    addon: &'a mut dyn Installable,
    /// Other known add-ons, checked for name collisions.
    siblings: &'a [Addon],
    /// Root directory receiving `<name>/` subdirectories.
    pub installation_path: PathBuf,
    /// Directory receiving macro scripts found in the add-on.
    pub macro_installation_path: PathBuf,
    /// Requested installation method.
    pub method: InstallMethod,
    /// Version-control client.
    git: Box<dyn VersionControl>,
    /// Archive transport.
    transport: Box<dyn ArchiveTransport>,
    /// Metadata file parser.
    metadata_parser: Box<dyn MetadataParser>,
    /// Progress of this installation.
    progress: InstallProgress,
}

impl<'a> AddonInstaller<'a> {
    /// Creates an installer using the default directories and capabilities.
    ///
    /// `addon` stays borrowed until the installer is dropped; read its
    /// installed version afterwards.
    #[must_use]
    pub fn new(addon: &'a mut dyn Installable, siblings: &'a [Addon]) -> Self {
        Self {
            addon,
            siblings,
            installation_path: config::default_installation_path(),
            macro_installation_path: config::default_macro_installation_path(),
            method: InstallMethod::Any,
            git: Box::new(GitCli::detect()),
            transport: Box::new(HttpTransport::new()),
            metadata_parser: Box::new(FileMetadataParser),
            progress: InstallProgress::default(),
        }
    }

    /// Creates an installer configured from an [`InstallerConfig`].
    #[must_use]
    pub fn from_config(
        addon: &'a mut dyn Installable,
        siblings: &'a [Addon],
        config: &InstallerConfig,
    ) -> Self {
        Self {
            installation_path: config.installation_path.clone(),
            macro_installation_path: config.macro_installation_path.clone(),
            method: config.install_method,
            git: Box::new(GitCli::with_executable(&config.git_executable)),
            ..Self::new(addon, siblings)
        }
    }

    /// Sets the requested method.
    #[must_use]
    pub fn with_method(mut self, method: InstallMethod) -> Self {
        self.method = method;
        self
    }

    /// Replaces the version-control client.
    #[must_use]
    pub fn with_version_control(mut self, git: Box<dyn VersionControl>) -> Self {
        self.git = git;
        self
    }

    /// Replaces the archive transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Box<dyn ArchiveTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replaces the metadata parser.
    #[must_use]
    pub fn with_metadata_parser(mut self, parser: Box<dyn MetadataParser>) -> Self {
        self.metadata_parser = parser;
        self
    }

    /// Returns the progress of this installation.
    #[must_use]
    pub fn progress(&self) -> &InstallProgress {
        &self.progress
    }

    /// Runs the installation. Returns true on success.
    ///
    /// An installer runs once; later calls return false without doing anything.
    pub fn run(&mut self) -> bool {
        if self.progress.phase != InstallPhase::Created {
            warn!("[ADDON-INSTALL] Installer already ran, refusing to run again");
            return false;
        }

        match self.install() {
            Ok(()) => {
                self.progress.advance(InstallPhase::Done);
                true
            }
            Err(e) => {
                error!("[ADDON-INSTALL] Installation failed: {}", e);
                self.progress.set_failed(e.to_string());
                false
            }
        }
    }

    fn install(&mut self) -> Result<(), AddonError> {
        let descriptor = required_fields(&*self.addon)?;
        check_siblings(&*self.addon, self.siblings)?;
        self.progress.advance(InstallPhase::Validated);

        info!(
            "[ADDON-INSTALL] Installing '{}' from {} ({}), method: {}",
            descriptor.name, descriptor.url, descriptor.branch, self.method
        );

        let methods = resolver::candidates(&descriptor.url, self.method, self.git.available());
        if methods.is_empty() {
            return Err(AddonError::Resolution {
                location: descriptor.url,
                requested: self.method,
            });
        }
        self.progress.advance(InstallPhase::MethodResolved);

        let request = RetrievalRequest {
            source: &descriptor.url,
            branch: &descriptor.branch,
            addon_name: &descriptor.name,
            installation_path: &self.installation_path,
        };
        let method = self.retrieve(&request, &methods)?;
        self.progress.method = Some(method);
        self.progress.advance(InstallPhase::Retrieved);

        self.update_metadata();
        self.progress.advance(InstallPhase::MetadataUpdated);

        self.extract_macros();
        self.progress.advance(InstallPhase::MacrosExtracted);

        info!(
            "[ADDON-INSTALL] Installed '{}' with {}",
            descriptor.name, method
        );
        Ok(())
    }

    /// Tries each method in turn until one succeeds.
    fn retrieve(
        &self,
        request: &RetrievalRequest<'_>,
        methods: &[ResolvedMethod],
    ) -> Result<ResolvedMethod, AddonError> {
        let mut last_error = None;

        for &method in methods {
            let retriever: Box<dyn Retriever + '_> = match method {
                ResolvedMethod::Git => Box::new(GitRetriever::new(self.git.as_ref())),
                ResolvedMethod::Zip => Box::new(ArchiveRetriever::new(self.transport.as_ref())),
                ResolvedMethod::Copy => Box::new(CopyRetriever),
            };

            match retriever.retrieve(request) {
                Ok(()) => return Ok(retriever.method()),
                Err(e) => {
                    warn!("[ADDON-INSTALL] {} retrieval failed: {}", method, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AddonError::Retrieval(format!("No method could retrieve {}", request.source))
        }))
    }

    /// Refreshes the descriptor's installed version from the metadata file.
    ///
    /// A missing or malformed file leaves the descriptor untouched.
    pub fn update_metadata(&mut self) {
        let Some(target) = self.addon_dir() else {
            return;
        };
        let Some(path) = metadata::find_metadata_file(&target) else {
            debug!("[ADDON-INSTALL] No metadata file in {:?}", target);
            return;
        };

        match self.metadata_parser.parse(&path) {
            Ok(metadata) => {
                info!(
                    "[ADDON-INSTALL] Installed version of '{}' is {}",
                    metadata.package.name, metadata.package.version
                );
                self.addon.set_installed_version(&metadata.package.version);
            }
            Err(e) => {
                warn!("[ADDON-INSTALL] Ignoring metadata: {}", e);
                self.progress.warnings.push(e.to_string());
            }
        }
    }

    /// Copies macro scripts from the installed add-on into the macro directory.
    pub fn extract_macros(&mut self) {
        let Some(target) = self.addon_dir() else {
            return;
        };
        if !target.is_dir() {
            return;
        }

        let extraction = macros::extract_macros(&target, &self.macro_installation_path);
        self.progress.macros.extend(extraction.copied);
        self.progress.warnings.extend(extraction.warnings);
    }

    fn addon_dir(&self) -> Option<PathBuf> {
        self.addon
            .name()
            .filter(|n| !n.is_empty())
            .map(|n| self.installation_path.join(n))
    }
}

/// Installs a macro-only add-on through its macro capability.
pub struct MacroInstaller<'a> {
    /// Add-on carrying the macro capability.
    addon: &'a dyn Installable,
    /// Directory the macro is installed into.
    pub installation_path: PathBuf,
    /// Warnings reported by the last run.
    warnings: Vec<String>,
}

impl<'a> MacroInstaller<'a> {
    /// Creates a macro installer targeting the default macro directory.
    #[must_use]
    pub fn new(addon: &'a dyn Installable) -> Self {
        Self {
            addon,
            installation_path: config::default_macro_installation_path(),
            warnings: Vec::new(),
        }
    }

    /// Runs the installation, returning the capability's success flag.
    pub fn run(&mut self) -> bool {
        let Some(capability) = self.addon.macro_capability() else {
            warn!("[ADDON-MACRO] Add-on has no macro to install");
            self.warnings = vec!["Add-on has no macro to install".to_string()];
            return false;
        };

        if let Err(e) = fs::create_dir_all(&self.installation_path) {
            warn!(
                "[ADDON-MACRO] Could not create {:?}: {}",
                self.installation_path, e
            );
            self.warnings = vec![format!(
                "Could not create {:?}: {}",
                self.installation_path, e
            )];
            return false;
        }

        let MacroInstallOutcome { success, warnings } =
            capability.install(&self.installation_path);
        for w in &warnings {
            warn!("[ADDON-MACRO] {}", w);
        }
        self.warnings = warnings;

        info!(
            "[ADDON-MACRO] Macro installation into {:?} {}",
            self.installation_path,
            if success { "succeeded" } else { "failed" }
        );
        success
    }

    /// Warnings reported by the last run.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Installs `addon` under `installation_path` with default capabilities.
pub fn install(
    addon: &mut dyn Installable,
    siblings: &[Addon],
    installation_path: &Path,
    macro_installation_path: &Path,
    preference: InstallMethod,
) -> bool {
    let mut installer = AddonInstaller::new(addon, siblings).with_method(preference);
    installer.installation_path = installation_path.to_path_buf();
    installer.macro_installation_path = macro_installation_path.to_path_buf();
    installer.run()
}

/// Installs a macro-only add-on into `installation_path`.
pub fn install_macro(addon: &dyn Installable, installation_path: &Path) -> bool {
    let mut installer = MacroInstaller::new(addon);
    installer.installation_path = installation_path.to_path_buf();
    installer.run()
}
