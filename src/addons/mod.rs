//! Add-on installation.
//!
//! Places an add-on's files under `installation_path/<name>/` from a git
//! repository, a zip archive or a local directory, then refreshes its
//! metadata and copies any macro scripts it ships.
//!
//! # Architecture
//!
//! - **types**: Descriptors (`Installable`, `Addon`), methods and `AddonError`
//! - **validate**: Structural descriptor checks and sibling collisions
//! - **resolver**: Source classification and method resolution
//! - **retrieval**: Git, archive and copy strategies
//! - **extract**: Staged zip extraction
//! - **git** / **transport** / **metadata** / **macros**: Injected capabilities
//! - **installer**: `AddonInstaller` and `MacroInstaller`
//!
//! # Usage
//!
//! ```no_run
//! use addon_installer::addons::{Addon, AddonInstaller, InstallMethod};
//!
//! let mut addon = Addon::new("Sheets", "https://github.com/owner/sheets", "main");
//! let mut installer = AddonInstaller::new(&mut addon, &[]).with_method(InstallMethod::Any);
//! if installer.run() {
//!     println!("installed with {:?}", installer.progress().method);
//! }
//! ```

mod extract;
mod fs_ops;
mod git;
mod installer;
mod macros;
mod metadata;
mod resolver;
mod retrieval;
mod transport;
mod types;
mod validate;

pub use extract::extract_archive;
pub use git::{GitCli, VersionControl};
pub use installer::{
    install, install_macro, AddonInstaller, InstallPhase, InstallProgress, MacroInstaller,
};
pub use macros::{
    extract_macros, MacroCapability, MacroExtraction, MacroFile, MacroInstallOutcome,
    MACRO_EXTENSIONS,
};
pub use metadata::{
    find_metadata_file, load_metadata, Dependencies, FileMetadataParser, MetadataParser,
    PackageInfo, PackageMetadata, METADATA_FILE, METADATA_FILES, XML_METADATA_FILE,
};
pub use resolver::{
    archive_url, candidates, classify, resolve_method, SourceKind, KNOWN_GIT_HOSTS,
};
pub use retrieval::{
    ArchiveRetriever, CopyRetriever, GitRetriever, RetrievalRequest, Retriever,
};
pub use transport::{ArchiveTransport, HttpTransport};
pub use types::{Addon, AddonError, InstallMethod, Installable, ResolvedMethod};
pub use validate::{check_siblings, validate, Descriptor};
