//! Addon Installer
//!
//! Installs add-ons from git repositories, zip archives or local
//! directories into a managed directory, then refreshes their metadata and
//! collects the macro scripts they ship.
//!
//! # Architecture
//!
//! - **Addons Module**: Descriptors, method resolution, retrieval, installers
//! - **Config Module**: `~/.addonrc` loading
//! - **Logging Module**: File-based tracing setup with retention cleanup
//!
//! # Usage
//!
//! ```no_run
//! use addon_installer::{install, Addon, InstallMethod};
//! use std::path::Path;
//!
//! let mut addon = Addon::new("Sheets", "/src/sheets", "main");
//! let ok = install(
//!     &mut addon,
//!     &[],
//!     Path::new("/opt/addons"),
//!     Path::new("/opt/macros"),
//!     InstallMethod::Any,
//! );
//! assert!(ok);
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

pub mod addons;
pub mod config;
pub mod logging;

// Re-export main types
pub use addons::{
    install, install_macro, resolve_method, validate, Addon, AddonError, AddonInstaller,
    InstallMethod, Installable, MacroInstaller, ResolvedMethod,
};
pub use config::InstallerConfig;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
