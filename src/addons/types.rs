//! Add-on type definitions.
//!
//! Core data structures shared by the resolver, the retrieval strategies
//! and the installers.

use super::macros::{MacroCapability, MacroFile};
use serde_json::Value;
use std::fmt;
use std::io;
use thiserror::Error;

/// Capability interface for anything that can be installed.
///
/// Validation is structural: any type exposing a name, a source location and
/// a branch can be handed to the installer. Accessors return `None` when the
/// underlying object lacks the field.
pub trait Installable {
    /// Add-on name, used as the installation subdirectory.
    fn name(&self) -> Option<&str>;

    /// Source location: local path, `file://` URI or http(s) URL.
    fn url(&self) -> Option<&str>;

    /// Branch, tag or commit to check out.
    fn branch(&self) -> Option<&str>;

    /// Version recorded by the last metadata refresh.
    fn installed_version(&self) -> Option<&str> {
        None
    }

    /// Records the installed version. Descriptors that do not track a
    /// version ignore the call.
    fn set_installed_version(&mut self, _version: &str) {}

    /// Macro capability, if this descriptor carries one.
    fn macro_capability(&self) -> Option<&dyn MacroCapability> {
        None
    }
}

/// An add-on descriptor as supplied by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Addon {
    /// Add-on name (installation subdirectory).
    pub name: String,
    /// Source location.
    pub url: String,
    /// Branch or ref.
    pub branch: String,
    /// Version read from the installed metadata file.
    pub installed_version: Option<String>,
    /// Macro script shipped by this add-on, for macro-only add-ons.
    pub macro_file: Option<MacroFile>,
}

impl Addon {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            branch: branch.into(),
            installed_version: None,
            macro_file: None,
        }
    }

    /// Attaches a macro script.
    #[must_use]
    pub fn with_macro(mut self, macro_file: MacroFile) -> Self {
        self.macro_file = Some(macro_file);
        self
    }
}

impl Installable for Addon {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn url(&self) -> Option<&str> {
        Some(&self.url)
    }

    fn branch(&self) -> Option<&str> {
        Some(&self.branch)
    }

    fn installed_version(&self) -> Option<&str> {
        self.installed_version.as_deref()
    }

    fn set_installed_version(&mut self, version: &str) {
        self.installed_version = Some(version.to_string());
    }

    fn macro_capability(&self) -> Option<&dyn MacroCapability> {
        self.macro_file.as_ref().map(|m| m as &dyn MacroCapability)
    }
}

/// Raw catalog entries decoded as JSON objects.
impl Installable for Value {
    fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }

    fn url(&self) -> Option<&str> {
        self.get("url").and_then(Value::as_str)
    }

    fn branch(&self) -> Option<&str> {
        self.get("branch").and_then(Value::as_str)
    }

    fn installed_version(&self) -> Option<&str> {
        self.get("installed_version").and_then(Value::as_str)
    }

    fn set_installed_version(&mut self, version: &str) {
        if let Some(object) = self.as_object_mut() {
            object.insert(
                "installed_version".to_string(),
                Value::String(version.to_string()),
            );
        }
    }
}

/// Requested installation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallMethod {
    /// Let the resolver pick the best available method.
    #[default]
    Any,
    /// Version-control checkout.
    Git,
    /// Archive download and extraction.
    Zip,
    /// Direct filesystem copy.
    Copy,
}

impl InstallMethod {
    /// Parses a method name (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "any" | "auto" => Some(Self::Any),
            "git" => Some(Self::Git),
            "zip" | "archive" => Some(Self::Zip),
            "copy" => Some(Self::Copy),
            _ => None,
        }
    }

    /// Returns the concrete method this preference pins, `None` for `Any`.
    #[must_use]
    pub fn as_resolved(self) -> Option<ResolvedMethod> {
        match self {
            Self::Any => None,
            Self::Git => Some(ResolvedMethod::Git),
            Self::Zip => Some(ResolvedMethod::Zip),
            Self::Copy => Some(ResolvedMethod::Copy),
        }
    }
}

impl fmt::Display for InstallMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Git => write!(f, "git"),
            Self::Zip => write!(f, "zip"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

/// A concrete installation method chosen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedMethod {
    /// Version-control checkout.
    Git,
    /// Archive download and extraction.
    Zip,
    /// Direct filesystem copy.
    Copy,
}

impl fmt::Display for ResolvedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Git => write!(f, "git"),
            Self::Zip => write!(f, "zip"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

impl From<ResolvedMethod> for InstallMethod {
    fn from(method: ResolvedMethod) -> Self {
        match method {
            ResolvedMethod::Git => Self::Git,
            ResolvedMethod::Zip => Self::Zip,
            ResolvedMethod::Copy => Self::Copy,
        }
    }
}

/// Add-on installation errors.
#[derive(Debug, Error)]
pub enum AddonError {
    /// Descriptor is missing a required field or is otherwise unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Another add-on from a different source already uses this name.
    #[error("Add-on name '{name}' is already used by {existing}")]
    NameCollision {
        /// Conflicting name.
        name: String,
        /// Source location of the existing add-on.
        existing: String,
    },

    /// No retrieval method fits the source and preference.
    #[error("No installation method available for '{location}' (requested: {requested})")]
    Resolution {
        /// Source location that could not be resolved.
        location: String,
        /// Requested method.
        requested: InstallMethod,
    },

    /// Clone, download or copy failed.
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// Archive is unreadable or malformed.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Metadata file is missing or malformed.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
