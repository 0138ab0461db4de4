//! Add-on metadata parsing.
//!
//! An installed add-on describes itself in `package.xml` or, failing that,
//! `package.toml` at its root.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::types::AddonError;

/// XML metadata file, looked up first.
pub const XML_METADATA_FILE: &str = "package.xml";

/// TOML metadata file, used when no XML file exists.
pub const METADATA_FILE: &str = "package.toml";

/// Metadata file names in lookup order.
pub const METADATA_FILES: &[&str] = &[XML_METADATA_FILE, METADATA_FILE];

/// Add-on metadata from package.xml or package.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageMetadata {
    /// Package identity.
    pub package: PackageInfo,
    /// Declared dependencies.
    #[serde(default)]
    pub dependencies: Dependencies,
}

/// Package identity.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageInfo {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Maintainer name or handle.
    #[serde(default)]
    pub maintainer: String,
    /// License identifier.
    #[serde(default)]
    pub license: String,
    /// Repository or homepage URL.
    #[serde(default)]
    pub url: String,
}

/// Declared dependencies. Recorded for callers, never resolved here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dependencies {
    /// Other add-ons this add-on needs.
    #[serde(default)]
    pub addons: Vec<String>,
    /// Python packages this add-on needs.
    #[serde(default)]
    pub python: Vec<String>,
}

/// Parses metadata files.
pub trait MetadataParser: Send + Sync {
    /// Parses the metadata file at `path`.
    fn parse(&self, path: &Path) -> Result<PackageMetadata, AddonError>;
}

/// Default parser. Picks the format from the file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMetadataParser;

impl MetadataParser for FileMetadataParser {
    fn parse(&self, path: &Path) -> Result<PackageMetadata, AddonError> {
        load_metadata(path)
    }
}

/// Returns the first metadata file present in `dir`.
pub fn find_metadata_file(dir: &Path) -> Option<PathBuf> {
    METADATA_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Loads add-on metadata from a `.xml` or `.toml` file.
pub fn load_metadata(path: &Path) -> Result<PackageMetadata, AddonError> {
    let content = fs::read_to_string(path)
        .map_err(|e| AddonError::Metadata(format!("Failed to read {:?}: {}", path, e)))?;

    let is_xml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"));

    let metadata = if is_xml {
        parse_xml(&content)
    } else {
        toml::from_str(&content).map_err(|e| e.to_string())
    }
    .map_err(|e| AddonError::Metadata(format!("Failed to parse {:?}: {}", path, e)))?;

    validate_metadata(&metadata)?;

    Ok(metadata)
}

/// Parses `<package>` XML. Unknown elements are ignored; `<depend>` entries
/// with `type="python"` are Python packages, the rest are add-ons.
fn parse_xml(content: &str) -> Result<PackageMetadata, String> {
    let doc = roxmltree::Document::parse(content).map_err(|e| e.to_string())?;
    let root = doc.root_element();
    if root.tag_name().name() != "package" {
        return Err(format!(
            "expected <package> root, found <{}>",
            root.tag_name().name()
        ));
    }

    let mut info = PackageInfo {
        name: String::new(),
        version: String::new(),
        description: String::new(),
        maintainer: String::new(),
        license: String::new(),
        url: String::new(),
    };
    let mut dependencies = Dependencies::default();
    let mut repository_url = None;

    for node in root.children().filter(roxmltree::Node::is_element) {
        let text = node.text().unwrap_or_default().trim().to_string();
        match node.tag_name().name() {
            "name" => info.name = text,
            "version" => info.version = text,
            "description" => info.description = text,
            "maintainer" if info.maintainer.is_empty() => info.maintainer = text,
            "license" if info.license.is_empty() => info.license = text,
            "url" => {
                if node.attribute("type") == Some("repository") {
                    if repository_url.is_none() {
                        repository_url = Some(text);
                    }
                } else if info.url.is_empty() {
                    info.url = text;
                }
            }
            "depend" if !text.is_empty() => {
                if node.attribute("type") == Some("python") {
                    dependencies.python.push(text);
                } else {
                    dependencies.addons.push(text);
                }
            }
            _ => {}
        }
    }

    if let Some(url) = repository_url {
        info.url = url;
    }

    Ok(PackageMetadata {
        package: info,
        dependencies,
    })
}

fn validate_metadata(metadata: &PackageMetadata) -> Result<(), AddonError> {
    if metadata.package.name.trim().is_empty() {
        return Err(AddonError::Metadata(
            "Package name is required".to_string(),
        ));
    }

    if metadata.package.version.trim().is_empty() {
        return Err(AddonError::Metadata(
            "Package version is required".to_string(),
        ));
    }

    Ok(())
}
