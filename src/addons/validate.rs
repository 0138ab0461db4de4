//! Descriptor validation.
//!
//! Checks run before any filesystem or network work begins.

use super::types::{Addon, AddonError, Installable};

/// Required descriptor fields, copied out after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Add-on name.
    pub name: String,
    /// Source location.
    pub url: String,
    /// Branch or ref.
    pub branch: String,
}

/// Confirms the descriptor exposes a name, a source location and a branch.
pub fn validate(addon: &dyn Installable) -> Result<(), AddonError> {
    required_fields(addon).map(|_| ())
}

/// Validates the descriptor and returns its required fields.
pub fn required_fields(addon: &dyn Installable) -> Result<Descriptor, AddonError> {
    let name = require(addon.name(), "name")?;
    let url = require(addon.url(), "url")?;
    let branch = require(addon.branch(), "branch")?;

    if !is_safe_name(name) {
        return Err(AddonError::Configuration(format!(
            "Add-on name '{}' is not a valid directory name",
            name
        )));
    }

    Ok(Descriptor {
        name: name.to_string(),
        url: url.to_string(),
        branch: branch.to_string(),
    })
}

/// Rejects a descriptor whose name is taken by a sibling with a different source.
pub fn check_siblings(addon: &dyn Installable, siblings: &[Addon]) -> Result<(), AddonError> {
    let fields = required_fields(addon)?;

    match siblings
        .iter()
        .find(|s| s.name == fields.name && s.url != fields.url)
    {
        Some(existing) => Err(AddonError::NameCollision {
            name: fields.name,
            existing: existing.url.clone(),
        }),
        None => Ok(()),
    }
}

fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AddonError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(AddonError::Configuration(format!(
            "Add-on descriptor has an empty '{}'",
            field
        ))),
        None => Err(AddonError::Configuration(format!(
            "Add-on descriptor has no '{}'",
            field
        ))),
    }
}

fn is_safe_name(name: &str) -> bool {
    name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && name.trim() == name
}
