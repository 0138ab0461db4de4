//! Installation method resolution.
//!
//! Maps a source location and a requested method to the concrete retrieval
//! methods that can serve it.

use super::types::{InstallMethod, ResolvedMethod};
use reqwest::Url;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Hosting sites that serve both git clones and "download as zip" archives.
/// Matched against the host with its top-level domain removed.
pub const KNOWN_GIT_HOSTS: &[&str] = &["github", "gitlab", "framagit", "salsa.debian", "codeberg"];

/// Hosts among [`KNOWN_GIT_HOSTS`] that use the GitLab archive URL layout.
const GITLAB_STYLE_HOSTS: &[&str] = &["gitlab", "framagit", "salsa.debian"];

/// File extension of supported archives.
const ARCHIVE_EXTENSION: &str = "zip";

/// Shape of a source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Local path or `file://` URI to a zip archive.
    LocalArchive,
    /// Local directory or `file://` URI to a directory.
    LocalDirectory,
    /// http(s) URL to a zip archive.
    RemoteArchive,
    /// http(s) URL on a known code-hosting site.
    KnownHost,
    /// Any other http(s) URL, treated as an archive endpoint.
    RemoteOther,
    /// Nothing we know how to install from.
    Unknown,
}

impl SourceKind {
    /// Methods usable for this kind of source, in order of preference.
    #[must_use]
    pub fn methods(self) -> &'static [ResolvedMethod] {
        match self {
            // Copying a local tree beats cloning it.
            Self::LocalDirectory => &[ResolvedMethod::Copy, ResolvedMethod::Git],
            Self::KnownHost => &[ResolvedMethod::Git, ResolvedMethod::Zip],
            Self::LocalArchive | Self::RemoteArchive | Self::RemoteOther => &[ResolvedMethod::Zip],
            Self::Unknown => &[],
        }
    }

    /// Returns true for sources fetched over the network.
    #[must_use]
    pub fn is_remote(self) -> bool {
        matches!(self, Self::RemoteArchive | Self::KnownHost | Self::RemoteOther)
    }
}

/// Classifies a source location.
#[must_use]
pub fn classify(source: &str) -> SourceKind {
    if let Some(url) = remote_url(source) {
        if has_archive_extension(url.path()) {
            return SourceKind::RemoteArchive;
        }
        if url.host_str().is_some_and(is_known_git_host) {
            return SourceKind::KnownHost;
        }
        return SourceKind::RemoteOther;
    }

    let Some(path) = local_path(source) else {
        return SourceKind::Unknown;
    };

    if has_archive_extension(&path) {
        SourceKind::LocalArchive
    } else if path.is_dir() {
        SourceKind::LocalDirectory
    } else {
        SourceKind::Unknown
    }
}

/// Returns every method that may serve `source`, in the order they should be
/// tried. A concrete preference yields at most that one method.
#[must_use]
pub fn candidates(
    source: &str,
    preference: InstallMethod,
    git_available: bool,
) -> Vec<ResolvedMethod> {
    let kind = classify(source);
    let usable = kind
        .methods()
        .iter()
        .copied()
        .filter(|m| *m != ResolvedMethod::Git || git_available);

    let methods: Vec<ResolvedMethod> = match preference.as_resolved() {
        Some(wanted) => usable.filter(|m| *m == wanted).collect(),
        None => usable.collect(),
    };

    debug!(
        "[ADDON-RESOLVE] '{}' is {:?}, preference {}, git available: {} -> {:?}",
        source, kind, preference, git_available, methods
    );
    methods
}

/// Picks the single method to use for `source`, or `None` when no method fits.
#[must_use]
pub fn resolve_method(
    source: &str,
    preference: InstallMethod,
    git_available: bool,
) -> Option<ResolvedMethod> {
    candidates(source, preference, git_available).first().copied()
}

/// Converts a local path or `file://` URI into a filesystem path.
#[must_use]
pub fn local_path(source: &str) -> Option<PathBuf> {
    if source
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("file://"))
    {
        return Url::parse(source).ok()?.to_file_path().ok();
    }
    if source.is_empty() || source.contains("://") {
        return None;
    }
    Some(PathBuf::from(source))
}

/// Returns the archive URL to download for `source` at `branch`.
///
/// Repository URLs on known hosts are mapped to their "download as zip"
/// endpoint; everything else is returned unchanged.
#[must_use]
pub fn archive_url(source: &str, branch: &str) -> String {
    if classify(source) != SourceKind::KnownHost {
        return source.to_string();
    }

    let base = source.trim_end_matches('/');
    let base = base.strip_suffix(".git").unwrap_or(base);
    let is_gitlab_style = remote_url(base)
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .and_then(|host| site_name(&host).map(str::to_string))
        .is_some_and(|site| {
            GITLAB_STYLE_HOSTS
                .iter()
                .any(|known| matches_site(&site, known))
        });

    if is_gitlab_style {
        let repo = base.rsplit('/').next().unwrap_or(base);
        format!("{}/-/archive/{}/{}-{}.zip", base, branch, repo, branch)
    } else {
        format!("{}/archive/{}.zip", base, branch)
    }
}

fn remote_url(source: &str) -> Option<Url> {
    Url::parse(source)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

fn has_archive_extension(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

fn is_known_git_host(host: &str) -> bool {
    let host = host.to_lowercase();
    site_name(&host).is_some_and(|site| KNOWN_GIT_HOSTS.iter().any(|known| matches_site(site, known)))
}

/// Host with its top-level domain removed ("salsa.debian.org" -> "salsa.debian").
fn site_name(host: &str) -> Option<&str> {
    host.rsplit_once('.').map(|(site, _tld)| site)
}

fn matches_site(site: &str, known: &str) -> bool {
    site == known
        || site
            .strip_suffix(known)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
