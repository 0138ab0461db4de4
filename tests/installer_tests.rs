//! Integration tests for add-on installation.
//!
//! Tests cover: descriptor validation, method resolution, archive layout,
//! retrieval through each strategy, fallback, metadata refresh and macros.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use addon_installer::addons::{
    extract_archive, install, resolve_method, validate, Addon, AddonError, AddonInstaller,
    ArchiveTransport, Dependencies, InstallMethod, InstallPhase, Installable, MacroCapability,
    MacroInstallOutcome, MacroInstaller, MetadataParser, PackageInfo, PackageMetadata,
    ResolvedMethod, VersionControl, KNOWN_GIT_HOSTS,
};
use pretty_assertions::assert_eq;
use tempfile::{NamedTempFile, TempDir};
use zip::write::SimpleFileOptions;

// ============================================================================
// Fixtures
// ============================================================================

/// Builds a zip archive in memory.
fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start file");
        writer.write_all(content.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Creates a source directory with a README.md.
fn fixture_repo() -> TempDir {
    let dir = TempDir::new().expect("fixture dir");
    fs::write(dir.path().join("README.md"), "# Fixture add-on\n").expect("readme");
    dir
}

/// Lists every file below `root` as sorted relative paths.
fn layout(root: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).expect("read dir") {
            let path = entry.expect("entry").path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(root).expect("relative");
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    files.sort();
    files
}

/// Recursively copies a directory (used by the fake git).
fn copy_tree(src: &Path, dst: &Path) {
    fs::create_dir_all(dst).expect("create dst");
    for entry in fs::read_dir(src).expect("read src") {
        let entry = entry.expect("entry");
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).expect("copy file");
        }
    }
}

/// Returns true if no staging or backup directories are left in `root`.
fn no_leftovers(root: &Path) -> bool {
    match fs::read_dir(root) {
        Ok(entries) => entries.filter_map(Result::ok).all(|e| {
            !e.file_name().to_string_lossy().starts_with(".addon-")
        }),
        Err(_) => true,
    }
}

/// Version control double: clones by copying the source directory.
struct FakeGit {
    available: bool,
    fail: bool,
    clones: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeGit {
    fn working() -> Self {
        Self {
            available: true,
            fail: false,
            clones: Arc::default(),
        }
    }

    fn broken() -> Self {
        Self {
            fail: true,
            ..Self::working()
        }
    }

    fn missing() -> Self {
        Self {
            available: false,
            ..Self::working()
        }
    }
}

impl VersionControl for FakeGit {
    fn available(&self) -> bool {
        self.available
    }

    fn clone_ref(&self, source: &str, reference: &str, destination: &Path) -> Result<(), AddonError> {
        self.clones
            .lock()
            .unwrap()
            .push((source.to_string(), reference.to_string()));
        if self.fail || !self.available {
            return Err(AddonError::Retrieval(format!("cannot clone {}", source)));
        }
        copy_tree(Path::new(source), destination);
        Ok(())
    }
}

/// Transport double: serves fixed bytes and records requested URLs.
struct FakeTransport {
    body: Vec<u8>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeTransport {
    fn serving(body: Vec<u8>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                body,
                requests: Arc::clone(&requests),
            },
            requests,
        )
    }
}

impl ArchiveTransport for FakeTransport {
    fn download(&self, url: &str) -> Result<NamedTempFile, AddonError> {
        self.requests.lock().unwrap().push(url.to_string());
        let mut file = NamedTempFile::new()?;
        file.write_all(&self.body)?;
        file.flush()?;
        Ok(file)
    }
}

/// Installs `addon` with injected doubles into `root/addons`.
fn run_installer(
    addon: &mut dyn Installable,
    root: &Path,
    method: InstallMethod,
    git: FakeGit,
    transport: FakeTransport,
) -> (bool, Option<ResolvedMethod>, Vec<String>, Option<String>) {
    let mut installer = AddonInstaller::new(addon, &[])
        .with_method(method)
        .with_version_control(Box::new(git))
        .with_transport(Box::new(transport));
    installer.installation_path = root.join("addons");
    installer.macro_installation_path = root.join("macros");

    let ok = installer.run();
    let progress = installer.progress();
    (
        ok,
        progress.method,
        progress.warnings.clone(),
        progress.error.clone(),
    )
}

fn no_network() -> FakeTransport {
    FakeTransport::serving(Vec::new()).0
}

// ============================================================================
// Validation
// ============================================================================

mod validation {
    use super::*;
    #[allow(unused_imports)]
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Bare {
        name: Option<&'static str>,
        url: Option<&'static str>,
        branch: Option<&'static str>,
    }

    impl Installable for Bare {
        fn name(&self) -> Option<&str> {
            self.name
        }
        fn url(&self) -> Option<&str> {
            self.url
        }
        fn branch(&self) -> Option<&str> {
            self.branch
        }
    }

    #[test]
    fn test_any_type_with_all_fields_validates() {
        let bare = Bare {
            name: Some("A"),
            url: Some("/tmp/a"),
            branch: Some("main"),
        };
        assert!(validate(&bare).is_ok());
        assert!(validate(&Addon::new("A", "/tmp/a", "main")).is_ok());
        assert!(validate(&json!({"name": "A", "url": "/tmp/a", "branch": "main"})).is_ok());
    }

    #[test]
    fn test_missing_any_field_fails() {
        let cases = [
            (None, Some("/tmp/a"), Some("main")),
            (Some("A"), None, Some("main")),
            (Some("A"), Some("/tmp/a"), None),
        ];
        for (name, url, branch) in cases {
            let bare = Bare { name, url, branch };
            assert!(matches!(
                validate(&bare),
                Err(AddonError::Configuration(_))
            ));
        }

        let entry = json!({"name": "A", "url": "/tmp/a"});
        assert!(validate(&entry).is_err());
    }

    #[test]
    fn test_sibling_name_collision_aborts_install() {
        let src = fixture_repo();
        let root = TempDir::new().expect("root");
        let siblings = vec![Addon::new("Shared", "https://github.com/other/shared", "main")];

        let mut addon = Addon::new("Shared", src.path().to_string_lossy(), "main");
        let mut installer = AddonInstaller::new(&mut addon, &siblings)
            .with_version_control(Box::new(FakeGit::missing()));
        installer.installation_path = root.path().join("addons");

        assert!(!installer.run());
        assert!(installer.progress().error.as_deref().unwrap_or("").contains("already used"));
        assert!(!root.path().join("addons").exists());
    }
}

// ============================================================================
// Method Resolution
// ============================================================================

mod resolution {
    use super::*;
    #[allow(unused_imports)]
    use pretty_assertions::assert_eq;

    const ALL_PREFERENCES: [InstallMethod; 4] = [
        InstallMethod::Any,
        InstallMethod::Git,
        InstallMethod::Zip,
        InstallMethod::Copy,
    ];

    #[test]
    fn test_local_directory() {
        let dir = TempDir::new().expect("dir");
        let source = dir.path().to_string_lossy().to_string();

        for git in [true, false] {
            assert_eq!(resolve_method(&source, InstallMethod::Copy, git), Some(ResolvedMethod::Copy));
            assert_eq!(resolve_method(&source, InstallMethod::Zip, git), None);
            assert_eq!(resolve_method(&source, InstallMethod::Any, git), Some(ResolvedMethod::Copy));
        }
        assert_eq!(resolve_method(&source, InstallMethod::Git, true), Some(ResolvedMethod::Git));
    }

    #[test]
    fn test_local_zip() {
        let dir = TempDir::new().expect("dir");
        let source = dir.path().join("dummy.zip").to_string_lossy().to_string();

        for git in [true, false] {
            assert_eq!(resolve_method(&source, InstallMethod::Copy, git), None);
            assert_eq!(resolve_method(&source, InstallMethod::Zip, git), Some(ResolvedMethod::Zip));
            assert_eq!(resolve_method(&source, InstallMethod::Any, git), Some(ResolvedMethod::Zip));
        }
    }

    #[test]
    fn test_arbitrary_https_url() {
        let source = "https://example.org/downloads/addon";
        for git in [true, false] {
            assert_eq!(resolve_method(source, InstallMethod::Copy, git), None);
            assert_eq!(resolve_method(source, InstallMethod::Git, git), None);
            assert_eq!(resolve_method(source, InstallMethod::Zip, git), Some(ResolvedMethod::Zip));
        }
    }

    #[test]
    fn test_known_hosts() {
        for host in KNOWN_GIT_HOSTS {
            let tld = if *host == "salsa.debian" { "org" } else { "com" };
            let source = format!("https://{}.{}/owner/repo", host, tld);

            assert_eq!(resolve_method(&source, InstallMethod::Copy, true), None);
            assert_eq!(resolve_method(&source, InstallMethod::Git, true), Some(ResolvedMethod::Git));
            assert_eq!(resolve_method(&source, InstallMethod::Zip, true), Some(ResolvedMethod::Zip));
            assert_eq!(resolve_method(&source, InstallMethod::Any, true), Some(ResolvedMethod::Git));
            assert_eq!(resolve_method(&source, InstallMethod::Any, false), Some(ResolvedMethod::Zip));
        }
    }

    #[test]
    fn test_never_resolves_unknown_source() {
        for preference in ALL_PREFERENCES {
            assert_eq!(resolve_method("/no/such/place", preference, true), None);
        }
    }
}

// ============================================================================
// Archive Extraction
// ============================================================================

mod extraction {
    use super::*;
    #[allow(unused_imports)]
    use pretty_assertions::assert_eq;

    fn extract(entries: &[(&str, &str)]) -> (TempDir, Vec<String>) {
        let scratch = TempDir::new().expect("scratch");
        let archive = scratch.path().join("addon.zip");
        fs::write(&archive, zip_bytes(entries)).expect("write zip");

        let dest = TempDir::new().expect("dest");
        let target = extract_archive(&archive, dest.path(), "Name").expect("extract");
        assert_eq!(target, dest.path().join("Name"));
        let files = layout(&target);
        (dest, files)
    }

    #[test]
    fn test_flat_and_wrapped_archives_match() {
        let (_flat_dir, flat) = extract(&[("README", "hello"), ("src/lib.txt", "code")]);
        let (_wrapped_dir, wrapped) = extract(&[
            ("repo-main/README", "hello"),
            ("repo-main/src/lib.txt", "code"),
        ]);

        assert_eq!(flat, vec!["README".to_string(), "src/lib.txt".to_string()]);
        assert_eq!(flat, wrapped);
    }

    #[test]
    fn test_corrupt_archive_leaves_nothing() {
        let scratch = TempDir::new().expect("scratch");
        let archive = scratch.path().join("broken.zip");
        fs::write(&archive, b"definitely not a zip").expect("write");

        let dest = TempDir::new().expect("dest");
        let result = extract_archive(&archive, dest.path(), "Name");
        assert!(matches!(result, Err(AddonError::Extraction(_))));
        assert!(!dest.path().join("Name").exists());
        assert!(no_leftovers(dest.path()));
    }
}

// ============================================================================
// Installation
// ============================================================================

mod installation {
    use super::*;
    #[allow(unused_imports)]
    use pretty_assertions::assert_eq;

    #[test]
    fn test_install_by_copy() {
        let src = fixture_repo();
        let root = TempDir::new().expect("root");
        let mut addon = Addon::new("Fixture", src.path().to_string_lossy(), "main");

        assert!(install(
            &mut addon,
            &[],
            &root.path().join("addons"),
            &root.path().join("macros"),
            InstallMethod::Copy,
        ));
        assert!(root.path().join("addons/Fixture/README.md").is_file());
        assert!(src.path().join("README.md").is_file());
    }

    #[test]
    fn test_install_by_fake_git() {
        let src = fixture_repo();
        let root = TempDir::new().expect("root");
        let git = FakeGit::working();
        let clones = Arc::clone(&git.clones);
        let mut addon = Addon::new("Fixture", src.path().to_string_lossy(), "stable");

        let (ok, method, _, _) =
            run_installer(&mut addon, root.path(), InstallMethod::Git, git, no_network());

        assert!(ok);
        assert_eq!(method, Some(ResolvedMethod::Git));
        assert!(root.path().join("addons/Fixture/README.md").is_file());
        assert_eq!(clones.lock().unwrap()[0].1, "stable");
    }

    fn git_usable() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    /// Runs git in `dir` and returns its trimmed stdout.
    fn git_in(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
            .args(["-c", "commit.gpgsign=false"])
            .args(args)
            .current_dir(dir)
            .output()
            .expect("run git");
        assert!(output.status.success(), "git {:?} failed", args);
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn real_git_install(src: &Path, reference: &str) -> TempDir {
        let root = TempDir::new().expect("root");
        let mut addon = Addon::new("Fixture", src.to_string_lossy(), reference);
        let mut installer =
            AddonInstaller::new(&mut addon, &[]).with_method(InstallMethod::Git);
        installer.installation_path = root.path().join("addons");
        installer.macro_installation_path = root.path().join("macros");

        assert!(installer.run(), "{:?}", installer.progress().error);
        assert_eq!(installer.progress().method, Some(ResolvedMethod::Git));
        root
    }

    #[test]
    fn test_install_by_real_git() {
        if !git_usable() {
            eprintln!("git not available, skipping");
            return;
        }

        let src = fixture_repo();
        git_in(src.path(), &["init", "-q"]);
        git_in(src.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git_in(src.path(), &["add", "README.md"]);
        git_in(src.path(), &["commit", "-q", "-m", "initial"]);

        let root = real_git_install(src.path(), "main");
        assert!(root.path().join("addons/Fixture/README.md").is_file());
    }

    #[test]
    fn test_install_by_real_git_at_commit() {
        if !git_usable() {
            eprintln!("git not available, skipping");
            return;
        }

        let src = fixture_repo();
        git_in(src.path(), &["init", "-q"]);
        git_in(src.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git_in(src.path(), &["add", "README.md"]);
        git_in(src.path(), &["commit", "-q", "-m", "initial"]);
        let pinned = git_in(src.path(), &["rev-parse", "HEAD"]);

        fs::write(src.path().join("README.md"), "# Moved on\n").expect("readme");
        git_in(src.path(), &["commit", "-q", "-am", "second"]);

        let root = real_git_install(src.path(), &pinned);
        assert_eq!(
            fs::read_to_string(root.path().join("addons/Fixture/README.md")).expect("read"),
            "# Fixture add-on\n"
        );
        assert!(no_leftovers(&root.path().join("addons")));
    }

    #[test]
    fn test_remote_archive_download() {
        let root = TempDir::new().expect("root");
        let (transport, requests) =
            FakeTransport::serving(zip_bytes(&[("repo-dev/README.md", "# remote")]));
        let mut addon = Addon::new("Remote", "https://gitlab.com/owner/repo.git", "dev");

        let (ok, method, _, _) =
            run_installer(&mut addon, root.path(), InstallMethod::Zip, FakeGit::missing(), transport);

        assert!(ok);
        assert_eq!(method, Some(ResolvedMethod::Zip));
        assert_eq!(
            requests.lock().unwrap().clone(),
            vec!["https://gitlab.com/owner/repo/-/archive/dev/repo-dev.zip".to_string()]
        );
        assert!(root.path().join("addons/Remote/README.md").is_file());
    }

    #[test]
    fn test_any_falls_back_from_git_to_zip() {
        let root = TempDir::new().expect("root");
        let (transport, requests) =
            FakeTransport::serving(zip_bytes(&[("repo-main/README.md", "# fallback")]));
        let mut addon = Addon::new("Fallback", "https://github.com/owner/repo", "main");

        let (ok, method, _, _) =
            run_installer(&mut addon, root.path(), InstallMethod::Any, FakeGit::broken(), transport);

        assert!(ok);
        assert_eq!(method, Some(ResolvedMethod::Zip));
        assert_eq!(
            requests.lock().unwrap().clone(),
            vec!["https://github.com/owner/repo/archive/main.zip".to_string()]
        );
        assert!(root.path().join("addons/Fallback/README.md").is_file());
        assert!(no_leftovers(&root.path().join("addons")));
    }

    #[test]
    fn test_pinned_method_does_not_fall_back() {
        let root = TempDir::new().expect("root");
        let (transport, requests) = FakeTransport::serving(zip_bytes(&[("README.md", "x")]));
        let mut addon = Addon::new("Pinned", "https://github.com/owner/repo", "main");

        let (ok, _, _, error) =
            run_installer(&mut addon, root.path(), InstallMethod::Git, FakeGit::broken(), transport);

        assert!(!ok);
        assert!(error.unwrap_or_default().contains("cannot clone"));
        assert!(requests.lock().unwrap().is_empty());
        assert!(!root.path().join("addons/Pinned").exists());
    }

    #[test]
    fn test_failed_install_keeps_previous_tree() {
        let root = TempDir::new().expect("root");
        let previous = root.path().join("addons/Keep");
        fs::create_dir_all(&previous).expect("previous");
        fs::write(previous.join("old.txt"), "old").expect("old file");

        let (transport, _) = FakeTransport::serving(b"not a zip".to_vec());
        let mut addon = Addon::new("Keep", "https://example.org/keep.zip", "main");
        let (ok, _, _, _) =
            run_installer(&mut addon, root.path(), InstallMethod::Any, FakeGit::missing(), transport);

        assert!(!ok);
        assert!(previous.join("old.txt").is_file());
        assert!(no_leftovers(&root.path().join("addons")));
    }

    #[test]
    fn test_reinstall_replaces_tree() {
        let src = fixture_repo();
        let root = TempDir::new().expect("root");
        let stale = root.path().join("addons/Fixture/stale.txt");
        fs::create_dir_all(stale.parent().unwrap()).expect("dir");
        fs::write(&stale, "stale").expect("stale");

        let mut addon = Addon::new("Fixture", src.path().to_string_lossy(), "main");
        let (ok, method, _, _) =
            run_installer(&mut addon, root.path(), InstallMethod::Any, FakeGit::working(), no_network());

        assert!(ok);
        assert_eq!(method, Some(ResolvedMethod::Copy));
        assert!(!stale.exists());
        assert!(root.path().join("addons/Fixture/README.md").is_file());
    }

    #[test]
    fn test_unresolved_source_touches_nothing() {
        let root = TempDir::new().expect("root");
        let mut addon = Addon::new("Nowhere", "https://example.org/page", "main");

        let mut installer = AddonInstaller::new(&mut addon, &[])
            .with_method(InstallMethod::Copy)
            .with_version_control(Box::new(FakeGit::working()))
            .with_transport(Box::new(no_network()));
        installer.installation_path = root.path().join("addons");

        assert!(!installer.run());
        assert_eq!(installer.progress().phase, InstallPhase::Failed);
        assert!(installer
            .progress()
            .error
            .as_deref()
            .unwrap_or("")
            .contains("No installation method"));
        assert!(!root.path().join("addons").exists());
    }

    #[test]
    fn test_json_descriptor_install() {
        let src = fixture_repo();
        fs::write(
            src.path().join("package.toml"),
            "[package]\nname = \"FromJson\"\nversion = \"2.3\"\n",
        )
        .expect("metadata");
        let root = TempDir::new().expect("root");
        let mut entry = serde_json::json!({
            "name": "FromJson",
            "url": src.path().to_string_lossy(),
            "branch": "main",
        });

        let (ok, _, _, _) =
            run_installer(&mut entry, root.path(), InstallMethod::Any, FakeGit::missing(), no_network());

        assert!(ok);
        assert_eq!(entry["installed_version"], "2.3");
        assert!(root.path().join("addons/FromJson/README.md").is_file());
    }
}

// ============================================================================
// Metadata Refresh
// ============================================================================

mod metadata {
    use super::*;
    #[allow(unused_imports)]
    use pretty_assertions::assert_eq;

    fn install_fixture(metadata: Option<&str>, prior: Option<&str>) -> (Addon, Vec<String>) {
        let src = fixture_repo();
        if let Some(content) = metadata {
            fs::write(src.path().join("package.toml"), content).expect("metadata");
        }
        let root = TempDir::new().expect("root");
        let mut addon = Addon::new("Meta", src.path().to_string_lossy(), "main");
        addon.installed_version = prior.map(str::to_string);

        let (ok, _, warnings, _) =
            run_installer(&mut addon, root.path(), InstallMethod::Copy, FakeGit::missing(), no_network());
        assert!(ok);
        (addon, warnings)
    }

    #[test]
    fn test_version_is_recorded() {
        let (addon, warnings) = install_fixture(
            Some("[package]\nname = \"Meta\"\nversion = \"1.0\"\n"),
            None,
        );
        assert_eq!(addon.installed_version.as_deref(), Some("1.0"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_metadata_keeps_prior_version() {
        let (addon, warnings) = install_fixture(None, Some("0.9"));
        assert_eq!(addon.installed_version.as_deref(), Some("0.9"));
        assert!(warnings.is_empty());

        let (addon, _) = install_fixture(None, None);
        assert!(addon.installed_version.is_none());
    }

    #[test]
    fn test_xml_metadata_wins_over_toml() {
        let src = fixture_repo();
        fs::write(
            src.path().join("package.xml"),
            "<?xml version=\"1.0\"?>\n<package format=\"1\">\n  <name>Meta</name>\n  \
             <version>1.0</version>\n</package>\n",
        )
        .expect("xml");
        fs::write(
            src.path().join("package.toml"),
            "[package]\nname = \"Meta\"\nversion = \"0.5\"\n",
        )
        .expect("toml");

        let root = TempDir::new().expect("root");
        let mut addon = Addon::new("Meta", src.path().to_string_lossy(), "main");
        let (ok, _, warnings, _) =
            run_installer(&mut addon, root.path(), InstallMethod::Copy, FakeGit::missing(), no_network());

        assert!(ok);
        assert_eq!(addon.installed_version.as_deref(), Some("1.0"));
        assert!(warnings.is_empty());
    }

    /// Parser reporting a fixed version whatever the file says.
    struct FixedVersion(&'static str);

    impl MetadataParser for FixedVersion {
        fn parse(&self, path: &Path) -> Result<PackageMetadata, AddonError> {
            assert!(path.is_file());
            Ok(PackageMetadata {
                package: PackageInfo {
                    name: "Meta".to_string(),
                    version: self.0.to_string(),
                    description: String::new(),
                    maintainer: String::new(),
                    license: String::new(),
                    url: String::new(),
                },
                dependencies: Dependencies::default(),
            })
        }
    }

    #[test]
    fn test_custom_metadata_parser() {
        let src = fixture_repo();
        fs::write(src.path().join("package.toml"), "not read by this parser").expect("metadata");

        let root = TempDir::new().expect("root");
        let mut addon = Addon::new("Meta", src.path().to_string_lossy(), "main");
        let mut installer = AddonInstaller::new(&mut addon, &[])
            .with_method(InstallMethod::Copy)
            .with_version_control(Box::new(FakeGit::missing()))
            .with_metadata_parser(Box::new(FixedVersion("3.1.4")));
        installer.installation_path = root.path().join("addons");
        installer.macro_installation_path = root.path().join("macros");

        assert!(installer.run());
        assert!(installer.progress().warnings.is_empty());
        drop(installer);
        assert_eq!(addon.installed_version.as_deref(), Some("3.1.4"));
    }

    #[test]
    fn test_malformed_metadata_is_a_warning() {
        let (addon, warnings) = install_fixture(Some("[package\nbroken"), Some("0.9"));
        assert_eq!(addon.installed_version.as_deref(), Some("0.9"));
        assert_eq!(warnings.len(), 1);
    }
}

// ============================================================================
// Macros
// ============================================================================

mod macros {
    use super::*;
    #[allow(unused_imports)]
    use pretty_assertions::assert_eq;

    #[test]
    fn test_macros_are_copied_not_moved() {
        let src = fixture_repo();
        fs::create_dir_all(src.path().join("tools")).expect("tools");
        fs::write(src.path().join("tools/Helper.MACRO"), "run()").expect("macro");
        fs::write(src.path().join("Top.macro"), "run()").expect("macro");

        let root = TempDir::new().expect("root");
        let mut addon = Addon::new("WithMacros", src.path().to_string_lossy(), "main");
        let mut installer = AddonInstaller::new(&mut addon, &[])
            .with_method(InstallMethod::Copy)
            .with_version_control(Box::new(FakeGit::missing()));
        installer.installation_path = root.path().join("addons");
        installer.macro_installation_path = root.path().join("macros");

        assert!(installer.run());
        let mut copied = installer.progress().macros.clone();
        copied.sort();
        assert_eq!(
            copied,
            vec![
                root.path().join("macros/Helper.MACRO"),
                root.path().join("macros/Top.macro"),
            ]
        );
        assert!(root.path().join("addons/WithMacros/tools/Helper.MACRO").is_file());
        assert!(root.path().join("addons/WithMacros/Top.macro").is_file());
    }

    #[test]
    fn test_macros_from_zip_install() {
        let root = TempDir::new().expect("root");
        let (transport, _) = FakeTransport::serving(zip_bytes(&[
            ("repo-main/README.md", "# zipped"),
            ("repo-main/TestMacro.FCMacro", "print('hi')"),
        ]));
        let mut addon = Addon::new("Zipped", "https://github.com/owner/repo", "main");
        let mut installer = AddonInstaller::new(&mut addon, &[])
            .with_method(InstallMethod::Zip)
            .with_version_control(Box::new(FakeGit::missing()))
            .with_transport(Box::new(transport));
        installer.installation_path = root.path().join("addons");
        installer.macro_installation_path = root.path().join("macros");

        assert!(installer.run());
        assert_eq!(installer.progress().method, Some(ResolvedMethod::Zip));
        assert_eq!(
            installer.progress().macros,
            vec![root.path().join("macros/TestMacro.FCMacro")]
        );
        assert!(root.path().join("macros/TestMacro.FCMacro").is_file());
        assert!(root.path().join("addons/Zipped/TestMacro.FCMacro").is_file());
    }

    /// Macro-only descriptor with a scripted capability.
    struct MacroOnly {
        capability: TestMacro,
    }

    struct TestMacro {
        succeed: bool,
    }

    impl MacroCapability for TestMacro {
        fn install(&self, destination: &Path) -> MacroInstallOutcome {
            fs::write(destination.join("MACRO_INSTALLATION_TEST"), "written")
                .expect("write marker");
            MacroInstallOutcome {
                success: self.succeed,
                warnings: vec!["scripted".to_string()],
            }
        }
    }

    impl Installable for MacroOnly {
        fn name(&self) -> Option<&str> {
            Some("MacroOnly")
        }
        fn url(&self) -> Option<&str> {
            None
        }
        fn branch(&self) -> Option<&str> {
            None
        }
        fn macro_capability(&self) -> Option<&dyn MacroCapability> {
            Some(&self.capability)
        }
    }

    fn run_macro(succeed: bool) -> (bool, PathBuf, Vec<String>, TempDir) {
        let dest = TempDir::new().expect("dest");
        let target = dest.path().join("Macro");
        let addon = MacroOnly {
            capability: TestMacro { succeed },
        };

        let mut installer = MacroInstaller::new(&addon);
        installer.installation_path = target.clone();
        let ok = installer.run();
        let warnings = installer.warnings().to_vec();
        (ok, target, warnings, dest)
    }

    #[test]
    fn test_macro_installer_reports_capability_result() {
        for succeed in [true, false] {
            let (ok, target, warnings, _dest) = run_macro(succeed);
            assert_eq!(ok, succeed);
            assert!(target.join("MACRO_INSTALLATION_TEST").is_file());
            assert_eq!(warnings, vec!["scripted".to_string()]);
        }
    }

    #[test]
    fn test_install_macro_with_macro_file() {
        let src = TempDir::new().expect("src");
        let script = src.path().join("Tool.macro");
        fs::write(&script, "run()").expect("script");

        let dest = TempDir::new().expect("dest");
        let addon = Addon::new("Tool", "", "").with_macro(addon_installer::addons::MacroFile::new(&script));

        assert!(addon_installer::install_macro(&addon, dest.path()));
        assert!(dest.path().join("Tool.macro").is_file());
        assert!(script.is_file());
    }
}
