//! addon-install - Main entry point.
//!
//! Installs one add-on from a git repository, zip archive or local directory.
//!
//! Usage: addon-install [OPTIONS] <NAME> <SOURCE>
//!
//! Options:
//!   --branch REF        Branch, tag or commit (default: main)
//!   --method METHOD     any, git, zip or copy (default from ~/.addonrc)
//!   --dest DIR          Installation root
//!   --macro-dest DIR    Macro directory
//!   --config FILE       Config file (default: ~/.addonrc)
//!   --macro FILE        Install FILE as a macro-only add-on instead
//!   --version, -v       Show version

use std::env;
use std::path::PathBuf;
use std::process;

use addon_installer::addons::{
    Addon, AddonInstaller, InstallMethod, MacroFile, MacroInstaller,
};
use addon_installer::config::InstallerConfig;
use addon_installer::{logging, VERSION};

const USAGE: &str = "Usage: addon-install [--branch REF] [--method any|git|zip|copy] \
[--dest DIR] [--macro-dest DIR] [--config FILE] [--macro FILE] <NAME> <SOURCE>";

/// Parsed command-line arguments.
#[derive(Debug, Default)]
struct Args {
    name: Option<String>,
    source: Option<String>,
    branch: Option<String>,
    method: Option<InstallMethod>,
    dest: Option<PathBuf>,
    macro_dest: Option<PathBuf>,
    config: Option<PathBuf>,
    macro_file: Option<PathBuf>,
}

fn parse_args(raw: &[String]) -> Result<Args, String> {
    let mut args = Args::default();
    let mut positional = Vec::new();
    let mut iter = raw.iter();

    while let Some(arg) = iter.next() {
        let mut value = || {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} requires a value", arg))
        };

        match arg.as_str() {
            "--branch" | "-b" => args.branch = Some(value()?),
            "--method" | "-m" => {
                let raw_method = value()?;
                args.method = Some(
                    InstallMethod::parse(&raw_method)
                        .ok_or_else(|| format!("Unknown method '{}'", raw_method))?,
                );
            }
            "--dest" => args.dest = Some(PathBuf::from(value()?)),
            "--macro-dest" => args.macro_dest = Some(PathBuf::from(value()?)),
            "--config" => args.config = Some(PathBuf::from(value()?)),
            "--macro" => args.macro_file = Some(PathBuf::from(value()?)),
            flag if flag.starts_with('-') => return Err(format!("Unknown option '{}'", flag)),
            _ => positional.push(arg.clone()),
        }
    }

    let mut positional = positional.into_iter();
    args.name = positional.next();
    args.source = positional.next();
    if let Some(extra) = positional.next() {
        return Err(format!("Unexpected argument '{}'", extra));
    }

    Ok(args)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let raw: Vec<String> = env::args().skip(1).collect();

    if raw.iter().any(|a| a == "--version" || a == "-v") {
        println!("addon-install v{}", VERSION);
        return Ok(());
    }
    if raw.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            process::exit(1);
        }
    };

    let config = match &args.config {
        Some(path) => InstallerConfig::load_from(path)?,
        None => InstallerConfig::load()?,
    };
    logging::init(&config.log_config)?;

    let Some(name) = args.name.clone() else {
        eprintln!("{}", USAGE);
        process::exit(1);
    };

    if let Some(script) = &args.macro_file {
        let addon = Addon::new(name.as_str(), script.to_string_lossy(), "")
            .with_macro(MacroFile::new(script));
        let mut installer = MacroInstaller::new(&addon);
        installer.installation_path = args
            .macro_dest
            .clone()
            .unwrap_or_else(|| config.macro_installation_path.clone());

        let ok = installer.run();
        for warning in installer.warnings() {
            eprintln!("warning: {}", warning);
        }
        if !ok {
            eprintln!("Macro installation of '{}' failed", name);
            process::exit(1);
        }
        println!("Installed macro '{}'", name);
        return Ok(());
    }

    let Some(source) = args.source.clone() else {
        eprintln!("{}", USAGE);
        process::exit(1);
    };
    let branch = args.branch.clone().unwrap_or_else(|| "main".to_string());

    let mut addon = Addon::new(name.as_str(), source, branch);
    let mut installer = AddonInstaller::from_config(&mut addon, &[], &config);
    if let Some(method) = args.method {
        installer.method = method;
    }
    if let Some(dest) = &args.dest {
        installer.installation_path = dest.clone();
    }
    if let Some(macro_dest) = &args.macro_dest {
        installer.macro_installation_path = macro_dest.clone();
    }

    let ok = installer.run();
    let progress = installer.progress().clone();
    for warning in &progress.warnings {
        eprintln!("warning: {}", warning);
    }
    if !ok {
        eprintln!(
            "Installation of '{}' failed: {}",
            name,
            progress.error.as_deref().unwrap_or("unknown error")
        );
        process::exit(1);
    }

    drop(installer);
    let method = progress
        .method
        .map_or_else(|| "unknown".to_string(), |m| m.to_string());
    match &addon.installed_version {
        Some(version) => println!("Installed '{}' {} with {}", name, version, method),
        None => println!("Installed '{}' with {}", name, method),
    }
    for path in &progress.macros {
        println!("  macro: {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_parse_full() {
        let args = parse_args(&strings(&[
            "--branch", "dev", "--method", "zip", "--dest", "/opt/a", "Sheets",
            "https://github.com/o/sheets",
        ]))
        .expect("parse");

        assert_eq!(args.name.as_deref(), Some("Sheets"));
        assert_eq!(args.source.as_deref(), Some("https://github.com/o/sheets"));
        assert_eq!(args.branch.as_deref(), Some("dev"));
        assert_eq!(args.method, Some(InstallMethod::Zip));
        assert_eq!(args.dest, Some(PathBuf::from("/opt/a")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&strings(&["--method", "svn", "a", "b"])).is_err());
        assert!(parse_args(&strings(&["--branch"])).is_err());
        assert!(parse_args(&strings(&["--bogus", "a", "b"])).is_err());
        assert!(parse_args(&strings(&["a", "b", "c"])).is_err());
    }
}
