//! Configuration module for addon-installer.
//!
//! Handles loading and parsing the .addonrc configuration file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::addons::InstallMethod;
use crate::logging::LogConfig;

/// Default .addonrc file content with all settings documented.
const DEFAULT_ADDONRC: &str = r#"# Addon Installer Configuration File
# ===================================
# This file is read on startup.
# Lines starting with '#' are comments.
#
# Installation
# ------------
# Directory receiving one subdirectory per installed add-on.
# installation_path = ~/.addon-installer/addons
#
# Directory receiving macro scripts shipped by add-ons.
# macro_installation_path = ~/.addon-installer/macros
#
# Preferred installation method: any, git, zip, copy
# install_method = any
#
# Git executable used for checkouts.
# git_executable = git

# Logging Configuration
# ---------------------
# Logs are stored in ~/.addon-installer/logs/ with automatic cleanup.
#
# log_enabled = true       # Enable/disable file logging (true/false)
# log_level = info         # Log level: trace, debug, info, warn, error, off
# log_retention = 24       # Hours to keep log files (default: 24)
"#;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read or created.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A setting has a value that cannot be used.
    #[error("Invalid value '{value}' for '{key}' on line {line}")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// Rejected value.
        value: String,
        /// 1-based line number.
        line: usize,
    },
}

/// Returns the application directory (~/.addon-installer).
#[must_use]
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".addon-installer")
}

/// Default root for installed add-ons.
#[must_use]
pub fn default_installation_path() -> PathBuf {
    app_dir().join("addons")
}

/// Default directory for macro scripts.
#[must_use]
pub fn default_macro_installation_path() -> PathBuf {
    app_dir().join("macros")
}

/// Installer configuration.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Root directory for installed add-ons.
    pub installation_path: PathBuf,
    /// Directory for macro scripts.
    pub macro_installation_path: PathBuf,
    /// Preferred installation method.
    pub install_method: InstallMethod,
    /// Git executable name or path.
    pub git_executable: PathBuf,
    /// Path to config file.
    pub config_path: PathBuf,
    /// Logging configuration.
    pub log_config: LogConfig,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            installation_path: default_installation_path(),
            macro_installation_path: default_macro_installation_path(),
            install_method: InstallMethod::Any,
            git_executable: PathBuf::from("git"),
            config_path: Self::default_config_path(),
            log_config: LogConfig::default(),
        }
    }
}

impl InstallerConfig {
    /// Returns the default config file path (~/.addonrc).
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".addonrc")
    }

    /// Loads configuration from the default path, creating it if it doesn't exist.
    ///
    /// # Errors
    /// Returns error if config cannot be read or a value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_config_path();
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    ///
    /// # Errors
    /// Returns error if config cannot be read or a value is invalid.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
        }

        let content = fs::read_to_string(path)?;
        let mut config = Self {
            config_path: path.to_path_buf(),
            ..Self::default()
        };
        config.parse(&content)?;

        Ok(config)
    }

    /// Creates the default config file.
    fn create_default_config(path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_ADDONRC.as_bytes())?;
        Ok(())
    }

    /// Parses the config file content.
    fn parse(&mut self, content: &str) -> Result<(), ConfigError> {
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim();

                // Remove inline comments
                let value = value.split('#').next().unwrap_or(value).trim();

                self.apply_setting(key, value, index + 1)?;
            }
        }
        Ok(())
    }

    /// Applies a single setting. Unknown keys are ignored.
    fn apply_setting(&mut self, key: &str, value: &str, line: usize) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            line,
        };

        match key {
            "installation_path" | "install_path" => {
                if value.is_empty() {
                    return Err(invalid());
                }
                self.installation_path = expand_home(value);
            }
            "macro_installation_path" | "macro_path" => {
                if value.is_empty() {
                    return Err(invalid());
                }
                self.macro_installation_path = expand_home(value);
            }
            "install_method" | "method" => {
                self.install_method = InstallMethod::parse(value).ok_or_else(invalid)?;
            }
            "git_executable" | "git" => {
                if value.is_empty() {
                    return Err(invalid());
                }
                self.git_executable = expand_home(value);
            }
            "log_level" => {
                self.log_config.level = LogConfig::parse_level(value);
            }
            "log_retention" | "log_retention_hours" => {
                self.log_config.retention_hours = LogConfig::parse_retention(value);
            }
            "log_enabled" | "logging" => {
                self.log_config.enabled =
                    matches!(value.to_lowercase().as_str(), "true" | "yes" | "1" | "on");
            }
            _ => {
                tracing::debug!("Ignoring unknown setting '{}' on line {}", key, line);
            }
        }
        Ok(())
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(value),
    }
}
