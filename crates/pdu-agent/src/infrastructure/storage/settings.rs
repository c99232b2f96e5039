//! TOML settings for the agent.
//!
//! Reads and writes [`AgentSettings`] from the platform config directory:
//! - Windows:  `%APPDATA%\PduAgent\settings.toml`
//! - Linux:    `~/.config/pdu-agent/settings.toml`
//! - macOS:    `~/Library/Application Support/PduAgent/settings.toml`
//!
//! Every field has a default, so a missing file or a file with only some
//! sections is fine:
//!
//! ```toml
//! [device]
//! host = "10.0.0.5"
//! username = "apc"
//!
//! [transfer]
//! passive = true
//! scratch_dir = "/var/tmp/pdu-agent"
//!
//! [writer]
//! attribution = "rack provisioning"
//! ```
//!
//! Values given on the command line win over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pdu_core::WriterInfo;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::storage::scratch::DEFAULT_SCRATCH_DIR;
use crate::infrastructure::transport::ftp::DEFAULT_FTP_PORT;

/// Tool name written into the header of uploaded configs.
pub const TOOL_NAME: &str = "pdu-agent";

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Settings schema ───────────────────────────────────────────────────────────

/// Top-level settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentSettings {
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub transfer: TransferSettings,
    #[serde(default)]
    pub writer: WriterSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Which device to talk to and how to log in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeviceSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Stored in plain text; prefer `PDU_PASSWORD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// FTP connection behaviour and scratch location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferSettings {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Passive (`PASV`) data connections.
    #[serde(default = "default_true")]
    pub passive: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

impl TransferSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Header information for uploaded configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WriterSettings {
    /// Optional third header line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

impl WriterSettings {
    pub fn writer_info(&self) -> WriterInfo {
        let info = WriterInfo::new(TOOL_NAME, env!("CARGO_PKG_VERSION"));
        match &self.attribution {
            Some(attribution) => info.with_attribution(attribution.clone()),
            None => info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_port() -> u16 {
    DEFAULT_FTP_PORT
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_scratch_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SCRATCH_DIR)
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            passive: default_true(),
            timeout_secs: default_timeout_secs(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ── Settings repository ───────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the settings file.
///
/// # Errors
///
/// Returns [`SettingsError::NoPlatformConfigDir`] when the base directory
/// cannot be determined from the environment.
pub fn settings_dir() -> Result<PathBuf, SettingsError> {
    platform_config_dir().ok_or(SettingsError::NoPlatformConfigDir)
}

pub fn settings_file_path() -> Result<PathBuf, SettingsError> {
    Ok(settings_dir()?.join("settings.toml"))
}

/// Loads settings from the platform location, or defaults if the file does
/// not exist yet.
pub fn load_settings() -> Result<AgentSettings, SettingsError> {
    load_settings_from(&settings_file_path()?)
}

/// Loads settings from `path`, returning `AgentSettings::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`SettingsError::Io`] for file-system errors other than "not
/// found", and [`SettingsError::Parse`] if the TOML is malformed.
pub fn load_settings_from(path: &Path) -> Result<AgentSettings, SettingsError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AgentSettings::default()),
        Err(source) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `settings` to `path`, creating parent directories.
pub fn save_settings_to(settings: &AgentSettings, path: &Path) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("PduAgent"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("pdu-agent"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("PduAgent")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
