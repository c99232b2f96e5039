//! pdu-agent: read and edit a PDU's `config.ini` over FTP.
//!
//! # Usage
//!
//! ```text
//! pdu-agent [OPTIONS] <COMMAND>
//!
//! Commands:
//!   show [--json]                      Print the device configuration
//!   get  <SECTION> <KEY>               Print one value
//!   set  <SECTION> <KEY=VALUE>...      Overwrite values and write back
//!   save-settings                      Write the effective settings file
//!
//! Options:
//!   --settings <FILE>      Settings TOML [default: platform config dir]
//!   --host <IP>            Device address
//!   --username <USER>
//!   --password <PASS>
//!   --port <PORT>          FTP control port
//!   --active               Use active instead of passive data connections
//!   --scratch-dir <DIR>    Where fetched and staged files are kept
//!   -v, --verbose          Debug logging
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable             | Description                      |
//! |----------------------|----------------------------------|
//! | `PDU_AGENT_SETTINGS` | Settings file path               |
//! | `PDU_HOST`           | Device address                   |
//! | `PDU_USERNAME`       | FTP user                         |
//! | `PDU_PASSWORD`       | FTP password                     |
//!
//! Precedence is command line, then environment, then settings file.
//! `save-settings` writes the merged result back, minus the password.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pdu_agent::application::edit_config::{
    edit_device_config, read_device_config, ConfigEdit, EditReport,
};
use pdu_agent::application::session::Session;
use pdu_agent::infrastructure::storage::settings::{
    load_settings, load_settings_from, save_settings_to, settings_file_path, AgentSettings,
    SettingsError,
};
use pdu_agent::infrastructure::transport::ftp::FtpConnector;
use pdu_core::serialize_body;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Read and edit the config.ini of a networked power-distribution unit.
#[derive(Debug, Parser)]
#[command(name = "pdu-agent", version)]
struct Cli {
    /// Settings file to load instead of the platform default.
    #[arg(long, global = true, env = "PDU_AGENT_SETTINGS")]
    settings: Option<PathBuf>,

    /// IP address of the device.
    #[arg(long, global = true, env = "PDU_HOST")]
    host: Option<String>,

    #[arg(long, global = true, env = "PDU_USERNAME")]
    username: Option<String>,

    #[arg(long, global = true, env = "PDU_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// FTP control port.
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Use active (PORT) data connections instead of passive.
    #[arg(long, global = true)]
    active: bool,

    /// Directory for fetched and staged copies of the config.
    #[arg(long, global = true)]
    scratch_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch and print the device configuration.
    Show {
        /// Print JSON instead of INI.
        #[arg(long)]
        json: bool,
    },
    /// Print a single value.
    Get { section: String, key: String },
    /// Overwrite one or more values in a section and write the config back.
    Set {
        section: String,
        /// Assignments of the form KEY=VALUE.
        #[arg(required = true, value_name = "KEY=VALUE")]
        assignments: Vec<String>,
    },
    /// Write the effective settings to the settings file, without the password.
    SaveSettings,
}

impl Cli {
    /// Overlays command-line values on top of the settings file.
    fn apply_to(&self, settings: &mut AgentSettings) {
        if let Some(host) = &self.host {
            settings.device.host = Some(host.clone());
        }
        if let Some(username) = &self.username {
            settings.device.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            settings.device.password = Some(password.clone());
        }
        if let Some(port) = self.port {
            settings.transfer.port = port;
        }
        if self.active {
            settings.transfer.passive = false;
        }
        if let Some(dir) = &self.scratch_dir {
            settings.transfer.scratch_dir = dir.clone();
        }
        if self.verbose {
            settings.logging.log_level = "debug".to_string();
        }
    }

    fn load_settings(&self) -> anyhow::Result<AgentSettings> {
        let mut settings = match &self.settings {
            Some(path) => load_settings_from(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => match load_settings() {
                Err(SettingsError::NoPlatformConfigDir) => AgentSettings::default(),
                other => other.context("loading settings")?,
            },
        };
        self.apply_to(&mut settings);
        Ok(settings)
    }

    fn settings_path(&self) -> anyhow::Result<PathBuf> {
        match &self.settings {
            Some(path) => Ok(path.clone()),
            None => settings_file_path().context("locating settings file"),
        }
    }
}

/// Saves `settings` to `path` with the password removed.
fn persist_settings(settings: &AgentSettings, path: &Path) -> anyhow::Result<()> {
    let mut stored = settings.clone();
    stored.device.password = None;
    save_settings_to(&stored, path)
        .with_context(|| format!("saving settings to {}", path.display()))
}

fn build_session(settings: &AgentSettings) -> anyhow::Result<Session<FtpConnector>> {
    let connector = FtpConnector::new(settings.transfer.port, settings.transfer.timeout());
    let mut session = Session::new(connector, &settings.transfer.scratch_dir)
        .with_writer(settings.writer.writer_info());

    if let Some(host) = &settings.device.host {
        session.set_host(host)?;
    }
    if let Some(username) = &settings.device.username {
        session.set_username(username.clone());
    }
    if let Some(password) = &settings.device.password {
        session.set_password(password.clone());
    }
    info!(
        host = session.host().unwrap_or("<unset>"),
        passive = settings.transfer.passive,
        "pdu-agent starting"
    );
    Ok(session)
}

fn render_report(report: &EditReport) -> String {
    let mut out = String::new();
    for applied in &report.applied {
        let edit = &applied.edit;
        let line = match &applied.previous {
            Some(old) if !applied.changed() => {
                format!("[{}] {}={} (unchanged)\n", edit.section, edit.key, old)
            }
            Some(old) => format!("[{}] {}: {} -> {}\n", edit.section, edit.key, old, edit.value),
            None => format!("[{}] {}={} (added)\n", edit.section, edit.key, edit.value),
        };
        out.push_str(&line);
    }
    out
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    // Logs go to stderr so `show` output can be piped.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.log_level)),
        )
        .init();

    let passive = settings.transfer.passive;

    match &cli.command {
        Command::Show { json } => {
            let mut session = build_session(&settings)?;
            let config = read_device_config(&mut session, passive)
                .context("reading device config")?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", serialize_body(&config));
            }
        }
        Command::Get { section, key } => {
            let mut session = build_session(&settings)?;
            let config = read_device_config(&mut session, passive)
                .context("reading device config")?;
            match config.get(section, key) {
                Some(value) => println!("{value}"),
                None => bail!("[{section}] {key} is not set on the device"),
            }
        }
        Command::Set {
            section,
            assignments,
        } => {
            let edits = assignments
                .iter()
                .map(|a| ConfigEdit::parse(section, a))
                .collect::<Result<Vec<_>, _>>()?;
            let mut session = build_session(&settings)?;
            let report = edit_device_config(&mut session, passive, &edits)
                .context("editing device config")?;
            print!("{}", render_report(&report));
        }
        Command::SaveSettings => {
            let path = cli.settings_path()?;
            persist_settings(&settings, &path)?;
            info!(path = %path.display(), "settings saved");
        }
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pdu_agent::application::edit_config::apply_edits;
    use pdu_core::DeviceConfig;
    use uuid::Uuid;

    #[test]
    fn test_cli_overrides_settings_file() {
        // Arrange
        let cli = Cli::parse_from([
            "pdu-agent",
            "--host",
            "10.0.0.5",
            "--port",
            "2121",
            "--active",
            "-v",
            "show",
        ]);
        let mut settings = AgentSettings::default();
        settings.device.username = Some("apc".to_string());

        // Act
        cli.apply_to(&mut settings);

        // Assert
        assert_eq!(settings.device.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(settings.device.username.as_deref(), Some("apc"));
        assert_eq!(settings.transfer.port, 2121);
        assert!(!settings.transfer.passive);
        assert_eq!(settings.logging.log_level, "debug");
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::parse_from(["pdu-agent", "get", "SystemID", "Contact", "--host", "10.0.0.5"]);

        assert_eq!(cli.host.as_deref(), Some("10.0.0.5"));
        assert!(matches!(cli.command, Command::Get { ref section, ref key }
            if section == "SystemID" && key == "Contact"));
    }

    #[test]
    fn test_set_requires_at_least_one_assignment() {
        assert!(Cli::try_parse_from(["pdu-agent", "set", "SystemID"]).is_err());
    }

    #[test]
    fn test_build_session_rejects_hostname() {
        let mut settings = AgentSettings::default();
        settings.device.host = Some("pdu.example.com".to_string());

        assert!(build_session(&settings).is_err());
    }

    #[test]
    fn test_render_body_and_report() {
        let mut config = DeviceConfig::new();
        config.set("SystemID", "Contact", "old");
        let report = apply_edits(
            &mut config,
            &[
                ConfigEdit::new("SystemID", "Contact", "new"),
                ConfigEdit::new("SystemID", "Owner", "noc"),
            ],
        );

        assert_eq!(serialize_body(&config), "[SystemID]\nContact=new\nOwner=noc\n");
        assert_eq!(
            render_report(&report),
            "[SystemID] Contact: old -> new\n[SystemID] Owner=noc (added)\n"
        );
    }

    #[test]
    fn test_save_settings_subcommand_parses() {
        let cli = Cli::parse_from(["pdu-agent", "save-settings", "--settings", "/tmp/s.toml"]);

        assert!(matches!(cli.command, Command::SaveSettings));
        assert_eq!(cli.settings_path().unwrap(), PathBuf::from("/tmp/s.toml"));
    }

    #[test]
    fn test_persist_settings_writes_overrides_without_password() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("pdu_cli_test_{}", Uuid::new_v4()));
        let path = dir.join("settings.toml");
        let cli = Cli::parse_from([
            "pdu-agent",
            "--host",
            "10.0.0.5",
            "--username",
            "apc",
            "--password",
            "secret",
            "--active",
            "save-settings",
        ]);
        let mut settings = AgentSettings::default();
        cli.apply_to(&mut settings);

        // Act
        persist_settings(&settings, &path).expect("save");
        let loaded = load_settings_from(&path).expect("load");

        // Assert
        assert_eq!(loaded.device.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(loaded.device.username.as_deref(), Some("apc"));
        assert_eq!(loaded.device.password, None);
        assert!(!loaded.transfer.passive);
        assert!(!std::fs::read_to_string(&path).unwrap().contains("secret"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
