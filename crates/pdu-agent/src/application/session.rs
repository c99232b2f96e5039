//! Session: one device, one FTP login, one edit round trip.
//!
//! A [`Session`] owns the connection to a single PDU and the two scratch files
//! that go with it.  It is generic over the [`Connector`] so the same code
//! runs against the real FTP client and against in-memory fakes.
//!
//! # Lifecycle
//!
//! ```text
//!                 connect()                    close() / drop
//!  Disconnected ─────────────►  Connected  ─────────────────────► Disconnected
//!       ▲                           │
//!       └── any connect() failure   │ set_passive_mode / fetch_config /
//!                                   │ load_config / write_config
//!                                   ▼
//!                               Connected
//! ```
//!
//! Host, username and password are plain setters that may be called in any
//! order before `connect()`.  Operations that need the device check for a
//! live handle before touching the network or the scratch directory, so a
//! misuse never leaves half-written files behind.
//!
//! Dropping a connected session closes the handle; a failure there is only
//! logged.

use std::fs;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use pdu_core::{serialize_config, DeviceConfig, ParseError, WriterInfo};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::infrastructure::storage::scratch::{remove_if_present, ScratchPaths, REMOTE_CONFIG_NAME};
use crate::infrastructure::storage::settings::WriterSettings;
use crate::infrastructure::transport::{Connector, TransferHandle, TransferMode, TransportError};

// ── Errors ────────────────────────────────────────────────────────────────────

/// A precondition of the requested operation does not hold.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("host is not set")]
    HostNotSet,

    #[error("username is not set")]
    UsernameNotSet,

    #[error("password is not set")]
    PasswordNotSet,

    #[error("{host:?} is not a valid IPv4 address")]
    InvalidHost { host: String },

    #[error("refusing to write an empty config")]
    EmptyConfig,

    #[error("session is not connected")]
    NotConnected,

    #[error("session is already connected")]
    AlreadyConnected,
}

/// Opening or logging in to the device failed.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("could not open a connection to {host}")]
    Unreachable {
        host: String,
        #[source]
        source: TransportError,
    },

    #[error("device rejected the credentials for {username:?}")]
    AuthenticationRejected {
        username: String,
        #[source]
        source: TransportError,
    },
}

/// A file transfer or scratch-file operation failed.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("could not set transfer mode")]
    Mode(#[source] TransportError),

    #[error("download of {remote_name} failed")]
    Download {
        remote_name: String,
        #[source]
        source: TransportError,
    },

    #[error("transfer reported success but {path} does not exist")]
    MissingAfterDownload { path: PathBuf },

    #[error("could not prepare scratch location {path}")]
    ScratchDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read fetched config {path}")]
    ScratchRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not stage updated config at {path}")]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload of {remote_name} failed")]
    Upload {
        remote_name: String,
        #[source]
        source: TransportError,
    },

    #[error("could not remove scratch file {path}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Closing the session failed.
#[derive(Debug, Error)]
pub enum CloseError {
    #[error("session is not connected")]
    NotConnected,

    #[error("device did not close the session cleanly")]
    Transport(#[source] TransportError),
}

/// Any failure of a [`Session`] operation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("fetched config is invalid: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Close(#[from] CloseError),
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Connection to one PDU plus its scratch files.
pub struct Session<C: Connector> {
    connector: C,
    host: Option<String>,
    username: Option<String>,
    password: Option<String>,
    handle: Option<C::Handle>,
    scratch_dir: PathBuf,
    writer: WriterInfo,
}

impl<C: Connector> Session<C> {
    /// Creates a disconnected session that keeps scratch files in
    /// `scratch_dir`.
    pub fn new(connector: C, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            connector,
            host: None,
            username: None,
            password: None,
            handle: None,
            scratch_dir: scratch_dir.into(),
            writer: WriterSettings::default().writer_info(),
        }
    }

    /// Replaces the header information written on upload.
    pub fn with_writer(mut self, writer: WriterInfo) -> Self {
        self.writer = writer;
        self
    }

    /// Sets the device address.
    ///
    /// Only dotted-quad IPv4 literals are accepted. The host doubles as the
    /// scratch file stem, so it must be a valid file name on every platform.
    pub fn set_host(&mut self, host: &str) -> Result<(), ValidationError> {
        let ip: Ipv4Addr = host.trim().parse().map_err(|_| ValidationError::InvalidHost {
            host: host.to_string(),
        })?;
        self.host = Some(ip.to_string());
        Ok(())
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = Some(username.into());
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = Some(password.into());
    }

    /// The password itself is write-only.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Scratch file locations for the current host, if one is set.
    pub fn scratch_paths(&self) -> Option<ScratchPaths> {
        self.host
            .as_deref()
            .map(|host| ScratchPaths::for_host(&self.scratch_dir, host))
    }

    /// Opens a handle to the device and logs in.
    ///
    /// # Errors
    ///
    /// - [`ValidationError`] if host, username or password is missing, or
    ///   the session is already connected.
    /// - [`ConnectError::Unreachable`] if no handle could be opened.
    /// - [`ConnectError::AuthenticationRejected`] if login failed.  The
    ///   half-open handle is closed before returning.
    pub fn connect(&mut self) -> Result<(), SessionError> {
        if self.handle.is_some() {
            return Err(ValidationError::AlreadyConnected.into());
        }
        let host = self.host.as_deref().ok_or(ValidationError::HostNotSet)?;
        let username = self.username.as_deref().ok_or(ValidationError::UsernameNotSet)?;
        let password = self.password.as_deref().ok_or(ValidationError::PasswordNotSet)?;

        debug!(host, "opening handle");
        let mut handle = self
            .connector
            .open_handle(host)
            .map_err(|source| ConnectError::Unreachable {
                host: host.to_string(),
                source,
            })?;

        if let Err(source) = handle.authenticate(username, password) {
            if let Err(e) = handle.close() {
                debug!(error = %e, "close after rejected login failed");
            }
            return Err(ConnectError::AuthenticationRejected {
                username: username.to_string(),
                source,
            }
            .into());
        }

        info!(host, username, "connected");
        self.handle = Some(handle);
        Ok(())
    }

    /// Selects passive (`true`) or active (`false`) data connections.
    pub fn set_passive_mode(&mut self, passive: bool) -> Result<(), SessionError> {
        let handle = self.handle.as_mut().ok_or(ValidationError::NotConnected)?;
        handle
            .set_transfer_mode(passive)
            .map_err(TransferError::Mode)?;
        debug!(passive, "transfer mode set");
        Ok(())
    }

    /// Downloads the device's `config.ini` into the scratch directory and
    /// returns the local path.
    ///
    /// A stale copy from an earlier run is removed first, so the returned
    /// file is always the one just transferred.
    pub fn fetch_config(&mut self) -> Result<PathBuf, SessionError> {
        let paths = self.connected_paths()?;

        fs::create_dir_all(&self.scratch_dir).map_err(|source| TransferError::ScratchDir {
            path: self.scratch_dir.clone(),
            source,
        })?;
        remove_if_present(&paths.fetched).map_err(|source| TransferError::ScratchDir {
            path: paths.fetched.clone(),
            source,
        })?;

        let handle = self.handle.as_mut().ok_or(ValidationError::NotConnected)?;
        handle
            .download(REMOTE_CONFIG_NAME, &paths.fetched, TransferMode::Text)
            .map_err(|source| TransferError::Download {
                remote_name: REMOTE_CONFIG_NAME.to_string(),
                source,
            })?;

        if !paths.fetched.is_file() {
            return Err(TransferError::MissingAfterDownload {
                path: paths.fetched,
            }
            .into());
        }

        info!(path = %paths.fetched.display(), "fetched device config");
        Ok(paths.fetched)
    }

    /// Parses the previously fetched scratch file.
    ///
    /// Needs a host (to find the file) but not a live connection.
    pub fn parse_config(&self) -> Result<DeviceConfig, SessionError> {
        let paths = self.scratch_paths().ok_or(ValidationError::HostNotSet)?;
        let text = fs::read_to_string(&paths.fetched).map_err(|source| {
            TransferError::ScratchRead {
                path: paths.fetched.clone(),
                source,
            }
        })?;
        let config = pdu_core::parse_config(&text)?;
        debug!(sections = config.len(), "parsed device config");
        Ok(config)
    }

    /// [`fetch_config`](Self::fetch_config) followed by
    /// [`parse_config`](Self::parse_config).
    pub fn load_config(&mut self) -> Result<DeviceConfig, SessionError> {
        self.fetch_config()?;
        self.parse_config()
    }

    /// Serializes `config`, uploads it as the device's `config.ini` and
    /// removes both scratch files.
    ///
    /// Not transactional: if the upload fails the staged file stays on disk
    /// and the device keeps whatever it had.
    pub fn write_config(&mut self, config: &DeviceConfig) -> Result<(), SessionError> {
        if config.is_empty() {
            return Err(ValidationError::EmptyConfig.into());
        }
        let paths = self.connected_paths()?;

        let text = serialize_config(config, &self.writer);
        fs::create_dir_all(&self.scratch_dir).map_err(|source| TransferError::ScratchDir {
            path: self.scratch_dir.clone(),
            source,
        })?;
        fs::write(&paths.staged, text).map_err(|source| TransferError::Stage {
            path: paths.staged.clone(),
            source,
        })?;

        let handle = self.handle.as_mut().ok_or(ValidationError::NotConnected)?;
        handle
            .upload(&paths.staged, REMOTE_CONFIG_NAME, TransferMode::Text)
            .map_err(|source| TransferError::Upload {
                remote_name: REMOTE_CONFIG_NAME.to_string(),
                source,
            })?;
        info!(sections = config.len(), "uploaded device config");

        for path in [&paths.staged, &paths.fetched] {
            remove_if_present(path).map_err(|source| TransferError::Cleanup {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Ends the session.
    ///
    /// The session is disconnected afterwards even if the device did not
    /// acknowledge the close.
    pub fn close(&mut self) -> Result<(), SessionError> {
        let mut handle = self.handle.take().ok_or(CloseError::NotConnected)?;
        handle.close().map_err(CloseError::Transport)?;
        info!(host = self.host.as_deref().unwrap_or_default(), "closed");
        Ok(())
    }

    fn connected_paths(&self) -> Result<ScratchPaths, ValidationError> {
        if self.handle.is_none() {
            return Err(ValidationError::NotConnected);
        }
        self.scratch_paths().ok_or(ValidationError::HostNotSet)
    }
}

impl<C: Connector> Drop for Session<C> {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.close() {
                warn!(error = %e, "failed to close session on drop");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
