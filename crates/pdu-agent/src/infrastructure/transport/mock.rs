//! In-memory device for testing.
//!
//! [`MemoryConnector`] stands in for a PDU: it holds a small set of remote
//! files, checks credentials, and records every call made through it.  All
//! handles opened from one connector share the same [`RemoteState`], so a
//! test can inspect what was uploaded after the session is gone.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Connector, TransferHandle, TransferMode, TransportError};

/// One recorded interaction with the fake device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Open { host: String },
    Authenticate { username: String },
    SetTransferMode { passive: bool },
    Download { remote_name: String, mode: TransferMode },
    Upload { remote_name: String, mode: TransferMode, content: String },
    Close,
}

/// Shared state of the fake device.
#[derive(Debug, Default)]
pub struct RemoteState {
    /// Remote files by name.
    pub files: HashMap<String, String>,
    /// Accepted `(username, password)`; `None` accepts anything.
    pub credentials: Option<(String, String)>,
    /// Refuse every `open_handle`.
    pub unreachable: bool,
    /// Fail every download with a 550.
    pub fail_download: bool,
    /// Report download success without writing the local file.
    pub skip_download_write: bool,
    /// Fail every upload with a 552.
    pub fail_upload: bool,
    /// Fail `close` with a 421.
    pub fail_close: bool,
    /// Every call, in order.
    pub calls: Vec<TransportCall>,
}

/// A [`Connector`] backed by [`RemoteState`].
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<RemoteState>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a remote file.
    pub fn with_file(self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.state().files.insert(name.into(), content.into());
        self
    }

    /// Restricts logins to one user.
    pub fn with_credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.state().credentials = Some((username.into(), password.into()));
        self
    }

    /// Locks the shared state for inspection or fault injection.
    pub fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().expect("lock poisoned")
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.state().calls.clone()
    }

    pub fn remote_file(&self, name: &str) -> Option<String> {
        self.state().files.get(name).cloned()
    }
}

impl Connector for MemoryConnector {
    type Handle = MemoryHandle;

    fn open_handle(&self, host: &str) -> Result<MemoryHandle, TransportError> {
        let mut state = self.state();
        state.calls.push(TransportCall::Open {
            host: host.to_string(),
        });
        if state.unreachable {
            return Err(TransportError::Unreachable {
                host: host.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            });
        }
        Ok(MemoryHandle {
            state: Arc::clone(&self.state),
            authenticated: false,
            closed: false,
        })
    }
}

/// Handle produced by [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryHandle {
    state: Arc<Mutex<RemoteState>>,
    authenticated: bool,
    closed: bool,
}

impl MemoryHandle {
    fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().expect("lock poisoned")
    }

    fn require_login(&self, command: &str) -> Result<(), TransportError> {
        if self.closed {
            return Err(reply(command, 421, "Service not available, closing control connection."));
        }
        if !self.authenticated {
            return Err(reply(command, 530, "Not logged in."));
        }
        Ok(())
    }
}

fn reply(command: &str, code: u16, message: &str) -> TransportError {
    TransportError::UnexpectedReply {
        command: command.to_string(),
        code,
        message: message.to_string(),
    }
}

impl TransferHandle for MemoryHandle {
    fn authenticate(&mut self, username: &str, password: &str) -> Result<(), TransportError> {
        let mut state = self.state();
        state.calls.push(TransportCall::Authenticate {
            username: username.to_string(),
        });
        let accepted = match &state.credentials {
            Some((u, p)) => u == username && p == password,
            None => true,
        };
        drop(state);

        if !accepted {
            return Err(TransportError::LoginRejected {
                username: username.to_string(),
                reply: "530 Login incorrect.".to_string(),
            });
        }
        self.authenticated = true;
        Ok(())
    }

    fn set_transfer_mode(&mut self, passive: bool) -> Result<(), TransportError> {
        self.state()
            .calls
            .push(TransportCall::SetTransferMode { passive });
        self.require_login(if passive { "PASV" } else { "PORT" })
    }

    fn download(
        &mut self,
        remote_name: &str,
        local_path: &Path,
        mode: TransferMode,
    ) -> Result<(), TransportError> {
        let mut state = self.state();
        state.calls.push(TransportCall::Download {
            remote_name: remote_name.to_string(),
            mode,
        });
        let fail = state.fail_download;
        let skip_write = state.skip_download_write;
        let content = state.files.get(remote_name).cloned();
        drop(state);

        self.require_login("RETR")?;
        if fail {
            return Err(reply("RETR", 550, "Requested action not taken."));
        }
        let content = content.ok_or_else(|| reply("RETR", 550, "No such file."))?;
        if !skip_write {
            fs::write(local_path, content)?;
        }
        Ok(())
    }

    fn upload(
        &mut self,
        local_path: &Path,
        remote_name: &str,
        mode: TransferMode,
    ) -> Result<(), TransportError> {
        self.require_login("STOR")?;
        let content = fs::read_to_string(local_path)?;

        let mut state = self.state();
        state.calls.push(TransportCall::Upload {
            remote_name: remote_name.to_string(),
            mode,
            content: content.clone(),
        });
        if state.fail_upload {
            return Err(reply("STOR", 552, "Exceeded storage allocation."));
        }
        state.files.insert(remote_name.to_string(), content);
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut state = self.state();
        state.calls.push(TransportCall::Close);
        let fail = state.fail_close;
        drop(state);

        self.closed = true;
        self.authenticated = false;
        if fail {
            return Err(reply("QUIT", 421, "Connection lost."));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("pdu_mock_test_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_download_requires_login() {
        // Arrange
        let connector = MemoryConnector::new().with_file("config.ini", "[A]\nk=v\n");
        let mut handle = connector.open_handle("10.0.0.5").unwrap();
        let local = temp_path("a.ini");

        // Act
        let result = handle.download("config.ini", &local, TransferMode::Text);

        // Assert
        assert!(matches!(
            result,
            Err(TransportError::UnexpectedReply { code: 530, .. })
        ));
        assert!(!local.exists());
    }

    #[test]
    fn test_credentials_are_checked() {
        let connector = MemoryConnector::new().with_credentials("apc", "apc");
        let mut handle = connector.open_handle("10.0.0.5").unwrap();

        assert!(matches!(
            handle.authenticate("apc", "nope"),
            Err(TransportError::LoginRejected { .. })
        ));
        assert!(handle.authenticate("apc", "apc").is_ok());
    }

    #[test]
    fn test_upload_replaces_remote_file_and_is_recorded() {
        // Arrange
        let connector = MemoryConnector::new().with_file("config.ini", "old");
        let mut handle = connector.open_handle("10.0.0.5").unwrap();
        handle.authenticate("apc", "apc").unwrap();
        let local = temp_path("b.ini");
        fs::write(&local, "new").unwrap();

        // Act
        handle.upload(&local, "config.ini", TransferMode::Text).unwrap();
        handle.close().unwrap();

        // Assert
        assert_eq!(connector.remote_file("config.ini").as_deref(), Some("new"));
        let calls = connector.calls();
        assert!(calls.contains(&TransportCall::Upload {
            remote_name: "config.ini".to_string(),
            mode: TransferMode::Text,
            content: "new".to_string(),
        }));
        assert_eq!(calls.last(), Some(&TransportCall::Close));

        fs::remove_dir_all(local.parent().unwrap()).ok();
    }

    #[test]
    fn test_skip_download_write_reports_success_without_file() {
        let connector = MemoryConnector::new().with_file("config.ini", "[A]\nk=v\n");
        connector.state().skip_download_write = true;
        let mut handle = connector.open_handle("10.0.0.5").unwrap();
        handle.authenticate("apc", "apc").unwrap();
        let local = temp_path("c.ini");

        handle
            .download("config.ini", &local, TransferMode::Text)
            .expect("lying transport reports success");

        assert!(!local.exists());
    }

    #[test]
    fn test_unreachable_connector_refuses_open() {
        let connector = MemoryConnector::new();
        connector.state().unreachable = true;

        assert!(matches!(
            connector.open_handle("10.0.0.5"),
            Err(TransportError::Unreachable { .. })
        ));
    }
}
