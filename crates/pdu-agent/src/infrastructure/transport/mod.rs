//! File-transfer infrastructure used by the session to reach the device.
//!
//! A PDU serves its `config.ini` over plain FTP.  The session never talks to
//! sockets directly; it goes through two small traits:
//!
//! - [`Connector`] opens a handle to a host (one TCP control connection).
//! - [`TransferHandle`] is that open handle: login, transfer mode, get, put,
//!   and close.
//!
//! # Implementations
//!
//! - [`ftp::FtpConnector`] – blocking FTP client over `std::net::TcpStream`.
//! - [`mock::MemoryConnector`] – in-memory device used by tests and dry runs.
//!
//! # Testability
//!
//! Unit tests additionally get `MockConnector` / `MockTransferHandle`
//! generated by `mockall`.

use std::path::Path;

use thiserror::Error;

pub mod ftp;
pub mod mock;

/// Representation used for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Line-oriented text (`TYPE A`): CRLF on the wire, LF on disk.
    Text,
    /// Byte-for-byte image (`TYPE I`).
    Binary,
}

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The host could not be resolved or the control connection failed.
    #[error("could not reach {host}: {source}")]
    Unreachable {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// The server refused the supplied credentials.
    #[error("login rejected for user {username:?}: {reply}")]
    LoginRejected { username: String, reply: String },

    /// The server answered a command with an unexpected reply code.
    #[error("{command} failed: server replied {code} {message}")]
    UnexpectedReply {
        command: String,
        code: u16,
        message: String,
    },

    /// The server sent something that is not a valid reply.
    #[error("malformed server reply: {0:?}")]
    MalformedReply(String),

    /// Socket or local file I/O failed mid-operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens transfer handles.
#[cfg_attr(test, mockall::automock(type Handle = MockTransferHandle;))]
pub trait Connector {
    /// Handle type produced by this connector.
    type Handle: TransferHandle;

    /// Opens an unauthenticated handle to `host`.
    fn open_handle(&self, host: &str) -> Result<Self::Handle, TransportError>;
}

/// An open connection to one device.
///
/// After [`close`](TransferHandle::close) returns (successfully or not) the
/// handle must not be used again.
#[cfg_attr(test, mockall::automock)]
pub trait TransferHandle {
    /// Logs in with the given credentials.
    fn authenticate(&mut self, username: &str, password: &str) -> Result<(), TransportError>;

    /// Selects passive (`true`) or active (`false`) data connections for
    /// subsequent transfers.
    fn set_transfer_mode(&mut self, passive: bool) -> Result<(), TransportError>;

    /// Copies `remote_name` on the device to `local_path`.
    fn download(
        &mut self,
        remote_name: &str,
        local_path: &Path,
        mode: TransferMode,
    ) -> Result<(), TransportError>;

    /// Copies `local_path` to `remote_name` on the device, replacing it.
    fn upload(
        &mut self,
        local_path: &Path,
        remote_name: &str,
        mode: TransferMode,
    ) -> Result<(), TransportError>;

    /// Ends the session with the server.
    fn close(&mut self) -> Result<(), TransportError>;
}
