//! Infrastructure layer for the agent.
//!
//! Contains OS-facing adapters: the FTP transport to the device and local
//! file-system storage for scratch files and settings.
//!
//! **Dependency rule**: this layer may depend on `pdu_core`, but MUST NOT
//! import the `application` layer.

pub mod storage;
pub mod transport;
