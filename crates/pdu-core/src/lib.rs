//! # pdu-core
//!
//! Shared library for the PDU configuration agent containing the in-memory
//! device configuration model and the `config.ini` text codec.
//!
//! This crate has zero dependencies on sockets, the file system, or any
//! transfer protocol.  Everything here operates on strings and plain data, so
//! it can be tested (and benchmarked) without a device on the network.
//!
//! # Architecture overview
//!
//! A networked power-distribution unit (PDU) exposes its settings as a single
//! `config.ini` file on its FTP server.  The agent downloads that file, edits
//! it in memory, and uploads the result.  This crate is the middle part of
//! that round trip:
//!
//! - **`config::model`** – [`DeviceConfig`]: ordered sections of ordered
//!   key/value pairs.  Values are opaque strings.
//!
//! - **`config::parser`** – turns the raw file text into a [`DeviceConfig`],
//!   or fails with a [`ParseError`].
//!
//! - **`config::serializer`** – turns a [`DeviceConfig`] back into file text,
//!   prefixed with a generated comment header described by [`WriterInfo`].
//!
//! ```text
//!  config.ini text ──parse_config──► DeviceConfig ──serialize_config──► config.ini text
//!                                        ▲    │
//!                                        └────┘  set / remove
//! ```

pub mod config;

// Re-export the most-used types at the crate root so callers can write
// `pdu_core::DeviceConfig` instead of `pdu_core::config::model::DeviceConfig`.
pub use config::model::{ConfigSection, DeviceConfig};
pub use config::parser::{parse_config, ParseError};
pub use config::serializer::{serialize_body, serialize_config, serialize_config_at, WriterInfo};
