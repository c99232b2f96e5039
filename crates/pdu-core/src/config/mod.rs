//! Device configuration model and its `config.ini` text codec.

pub mod model;
pub mod parser;
pub mod serializer;

pub use model::{ConfigSection, DeviceConfig};
pub use parser::{parse_config, ParseError};
pub use serializer::{serialize_body, serialize_config, serialize_config_at, WriterInfo};
