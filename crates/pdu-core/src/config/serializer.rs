//! Serializer for the PDU `config.ini` text format.
//!
//! Output layout:
//!
//! ```text
//! ; Config written at 03-14-2024 09:26:53
//! ; pdu-core version 0.1.0
//! ; <attribution, optional>
//! [SectionName]
//! key=value
//! [OtherSection]
//! key=value
//! ```
//!
//! The header is regenerated on every write.  The parser ignores all
//! `;`-prefixed lines, so the header never affects round-trip content.
//!
//! Keys and values are written verbatim.  A value containing a newline, or a
//! key containing `=`, will not survive a re-parse; callers must not store
//! control characters in values.

use chrono::{Local, NaiveDateTime};

use super::model::DeviceConfig;

/// Timestamp layout of the first header line.  Numeric only, so the output
/// does not depend on the process locale.
pub const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

/// Identification written into the generated header comment lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterInfo {
    /// Name of the writing tool (e.g. `"pdu-agent"`).
    pub tool: String,
    /// Version of the writing tool.
    pub version: String,
    /// Optional free-form attribution line (author, ticket, change id).
    pub attribution: Option<String>,
}

impl WriterInfo {
    pub fn new(tool: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            version: version.into(),
            attribution: None,
        }
    }

    /// Adds the optional attribution line.
    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }
}

impl Default for WriterInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

/// Serializes `config` using the current local time in the header.
///
/// See [`serialize_config_at`] for a deterministic variant.
pub fn serialize_config(config: &DeviceConfig, writer: &WriterInfo) -> String {
    serialize_config_at(config, writer, Local::now().naive_local())
}

/// Serializes `config` with an explicit header timestamp.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use pdu_core::{serialize_config_at, DeviceConfig, WriterInfo};
///
/// let mut cfg = DeviceConfig::new();
/// cfg.set("SystemID", "Contact", "new");
///
/// let at = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap().and_hms_opt(9, 26, 53).unwrap();
/// let text = serialize_config_at(&cfg, &WriterInfo::new("pdu-agent", "1.0"), at);
///
/// assert_eq!(
///     text,
///     "; Config written at 03-14-2024 09:26:53\n; pdu-agent version 1.0\n[SystemID]\nContact=new\n"
/// );
/// ```
pub fn serialize_config_at(
    config: &DeviceConfig,
    writer: &WriterInfo,
    timestamp: NaiveDateTime,
) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "; Config written at {}\n",
        timestamp.format(TIMESTAMP_FORMAT)
    ));
    out.push_str(&format!("; {} version {}\n", writer.tool, writer.version));
    if let Some(attribution) = &writer.attribution {
        out.push_str(&format!("; {attribution}\n"));
    }

    write_body(config, &mut out);
    out
}

/// Serializes only the `[Section]` / `key=value` lines, without a header.
pub fn serialize_body(config: &DeviceConfig) -> String {
    let mut out = String::new();
    write_body(config, &mut out);
    out
}

fn write_body(config: &DeviceConfig, out: &mut String) {
    for (name, section) in config.sections() {
        out.push('[');
        out.push_str(name);
        out.push_str("]\n");
        for (key, value) in section.iter() {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
    }
}
