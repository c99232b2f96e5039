//! Read and edit use cases built on [`Session`].
//!
//! Each use case drives one full round trip and aborts on the first failure:
//!
//! ```text
//! read:  connect → passive → fetch → parse → close
//! edit:  connect → passive → fetch → parse → apply edits → write → close
//! ```
//!
//! On an early error the session is left for its `Drop` impl to close.

use pdu_core::DeviceConfig;
use thiserror::Error;
use tracing::info;

use super::session::{Session, SessionError};
use crate::infrastructure::transport::Connector;

/// A `KEY=VALUE` argument that could not be understood.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("expected KEY=VALUE, got {0:?}")]
    MissingEquals(String),

    #[error("empty key in {0:?}")]
    EmptyKey(String),
}

/// One value to overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEdit {
    pub section: String,
    pub key: String,
    pub value: String,
}

impl ConfigEdit {
    pub fn new(
        section: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parses `KEY=VALUE`, splitting on the first `=` the same way the config
    /// parser does.  The key is trimmed; the value is kept as given.
    pub fn parse(section: &str, assignment: &str) -> Result<Self, EditError> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| EditError::MissingEquals(assignment.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(EditError::EmptyKey(assignment.to_string()));
        }
        Ok(Self::new(section, key, value))
    }
}

/// An edit together with the value it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit {
    pub edit: ConfigEdit,
    pub previous: Option<String>,
}

impl AppliedEdit {
    pub fn changed(&self) -> bool {
        self.previous.as_deref() != Some(self.edit.value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditReport {
    pub applied: Vec<AppliedEdit>,
}

impl EditReport {
    pub fn changed_count(&self) -> usize {
        self.applied.iter().filter(|a| a.changed()).count()
    }
}

/// Applies `edits` in order.  Missing sections and keys are created.
pub fn apply_edits(config: &mut DeviceConfig, edits: &[ConfigEdit]) -> EditReport {
    let applied = edits
        .iter()
        .map(|edit| AppliedEdit {
            previous: config.set(
                edit.section.clone(),
                edit.key.clone(),
                edit.value.clone(),
            ),
            edit: edit.clone(),
        })
        .collect();
    EditReport { applied }
}

/// Fetches and parses the device config, then closes the session.
pub fn read_device_config<C: Connector>(
    session: &mut Session<C>,
    passive: bool,
) -> Result<DeviceConfig, SessionError> {
    session.connect()?;
    session.set_passive_mode(passive)?;
    let config = session.load_config()?;
    session.close()?;
    Ok(config)
}

/// Fetches the device config, applies `edits`, writes it back and closes the
/// session.
pub fn edit_device_config<C: Connector>(
    session: &mut Session<C>,
    passive: bool,
    edits: &[ConfigEdit],
) -> Result<EditReport, SessionError> {
    session.connect()?;
    session.set_passive_mode(passive)?;
    let mut config = session.load_config()?;

    let report = apply_edits(&mut config, edits);
    info!(
        edits = edits.len(),
        changed = report.changed_count(),
        "applying edits"
    );

    session.write_config(&config)?;
    session.close()?;
    Ok(report)
}
