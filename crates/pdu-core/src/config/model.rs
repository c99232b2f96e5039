//! In-memory model of a PDU `config.ini`.
//!
//! A [`DeviceConfig`] is an ordered map of section name → [`ConfigSection`],
//! and a [`ConfigSection`] is an ordered map of key → value.  Both maps keep
//! insertion order so that a config parsed from a device and written back
//! unchanged produces the same section and key order.
//!
//! # Mutation and ordering
//!
//! - Overwriting an existing key keeps the key where it is.
//! - Adding a new key appends it to the end of its section.
//! - Adding a new section appends it to the end of the config.
//!
//! Equality ignores order: two configs are equal when they hold the same
//! (section, key) → value content.

use indexmap::IndexMap;
use serde::Serialize;

/// One `[Section]` of a device config: ordered key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConfigSection {
    entries: IndexMap<String, String>,
}

impl ConfigSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Stores `value` under `key`, returning the previous value if any.
    ///
    /// An existing key keeps its position; a new key is appended.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Removes `key`, preserving the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigSection {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut section = ConfigSection::new();
        for (k, v) in iter {
            section.set(k, v);
        }
        section
    }
}

/// A complete device configuration: ordered, uniquely named sections.
///
/// # Example
///
/// ```rust
/// use pdu_core::DeviceConfig;
///
/// let mut cfg = DeviceConfig::new();
/// cfg.set("SystemID", "Contact", "ops@example.com");
/// assert_eq!(cfg.get("SystemID", "Contact"), Some("ops@example.com"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeviceConfig {
    sections: IndexMap<String, ConfigSection>,
}

impl DeviceConfig {
    /// Creates an empty config with no sections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the config has no sections at all.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn contains_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn section(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.get(name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut ConfigSection> {
        self.sections.get_mut(name)
    }

    /// Returns the named section, appending an empty one first if it does
    /// not exist yet.
    pub fn section_or_insert(&mut self, name: impl Into<String>) -> &mut ConfigSection {
        self.sections.entry(name.into()).or_default()
    }

    /// Looks up a single value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section).and_then(|s| s.get(key))
    }

    /// Sets `section.key = value`, creating the section if needed.
    ///
    /// Returns the value that was overwritten, if any.
    pub fn set(
        &mut self,
        section: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.section_or_insert(section).set(key, value)
    }

    /// Removes a single key.  The section stays even if it becomes empty.
    pub fn remove(&mut self, section: &str, key: &str) -> Option<String> {
        self.sections.get_mut(section).and_then(|s| s.remove(key))
    }

    /// Removes a whole section, preserving the order of the others.
    pub fn remove_section(&mut self, name: &str) -> Option<ConfigSection> {
        self.sections.shift_remove(name)
    }

    /// Iterates over `(section name, section)` pairs in file order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &ConfigSection)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }
}
