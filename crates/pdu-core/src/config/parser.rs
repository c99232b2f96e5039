//! Parser for the PDU `config.ini` text format.
//!
//! Grammar, applied to each line after trimming surrounding whitespace:
//!
//! ```text
//! ; comment                ignored, current section unchanged
//! [SectionName]            header: drops the first and last character
//!                          blank lines are ignored
//! key=value                split on the FIRST '=' only
//! ```
//!
//! A header that repeats an earlier name re-opens that section; keys seen
//! later overwrite earlier ones.  This is a sanity check rather than a full
//! grammar validation: values are never interpreted.

use thiserror::Error;
use tracing::debug;

use super::model::DeviceConfig;

/// Errors that can occur while parsing a `config.ini`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The input has zero or one line.  A usable device config has at least a
    /// header comment and one directive.
    #[error("config is empty or unreadable: {line_count} line(s)")]
    EmptyOrUnreadable { line_count: usize },

    /// A `key=value` line appeared before the first `[Section]` header.
    #[error("line {line_number}: key/value line before any [section] header")]
    KeyBeforeSection { line_number: usize },

    /// A line that is not a comment, header, or blank has no `=`.
    #[error("line {line_number}: expected key=value, got {line:?}")]
    MalformedLine { line_number: usize, line: String },
}

/// Parses the raw text of a `config.ini` into a [`DeviceConfig`].
///
/// # Errors
///
/// - [`ParseError::EmptyOrUnreadable`] for inputs of zero or one line.
/// - [`ParseError::KeyBeforeSection`] for a directive before any header.
/// - [`ParseError::MalformedLine`] for a directive without `=`.
///
/// # Examples
///
/// ```rust
/// use pdu_core::parse_config;
///
/// let cfg = parse_config("[SystemID]\nContact=a=b\n").unwrap();
/// assert_eq!(cfg.get("SystemID", "Contact"), Some("a=b"));
///
/// assert!(parse_config("[SystemID]").is_err());
/// ```
pub fn parse_config(text: &str) -> Result<DeviceConfig, ParseError> {
    let line_count = text.lines().count();
    if line_count <= 1 {
        return Err(ParseError::EmptyOrUnreadable { line_count });
    }

    let mut config = DeviceConfig::new();
    let mut current: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_number = idx + 1;
        let line = raw.trim();

        if line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') {
            let name = header_name(line);
            // Register the section now so an empty one still round-trips.
            config.section_or_insert(name);
            current = Some(name.to_string());
            continue;
        }

        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ParseError::MalformedLine {
                line_number,
                line: line.to_string(),
            });
        };

        let Some(section) = current.as_deref() else {
            return Err(ParseError::KeyBeforeSection { line_number });
        };

        config.set(section, key, value);
    }

    debug!(sections = config.len(), lines = line_count, "parsed device config");
    Ok(config)
}

/// Section name of a header line: everything between the first and last
/// character.  `line` must start with `[`.
fn header_name(line: &str) -> &str {
    let inner = &line[1..];
    match inner.char_indices().next_back() {
        Some((last, _)) => &inner[..last],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_section() {
        // Arrange
        let text = "[A]\nk=v";

        // Act
        let cfg = parse_config(text).expect("two lines must parse");

        // Assert
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.get("A", "k"), Some("v"));
    }

    #[test]
    fn test_parse_empty_input_fails() {
        assert_eq!(
            parse_config(""),
            Err(ParseError::EmptyOrUnreadable { line_count: 0 })
        );
    }

    #[test]
    fn test_parse_single_line_fails() {
        assert_eq!(
            parse_config("[A]"),
            Err(ParseError::EmptyOrUnreadable { line_count: 1 })
        );
        // A trailing newline does not make a second line.
        assert_eq!(
            parse_config("[A]\n"),
            Err(ParseError::EmptyOrUnreadable { line_count: 1 })
        );
    }

    #[test]
    fn test_first_equals_sign_is_the_delimiter() {
        let cfg = parse_config("[A]\nk=a=b").unwrap();
        assert_eq!(cfg.get("A", "k"), Some("a=b"));
    }

    #[test]
    fn test_empty_value_is_kept() {
        let cfg = parse_config("[A]\nk=").unwrap();
        assert_eq!(cfg.get("A", "k"), Some(""));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let cfg = parse_config("[A]\nx=1\ny=2\nx=2\n").unwrap();

        assert_eq!(cfg.get("A", "x"), Some("2"));
        let keys: Vec<&str> = cfg.section("A").unwrap().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["x", "y"], "overwrite keeps the original position");
    }

    #[test]
    fn test_repeated_header_merges_sections() {
        // Arrange
        let text = "[A]\nx=1\n[B]\ny=2\n[A]\nz=3\nx=9\n";

        // Act
        let cfg = parse_config(text).unwrap();

        // Assert
        assert_eq!(cfg.len(), 2);
        assert_eq!(cfg.get("A", "x"), Some("9"));
        assert_eq!(cfg.get("A", "z"), Some("3"));
        assert_eq!(cfg.get("B", "y"), Some("2"));
    }

    #[test]
    fn test_comments_and_blank_lines_are_ignored() {
        let text = "; Config written at 01-02-2024 10:11:12\n\n[A]\n; inline comment\n\n   \nk=v\n;x=1\n";
        let cfg = parse_config(text).unwrap();

        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.section("A").unwrap().len(), 1);
        assert_eq!(cfg.get("A", "k"), Some("v"));
    }

    #[test]
    fn test_comment_does_not_reset_current_section() {
        let cfg = parse_config("[A]\n; note\nk=v\n").unwrap();
        assert_eq!(cfg.get("A", "k"), Some("v"));
    }

    #[test]
    fn test_lines_are_trimmed() {
        let cfg = parse_config("  [A]  \r\n\tk=v  \r\n").unwrap();
        assert_eq!(cfg.get("A", "k"), Some("v"));
    }

    #[test]
    fn test_whitespace_inside_key_and_value_is_verbatim() {
        let cfg = parse_config("[A]\nContact = Jane Doe\n").unwrap();
        assert_eq!(cfg.get("A", "Contact "), Some(" Jane Doe"));
    }

    #[test]
    fn test_header_name_drops_first_and_last_char() {
        let cfg = parse_config("[NetworkTCP/IP]\nSystemIP=10.0.0.5\n").unwrap();
        assert_eq!(cfg.get("NetworkTCP/IP", "SystemIP"), Some("10.0.0.5"));
    }

    #[test]
    fn test_degenerate_headers() {
        assert_eq!(header_name("["), "");
        assert_eq!(header_name("[]"), "");
        assert_eq!(header_name("[A"), "");
        assert_eq!(header_name("[Äö]"), "Äö");
    }

    #[test]
    fn test_empty_section_is_kept() {
        let cfg = parse_config("[Empty]\n[A]\nk=v\n").unwrap();
        assert!(cfg.section("Empty").unwrap().is_empty());
        let names: Vec<&str> = cfg.sections().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Empty", "A"]);
    }

    #[test]
    fn test_key_before_section_fails() {
        assert_eq!(
            parse_config("; header\nk=v\n[A]\n"),
            Err(ParseError::KeyBeforeSection { line_number: 2 })
        );
    }

    #[test]
    fn test_line_without_equals_fails() {
        assert_eq!(
            parse_config("[A]\nk=v\nnot a directive\n"),
            Err(ParseError::MalformedLine {
                line_number: 3,
                line: "not a directive".to_string(),
            })
        );
    }

    #[test]
    fn test_error_messages_name_the_line() {
        let err = parse_config("[A]\noops\n").unwrap_err();
        assert_eq!(err.to_string(), "line 2: expected key=value, got \"oops\"");
    }
}
