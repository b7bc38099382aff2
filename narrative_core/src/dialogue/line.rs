//! Dialogue lines and the `speaker : text` convention.
//!
//! Raw lines name their speaker before a single colon. A colon that belongs
//! to the speaker or the text is written doubled (`::`):
//!
//! ```
//! use narrative_core::parse_line;
//!
//! let line = parse_line("Time is 12::30: Let's go");
//! assert_eq!(line.speaker.as_deref(), Some("Time is 12:30"));
//! assert_eq!(line.text, "Let's go");
//! ```

use serde::{Deserialize, Serialize};

/// Stands in for an escaped colon while the line is split.
const ESCAPED_COLON_PLACEHOLDER: char = '\u{E000}';

const ESCAPED_COLON: &str = "::";

const SEPARATOR: char = ':';

/// A selectable branch shown with a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    /// Position in the runtime's choice list; the only handle used to resume.
    pub index: usize,
}

/// One continuation step's worth of dialogue, handed to the presenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DialogueLine {
    pub speaker: Option<String>,
    pub text: String,
    pub choices: Vec<Choice>,
}

impl DialogueLine {
    /// A line with no text or speaker that only offers choices.
    pub fn choices_only(choices: Vec<Choice>) -> Self {
        Self {
            speaker: None,
            text: String::new(),
            choices,
        }
    }

    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }
}

/// Result of splitting a raw line into speaker and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub speaker: Option<String>,
    pub text: String,
    /// Unescaped colons found; anything above one is an authoring error.
    pub separators: usize,
}

impl ParsedLine {
    /// Check whether the text used bare colons without escaping them.
    pub fn is_malformed(&self) -> bool {
        self.separators > 1
    }
}

/// Split a raw line into an optional speaker and text.
///
/// Only the first unescaped colon separates the speaker; extra colons stay in
/// the text. Both parts are trimmed and `::` becomes `:`. An empty speaker
/// segment counts as no speaker.
pub fn parse_line(raw: &str) -> ParsedLine {
    let escaped = raw.replace(ESCAPED_COLON, &ESCAPED_COLON_PLACEHOLDER.to_string());
    let separators = escaped.matches(SEPARATOR).count();

    let (speaker, text) = match escaped.split_once(SEPARATOR) {
        Some((speaker, text)) => {
            let speaker = unescape(speaker.trim());
            (Some(speaker).filter(|s| !s.is_empty()), unescape(text.trim()))
        }
        None => (None, unescape(escaped.trim())),
    };

    ParsedLine {
        speaker,
        text,
        separators,
    }
}

fn unescape(segment: &str) -> String {
    segment.replace(ESCAPED_COLON_PLACEHOLDER, ":")
}

/// Wrap text in an emphasis span.
pub fn emphasize(text: &str, open: &str, close: &str) -> String {
    format!("{}{}{}", open, text, close)
}
