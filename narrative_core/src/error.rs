//! Error types for the narrative core.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a script runtime collaborator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Unknown story path: {0}")]
    UnknownPath(String),

    #[error("Story cannot continue")]
    CannotContinue,

    #[error("Choice index {index} rejected: {count} choices available")]
    ChoiceRejected { index: usize, count: usize },

    #[error("External function `{0}` is already bound")]
    AlreadyBound(String),

    #[error("External function `{0}` is not bound")]
    NotBound(String),

    #[error("External function `{function}` expects {expected} arguments, got {found}")]
    ArgumentCount {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("External function `{function}` argument {position} must be {expected}")]
    ArgumentType {
        function: String,
        position: usize,
        expected: &'static str,
    },

    #[error("Story error: {0}")]
    Story(String),
}

/// Dialogue session contract violations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DialogueError {
    #[error("A dialogue is already open")]
    AlreadyOpen,

    #[error("No dialogue is open")]
    NotOpen,

    #[error("The current line is waiting for a choice")]
    ChoicePending,

    #[error("The current line has no choices")]
    NoChoices,

    #[error("Choice index {index} is out of range: {count} choices available")]
    ChoiceOutOfRange { index: usize, count: usize },

    #[error("Script runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
