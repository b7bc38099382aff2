//! Script runtime seam - the branching-story interpreter the engine drives.
//!
//! The interpreter itself is an external collaborator. [`ScriptRuntime`]
//! captures the operations the dialogue engine needs from it: jumping to an
//! entry path, pulling lines, reading choices and tags, choosing a branch,
//! binding external functions and receiving error reports.

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// A value crossing the script/host boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScriptValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    Str(String),
}

impl ScriptValue {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            ScriptValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Name of the value's type, for argument errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Int(_) => "int",
            ScriptValue::Float(_) => "float",
            ScriptValue::Bool(_) => "bool",
            ScriptValue::Str(_) => "string",
        }
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        ScriptValue::Int(value)
    }
}

impl From<f32> for ScriptValue {
    fn from(value: f32) -> Self {
        ScriptValue::Float(value)
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::Str(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::Str(value)
    }
}

impl std::fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptValue::Int(value) => write!(f, "{}", value),
            ScriptValue::Float(value) => write!(f, "{}", value),
            ScriptValue::Bool(value) => write!(f, "{}", value),
            ScriptValue::Str(value) => write!(f, "{}", value),
        }
    }
}

/// Severity of a runtime error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorType {
    /// Annotation meant for the script author only.
    Author,
    Warning,
    Error,
}

impl ErrorType {
    /// Raw severity code as reported by the runtime.
    pub fn code(self) -> i32 {
        match self {
            ErrorType::Author => 0,
            ErrorType::Warning => 1,
            ErrorType::Error => 2,
        }
    }
}

impl TryFrom<i32> for ErrorType {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, i32> {
        match code {
            0 => Ok(ErrorType::Author),
            1 => Ok(ErrorType::Warning),
            2 => Ok(ErrorType::Error),
            other => Err(other),
        }
    }
}

/// A host function the script can call mid-line.
pub type ExternalFunction =
    Box<dyn FnMut(&[ScriptValue]) -> Result<Option<ScriptValue>, RuntimeError>>;

/// Box a closure as an [`ExternalFunction`].
pub fn external_function(
    function: impl FnMut(&[ScriptValue]) -> Result<Option<ScriptValue>, RuntimeError> + 'static,
) -> ExternalFunction {
    Box::new(function)
}

/// Receives `(message, raw severity code)` error reports from the runtime.
pub type ErrorHandler = Box<dyn FnMut(&str, i32)>;

/// The operations the dialogue engine needs from a branching-story runtime.
pub trait ScriptRuntime {
    /// Move the story cursor to a named entry path.
    fn choose_path(&mut self, path: &str) -> Result<(), RuntimeError>;

    /// Whether another line can be pulled.
    fn can_continue(&self) -> bool;

    /// Pull the next raw line. External functions run during this call.
    fn continue_line(&mut self) -> Result<String, RuntimeError>;

    /// Display text of the pending choices, in index order.
    fn current_choices(&self) -> Vec<String>;

    /// Resume the story along the choice at `index`.
    fn choose_choice_index(&mut self, index: usize) -> Result<(), RuntimeError>;

    /// Tags attached to the most recently continued line.
    fn current_tags(&self) -> Vec<String>;

    /// Register a host function under `name`.
    fn bind_external_function(
        &mut self,
        name: &str,
        function: ExternalFunction,
    ) -> Result<(), RuntimeError>;

    /// Install the error report callback, replacing any previous one.
    fn set_error_handler(&mut self, handler: ErrorHandler);

    fn has_choices(&self) -> bool {
        !self.current_choices().is_empty()
    }
}
