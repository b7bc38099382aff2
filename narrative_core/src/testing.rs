//! Testing utilities for the dialogue engine.
//!
//! - `ScriptedStory`: an in-memory [`ScriptRuntime`] built from knots of nodes
//! - `RecordingPresenter`: a presenter that keeps every line it is shown
//!
//! `ScriptedStory` follows the cursor semantics of a real branching-story
//! runtime: lines are pulled one at a time, external calls run while pulling,
//! and the cursor settles on choices or the end as soon as it reaches them so
//! that `can_continue` is accurate between calls.

use std::collections::HashMap;

use crate::dialogue::bridge::GET_STATE_HOOK;
use crate::dialogue::{DialogueLine, DialoguePresenter};
use crate::error::RuntimeError;
use crate::runtime::{ErrorHandler, ErrorType, ExternalFunction, ScriptRuntime, ScriptValue};

/// A choice inside a scripted knot.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryChoice {
    pub text: String,
    /// Knot the story diverts to when this choice is taken.
    pub target: String,
}

/// One step of a scripted knot.
#[derive(Debug, Clone, PartialEq)]
pub enum StoryNode {
    /// Output a line with optional tags.
    Line { text: String, tags: Vec<String> },
    /// Call a bound external function.
    Call {
        function: String,
        args: Vec<ScriptValue>,
    },
    /// Divert to `target` when the `Get_State` hook reports at least `threshold` for `id`.
    IfAtLeast {
        id: String,
        threshold: i32,
        target: String,
    },
    /// Report an issue through the error handler with a raw severity code.
    Report { message: String, code: i32 },
    /// Fail the `continue_line` call that reaches this node, then move on.
    Fail(String),
    /// Stop and offer choices.
    Choices(Vec<StoryChoice>),
    /// Continue in another knot.
    Divert(String),
    End,
}

impl StoryNode {
    pub fn line(text: impl Into<String>) -> Self {
        StoryNode::Line {
            text: text.into(),
            tags: Vec::new(),
        }
    }

    pub fn tagged(text: impl Into<String>, tags: &[&str]) -> Self {
        StoryNode::Line {
            text: text.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn call(function: impl Into<String>, args: Vec<ScriptValue>) -> Self {
        StoryNode::Call {
            function: function.into(),
            args,
        }
    }

    pub fn if_at_least(id: impl Into<String>, threshold: i32, target: impl Into<String>) -> Self {
        StoryNode::IfAtLeast {
            id: id.into(),
            threshold,
            target: target.into(),
        }
    }

    pub fn report(message: impl Into<String>, code: i32) -> Self {
        StoryNode::Report {
            message: message.into(),
            code,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        StoryNode::Fail(message.into())
    }

    pub fn choices(choices: Vec<(&str, &str)>) -> Self {
        StoryNode::Choices(
            choices
                .into_iter()
                .map(|(text, target)| StoryChoice {
                    text: text.to_string(),
                    target: target.to_string(),
                })
                .collect(),
        )
    }

    pub fn divert(target: impl Into<String>) -> Self {
        StoryNode::Divert(target.into())
    }
}

/// An in-memory story made of named knots.
#[derive(Default)]
pub struct ScriptedStory {
    knots: HashMap<String, Vec<StoryNode>>,
    cursor: Option<(String, usize)>,
    choices: Vec<StoryChoice>,
    tags: Vec<String>,
    functions: HashMap<String, ExternalFunction>,
    error_handler: Option<ErrorHandler>,
    visited: Vec<String>,
}

impl ScriptedStory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a knot. Replaces any knot with the same name.
    pub fn knot(mut self, name: impl Into<String>, nodes: Vec<StoryNode>) -> Self {
        self.knots.insert(name.into(), nodes);
        self
    }

    /// Invoke a bound external function directly.
    pub fn call_external(
        &mut self,
        name: &str,
        args: &[ScriptValue],
    ) -> Result<Option<ScriptValue>, RuntimeError> {
        match self.functions.get_mut(name) {
            Some(function) => function(args),
            None => Err(RuntimeError::NotBound(name.to_string())),
        }
    }

    /// Knots entered so far, in order.
    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    fn current_node(&self) -> Option<StoryNode> {
        let (knot, index) = self.cursor.as_ref()?;
        self.knots.get(knot)?.get(*index).cloned()
    }

    fn step(&mut self) {
        if let Some((_, index)) = self.cursor.as_mut() {
            *index += 1;
        }
    }

    fn jump(&mut self, target: &str) {
        if self.knots.contains_key(target) {
            self.cursor = Some((target.to_string(), 0));
            self.visited.push(target.to_string());
        } else {
            self.cursor = None;
            self.report(&format!("Divert target not found: {}", target), ErrorType::Error.code());
        }
    }

    /// Move the cursor past anything that is not content.
    fn settle(&mut self) {
        while self.cursor.is_some() {
            match self.current_node() {
                None | Some(StoryNode::End) => self.cursor = None,
                Some(StoryNode::Choices(choices)) => {
                    self.choices = choices;
                    self.cursor = None;
                }
                Some(StoryNode::Divert(target)) => self.jump(&target),
                Some(_) => break,
            }
        }
    }

    fn report(&mut self, message: &str, code: i32) {
        match self.error_handler.as_mut() {
            Some(handler) => handler(message, code),
            None => tracing::warn!(code, "{}", message),
        }
    }

    fn run_call(&mut self, function: &str, args: &[ScriptValue]) -> Option<ScriptValue> {
        match self.call_external(function, args) {
            Ok(value) => value,
            Err(err) => {
                self.report(&err.to_string(), ErrorType::Error.code());
                None
            }
        }
    }
}

impl ScriptRuntime for ScriptedStory {
    fn choose_path(&mut self, path: &str) -> Result<(), RuntimeError> {
        if !self.knots.contains_key(path) {
            return Err(RuntimeError::UnknownPath(path.to_string()));
        }

        self.choices.clear();
        self.tags.clear();
        self.jump(path);
        self.settle();
        Ok(())
    }

    fn can_continue(&self) -> bool {
        self.cursor.is_some()
    }

    fn continue_line(&mut self) -> Result<String, RuntimeError> {
        if self.cursor.is_none() {
            return Err(RuntimeError::CannotContinue);
        }

        self.tags.clear();
        let mut output = String::new();

        loop {
            self.settle();
            let Some(node) = self.current_node() else {
                break;
            };
            self.step();

            match node {
                StoryNode::Line { text, tags } => {
                    output = text;
                    self.tags = tags;
                    break;
                }
                StoryNode::Call { function, args } => {
                    self.run_call(&function, &args);
                }
                StoryNode::IfAtLeast {
                    id,
                    threshold,
                    target,
                } => {
                    let amount = self
                        .run_call(GET_STATE_HOOK, &[ScriptValue::Str(id)])
                        .and_then(|value| value.as_int());
                    if amount.is_some_and(|amount| amount >= threshold) {
                        self.jump(&target);
                    }
                }
                StoryNode::Report { message, code } => self.report(&message, code),
                StoryNode::Fail(message) => {
                    self.settle();
                    return Err(RuntimeError::Story(message));
                }
                StoryNode::Choices(_) | StoryNode::Divert(_) | StoryNode::End => {}
            }
        }

        self.settle();
        Ok(output)
    }

    fn current_choices(&self) -> Vec<String> {
        self.choices.iter().map(|choice| choice.text.clone()).collect()
    }

    fn choose_choice_index(&mut self, index: usize) -> Result<(), RuntimeError> {
        let Some(choice) = self.choices.get(index) else {
            return Err(RuntimeError::ChoiceRejected {
                index,
                count: self.choices.len(),
            });
        };

        let target = choice.target.clone();
        self.choices.clear();
        self.tags.clear();
        self.jump(&target);
        self.settle();
        Ok(())
    }

    fn current_tags(&self) -> Vec<String> {
        self.tags.clone()
    }

    fn bind_external_function(
        &mut self,
        name: &str,
        function: ExternalFunction,
    ) -> Result<(), RuntimeError> {
        if self.functions.contains_key(name) {
            return Err(RuntimeError::AlreadyBound(name.to_string()));
        }
        self.functions.insert(name.to_string(), function);
        Ok(())
    }

    fn set_error_handler(&mut self, handler: ErrorHandler) {
        self.error_handler = Some(handler);
    }
}

impl std::fmt::Debug for ScriptedStory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedStory")
            .field("knots", &self.knots.len())
            .field("cursor", &self.cursor)
            .field("choices", &self.choices)
            .finish()
    }
}

/// A presenter that records every line it is shown.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub lines: Vec<DialogueLine>,
}

impl RecordingPresenter {
    pub fn last(&self) -> Option<&DialogueLine> {
        self.lines.last()
    }
}

impl DialoguePresenter for RecordingPresenter {
    fn display(&mut self, line: &DialogueLine) {
        self.lines.push(line.clone());
    }
}
