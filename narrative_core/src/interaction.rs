//! Interaction chains for things the player can interact with.
//!
//! An [`Interactable`] keeps an ordered list of interactions with exactly one
//! active at a time. Interacting runs the active one; if it names a `next`
//! interaction, that one takes over for the following interaction. Talking to
//! a guard can open an introduction once and a shorter dialogue afterwards.

use serde::{Deserialize, Serialize};

use game_state::NamedCounter;

use crate::dialogue::{DialogueEngine, DialoguePresenter};
use crate::error::DialogueError;
use crate::runtime::ScriptRuntime;

/// What an interaction does when it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InteractionAction {
    /// Open a dialogue at the given story path.
    StartDialogue(String),
    /// Apply counters as one batch.
    AddState(Vec<NamedCounter>),
    /// Emit a named signal on the narrative channel.
    Signal(String),
    #[default]
    None,
}

impl InteractionAction {
    /// Carry out the action against an engine and its store and events.
    pub fn perform<R, P>(&self, engine: &mut DialogueEngine<R, P>) -> Result<(), DialogueError>
    where
        R: ScriptRuntime,
        P: DialoguePresenter,
    {
        match self {
            InteractionAction::StartDialogue(path) => engine.start_dialogue(path),
            InteractionAction::AddState(counters) => {
                engine.store().add_batch(counters.iter().cloned());
                Ok(())
            }
            InteractionAction::Signal(name) => {
                engine.events().narrative().emit(name);
                Ok(())
            }
            InteractionAction::None => Ok(()),
        }
    }
}

/// One step of an interaction chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub action: InteractionAction,
    /// Index of the interaction that becomes active after this one runs.
    #[serde(default)]
    pub next: Option<usize>,
}

impl Interaction {
    pub fn new(action: InteractionAction) -> Self {
        Self { action, next: None }
    }

    pub fn then(mut self, next: usize) -> Self {
        self.next = Some(next);
        self
    }
}

/// An ordered interaction chain with one active interaction.
#[derive(Debug, Clone)]
pub struct Interactable {
    name: String,
    interactions: Vec<Interaction>,
    active: Option<usize>,
}

impl Interactable {
    /// Create a chain whose first interaction is active.
    pub fn new(name: impl Into<String>, interactions: Vec<Interaction>) -> Self {
        let active = if interactions.is_empty() { None } else { Some(0) };
        Self {
            name: name.into(),
            interactions,
            active,
        }
    }

    /// Run the active interaction and return its action for dispatch.
    ///
    /// Returns `None` when the chain is empty.
    pub fn interact(&mut self) -> Option<&InteractionAction> {
        let current = self.active?;
        let next = self.interactions[current].next;

        match next {
            Some(next) if next < self.interactions.len() => self.active = Some(next),
            Some(next) => tracing::warn!(
                interactable = %self.name,
                next,
                count = self.interactions.len(),
                "Next interaction is out of range; keeping the current one"
            ),
            None => {}
        }

        tracing::debug!(interactable = %self.name, interaction = current, "Interacted");

        Some(&self.interactions[current].action)
    }

    /// Index of the interaction that runs next.
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }
}
