//! Game configuration loaded from TOML.
//!
//! ```toml
//! [dialogue]
//! thought_tag = "thought"
//!
//! [[initial_state]]
//! id = "met_guard"
//! amount = 1
//!
//! [[reactors]]
//! name = "gate_open"
//! conditions = [{ id = "key", amount = 1 }]
//!
//! [[interactables]]
//! name = "guard"
//! interactions = [
//!     { action = { start_dialogue = "guard.intro" }, next = 1 },
//!     { action = { start_dialogue = "guard.again" } },
//! ]
//! ```
//!
//! Every section is optional.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;

use game_state::{ConditionReactor, ConditionSet, NamedCounter, StateStore};

use crate::error::ConfigError;
use crate::interaction::{Interactable, Interaction};

/// How dialogue lines are decorated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Line tag that marks the text as an inner thought.
    pub thought_tag: String,
    pub emphasis_open: String,
    pub emphasis_close: String,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            thought_tag: "thought".to_string(),
            emphasis_open: "<i>".to_string(),
            emphasis_close: "</i>".to_string(),
        }
    }
}

/// A named condition set to watch with a [`ConditionReactor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactorDefinition {
    pub name: String,
    #[serde(default)]
    pub conditions: ConditionSet,
}

/// A named chain of interactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractableDefinition {
    pub name: String,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

/// The complete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GameConfig {
    pub dialogue: DialogueConfig,
    pub initial_state: Vec<NamedCounter>,
    pub reactors: Vec<ReactorDefinition>,
    pub interactables: Vec<InteractableDefinition>,
}

impl GameConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;

        tracing::debug!(
            path = %path.display(),
            counters = config.initial_state.len(),
            reactors = config.reactors.len(),
            interactables = config.interactables.len(),
            "Loaded game config"
        );

        Ok(config)
    }

    /// A store seeded with `initial_state`, without notifications.
    pub fn build_store(&self) -> Rc<StateStore> {
        Rc::new(StateStore::with_counters(self.initial_state.iter().cloned()))
    }

    /// Inactive reactors for every definition, in file order.
    pub fn build_reactors(&self, store: &Rc<StateStore>) -> Vec<ConditionReactor> {
        self.reactors
            .iter()
            .map(|def| {
                ConditionReactor::new(def.name.clone(), Rc::clone(store), def.conditions.clone())
            })
            .collect()
    }

    /// Interactables for every definition, each with its first interaction active.
    pub fn build_interactables(&self) -> Vec<Interactable> {
        self.interactables
            .iter()
            .map(|def| Interactable::new(def.name.clone(), def.interactions.clone()))
            .collect()
    }
}
