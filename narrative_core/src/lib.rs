//! # Narrative Core
//!
//! The dialogue side of the reactive narrative system. This crate drives a
//! branching-story runtime line by line, turns raw lines into structured
//! dialogue for the presentation layer, and bridges the script to the
//! `game_state` ledger.
//!
//! ## Core Components
//!
//! - **dialogue**: the session state machine, line parsing, and the external function bridge
//! - **runtime**: the trait the story interpreter is driven through
//! - **events**: process-wide dialogue opened/closed and narrative signals
//! - **mode**: play/dialogue mode tracking for input gating
//! - **interaction**: interaction chains that start dialogues or change state
//! - **config**: TOML configuration for dialogue, initial state, reactors, and interactables
//! - **testing**: an in-memory story runtime and a recording presenter
//!
//! ## Design Philosophy
//!
//! - **Injected**: the state store and event hub are constructed once and passed in
//! - **Event-Driven**: the engine reacts to continue/choice input and never blocks
//! - **Forgiving**: authoring mistakes degrade to a best-effort line plus a warning

pub mod config;
pub mod dialogue;
pub mod error;
pub mod events;
pub mod interaction;
pub mod mode;
pub mod runtime;
pub mod testing;

pub use config::*;
pub use dialogue::*;
pub use error::*;
pub use events::*;
pub use interaction::*;
pub use mode::*;
pub use runtime::*;
