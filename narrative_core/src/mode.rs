//! Game mode tracking - gameplay input is off while a dialogue is open.

use std::cell::Cell;
use std::rc::Rc;

use game_state::SubscriptionId;

use crate::events::DialogueEvents;

/// What the player is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameMode {
    /// Free movement; gameplay input enabled.
    #[default]
    Play,
    /// In conversation; gameplay input disabled.
    Dialogue,
}

/// Follows dialogue open/close signals and reports the current mode.
pub struct ModeTracker {
    events: Rc<DialogueEvents>,
    mode: Rc<Cell<GameMode>>,
    opened: SubscriptionId,
    closed: SubscriptionId,
}

impl ModeTracker {
    /// Start in [`GameMode::Play`] and listen for dialogue signals.
    pub fn new(events: Rc<DialogueEvents>) -> Self {
        let mode = Rc::new(Cell::new(GameMode::Play));

        let on_open = Rc::clone(&mode);
        let opened = events.opened().subscribe(move |_| {
            on_open.set(GameMode::Dialogue);
            tracing::debug!("Entered dialogue mode");
        });

        let on_close = Rc::clone(&mode);
        let closed = events.closed().subscribe(move |_| {
            on_close.set(GameMode::Play);
            tracing::debug!("Entered play mode");
        });

        Self {
            events,
            mode,
            opened,
            closed,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode.get()
    }

    /// Whether gameplay (movement, interaction) input should be accepted.
    pub fn input_enabled(&self) -> bool {
        self.mode() == GameMode::Play
    }
}

impl Drop for ModeTracker {
    fn drop(&mut self) {
        self.events.opened().unsubscribe(self.opened);
        self.events.closed().unsubscribe(self.closed);
    }
}

impl std::fmt::Debug for ModeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeTracker").field("mode", &self.mode()).finish()
    }
}
