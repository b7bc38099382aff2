//! Process-wide dialogue signals.

use game_state::Signal;

/// Signals published by the dialogue engine.
///
/// Shared as `Rc<DialogueEvents>` between the engine and any number of
/// listeners (input gating, UI focus, gameplay triggers).
#[derive(Debug, Default)]
pub struct DialogueEvents {
    opened: Signal<()>,
    closed: Signal<()>,
    narrative: Signal<String>,
}

impl DialogueEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Published when a session opens, before the first line is shown.
    pub fn opened(&self) -> &Signal<()> {
        &self.opened
    }

    /// Published when a session reaches the end of its story path.
    pub fn closed(&self) -> &Signal<()> {
        &self.closed
    }

    /// Named signals raised by the script through the event hook.
    pub fn narrative(&self) -> &Signal<String> {
        &self.narrative
    }
}
