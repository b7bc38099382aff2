//! Dialogue engine - drives a script runtime one line at a time.
//!
//! The session is a small state machine:
//!
//! 1. **Closed**: no dialogue; [`DialogueEngine::start_dialogue`] opens one
//! 2. **Continuing**: a line without choices is shown; [`DialogueEngine::advance`] moves on
//! 3. **AwaitingChoice**: a line with choices is shown; [`DialogueEngine::select_choice`] picks one
//!
//! Each transition out of an open state runs one continuation step: blank
//! lines are skipped, the next line is parsed into a [`DialogueLine`] and
//! handed to the presenter, or the session closes when the story has
//! nothing left to say. Between steps the engine does nothing until the
//! host calls it again.

pub mod bridge;
mod line;

pub use line::*;

use std::rc::Rc;

use game_state::StateStore;

use crate::config::DialogueConfig;
use crate::error::DialogueError;
use crate::events::DialogueEvents;
use crate::runtime::ScriptRuntime;

/// Receives each dialogue line the engine produces.
pub trait DialoguePresenter {
    fn display(&mut self, line: &DialogueLine);
}

/// Where the current session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Continuing,
    AwaitingChoice { choice_count: usize },
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        !matches!(self, SessionState::Closed)
    }
}

/// Owns a script runtime and runs dialogue sessions on it.
pub struct DialogueEngine<R: ScriptRuntime, P: DialoguePresenter> {
    runtime: R,
    presenter: P,
    store: Rc<StateStore>,
    events: Rc<DialogueEvents>,
    config: DialogueConfig,
    state: SessionState,
}

impl<R: ScriptRuntime, P: DialoguePresenter> DialogueEngine<R, P> {
    /// Create an engine and bind the external function bridge on `runtime`.
    pub fn new(
        mut runtime: R,
        presenter: P,
        store: Rc<StateStore>,
        events: Rc<DialogueEvents>,
        config: DialogueConfig,
    ) -> Result<Self, DialogueError> {
        bridge::bind(&mut runtime, &store, &events)?;

        Ok(Self {
            runtime,
            presenter,
            store,
            events,
            config,
            state: SessionState::Closed,
        })
    }

    /// Open a session at `entry_path` and show its first line.
    ///
    /// If the path is empty of content the session opens and closes within
    /// this call. If the runtime rejects the path the session is closed again
    /// and the error returned.
    pub fn start_dialogue(&mut self, entry_path: &str) -> Result<(), DialogueError> {
        if self.state.is_open() {
            tracing::warn!(path = %entry_path, "Dialogue already open");
            return Err(DialogueError::AlreadyOpen);
        }

        self.open(entry_path);

        if let Err(err) = self.runtime.choose_path(entry_path) {
            tracing::warn!(path = %entry_path, error = %err, "Could not enter dialogue path");
            self.close();
            return Err(err.into());
        }

        self.continue_dialogue()
    }

    /// Move past a line that has no choices.
    pub fn advance(&mut self) -> Result<(), DialogueError> {
        match self.state {
            SessionState::Closed => Err(DialogueError::NotOpen),
            SessionState::AwaitingChoice { .. } => {
                tracing::warn!("Advance requested while a choice is pending");
                Err(DialogueError::ChoicePending)
            }
            SessionState::Continuing => self.continue_dialogue(),
        }
    }

    /// Resume the story along the choice at `index`.
    pub fn select_choice(&mut self, index: usize) -> Result<(), DialogueError> {
        let choice_count = match self.state {
            SessionState::Closed => return Err(DialogueError::NotOpen),
            SessionState::Continuing => return Err(DialogueError::NoChoices),
            SessionState::AwaitingChoice { choice_count } => choice_count,
        };

        if index >= choice_count {
            tracing::warn!(index, count = choice_count, "Choice index out of range");
            return Err(DialogueError::ChoiceOutOfRange {
                index,
                count: choice_count,
            });
        }

        self.runtime.choose_choice_index(index)?;
        // The runtime has consumed its choices.
        self.state = SessionState::Continuing;
        self.continue_dialogue()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn store(&self) -> &Rc<StateStore> {
        &self.store
    }

    pub fn events(&self) -> &Rc<DialogueEvents> {
        &self.events
    }

    fn open(&mut self, entry_path: &str) {
        self.state = SessionState::Continuing;
        tracing::debug!(path = %entry_path, "Dialogue opened");
        self.events.opened().emit(&());
    }

    fn close(&mut self) {
        self.state = SessionState::Closed;
        tracing::debug!("Dialogue closed");
        self.events.closed().emit(&());
    }

    /// One continuation step, looping over blank lines.
    fn continue_dialogue(&mut self) -> Result<(), DialogueError> {
        let line = loop {
            if !self.runtime.can_continue() {
                let choices = self.runtime.current_choices();
                if choices.is_empty() {
                    self.close();
                    return Ok(());
                }
                break DialogueLine::choices_only(number_choices(choices));
            }

            let raw = self.runtime.continue_line()?;
            if raw.trim().is_empty() {
                continue;
            }

            let mut line = self.build_line(&raw);
            line.choices = number_choices(self.runtime.current_choices());
            break line;
        };

        self.state = match line.choices.len() {
            0 => SessionState::Continuing,
            choice_count => SessionState::AwaitingChoice { choice_count },
        };
        self.presenter.display(&line);

        Ok(())
    }

    fn build_line(&self, raw: &str) -> DialogueLine {
        let parsed = parse_line(raw);
        if parsed.is_malformed() {
            tracing::warn!(
                line = %raw.trim(),
                separators = parsed.separators,
                "Dialogue line has more than one speaker separator; escape colons in text as `::`"
            );
        }

        let is_thought = self
            .runtime
            .current_tags()
            .iter()
            .any(|tag| tag.trim() == self.config.thought_tag);

        let text = if is_thought {
            emphasize(&parsed.text, &self.config.emphasis_open, &self.config.emphasis_close)
        } else {
            parsed.text
        };

        DialogueLine {
            speaker: parsed.speaker,
            text,
            choices: Vec::new(),
        }
    }
}

fn number_choices(texts: Vec<String>) -> Vec<Choice> {
    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Choice { text, index })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use crate::testing::{RecordingPresenter, ScriptedStory, StoryNode};
    use std::cell::Cell;

    type Engine = DialogueEngine<ScriptedStory, RecordingPresenter>;

    fn engine_with(story: ScriptedStory) -> (Engine, Rc<StateStore>, Rc<DialogueEvents>) {
        let store = Rc::new(StateStore::new());
        let events = Rc::new(DialogueEvents::new());
        let engine = DialogueEngine::new(
            story,
            RecordingPresenter::default(),
            Rc::clone(&store),
            Rc::clone(&events),
            DialogueConfig::default(),
        )
        .unwrap();
        (engine, store, events)
    }

    fn count(signal: &game_state::Signal<()>) -> Rc<Cell<u32>> {
        let hits = Rc::new(Cell::new(0));
        let hits_clone = Rc::clone(&hits);
        signal.subscribe(move |_| hits_clone.set(hits_clone.get() + 1));
        hits
    }

    fn guard_story() -> ScriptedStory {
        ScriptedStory::new()
            .knot(
                "guard",
                vec![
                    StoryNode::line("Guard: Halt! Who goes there?"),
                    StoryNode::choices(vec![
                        ("A friend.", "guard.friend"),
                        ("A traveller.", "guard.traveller"),
                        ("Nobody.", "guard.nobody"),
                    ]),
                ],
            )
            .knot("guard.friend", vec![StoryNode::line("Guard: Pass, friend.")])
            .knot("guard.traveller", vec![StoryNode::line("Guard: State your business.")])
            .knot("guard.nobody", vec![StoryNode::line("Guard: Very funny.")])
    }

    #[test]
    fn test_empty_path_opens_and_closes() {
        let (mut engine, _, events) = engine_with(ScriptedStory::new().knot("empty", vec![]));
        let opened = count(events.opened());
        let closed = count(events.closed());

        engine.start_dialogue("empty").unwrap();

        assert_eq!(opened.get(), 1);
        assert_eq!(closed.get(), 1);
        assert!(engine.presenter().lines.is_empty());
        assert_eq!(engine.state(), SessionState::Closed);
    }

    #[test]
    fn test_lines_then_close() {
        let story = ScriptedStory::new().knot(
            "intro",
            vec![
                StoryNode::line("Alice: Hello there"),
                StoryNode::line("The wind howls."),
            ],
        );
        let (mut engine, _, events) = engine_with(story);
        let closed = count(events.closed());

        engine.start_dialogue("intro").unwrap();
        assert_eq!(engine.state(), SessionState::Continuing);
        assert_eq!(engine.presenter().lines.len(), 1);
        assert_eq!(engine.presenter().lines[0].speaker.as_deref(), Some("Alice"));
        assert_eq!(engine.presenter().lines[0].text, "Hello there");

        engine.advance().unwrap();
        assert_eq!(engine.presenter().lines[1].speaker, None);
        assert_eq!(engine.presenter().lines[1].text, "The wind howls.");
        assert_eq!(closed.get(), 0);

        engine.advance().unwrap();
        assert_eq!(closed.get(), 1);
        assert!(!engine.is_open());
        assert_eq!(engine.presenter().lines.len(), 2);
    }

    #[test]
    fn test_three_choices_select_middle() {
        let (mut engine, _, _) = engine_with(guard_story());

        engine.start_dialogue("guard").unwrap();

        let line = engine.presenter().last().unwrap().clone();
        assert_eq!(line.text, "Halt! Who goes there?");
        assert_eq!(line.choices.len(), 3);
        assert_eq!(line.choices[1].text, "A traveller.");
        assert_eq!(line.choices[1].index, 1);
        assert_eq!(engine.state(), SessionState::AwaitingChoice { choice_count: 3 });

        engine.select_choice(1).unwrap();

        let line = engine.presenter().last().unwrap();
        assert_eq!(line.text, "State your business.");
        assert!(line.choices.is_empty());
        assert_eq!(engine.runtime().visited(), &["guard", "guard.traveller"]);
    }

    #[test]
    fn test_choice_contract() {
        let (mut engine, _, _) = engine_with(guard_story());

        assert_eq!(engine.select_choice(0), Err(DialogueError::NotOpen));
        assert_eq!(engine.advance(), Err(DialogueError::NotOpen));

        engine.start_dialogue("guard").unwrap();

        assert_eq!(engine.advance(), Err(DialogueError::ChoicePending));
        assert_eq!(
            engine.select_choice(3),
            Err(DialogueError::ChoiceOutOfRange { index: 3, count: 3 })
        );
        assert_eq!(engine.state(), SessionState::AwaitingChoice { choice_count: 3 });

        engine.select_choice(0).unwrap();
        assert_eq!(engine.select_choice(0), Err(DialogueError::NoChoices));
    }

    #[test]
    fn test_start_while_open_is_rejected() {
        let (mut engine, _, events) = engine_with(guard_story());
        let opened = count(events.opened());

        engine.start_dialogue("guard").unwrap();
        assert_eq!(engine.start_dialogue("guard"), Err(DialogueError::AlreadyOpen));
        assert_eq!(opened.get(), 1);
    }

    #[test]
    fn test_unknown_path_closes_again() {
        let (mut engine, _, events) = engine_with(guard_story());
        let closed = count(events.closed());

        let result = engine.start_dialogue("nowhere");

        assert!(matches!(result, Err(DialogueError::Runtime(_))));
        assert_eq!(closed.get(), 1);
        assert!(!engine.is_open());
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let mut nodes: Vec<StoryNode> = (0..500).map(|_| StoryNode::line("   ")).collect();
        nodes.push(StoryNode::line("Narrator: Finally."));
        let (mut engine, _, _) = engine_with(ScriptedStory::new().knot("quiet", nodes));

        engine.start_dialogue("quiet").unwrap();

        assert_eq!(engine.presenter().lines.len(), 1);
        assert_eq!(engine.presenter().lines[0].text, "Finally.");
    }

    #[test]
    fn test_trailing_blank_lines_close_session() {
        let story = ScriptedStory::new().knot(
            "short",
            vec![StoryNode::line("Hi."), StoryNode::line(""), StoryNode::line("\n")],
        );
        let (mut engine, _, events) = engine_with(story);
        let closed = count(events.closed());

        engine.start_dialogue("short").unwrap();
        engine.advance().unwrap();

        assert_eq!(closed.get(), 1);
        assert_eq!(engine.presenter().lines.len(), 1);
    }

    #[test]
    fn test_choices_without_text() {
        let story = ScriptedStory::new()
            .knot(
                "fork",
                vec![StoryNode::choices(vec![("Left", "fork.left"), ("Right", "fork.right")])],
            )
            .knot("fork.left", vec![StoryNode::line("You go left.")])
            .knot("fork.right", vec![StoryNode::line("You go right.")]);
        let (mut engine, _, _) = engine_with(story);

        engine.start_dialogue("fork").unwrap();

        let line = engine.presenter().last().unwrap();
        assert_eq!(line.speaker, None);
        assert_eq!(line.text, "");
        assert_eq!(line.choices.len(), 2);

        engine.select_choice(1).unwrap();
        assert_eq!(engine.presenter().last().unwrap().text, "You go right.");
    }

    #[test]
    fn test_thought_tag_emphasizes_text() {
        let story = ScriptedStory::new().knot(
            "inner",
            vec![
                StoryNode::tagged("Hero: hmm", &["thought"]),
                StoryNode::tagged("Hero: Let's go.", &["loud"]),
            ],
        );
        let (mut engine, _, _) = engine_with(story);

        engine.start_dialogue("inner").unwrap();
        engine.advance().unwrap();

        let lines = &engine.presenter().lines;
        assert_eq!(lines[0].speaker.as_deref(), Some("Hero"));
        assert_eq!(lines[0].text, "<i>hmm</i>");
        assert_eq!(lines[1].text, "Let's go.");
    }

    #[test]
    fn test_malformed_line_still_renders() {
        let story = ScriptedStory::new().knot("oops", vec![StoryNode::line("A: B: C")]);
        let (mut engine, _, _) = engine_with(story);

        engine.start_dialogue("oops").unwrap();

        let line = engine.presenter().last().unwrap();
        assert_eq!(line.speaker.as_deref(), Some("A"));
        assert_eq!(line.text, "B: C");
    }

    #[test]
    fn test_script_mutates_and_reads_state() {
        let story = ScriptedStory::new()
            .knot(
                "shop",
                vec![
                    StoryNode::call("Add_State", vec!["coins".into(), 5.into()]),
                    StoryNode::if_at_least("coins", 5, "shop.rich"),
                    StoryNode::line("Merchant: Come back with coin."),
                ],
            )
            .knot(
                "shop.rich",
                vec![
                    StoryNode::call("Unity_Event", vec!["shop_open".into()]),
                    StoryNode::line("Merchant: What will it be?"),
                ],
            );
        let (mut engine, store, events) = engine_with(story);

        let signals = Rc::new(std::cell::RefCell::new(Vec::new()));
        let signals_clone = Rc::clone(&signals);
        events
            .narrative()
            .subscribe(move |name| signals_clone.borrow_mut().push(name.clone()));

        engine.start_dialogue("shop").unwrap();

        assert_eq!(store.amount("coins"), 5);
        assert_eq!(*signals.borrow(), vec!["shop_open".to_string()]);
        assert_eq!(engine.presenter().last().unwrap().text, "What will it be?");
    }

    #[test]
    fn test_sessions_can_restart() {
        let (mut engine, _, events) = engine_with(guard_story());
        let opened = count(events.opened());
        let closed = count(events.closed());

        engine.start_dialogue("guard").unwrap();
        engine.select_choice(2).unwrap();
        engine.advance().unwrap();
        engine.start_dialogue("guard").unwrap();

        assert_eq!((opened.get(), closed.get()), (2, 1));
        assert_eq!(engine.presenter().lines.len(), 3);
    }

    #[test]
    fn test_custom_thought_markup() {
        let story =
            ScriptedStory::new().knot("inner", vec![StoryNode::tagged("dream", &["inner"])]);
        let config = DialogueConfig {
            thought_tag: "inner".to_string(),
            emphasis_open: "<em>".to_string(),
            emphasis_close: "</em>".to_string(),
        };
        let mut engine = DialogueEngine::new(
            story,
            RecordingPresenter::default(),
            Rc::new(StateStore::new()),
            Rc::new(DialogueEvents::new()),
            config,
        )
        .unwrap();

        engine.start_dialogue("inner").unwrap();
        assert_eq!(engine.presenter().last().unwrap().text, "<em>dream</em>");
    }

    #[test]
    fn test_runtime_failure_after_choice_can_be_advanced() {
        let story = ScriptedStory::new()
            .knot(
                "ask",
                vec![
                    StoryNode::line("A: before"),
                    StoryNode::choices(vec![("Yes.", "ask.yes"), ("No.", "ask.no")]),
                ],
            )
            .knot(
                "ask.yes",
                vec![StoryNode::fail("transient"), StoryNode::line("A: after")],
            )
            .knot("ask.no", vec![]);
        let (mut engine, _, _) = engine_with(story);

        engine.start_dialogue("ask").unwrap();
        assert_eq!(engine.state(), SessionState::AwaitingChoice { choice_count: 2 });

        assert_eq!(
            engine.select_choice(0),
            Err(DialogueError::Runtime(RuntimeError::Story("transient".to_string())))
        );
        assert_eq!(engine.state(), SessionState::Continuing);

        engine.advance().unwrap();
        assert_eq!(engine.presenter().last().unwrap().text, "after");
        assert_eq!(engine.presenter().lines.len(), 2);

        engine.advance().unwrap();
        assert!(!engine.is_open());
    }

    #[test]
    fn test_script_reports_do_not_interrupt_session() {
        let story = ScriptedStory::new().knot(
            "noisy",
            vec![
                StoryNode::report("remember to reword this", 0),
                StoryNode::report("careful", 1),
                StoryNode::report("bad", 2),
                StoryNode::line("Guard: Still here."),
            ],
        );
        let (mut engine, _, _) = engine_with(story);

        engine.start_dialogue("noisy").unwrap();

        assert_eq!(engine.state(), SessionState::Continuing);
        assert_eq!(engine.presenter().last().unwrap().text, "Still here.");
    }

    #[test]
    #[should_panic(expected = "unrecognised script error severity 7")]
    fn test_unknown_severity_from_story_panics() {
        let story = ScriptedStory::new().knot(
            "broken",
            vec![StoryNode::report("???", 7), StoryNode::line("never shown")],
        );
        let (mut engine, _, _) = engine_with(story);

        let _ = engine.start_dialogue("broken");
    }
}
