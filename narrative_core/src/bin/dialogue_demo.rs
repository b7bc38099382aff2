//! Console dialogue demo.
//!
//! Plays a short gatehouse conversation in the terminal. Press Enter to
//! continue and type a number to pick a choice. Set `RUST_LOG=debug` to see
//! state and session transitions.

use std::io::{self, BufRead, Write};
use std::rc::Rc;

use game_state::{ConditionReactor, ConditionSet};
use narrative_core::testing::{ScriptedStory, StoryNode};
use narrative_core::{
    DialogueEngine, DialogueEvents, DialogueLine, DialoguePresenter, GameConfig, Interactable,
    Interaction, InteractionAction, ModeTracker, SessionState,
};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
[[initial_state]]
id = "coins"
amount = 2

[[reactors]]
name = "gate_open"
conditions = [{ id = "gate_pass", amount = 1 }]
"#;

struct ConsolePresenter;

impl DialoguePresenter for ConsolePresenter {
    fn display(&mut self, line: &DialogueLine) {
        match &line.speaker {
            Some(speaker) => println!("{}: {}", speaker, line.text),
            None if !line.text.is_empty() => println!("{}", line.text),
            None => {}
        }
        for choice in &line.choices {
            println!("  [{}] {}", choice.index + 1, choice.text);
        }
    }
}

fn gatehouse() -> ScriptedStory {
    ScriptedStory::new()
        .knot(
            "guard.intro",
            vec![
                StoryNode::line("Guard: Halt! The gate is closed to strangers."),
                StoryNode::tagged(
                    "He looks at my purse. Two coins won't impress him.",
                    &["thought"],
                ),
                StoryNode::choices(vec![
                    ("Offer a bribe.", "guard.bribe"),
                    ("Ask about the lord.", "guard.lord"),
                    ("Leave.", "guard.leave"),
                ]),
            ],
        )
        .knot(
            "guard.bribe",
            vec![
                StoryNode::if_at_least("coins", 5, "guard.accept"),
                StoryNode::line("Guard: That's all? Keep it."),
            ],
        )
        .knot(
            "guard.accept",
            vec![
                StoryNode::call("Add_State", vec!["gate_pass".into(), 1.into()]),
                StoryNode::line("Guard: Go on, then."),
            ],
        )
        .knot(
            "guard.lord",
            vec![
                StoryNode::line("Guard: The lord pays well for news::good or bad."),
                StoryNode::call("Add_State", vec!["coins".into(), 3.into()]),
                StoryNode::call("Unity_Event", vec!["lord_mentioned".into()]),
                StoryNode::line("Guard: Here, for your trouble. Now try again."),
                StoryNode::divert("guard.intro"),
            ],
        )
        .knot("guard.leave", vec![])
        .knot(
            "guard.again",
            vec![
                StoryNode::line("Guard: You again?"),
                StoryNode::divert("guard.intro"),
            ],
        )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GameConfig::from_toml_str(CONFIG)?;
    let store = config.build_store();
    let events = Rc::new(DialogueEvents::new());
    let mode = ModeTracker::new(Rc::clone(&events));

    let mut reactors = config.build_reactors(&store);
    reactors.push(ConditionReactor::new(
        "rich",
        Rc::clone(&store),
        ConditionSet::new().with("coins", 5),
    ));
    let reactors: Vec<_> = reactors
        .into_iter()
        .map(|reactor| {
            let name = reactor.name().to_string();
            let lost = name.clone();
            let mut reactor = reactor
                .on_fulfilled(move || println!("  * {} is now fulfilled", name))
                .on_unfulfilled(move || println!("  * {} is no longer fulfilled", lost));
            reactor.activate();
            reactor
        })
        .collect();

    events
        .narrative()
        .subscribe(|name| println!("  * signal: {}", name));

    let mut engine = DialogueEngine::new(
        gatehouse(),
        ConsolePresenter,
        Rc::clone(&store),
        Rc::clone(&events),
        config.dialogue.clone(),
    )?;

    let mut guard = Interactable::new(
        "guard",
        vec![
            Interaction::new(InteractionAction::StartDialogue("guard.intro".into())).then(1),
            Interaction::new(InteractionAction::StartDialogue("guard.again".into())),
        ],
    );

    let stdin = io::stdin();
    let mut input = String::new();

    for visit in 0..2 {
        println!("-- talking to the guard (visit {}) --", visit + 1);
        if let Some(action) = guard.interact() {
            action.perform(&mut engine)?;
        }

        while engine.is_open() {
            print!("> ");
            io::stdout().flush()?;

            input.clear();
            if stdin.lock().read_line(&mut input)? == 0 {
                return Ok(());
            }

            let result = match engine.state() {
                SessionState::AwaitingChoice { .. } => match input.trim().parse::<usize>() {
                    Ok(number) if number > 0 => engine.select_choice(number - 1),
                    _ => {
                        println!("Pick a choice by number.");
                        continue;
                    }
                },
                _ => engine.advance(),
            };

            if let Err(err) = result {
                println!("{}", err);
            }
        }

        println!("(mode: {:?}, input enabled: {})", mode.mode(), mode.input_enabled());
    }

    println!("-- final state --");
    for counter in store.counters() {
        println!("{} = {}", counter.id, counter.amount);
    }
    for reactor in &reactors {
        let status = if reactor.is_fulfilled() {
            "fulfilled"
        } else {
            "unfulfilled"
        };
        println!("{}: {}", reactor.name(), status);
    }

    Ok(())
}
