//! External function bridge between the script and the rest of the game.
//!
//! The script sees exactly three host functions:
//!
//! | Hook          | Arguments          | Returns | Effect                         |
//! |---------------|--------------------|---------|--------------------------------|
//! | `Unity_Event` | `name: string`     | -       | emits `name` on the narrative signal |
//! | `Get_State`   | `id: string`       | `int`   | counter amount, 0 if absent    |
//! | `Add_State`   | `id: string, amount: int` | - | `StateStore::add` with notification |

use std::rc::Rc;

use game_state::StateStore;

use crate::error::RuntimeError;
use crate::events::DialogueEvents;
use crate::runtime::{external_function, ErrorType, ScriptRuntime, ScriptValue};

pub const EVENT_HOOK: &str = "Unity_Event";
pub const GET_STATE_HOOK: &str = "Get_State";
pub const ADD_STATE_HOOK: &str = "Add_State";

/// Bind the three hooks and the error handler on `runtime`.
pub fn bind<R: ScriptRuntime>(
    runtime: &mut R,
    store: &Rc<StateStore>,
    events: &Rc<DialogueEvents>,
) -> Result<(), RuntimeError> {
    let signal_events = Rc::clone(events);
    runtime.bind_external_function(
        EVENT_HOOK,
        external_function(move |args| {
            expect_arg_count(EVENT_HOOK, args, 1)?;
            let name = string_arg(EVENT_HOOK, args, 0)?;
            tracing::debug!(signal = %name, "Narrative signal raised");
            signal_events.narrative().emit(&name.to_string());
            Ok(None)
        }),
    )?;

    let read_store = Rc::clone(store);
    runtime.bind_external_function(
        GET_STATE_HOOK,
        external_function(move |args| {
            expect_arg_count(GET_STATE_HOOK, args, 1)?;
            let id = string_arg(GET_STATE_HOOK, args, 0)?;
            Ok(Some(ScriptValue::Int(read_store.amount(id))))
        }),
    )?;

    let write_store = Rc::clone(store);
    runtime.bind_external_function(
        ADD_STATE_HOOK,
        external_function(move |args| {
            expect_arg_count(ADD_STATE_HOOK, args, 2)?;
            let id = string_arg(ADD_STATE_HOOK, args, 0)?;
            let amount = int_arg(ADD_STATE_HOOK, args, 1)?;
            write_store.add(id, amount);
            Ok(None)
        }),
    )?;

    runtime.set_error_handler(Box::new(handle_runtime_error));

    Ok(())
}

/// Route a runtime error report to the log.
///
/// Author annotations are dropped; warnings and errors are logged and the
/// session carries on.
///
/// # Panics
///
/// Panics on a severity code outside the known set. The runtime and this
/// bridge disagree about the severity enumeration and nothing sane can be
/// assumed about the report.
pub fn handle_runtime_error(message: &str, code: i32) {
    match ErrorType::try_from(code) {
        Ok(ErrorType::Author) => {}
        Ok(ErrorType::Warning) => tracing::warn!(target: "script", "{}", message),
        Ok(ErrorType::Error) => tracing::error!(target: "script", "{}", message),
        Err(code) => panic!("unrecognised script error severity {code}: {message}"),
    }
}

fn expect_arg_count(
    function: &str,
    args: &[ScriptValue],
    expected: usize,
) -> Result<(), RuntimeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeError::ArgumentCount {
            function: function.to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn string_arg<'a>(
    function: &str,
    args: &'a [ScriptValue],
    position: usize,
) -> Result<&'a str, RuntimeError> {
    args.get(position)
        .and_then(ScriptValue::as_str)
        .ok_or_else(|| RuntimeError::ArgumentType {
            function: function.to_string(),
            position,
            expected: "string",
        })
}

fn int_arg(function: &str, args: &[ScriptValue], position: usize) -> Result<i32, RuntimeError> {
    args.get(position)
        .and_then(ScriptValue::as_int)
        .ok_or_else(|| RuntimeError::ArgumentType {
            function: function.to_string(),
            position,
            expected: "int",
        })
}
