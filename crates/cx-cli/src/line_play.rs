use std::io::{self, BufRead, Write};
use std::path::Path;

use cx_api::Session;
use cx_core::{CodexError, CxValue};

use crate::{
    boundary_after_choice, collect_boundary, load_session_from_state_for_story,
    map_cli_state_encode, map_tui_io, parse_event_arg, save_session_state, Boundary,
    TuiCommandAction, TuiCommandContext,
};

pub(crate) const LINE_HELP: &str =
    "commands: :help :save :load :restart :state :trigger <event> [args...] :quit";

pub(crate) fn run_play_line_mode(
    context: &TuiCommandContext<'_>,
    session: &mut Session,
) -> Result<i32, CodexError> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_play_line_mode_with_io(context, session, &mut reader, &mut writer)
}

pub(crate) fn run_play_line_mode_with_io(
    context: &TuiCommandContext<'_>,
    session: &mut Session,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, CodexError> {
    writeln!(writer, "{}", session.story().title()).map_err(map_tui_io)?;
    if let Some(author) = session.story().author() {
        writeln!(writer, "by {}", author).map_err(map_tui_io)?;
    }
    writeln!(writer, "{}", LINE_HELP).map_err(map_tui_io)?;

    let mut boundary = collect_boundary(session)?;
    loop {
        write_boundary(&boundary, writer)?;
        loop {
            let Some(raw) = prompt_input_from("> ", reader, writer)? else {
                return Ok(0);
            };
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let mut lines = Vec::new();
            let mut emit = |line: String| lines.push(line);
            let action = handle_line_cmd(raw, context, session, &mut emit);
            for line in lines {
                writeln!(writer, "{}", line).map_err(map_tui_io)?;
            }
            match action {
                Ok(TuiCommandAction::Continue) => continue,
                Ok(TuiCommandAction::RefreshBoundary) => {
                    boundary = collect_boundary(session)?;
                    break;
                }
                Ok(TuiCommandAction::Quit) => return Ok(0),
                Ok(TuiCommandAction::NotHandled) => {}
                Err(error) => {
                    writeln!(writer, "error: {}", error).map_err(map_tui_io)?;
                    continue;
                }
            }

            let Some(option_id) = resolve_option_choice(raw, &boundary) else {
                writeln!(writer, "no such option: {}", raw).map_err(map_tui_io)?;
                continue;
            };
            match session.choose(&option_id) {
                Ok(outcome) => {
                    boundary = boundary_after_choice(session, outcome)?;
                    break;
                }
                Err(error) => writeln!(writer, "error: {}", error).map_err(map_tui_io)?,
            }
        }
    }
}

/// Handles `:`-prefixed commands. Anything else is left to the caller.
pub(crate) fn handle_line_cmd(
    raw: &str,
    context: &TuiCommandContext<'_>,
    session: &mut Session,
    emit: &mut dyn FnMut(String),
) -> Result<TuiCommandAction, CodexError> {
    let mut words = raw.split_whitespace();
    let Some(command) = words.next().filter(|word| word.starts_with(':')) else {
        return Ok(TuiCommandAction::NotHandled);
    };

    match command {
        ":help" => {
            emit(LINE_HELP.to_string());
            Ok(TuiCommandAction::Continue)
        }
        ":save" => {
            save_session_state(
                Path::new(context.state_file),
                session,
                &context.story.id,
                context.seed,
            )?;
            emit(format!("saved: {}", context.state_file));
            Ok(TuiCommandAction::Continue)
        }
        ":load" => {
            let (_, resumed) =
                load_session_from_state_for_story(Path::new(context.state_file), context.story)?;
            *session = resumed;
            emit(format!("loaded: {}", context.state_file));
            Ok(TuiCommandAction::RefreshBoundary)
        }
        ":restart" => {
            session.restart()?;
            emit("restarted".to_string());
            Ok(TuiCommandAction::RefreshBoundary)
        }
        ":state" => {
            let globals = session.save_state().globals;
            emit(serde_json::to_string(&globals).map_err(map_cli_state_encode)?);
            Ok(TuiCommandAction::Continue)
        }
        ":trigger" => {
            let Some(event_id) = words.next() else {
                emit("usage: :trigger <event> [args...]".to_string());
                return Ok(TuiCommandAction::Continue);
            };
            let args = words.map(parse_event_arg).collect::<Vec<CxValue>>();
            emit(session.trigger(event_id, &args));
            Ok(TuiCommandAction::RefreshBoundary)
        }
        ":quit" => {
            emit("bye".to_string());
            Ok(TuiCommandAction::Quit)
        }
        other => {
            emit(format!("unknown command: {}", other));
            Ok(TuiCommandAction::Continue)
        }
    }
}

/// Accepts a 1-based option number or an option id.
pub(crate) fn resolve_option_choice(raw: &str, boundary: &Boundary) -> Option<String> {
    if let Ok(number) = raw.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|index| boundary.options.get(index))
            .map(|option| option.id.clone());
    }
    boundary
        .options
        .iter()
        .find(|option| option.id == raw)
        .map(|option| option.id.clone())
}

fn write_boundary(boundary: &Boundary, writer: &mut dyn Write) -> Result<(), CodexError> {
    writeln!(writer).map_err(map_tui_io)?;
    if let Some(message) = &boundary.message {
        writeln!(writer, "{}", message).map_err(map_tui_io)?;
    }
    if let Some(notify) = &boundary.notify {
        writeln!(writer, "* {}", notify).map_err(map_tui_io)?;
    }
    if let Some(nav_error) = &boundary.nav_error {
        writeln!(writer, "! {}", nav_error).map_err(map_tui_io)?;
    }
    writeln!(writer, "== {} ==", boundary.title).map_err(map_tui_io)?;
    writeln!(writer, "{}", boundary.text.trim_end()).map_err(map_tui_io)?;
    if boundary.is_end() {
        writeln!(writer, "[END]").map_err(map_tui_io)?;
    }
    for (index, option) in boundary.options.iter().enumerate() {
        writeln!(writer, "  [{}] {}", index + 1, option.text).map_err(map_tui_io)?;
    }
    Ok(())
}

/// Reads one line. `None` at end of input.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, CodexError> {
    write!(writer, "{}", prefix).map_err(map_tui_io)?;
    writer.flush().map_err(map_tui_io)?;
    let mut input = String::new();
    if reader.read_line(&mut input).map_err(map_tui_io)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
