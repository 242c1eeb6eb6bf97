use std::path::Path;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use cx_api::Session;
use cx_core::CodexError;

use crate::tui_state::TuiUiState;
use crate::{
    boundary_after_choice, collect_boundary, load_session_from_state_for_story,
    save_session_state, TuiCommandContext,
};

pub(crate) const OPTION_VIEWPORT_ROWS: usize = 5;

/// Applies one key press. Returns `true` when the player asked to quit.
pub(crate) fn handle_key(
    key: KeyEvent,
    context: &TuiCommandContext<'_>,
    session: &mut Session,
    ui: &mut TuiUiState,
) -> Result<bool, CodexError> {
    if key.code == KeyCode::Esc || matches!(key.code, KeyCode::Char('q')) {
        return Ok(true);
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(true);
    }

    match key.code {
        KeyCode::Char('h') => {
            ui.help_visible = !ui.help_visible;
            return Ok(false);
        }
        KeyCode::Char('r') => {
            session.restart()?;
            ui.replace_boundary(collect_boundary(session)?);
            ui.status = "restarted".to_string();
            return Ok(false);
        }
        KeyCode::Char('s') => {
            save_session_state(
                Path::new(context.state_file),
                session,
                &context.story.id,
                context.seed,
            )?;
            ui.status = format!("saved to {}", context.state_file);
            return Ok(false);
        }
        KeyCode::Char('l') => {
            let (_state, resumed) =
                load_session_from_state_for_story(Path::new(context.state_file), context.story)?;
            *session = resumed;
            ui.replace_boundary(collect_boundary(session)?);
            ui.status = format!("loaded from {}", context.state_file);
            return Ok(false);
        }
        _ => {}
    }

    let typing_in_progress = ui.typing_in_progress();

    match key.code {
        KeyCode::Up => {
            if typing_in_progress {
                ui.status = "text streaming...".to_string();
                return Ok(false);
            }
            if ui.options.is_empty() {
                ui.status = "no options".to_string();
                return Ok(false);
            }
            ui.selected_option_index = ui.selected_option_index.saturating_sub(1);
            if ui.selected_option_index < ui.option_scroll_offset {
                ui.option_scroll_offset = ui.selected_option_index;
            }
        }
        KeyCode::Down => {
            if typing_in_progress {
                ui.status = "text streaming...".to_string();
                return Ok(false);
            }
            if ui.options.is_empty() {
                ui.status = "no options".to_string();
                return Ok(false);
            }
            let last = ui.options.len().saturating_sub(1);
            ui.selected_option_index = (ui.selected_option_index + 1).min(last);
            if ui.options.len() > OPTION_VIEWPORT_ROWS
                && ui.selected_option_index >= ui.option_scroll_offset + OPTION_VIEWPORT_ROWS
            {
                ui.option_scroll_offset = ui.selected_option_index - OPTION_VIEWPORT_ROWS + 1;
            }
        }
        KeyCode::Enter => {
            if typing_in_progress {
                ui.finish_typewriter();
                return Ok(false);
            }
            let Some(selected) = ui.selected_option() else {
                ui.status = "no options".to_string();
                return Ok(false);
            };
            let option_id = selected.id.clone();
            let outcome = session.choose(&option_id)?;
            let boundary = boundary_after_choice(session, outcome)?;
            ui.append_boundary(boundary);
            ui.status = format!("chose {}", option_id);
        }
        _ => {}
    }

    Ok(false)
}
