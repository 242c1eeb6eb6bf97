use cx_api::Session;
use cx_core::CodexError;

use crate::TuiCommandContext;

#[cfg(coverage)]
pub(super) fn run_tui_ratatui_mode(
    context: &TuiCommandContext<'_>,
    session: &mut Session,
) -> Result<i32, CodexError> {
    super::run_play_line_mode(context, session)
}

#[cfg(not(coverage))]
mod rich {
    use std::io;
    use std::time::{Duration, Instant};

    use crossterm::event::{self, Event, KeyEventKind};
    use crossterm::terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
    };
    use crossterm::ExecutableCommand;
    use cx_api::Session;
    use cx_core::CodexError;
    use ratatui::backend::CrosstermBackend;
    use ratatui::Terminal;

    use crate::tui_actions::handle_key;
    use crate::tui_render::render_tui;
    use crate::tui_state::TuiUiState;
    use crate::{collect_boundary, map_tui_io, TuiCommandContext};

    const TYPEWRITER_CHARS_PER_SECOND: usize = 60;
    const TYPEWRITER_TICK_MS: u64 = (1000 / TYPEWRITER_CHARS_PER_SECOND) as u64;

    struct TuiTerminal {
        terminal: Terminal<CrosstermBackend<io::Stdout>>,
    }

    impl TuiTerminal {
        fn new() -> Result<Self, CodexError> {
            enable_raw_mode().map_err(map_tui_io)?;
            io::stdout()
                .execute(EnterAlternateScreen)
                .map_err(map_tui_io)?;
            let backend = CrosstermBackend::new(io::stdout());
            let terminal = Terminal::new(backend).map_err(map_tui_io)?;
            Ok(Self { terminal })
        }

        fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<io::Stdout>> {
            &mut self.terminal
        }
    }

    impl Drop for TuiTerminal {
        fn drop(&mut self) {
            let _ = disable_raw_mode();
            let _ = io::stdout().execute(LeaveAlternateScreen);
        }
    }

    pub(super) fn run_tui_ratatui_mode(
        context: &TuiCommandContext<'_>,
        session: &mut Session,
    ) -> Result<i32, CodexError> {
        let mut terminal = TuiTerminal::new()?;
        let mut ui = TuiUiState {
            story_title: session.story().title().to_string(),
            status: "ready".to_string(),
            ..TuiUiState::default()
        };
        ui.replace_boundary(collect_boundary(session)?);

        let tick = Duration::from_millis(TYPEWRITER_TICK_MS);
        let mut last_tick = Instant::now();

        loop {
            terminal
                .terminal_mut()
                .draw(|frame| render_tui(frame, &ui, context.state_file))
                .map_err(map_tui_io)?;

            if last_tick.elapsed() >= tick && ui.advance_typewriter() {
                last_tick = Instant::now();
            }

            let timeout = tick.saturating_sub(last_tick.elapsed());
            if !event::poll(timeout).map_err(map_tui_io)? {
                continue;
            }

            let evt = event::read().map_err(map_tui_io)?;
            if let Event::Key(key) = evt {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let should_quit = match handle_key(key, context, session, &mut ui) {
                    Ok(should_quit) => should_quit,
                    Err(error) => {
                        log::warn!("Key handling failed: {}", error);
                        ui.status = error.message;
                        false
                    }
                };
                if should_quit {
                    break;
                }
            }
        }

        Ok(0)
    }
}

/// Full-screen player, or line mode when stdin/stdout is not a terminal.
#[cfg(not(coverage))]
pub(super) fn run_tui_ratatui_mode(
    context: &TuiCommandContext<'_>,
    session: &mut Session,
) -> Result<i32, CodexError> {
    use std::io::IsTerminal;

    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        log::info!("No terminal attached, falling back to line mode");
        return super::run_play_line_mode(context, session);
    }
    rich::run_tui_ratatui_mode(context, session)
}
