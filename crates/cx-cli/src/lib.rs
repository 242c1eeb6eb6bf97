use std::ffi::OsString;

use clap::Parser;
use cx_core::CodexError;

mod agent;
mod boundary_runner;
mod cli_args;
mod error_map;
mod line_play;
mod logger;
mod models;
mod session_ops;
mod source_loader;
mod state_store;
mod tui;
mod tui_actions;
mod tui_render;
mod tui_state;

pub(crate) use agent::parse_event_arg;
pub(crate) use boundary_runner::{collect_boundary, emit_boundary, json_text};
pub(crate) use cli_args::{
    AgentArgs, AgentCommand, ChooseArgs, Cli, ListArgs, Mode, PlayArgs, SourceArgs, StartArgs,
    TriggerArgs,
};
pub(crate) use error_map::{
    emit_error, map_cli_source_path, map_cli_source_read, map_cli_state_encode,
    map_cli_state_invalid, map_cli_state_read, map_cli_state_write, map_story_load, map_tui_io,
};
pub(crate) use line_play::run_play_line_mode;
pub(crate) use models::{
    Boundary, LoadedStory, PlayerState, TuiCommandAction, TuiCommandContext,
    DEFAULT_STATE_FILE, DEFAULT_STORIES_DIR, DEFAULT_STORY_NAME, PLAYER_STATE_SCHEMA,
    STORY_REF_PREFIX,
};
pub(crate) use session_ops::{
    boundary_after_choice, create_session_for_story, emit_boundary_with_saved_state,
    load_session_from_state_for_ref, load_session_from_state_for_story, save_session_state,
};
pub(crate) use source_loader::{
    load_story_by_ref, load_story_from_args, resolve_stories_dir, scan_story_files,
};
pub(crate) use state_store::{load_player_state, save_player_state};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    if let Err(error) = logger::init_logger(&cli.log_level) {
        return emit_error(error);
    }
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, CodexError> {
    match cli.command {
        Mode::Agent(args) => agent::run_agent(args),
        Mode::Play(args) => run_player(args, false),
        Mode::Tui(args) => run_player(args, true),
        Mode::List(args) => run_list(args),
    }
}

fn run_player(args: PlayArgs, full_screen: bool) -> Result<i32, CodexError> {
    let state_file = args
        .state_file
        .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());
    let story = load_story_from_args(&args.source)?;
    let mut session = create_session_for_story(&story, None, args.seed)?;
    let context = TuiCommandContext {
        state_file: &state_file,
        story: &story,
        seed: args.seed,
    };

    if full_screen {
        tui::run_tui_ratatui_mode(&context, &mut session)
    } else {
        run_play_line_mode(&context, &mut session)
    }
}

fn run_list(args: ListArgs) -> Result<i32, CodexError> {
    let root = resolve_stories_dir(&args.stories_dir)?;
    println!("RESULT:OK");
    for (name, path) in scan_story_files(&root) {
        let relative = path.strip_prefix(&root).unwrap_or(&path);
        println!("STORY:{}|{}", name, json_text(&relative.to_string_lossy()));
    }
    Ok(0)
}
