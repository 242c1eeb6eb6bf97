use std::path::Path;

use cx_api::Session;
use cx_core::{CodexError, CxValue};

use crate::{
    boundary_after_choice, collect_boundary, create_session_for_story,
    emit_boundary_with_saved_state, load_session_from_state_for_ref, load_story_from_args,
    AgentArgs, AgentCommand, Boundary, ChooseArgs, StartArgs, TriggerArgs,
};

pub(super) fn run_agent(args: AgentArgs) -> Result<i32, CodexError> {
    match args.command {
        AgentCommand::Start(args) => run_start(args),
        AgentCommand::Choose(args) => run_choose(args),
        AgentCommand::Trigger(args) => run_trigger(args),
    }
}

pub(super) fn run_start(args: StartArgs) -> Result<i32, CodexError> {
    let story = load_story_from_args(&args.source)?;
    let mut session = create_session_for_story(&story, args.section, args.seed)?;

    let boundary = collect_boundary(&mut session)?;
    emit_boundary_with_saved_state(&session, boundary, &args.state_out, &story.id, args.seed)
}

pub(super) fn run_choose(args: ChooseArgs) -> Result<i32, CodexError> {
    run_state_transition(&args.state_in, &args.state_out, |session| {
        let outcome = session.choose(&args.option)?;
        boundary_after_choice(session, outcome)
    })
}

pub(super) fn run_trigger(args: TriggerArgs) -> Result<i32, CodexError> {
    let event_args = args
        .args
        .iter()
        .map(|raw| parse_event_arg(raw))
        .collect::<Vec<_>>();
    run_state_transition(&args.state_in, &args.state_out, |session| {
        let message = session.trigger(&args.event, &event_args);
        let mut boundary = collect_boundary(session)?;
        boundary.message = Some(message);
        Ok(boundary)
    })
}

/// `--arg 5` is a number, `--arg '["a"]'` a list, and `--arg lamp` plain text.
pub(crate) fn parse_event_arg(raw: &str) -> CxValue {
    serde_json::from_str::<CxValue>(raw).unwrap_or_else(|_| CxValue::from(raw))
}

fn run_state_transition(
    state_in: &str,
    state_out: &str,
    transition: impl FnOnce(&mut Session) -> Result<Boundary, CodexError>,
) -> Result<i32, CodexError> {
    let (story, state, mut session) = load_session_from_state_for_ref(Path::new(state_in))?;
    let boundary = transition(&mut session)?;
    emit_boundary_with_saved_state(&session, boundary, state_out, &story.id, state.seed)
}
