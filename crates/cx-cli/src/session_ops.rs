use std::path::Path;

use cx_api::{
    create_session_from_yaml, resume_session_from_yaml, ChoiceOutcome, CreateSessionOptions,
    Navigation, ResumeSessionOptions, Session,
};
use cx_core::CodexError;

use crate::{
    collect_boundary, emit_boundary, load_player_state, load_story_by_ref, map_story_load,
    save_player_state, Boundary, LoadedStory, PlayerState, PLAYER_STATE_SCHEMA,
};

pub(crate) fn create_session_for_story(
    story: &LoadedStory,
    start_section: Option<String>,
    seed: Option<u32>,
) -> Result<Session, CodexError> {
    create_session_from_yaml(CreateSessionOptions {
        story_yaml: story.yaml.clone(),
        start_section,
        random_seed: seed,
    })
    .map_err(|error| map_story_load(story, error))
}

pub(crate) fn resume_session_for_state(
    story: &LoadedStory,
    state: &PlayerState,
) -> Result<Session, CodexError> {
    resume_session_from_yaml(ResumeSessionOptions {
        story_yaml: story.yaml.clone(),
        save: state.save.clone(),
        random_seed: state.seed,
    })
    .map_err(|error| map_story_load(story, error))
}

pub(crate) fn save_session_state(
    path: &Path,
    session: &Session,
    story_ref: &str,
    seed: Option<u32>,
) -> Result<(), CodexError> {
    let state = PlayerState {
        schema_version: PLAYER_STATE_SCHEMA.to_string(),
        story_ref: story_ref.to_string(),
        seed,
        save: session.save_state(),
    };
    save_player_state(path, &state)
}

pub(crate) fn load_session_from_state_for_ref(
    path: &Path,
) -> Result<(LoadedStory, PlayerState, Session), CodexError> {
    let state = load_player_state(path)?;
    let story = load_story_by_ref(&state.story_ref)?;
    let session = resume_session_for_state(&story, &state)?;
    Ok((story, state, session))
}

pub(crate) fn load_session_from_state_for_story(
    path: &Path,
    story: &LoadedStory,
) -> Result<(PlayerState, Session), CodexError> {
    let state = load_player_state(path)?;
    if state.story_ref != story.id {
        return Err(CodexError::new(
            "TUI_STATE_STORY_MISMATCH",
            format!(
                "State story mismatch. expected={} actual={}",
                story.id, state.story_ref
            ),
        ));
    }
    let session = resume_session_for_state(story, &state)?;
    Ok((state, session))
}

/// Folds a choice outcome into the boundary shown afterwards.
pub(crate) fn boundary_after_choice(
    session: &mut Session,
    outcome: ChoiceOutcome,
) -> Result<Boundary, CodexError> {
    let mut boundary = collect_boundary(session)?;
    boundary.notify = outcome.notify;
    if let Navigation::Blocked(error) = outcome.navigation {
        boundary.nav_error = Some(error.message);
    }
    Ok(boundary)
}

pub(crate) fn emit_boundary_with_saved_state(
    session: &Session,
    boundary: Boundary,
    state_out: &str,
    story_ref: &str,
    seed: Option<u32>,
) -> Result<i32, CodexError> {
    save_session_state(Path::new(state_out), session, story_ref, seed)?;
    emit_boundary(boundary, Some(state_out.to_string()));
    Ok(0)
}
