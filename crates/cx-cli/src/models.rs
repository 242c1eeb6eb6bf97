use std::path::PathBuf;

use cx_core::SaveState;
use cx_runtime::OptionView;
use serde::{Deserialize, Serialize};

pub(crate) const PLAYER_STATE_SCHEMA: &str = "codex-player.v1";
pub(crate) const STORY_REF_PREFIX: &str = "story-file:";
pub(crate) const DEFAULT_STORIES_DIR: &str = "stories";
pub(crate) const DEFAULT_STORY_NAME: &str = "main";
pub(crate) const DEFAULT_STATE_FILE: &str = ".codex/save.json";

#[derive(Debug, Clone)]
pub(crate) struct LoadedStory {
    /// `story-file:<absolute path>`, stored in player state files.
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) yaml: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayerState {
    pub(crate) schema_version: String,
    pub(crate) story_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) seed: Option<u32>,
    pub(crate) save: SaveState,
}

/// What the player sees after a step: the section plus anything the step said.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Boundary {
    pub(crate) section_id: String,
    pub(crate) title: String,
    pub(crate) text: String,
    pub(crate) options: Vec<OptionView>,
    pub(crate) notify: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) nav_error: Option<String>,
}

impl Boundary {
    /// A section with nothing left to choose.
    pub(crate) fn is_end(&self) -> bool {
        self.options.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TuiCommandAction {
    NotHandled,
    Continue,
    RefreshBoundary,
    Quit,
}

pub(crate) struct TuiCommandContext<'a> {
    pub(crate) state_file: &'a str,
    pub(crate) story: &'a LoadedStory,
    pub(crate) seed: Option<u32>,
}
