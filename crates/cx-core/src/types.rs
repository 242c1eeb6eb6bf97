use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::value::{number_to_text, CxValue, StateMap};

pub const SAVE_STATE_SCHEMA: &str = "codex-save.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

/// Top level of a story document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryDoc {
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default, deserialize_with = "scalar_text")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub version: Option<String>,
    #[serde(default)]
    pub vars: IndexMap<String, CxValue>,
    #[serde(default)]
    pub init: Option<String>,
    #[serde(default)]
    pub events: IndexMap<String, EventDoc>,
    #[serde(default)]
    pub hooks: IndexMap<String, HookDoc>,
    pub sections: IndexMap<String, SectionDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDoc {
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub run: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookDoc {
    #[serde(default)]
    pub run: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDoc {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub vars: IndexMap<String, CxValue>,
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub options: IndexMap<String, OptionDoc>,
}

/// An option is either the compact `[text, goto]` pair or a full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionDoc {
    Pair(String, String),
    Record(OptionRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionRecord {
    pub text: String,
    #[serde(default)]
    pub goto: Option<String>,
    #[serde(default, rename = "if")]
    pub condition: Option<String>,
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub notify: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub hidden: bool,
}

/// Host-side save: where the player is, the declared global roster, and the
/// play state of every visited section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveState {
    pub schema_version: String,
    pub story_title: String,
    pub section_id: String,
    pub globals: StateMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sections: BTreeMap<String, SectionState>,
    /// Dice generator state at save time, so resumed play continues the
    /// sequence instead of replaying it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_state: Option<u32>,
}

/// Per-section play state kept in a save.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionState {
    pub visits: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hidden_options: Vec<String>,
    /// The section namespace (`s`) as a map.
    #[serde(default, skip_serializing_if = "StateMap::is_empty")]
    pub vars: StateMap,
}

fn untitled() -> String {
    "Untitled Story".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarText {
    Text(String),
    Number(f64),
    Bool(bool),
}

fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<ScalarText>::deserialize(deserializer)?;
    Ok(value.map(|value| match value {
        ScalarText::Text(text) => text,
        ScalarText::Number(number) => number_to_text(number),
        ScalarText::Bool(flag) => flag.to_string(),
    }))
}
