use std::sync::OnceLock;

use cx_core::{CodexError, StoryDoc};
use regex::Regex;

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex must compile")
    })
}

pub fn is_identifier(name: &str) -> bool {
    identifier_regex().is_match(name)
}

/// Checks the structural rules serde cannot express.
///
/// Event ids, hook ids and event parameters become interpreter names, so they
/// must be plain identifiers. Section and option ids only need to be non-empty.
pub fn validate_story_document(document: &StoryDoc) -> Result<(), CodexError> {
    if document.sections.is_empty() {
        return Err(CodexError::new(
            "PARSE_NO_SECTIONS",
            "Story must declare at least one section.",
        ));
    }

    for name in document.vars.keys() {
        require_identifier("variable", name)?;
    }
    for (event_id, event) in &document.events {
        require_identifier("event", event_id)?;
        for param in &event.params {
            require_identifier(&format!("parameter of event \"{}\"", event_id), param)?;
        }
    }
    for hook_id in document.hooks.keys() {
        require_identifier("hook", hook_id)?;
    }

    for (section_id, section) in &document.sections {
        if section_id.trim().is_empty() {
            return Err(CodexError::new(
                "PARSE_SECTION_ID",
                "Section id must not be empty.",
            ));
        }
        for option_id in section.options.keys() {
            if option_id.trim().is_empty() {
                return Err(CodexError::new(
                    "PARSE_OPTION_ID",
                    format!("Section \"{}\" has an option with an empty id.", section_id),
                ));
            }
        }
    }
    Ok(())
}

fn require_identifier(what: &str, name: &str) -> Result<(), CodexError> {
    if is_identifier(name) {
        return Ok(());
    }
    Err(CodexError::new(
        "PARSE_IDENTIFIER",
        format!("Invalid {} name \"{}\".", what, name),
    ))
}
