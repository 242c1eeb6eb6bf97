use cx_core::{CodexError, SourceLocation, StoryDoc};
use serde_yaml::Value;

use crate::validate::validate_story_document;

/// Parses and validates a story document.
pub fn parse_story_document(source: &str) -> Result<StoryDoc, CodexError> {
    let value = parse_yaml_document(source)?;
    let document: StoryDoc = serde_yaml::from_value(value)
        .map_err(|error| CodexError::new("PARSE_DOCUMENT", error.to_string()))?;
    validate_story_document(&document)?;
    Ok(document)
}

/// Parses raw YAML and resolves `<<` merge keys so shared option or event
/// fragments can be anchored once and reused.
pub fn parse_yaml_document(source: &str) -> Result<Value, CodexError> {
    let mut value: Value = serde_yaml::from_str(source).map_err(map_yaml_error)?;
    if value.is_null() {
        return Err(CodexError::new(
            "PARSE_EMPTY",
            "Story document is empty.",
        ));
    }
    value.apply_merge().map_err(map_yaml_error)?;
    Ok(value)
}

fn map_yaml_error(error: serde_yaml::Error) -> CodexError {
    match error.location() {
        Some(location) => CodexError::with_location(
            "PARSE_YAML",
            error.to_string(),
            SourceLocation {
                line: location.line(),
                column: location.column(),
            },
        ),
        None => CodexError::new("PARSE_YAML", error.to_string()),
    }
}

#[cfg(test)]
mod yaml_tests {
    use super::*;
    use cx_core::{CxValue, OptionDoc};

    #[test]
    fn parse_story_document_reads_full_shape_in_document_order() {
        let doc = parse_story_document(
            r#"
title: The Cave
author: Someone
version: 1.5
vars:
  gold: 10
  bag: [torch, rope]
init: |
  let seen_bat = false;
events:
  use_item:
    params: [item]
    run: return "used " + item;
hooks:
  post_option:
    run: turns += 1;
sections:
  start:
    title: Entrance
    text: You stand at the mouth of a cave.
    options:
      enter: [Go inside, cave_entry]
      leave:
        text: Walk away
        goto: ending
        if: gold > 5
        flags: [once]
  cave_entry:
    text: Dark.
"#,
        )
        .expect("story should parse");

        assert_eq!(doc.title, "The Cave");
        assert_eq!(doc.author.as_deref(), Some("Someone"));
        assert_eq!(doc.version.as_deref(), Some("1.5"));
        assert_eq!(doc.vars.keys().collect::<Vec<_>>(), vec!["gold", "bag"]);
        assert_eq!(doc.vars["gold"], CxValue::Int(10));
        assert_eq!(doc.vars["bag"], CxValue::from(vec!["torch", "rope"]));
        assert_eq!(doc.events["use_item"].params, vec!["item".to_string()]);
        assert_eq!(
            doc.sections.keys().collect::<Vec<_>>(),
            vec!["start", "cave_entry"]
        );
        let options = &doc.sections["start"].options;
        assert_eq!(options.keys().collect::<Vec<_>>(), vec!["enter", "leave"]);
        assert!(matches!(options["enter"], OptionDoc::Pair(_, _)));
        let OptionDoc::Record(leave) = &options["leave"] else {
            panic!("leave should be a record");
        };
        assert_eq!(leave.condition.as_deref(), Some("gold > 5"));
    }

    #[test]
    fn merge_keys_are_applied_before_decoding() {
        let doc = parse_story_document(
            r#"
sections:
  start:
    text: Hub
    options:
      back: &back
        text: Go back
        goto: start
        flags: [not_first]
  side:
    text: Side room
    options:
      back:
        <<: *back
        text: Return to the hub
"#,
        )
        .expect("merge should resolve");
        let OptionDoc::Record(record) = &doc.sections["side"].options["back"] else {
            panic!("merged option should be a record");
        };
        assert_eq!(record.text, "Return to the hub");
        assert_eq!(record.goto.as_deref(), Some("start"));
        assert_eq!(record.flags, vec!["not_first".to_string()]);
    }

    #[test]
    fn syntax_errors_carry_location() {
        let error = parse_story_document("sections:\n  start: [unclosed\n")
            .expect_err("invalid yaml should fail");
        assert_eq!(error.code, "PARSE_YAML");
        assert!(error.location.is_some());
    }

    #[test]
    fn duplicate_section_ids_are_rejected() {
        let error = parse_story_document(
            "sections:\n  start:\n    text: a\n  start:\n    text: b\n",
        )
        .expect_err("duplicate keys should fail");
        assert_eq!(error.code, "PARSE_YAML");
    }

    #[test]
    fn empty_and_shapeless_documents_are_rejected() {
        assert_eq!(
            parse_story_document("").expect_err("empty").code,
            "PARSE_EMPTY"
        );
        assert_eq!(
            parse_story_document("title: No sections\n")
                .expect_err("missing sections")
                .code,
            "PARSE_DOCUMENT"
        );
    }
}
