use cx_core::{CodexError, ErrorKind};
use std::fmt::Display;

use crate::{json_text, LoadedStory};

fn map_error(code: &'static str, error: impl Display) -> CodexError {
    CodexError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: CodexError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!("ERROR_MSG_JSON:{}", json_text(&error.message));
    1
}

/// Names the story file in load failures. Code and location are kept, so
/// `ERROR_CODE` stays stable for callers matching on it.
pub(crate) fn map_story_load(story: &LoadedStory, error: CodexError) -> CodexError {
    if error.kind() != ErrorKind::Parse {
        return error;
    }
    CodexError {
        message: format!(
            "{} ({}): {}",
            story.name,
            story.path.display(),
            error.message
        ),
        ..error
    }
}

pub(crate) fn map_tui_io(error: std::io::Error) -> CodexError {
    map_error("TUI_IO", error)
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> CodexError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> CodexError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_state_write(error: std::io::Error) -> CodexError {
    map_error("CLI_STATE_WRITE", error)
}

pub(crate) fn map_cli_state_read(error: std::io::Error) -> CodexError {
    map_error("CLI_STATE_READ", error)
}

pub(crate) fn map_cli_state_invalid(error: serde_json::Error) -> CodexError {
    map_error("CLI_STATE_INVALID", error)
}

pub(crate) fn map_cli_state_encode(error: serde_json::Error) -> CodexError {
    map_error("CLI_STATE_ENCODE", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;
    use cx_core::SourceLocation;
    use std::path::PathBuf;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(CodexError::new("ERR", "failed"));
        assert_eq!(code, 1);
    }

    #[test]
    fn story_load_errors_name_the_file() {
        let story = LoadedStory {
            id: "story-file:/tmp/cave.yaml".to_string(),
            name: "cave".to_string(),
            path: PathBuf::from("/tmp/cave.yaml"),
            yaml: String::new(),
        };
        let parse = CodexError::with_location(
            "PARSE_YAML",
            "bad indent",
            SourceLocation { line: 4, column: 2 },
        );
        let mapped = map_story_load(&story, parse);
        assert_eq!(mapped.code, "PARSE_YAML");
        assert_eq!(mapped.message, "cave (/tmp/cave.yaml): bad indent");
        assert_eq!(mapped.location, Some(SourceLocation { line: 4, column: 2 }));

        let nav = map_story_load(&story, CodexError::new("NAV_SECTION_NOT_FOUND", "gone"));
        assert_eq!(nav.message, "gone");
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        assert_eq!(map_tui_io(std::io::Error::other("io")).code, "TUI_IO");
        assert_eq!(
            map_cli_source_path(std::io::Error::other("path")).code,
            "CLI_SOURCE_PATH"
        );
        assert_eq!(
            map_cli_source_read(std::io::Error::other("read")).code,
            "CLI_SOURCE_READ"
        );
        assert_eq!(
            map_cli_state_write(std::io::Error::other("write")).code,
            "CLI_STATE_WRITE"
        );
        assert_eq!(
            map_cli_state_read(std::io::Error::other("read")).code,
            "CLI_STATE_READ"
        );

        let invalid = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        let message = invalid.to_string();
        let mapped = map_cli_state_invalid(invalid);
        assert_eq!(mapped.code, "CLI_STATE_INVALID");
        assert_eq!(mapped.message, message);
    }
}
