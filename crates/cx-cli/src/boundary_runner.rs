use cx_api::Session;
use cx_core::CodexError;

use crate::Boundary;

/// JSON string literal for `value`, used for every free-text protocol line.
pub(crate) fn json_text(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

pub(crate) fn collect_boundary(session: &mut Session) -> Result<Boundary, CodexError> {
    let view = session.view()?;
    Ok(Boundary {
        section_id: view.id,
        title: view.title,
        text: view.text,
        options: view.options,
        notify: None,
        message: None,
        nav_error: None,
    })
}

pub(crate) fn emit_boundary(boundary: Boundary, state_out: Option<String>) {
    println!("RESULT:OK");
    if boundary.is_end() {
        println!("EVENT:END");
    } else {
        println!("EVENT:OPTIONS");
    }

    if let Some(message) = &boundary.message {
        println!("MESSAGE_JSON:{}", json_text(message));
    }
    if let Some(notify) = &boundary.notify {
        println!("NOTIFY_JSON:{}", json_text(notify));
    }
    if let Some(nav_error) = &boundary.nav_error {
        println!("NAV_ERROR_JSON:{}", json_text(nav_error));
    }

    println!("SECTION:{}", boundary.section_id);
    println!("TITLE_JSON:{}", json_text(&boundary.title));
    println!("TEXT_JSON:{}", json_text(&boundary.text));

    for option in &boundary.options {
        println!("OPTION:{}|{}", option.id, json_text(&option.text));
    }

    println!(
        "STATE_OUT:{}",
        state_out.unwrap_or_else(|| "NONE".to_string())
    );
}

#[cfg(test)]
mod boundary_runner_tests {
    use super::*;
    use crate::cli_test_support::*;
    use crate::create_session_for_story;

    #[test]
    fn json_text_escapes_quotes_and_newlines() {
        assert_eq!(json_text("plain"), "\"plain\"");
        assert_eq!(json_text("say \"hi\"\nbye"), "\"say \\\"hi\\\"\\nbye\"");
    }

    #[test]
    fn collect_boundary_reads_the_current_section() {
        let root = temp_dir();
        let story = write_story(root.path(), "main", STORY_YAML);
        let mut session = create_session_for_story(&story, None, None).expect("session");

        let boundary = collect_boundary(&mut session).expect("boundary");
        assert_eq!(boundary.section_id, "start");
        assert_eq!(boundary.title, "Front Door");
        assert_eq!(boundary.text, "Coins: 2");
        assert_eq!(
            boundary
                .options
                .iter()
                .map(|option| option.id.as_str())
                .collect::<Vec<_>>(),
            vec!["onward", "cellar"]
        );
        assert!(!boundary.is_end());

        session.choose("onward").expect("onward");
        let boundary = collect_boundary(&mut session).expect("hall boundary");
        assert_eq!(boundary.section_id, "hall");
        assert!(boundary.is_end());
        emit_boundary(boundary, None);
    }
}
