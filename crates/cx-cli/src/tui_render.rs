#![cfg(not(coverage))]

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

use crate::tui_actions::OPTION_VIEWPORT_ROWS;
use crate::tui_state::TuiUiState;

const ELLIPSIS: &str = "…";

pub(crate) fn render_tui(frame: &mut Frame<'_>, ui: &TuiUiState, state_file: &str) {
    let terminal_width = frame.area().width as usize;
    let terminal_rows = frame.area().height as usize;

    let typing_in_progress = ui.typing_in_progress();
    let mut lines = ui.rendered_lines.clone();
    if let Some(typing) = &ui.typing_line {
        lines.push(typing.chars().take(ui.typing_chars).collect::<String>());
    }

    let content_width = (terminal_width.saturating_sub(2)).max(16);
    let wrapped_text_rows = lines
        .iter()
        .flat_map(|line| wrap_line_to_width(line, content_width))
        .collect::<Vec<_>>();

    let option_display_enabled = !typing_in_progress && !ui.options.is_empty();
    let option_header_text = if option_display_enabled {
        truncate_to_width("options (up/down + enter):", content_width)
    } else {
        String::new()
    };

    let mut reserved_rows = 3usize + 1usize + OPTION_VIEWPORT_ROWS + 1usize + 1usize;
    if ui.ended {
        reserved_rows += 1;
    }
    if ui.help_visible {
        reserved_rows += 1;
    }
    if !option_header_text.is_empty() {
        reserved_rows += 1;
    }
    let visible_text_rows = terminal_rows.saturating_sub(reserved_rows).max(1);
    let clipped_text_rows = if wrapped_text_rows.len() <= visible_text_rows {
        wrapped_text_rows
    } else {
        wrapped_text_rows[wrapped_text_rows.len() - visible_text_rows..].to_vec()
    };

    let option_text_width = content_width.saturating_sub(6).max(8);
    let visible_option_rows = (0..OPTION_VIEWPORT_ROWS)
        .map(|row_index| {
            let absolute_index = ui.option_scroll_offset + row_index;
            let Some(option) = ui
                .options
                .get(absolute_index)
                .filter(|_| option_display_enabled)
            else {
                return (" ".to_string(), false);
            };
            (
                format!(
                    "{}. {}",
                    absolute_index + 1,
                    truncate_to_width(option.text.as_str(), option_text_width)
                ),
                absolute_index == ui.selected_option_index,
            )
        })
        .collect::<Vec<_>>();

    let window_text = if option_display_enabled && ui.options.len() > OPTION_VIEWPORT_ROWS {
        truncate_to_width(
            format!(
                "window {}-{} / {}",
                ui.option_scroll_offset + 1,
                (ui.option_scroll_offset + OPTION_VIEWPORT_ROWS).min(ui.options.len()),
                ui.options.len()
            )
            .as_str(),
            content_width,
        )
    } else {
        " ".to_string()
    };

    let header_text = truncate_to_width(
        format!("{} | {}", ui.story_title, ui.section_title).as_str(),
        content_width,
    );
    let state_text = truncate_to_width(format!("state: {}", state_file).as_str(), content_width);
    let status_text = truncate_to_width(format!("status: {}", ui.status).as_str(), content_width);
    let divider_line = "─".repeat(content_width);
    let key_text = truncate_to_width(
        "keys: up/down move | enter choose/skip text | s save | l load | r restart | h help | q quit",
        content_width,
    );
    let help_text = truncate_to_width(
        "saves keep the section, story and section variables, visit counts and used options.",
        content_width,
    );

    let mut lines_out: Vec<Line<'_>> = Vec::new();
    lines_out.push(Line::from(header_text));
    lines_out.push(Line::from(Span::styled(
        state_text,
        Style::default().fg(Color::Gray),
    )));
    lines_out.push(Line::from(Span::styled(
        status_text,
        Style::default().fg(Color::Gray),
    )));
    for row in clipped_text_rows {
        lines_out.push(Line::from(row));
    }
    lines_out.push(Line::from(Span::styled(
        divider_line,
        Style::default().fg(Color::Gray),
    )));
    if !option_header_text.is_empty() {
        lines_out.push(Line::from(Span::styled(
            option_header_text,
            Style::default().fg(Color::Cyan),
        )));
    }
    for (text, selected) in visible_option_rows {
        let prefix = if selected { "> " } else { "  " };
        let style = if selected {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };
        lines_out.push(Line::from(Span::styled(
            format!("{}{}", prefix, text),
            style,
        )));
    }
    lines_out.push(Line::from(Span::styled(
        window_text,
        Style::default().fg(Color::Gray),
    )));
    if ui.ended {
        lines_out.push(Line::from(Span::styled(
            "[end] r restarts, l loads a save".to_string(),
            Style::default().fg(Color::Green),
        )));
    }
    lines_out.push(Line::from(Span::styled(
        key_text,
        Style::default().fg(Color::Yellow),
    )));
    if ui.help_visible {
        lines_out.push(Line::from(Span::styled(
            help_text,
            Style::default().fg(Color::Magenta),
        )));
    }

    let paragraph = Paragraph::new(lines_out).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, frame.area());
}

fn truncate_to_width(value: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let chars = value.chars().collect::<Vec<_>>();
    if chars.len() <= width {
        return value.to_string();
    }
    if width == 1 {
        return ELLIPSIS.to_string();
    }
    let mut out = chars.into_iter().take(width - 1).collect::<String>();
    out.push_str(ELLIPSIS);
    out
}

fn wrap_line_to_width(value: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![String::new()];
    }
    let chars = value.chars().collect::<Vec<_>>();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tui_render_tests {
    use super::*;
    use crate::cli_test_support::*;
    use crate::{collect_boundary, create_session_for_story};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn width_helpers_truncate_and_wrap_by_chars() {
        assert_eq!(truncate_to_width("lantern", 10), "lantern");
        assert_eq!(truncate_to_width("lantern", 4), "lan…");
        assert_eq!(truncate_to_width("lantern", 1), "…");
        assert_eq!(truncate_to_width("lantern", 0), "");
        assert_eq!(wrap_line_to_width("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(wrap_line_to_width("", 3), vec![String::new()]);
    }

    #[test]
    fn frame_shows_header_text_and_options() {
        let root = temp_dir();
        let story = write_story(root.path(), "main", STORY_YAML);
        let mut session = create_session_for_story(&story, None, None).expect("session");
        let mut ui = TuiUiState {
            story_title: session.story().title().to_string(),
            status: "ready".to_string(),
            ..TuiUiState::default()
        };
        ui.replace_boundary(collect_boundary(&mut session).expect("boundary"));
        ui.finish_typewriter();

        let mut terminal = Terminal::new(TestBackend::new(60, 20)).expect("terminal");
        terminal
            .draw(|frame| render_tui(frame, &ui, "save.json"))
            .expect("draw");
        let screen = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(screen.contains("Test House | Front Door"));
        assert!(screen.contains("Coins: 2"));
        assert!(screen.contains("> 1. Walk in"));
        assert!(screen.contains("2. Go down"));
    }
}
