use crate::Boundary;

#[derive(Debug, Clone)]
pub(crate) struct OptionRow {
    pub(crate) id: String,
    pub(crate) text: String,
}

#[derive(Debug, Default)]
pub(crate) struct TuiUiState {
    pub(crate) story_title: String,
    pub(crate) section_title: String,
    pub(crate) rendered_lines: Vec<String>,
    pub(crate) pending_lines: Vec<String>,
    pub(crate) typing_line: Option<String>,
    pub(crate) typing_chars: usize,
    pub(crate) options: Vec<OptionRow>,
    pub(crate) selected_option_index: usize,
    pub(crate) option_scroll_offset: usize,
    pub(crate) ended: bool,
    pub(crate) help_visible: bool,
    pub(crate) status: String,
}

/// Lines a boundary contributes to the text pane: step messages first, then
/// the section heading and body.
pub(crate) fn boundary_lines(boundary: &Boundary) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(message) = &boundary.message {
        lines.push(message.clone());
    }
    if let Some(notify) = &boundary.notify {
        lines.push(format!("* {}", notify));
    }
    if let Some(nav_error) = &boundary.nav_error {
        lines.push(format!("! {}", nav_error));
    }
    lines.push(format!("== {} ==", boundary.title));
    lines.extend(boundary.text.trim_end().lines().map(str::to_string));
    lines
}

impl TuiUiState {
    pub(crate) fn typing_in_progress(&self) -> bool {
        self.typing_line.is_some() || !self.pending_lines.is_empty()
    }

    pub(crate) fn set_boundary_state(&mut self, boundary: Boundary) {
        self.section_title = boundary.title;
        self.ended = boundary.options.is_empty();
        self.options = boundary
            .options
            .into_iter()
            .map(|option| OptionRow {
                id: option.id,
                text: option.text,
            })
            .collect();
        self.selected_option_index = 0;
        self.option_scroll_offset = 0;
    }

    pub(crate) fn append_boundary(&mut self, boundary: Boundary) {
        self.pending_lines.push(String::new());
        self.pending_lines.extend(boundary_lines(&boundary));
        self.set_boundary_state(boundary);
    }

    pub(crate) fn replace_boundary(&mut self, boundary: Boundary) {
        self.rendered_lines.clear();
        self.pending_lines = boundary_lines(&boundary);
        self.typing_line = None;
        self.typing_chars = 0;
        self.set_boundary_state(boundary);
    }

    pub(crate) fn advance_typewriter(&mut self) -> bool {
        let Some(line) = self.typing_line.take() else {
            if self.pending_lines.is_empty() {
                return false;
            }
            let next_line = self.pending_lines.remove(0);
            if next_line.is_empty() {
                self.rendered_lines.push(next_line);
                return true;
            }
            self.typing_line = Some(next_line);
            self.typing_chars = 1;
            return true;
        };

        if self.typing_chars >= line.chars().count() {
            self.rendered_lines.push(line);
            self.typing_chars = 0;
            return true;
        }
        self.typing_chars += 1;
        self.typing_line = Some(line);
        true
    }

    /// Shows everything still queued at once.
    pub(crate) fn finish_typewriter(&mut self) {
        if let Some(line) = self.typing_line.take() {
            self.rendered_lines.push(line);
        }
        self.rendered_lines.append(&mut self.pending_lines);
        self.typing_chars = 0;
    }

    pub(crate) fn selected_option(&self) -> Option<&OptionRow> {
        self.options.get(self.selected_option_index)
    }
}

#[cfg(test)]
mod tui_state_tests {
    use super::*;
    use cx_runtime::OptionView;

    fn boundary(title: &str, text: &str, options: &[(&str, &str)]) -> Boundary {
        Boundary {
            section_id: title.to_lowercase(),
            title: title.to_string(),
            text: text.to_string(),
            options: options
                .iter()
                .map(|(id, text)| OptionView {
                    id: id.to_string(),
                    text: text.to_string(),
                })
                .collect(),
            ..Boundary::default()
        }
    }

    #[test]
    fn typewriter_reveals_one_char_per_tick() {
        let mut ui = TuiUiState::default();
        ui.replace_boundary(boundary("Hall", "ab", &[("go", "Go")]));
        assert!(ui.typing_in_progress());
        assert_eq!(ui.pending_lines, vec!["== Hall ==", "ab"]);

        while ui.rendered_lines.is_empty() {
            assert!(ui.advance_typewriter());
        }
        assert_eq!(ui.rendered_lines, vec!["== Hall =="]);

        assert!(ui.advance_typewriter());
        assert_eq!(ui.typing_line.as_deref(), Some("ab"));
        assert_eq!(ui.typing_chars, 1);
        assert!(ui.advance_typewriter());
        assert!(ui.advance_typewriter());
        assert_eq!(ui.rendered_lines, vec!["== Hall ==", "ab"]);
        assert!(!ui.advance_typewriter());
        assert!(!ui.typing_in_progress());
    }

    #[test]
    fn append_keeps_history_and_replace_clears_it() {
        let mut ui = TuiUiState::default();
        ui.replace_boundary(boundary("Hall", "first", &[("go", "Go")]));
        ui.finish_typewriter();
        assert_eq!(ui.rendered_lines.len(), 2);

        let mut next = boundary("Yard", "second", &[]);
        next.notify = Some("You step outside.".to_string());
        ui.append_boundary(next);
        ui.finish_typewriter();
        assert_eq!(
            ui.rendered_lines,
            vec![
                "== Hall ==",
                "first",
                "",
                "* You step outside.",
                "== Yard ==",
                "second"
            ]
        );
        assert!(ui.ended);
        assert!(ui.selected_option().is_none());

        ui.replace_boundary(boundary("Hall", "again", &[("go", "Go")]));
        ui.finish_typewriter();
        assert_eq!(ui.rendered_lines, vec!["== Hall ==", "again"]);
        assert_eq!(ui.selected_option().map(|row| row.id.as_str()), Some("go"));
    }
}
