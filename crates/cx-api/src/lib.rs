use cx_core::{CodexError, CxValue, SaveState, SAVE_STATE_SCHEMA};
use cx_runtime::story::RESTART_TARGET;
use cx_runtime::{OptionView, Story, StoryOptions};

#[derive(Debug, Clone)]
pub struct CreateSessionOptions {
    pub story_yaml: String,
    /// Section to enter first; defaults to the story's start section.
    pub start_section: Option<String>,
    pub random_seed: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ResumeSessionOptions {
    pub story_yaml: String,
    pub save: SaveState,
    pub random_seed: Option<u32>,
}

/// Everything a host needs to draw the current section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionView {
    pub id: String,
    pub title: String,
    pub text: String,
    pub visits: u32,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone)]
pub enum Navigation {
    /// The player is now in this section.
    Entered(String),
    /// The story was reloaded and the player is in its start section.
    Restarted(String),
    /// The resolved target does not exist; the player did not move.
    Blocked(CodexError),
}

#[derive(Debug, Clone)]
pub struct ChoiceOutcome {
    pub navigation: Navigation,
    pub notify: Option<String>,
    pub redirected: bool,
}

/// A player's cursor over a story: the loaded story, where the player is, and
/// the source needed to start over.
pub struct Session {
    story: Story,
    story_yaml: String,
    story_options: StoryOptions,
    current: String,
}

pub fn create_session_from_yaml(options: CreateSessionOptions) -> Result<Session, CodexError> {
    let story_options = StoryOptions {
        random_seed: options.random_seed,
    };
    let mut story = Story::parse(&options.story_yaml, story_options)?;
    let start = options
        .start_section
        .unwrap_or_else(|| story.start_section_id().to_string());
    story.visit(&start)?;

    Ok(Session {
        story,
        story_yaml: options.story_yaml,
        story_options,
        current: start,
    })
}

/// Reloads a story and puts the player back where the save says.
///
/// Saves that carry section progress get it back as written: visit counts,
/// hidden options and section namespaces, with the current section rebound
/// rather than re-entered. Older saves without it visit the saved section
/// instead. Either way the saved globals win over anything run code assigns,
/// and a saved dice state is restored last.
pub fn resume_session_from_yaml(options: ResumeSessionOptions) -> Result<Session, CodexError> {
    if options.save.schema_version != SAVE_STATE_SCHEMA {
        return Err(CodexError::new(
            "API_SAVE_SCHEMA_UNSUPPORTED",
            format!(
                "Save schema \"{}\" is not supported (expected \"{}\").",
                options.save.schema_version, SAVE_STATE_SCHEMA
            ),
        ));
    }

    let story_options = StoryOptions {
        random_seed: options.random_seed,
    };
    let mut story = Story::parse(&options.story_yaml, story_options)?;
    if story.title() != options.save.story_title {
        log::warn!(
            "Save was made for \"{}\" but the story is \"{}\"",
            options.save.story_title,
            story.title()
        );
    }
    if options.save.sections.is_empty() {
        story.visit(&options.save.section_id)?;
    } else {
        story.restore_section_states(&options.save.sections)?;
        story.rebind(&options.save.section_id)?;
    }
    story.set_state(&options.save.globals)?;
    if let Some(rng_state) = options.save.rng_state {
        story.restore_rng_state(rng_state);
    }

    Ok(Session {
        story,
        story_yaml: options.story_yaml,
        story_options,
        current: options.save.section_id,
    })
}

impl Session {
    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn story_mut(&mut self) -> &mut Story {
        &mut self.story
    }

    pub fn current_section_id(&self) -> &str {
        &self.current
    }

    pub fn view(&mut self) -> Result<SectionView, CodexError> {
        let text = self.story.section_text(&self.current)?;
        let options = self.story.available_options(&self.current)?;
        let section = self
            .story
            .section(&self.current)
            .ok_or_else(|| section_not_found(&self.current))?;
        Ok(SectionView {
            id: section.id().to_string(),
            title: section.title().to_string(),
            text,
            visits: section.visits(),
            options,
        })
    }

    /// Chooses one of the currently available options and follows it.
    pub fn choose(&mut self, option_id: &str) -> Result<ChoiceOutcome, CodexError> {
        let available = self.story.available_options(&self.current)?;
        if !available.iter().any(|option| option.id == option_id) {
            let exists = self
                .story
                .section(&self.current)
                .and_then(|section| section.option(option_id))
                .is_some();
            if exists {
                return Err(CodexError::new(
                    "NAV_OPTION_UNAVAILABLE",
                    format!(
                        "Option \"{}\" is not available in section \"{}\".",
                        option_id, self.current
                    ),
                ));
            }
        }

        let result = self.story.execute_option(&self.current, option_id)?;
        let navigation = if result.target == RESTART_TARGET {
            self.restart()?;
            Navigation::Restarted(self.current.clone())
        } else {
            match self.goto_section(&result.target) {
                Ok(()) => Navigation::Entered(self.current.clone()),
                Err(error) => {
                    log::warn!(
                        "Option {} leads nowhere, staying in {}: {}",
                        option_id,
                        self.current,
                        error
                    );
                    Navigation::Blocked(error)
                }
            }
        };

        Ok(ChoiceOutcome {
            navigation,
            notify: result.notify,
            redirected: result.redirected,
        })
    }

    /// Enters a section. On failure the current section is unchanged.
    pub fn goto_section(&mut self, section_id: &str) -> Result<(), CodexError> {
        self.story.visit(section_id)?;
        self.current = section_id.to_string();
        Ok(())
    }

    /// Reloads the story from source, discarding all play state, and enters
    /// the start section.
    pub fn restart(&mut self) -> Result<(), CodexError> {
        let mut story = Story::parse(&self.story_yaml, self.story_options)?;
        let start = story.start_section_id().to_string();
        story.visit(&start)?;
        log::info!("Restarted story \"{}\"", story.title());
        self.story = story;
        self.current = start;
        Ok(())
    }

    pub fn trigger(&mut self, event_id: &str, args: &[CxValue]) -> String {
        self.story.trigger(event_id, args)
    }

    pub fn save_state(&self) -> SaveState {
        SaveState {
            schema_version: SAVE_STATE_SCHEMA.to_string(),
            story_title: self.story.title().to_string(),
            section_id: self.current.clone(),
            globals: self.story.get_state(),
            sections: self.story.section_states(),
            rng_state: self.story.rng_state(),
        }
    }
}

fn section_not_found(section_id: &str) -> CodexError {
    CodexError::new(
        "NAV_SECTION_NOT_FOUND",
        format!("Section \"{}\" not found.", section_id),
    )
}
