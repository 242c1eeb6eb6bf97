mod context;
mod option;
mod section;
mod substitute;

pub use context::{
    event_function, hook_function, section_namespace, EffectOutcome, ScriptContext,
    POST_OPTION_HOOK, REDIRECT_NAME, SCRATCH_NAME, SECTION_ALIAS,
};
pub use option::{
    OptionResult, SectionOption, FLAG_FIRST, FLAG_NOT_FIRST, FLAG_ONCE, RESTART_TARGET,
    SELF_TARGET,
};
pub use section::Section;
pub use substitute::substitute;

use std::collections::BTreeMap;

use cx_core::{CodexError, CxValue, SectionState, StateMap, StoryDoc};
use cx_parser::parse_story_document;
use indexmap::IndexMap;

use crate::script::{RhaiScriptEngine, ScriptEngine};

pub const DEFAULT_START_SECTION: &str = "start";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoryOptions {
    /// Seed for the dice helpers. `None` seeds from the clock.
    pub random_seed: Option<u32>,
}

/// An option as a host shows it: id plus expanded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub id: String,
    pub text: String,
}

/// An option whose static target names no section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingTarget {
    pub section_id: String,
    pub option_id: String,
    pub target: String,
}

/// A loaded story: the section graph plus the interpreter holding its state.
pub struct Story {
    title: String,
    author: Option<String>,
    version: Option<String>,
    vars: Vec<String>,
    events: IndexMap<String, Vec<String>>,
    hooks: Vec<String>,
    sections: IndexMap<String, Section>,
    context: ScriptContext,
}

impl Story {
    pub fn parse(source: &str, options: StoryOptions) -> Result<Self, CodexError> {
        let document = parse_story_document(source)?;
        let engine = match options.random_seed {
            Some(seed) => RhaiScriptEngine::with_seed(seed),
            None => RhaiScriptEngine::new(),
        };
        Self::from_document(document, Box::new(engine))
    }

    /// Builds a story on any engine. Registration happens in a fixed order:
    /// globals, helpers, reserved bindings, init code, events, hooks, sections.
    pub fn from_document(
        document: StoryDoc,
        engine: Box<dyn ScriptEngine>,
    ) -> Result<Self, CodexError> {
        if !engine.is_ready() {
            return Err(CodexError::new(
                "PARSE_ENGINE_UNAVAILABLE",
                "Script engine is not ready.",
            ));
        }
        let mut context = ScriptContext::new(engine);

        for (name, value) in &document.vars {
            context
                .engine_mut()
                .set_global(name, value.clone())
                .map_err(|error| load_error("PARSE_VARS", &format!("Variable {}", name), error))?;
        }
        context
            .engine_mut()
            .install_builtins()
            .map_err(|error| load_error("PARSE_BUILTINS", "Helper routines", error))?;
        context
            .prime()
            .map_err(|error| load_error("PARSE_BUILTINS", "Reserved bindings", error))?;

        if let Some(init) = document.init.as_deref().filter(|init| !init.trim().is_empty()) {
            context
                .engine_mut()
                .execute(init)
                .map_err(|error| load_error("PARSE_INIT", "Init code", error))?;
        }

        let mut events = IndexMap::new();
        for (event_id, event) in &document.events {
            context
                .engine_mut()
                .define_function(&event_function(event_id), &event.params, &event.run)
                .map_err(|error| load_error("PARSE_EVENT", &format!("Event {}", event_id), error))?;
            events.insert(event_id.clone(), event.params.clone());
        }

        let mut hooks = Vec::new();
        for (hook_id, hook) in &document.hooks {
            context
                .engine_mut()
                .define_function(&hook_function(hook_id), &[], &hook.run)
                .map_err(|error| load_error("PARSE_HOOK", &format!("Hook {}", hook_id), error))?;
            hooks.push(hook_id.clone());
        }

        let mut sections = IndexMap::new();
        for (section_id, section_doc) in &document.sections {
            let section = Section::parse(section_id, section_doc);
            context
                .init_section_namespace(section_id, section.local_vars())
                .map_err(|error| {
                    load_error("PARSE_SECTION", &format!("Section {}", section_id), error)
                })?;
            sections.insert(section_id.clone(), section);
        }

        let story = Self {
            title: document.title,
            author: document.author,
            version: document.version,
            vars: document.vars.keys().cloned().collect(),
            events,
            hooks,
            sections,
            context,
        };
        for dangling in story.dangling_targets() {
            log::warn!(
                "Option {}.{} points at unknown section \"{}\"",
                dangling.section_id,
                dangling.option_id,
                dangling.target
            );
        }
        log::info!(
            "Loaded story \"{}\" with {} section(s), {} event(s), {} hook(s)",
            story.title,
            story.sections.len(),
            story.events.len(),
            story.hooks.len()
        );
        Ok(story)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Declared global variables, the persistence roster.
    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    pub fn event_params(&self, event_id: &str) -> Option<&[String]> {
        self.events.get(event_id).map(Vec::as_slice)
    }

    pub fn hooks(&self) -> &[String] {
        &self.hooks
    }

    pub fn section_ids(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.get(section_id)
    }

    pub fn has_section(&self, section_id: &str) -> bool {
        self.sections.contains_key(section_id)
    }

    /// `start` when present, otherwise the first section written.
    pub fn start_section_id(&self) -> &str {
        if self.sections.contains_key(DEFAULT_START_SECTION) {
            return DEFAULT_START_SECTION;
        }
        self.sections
            .keys()
            .next()
            .map(String::as_str)
            .unwrap_or(DEFAULT_START_SECTION)
    }

    pub fn dangling_targets(&self) -> Vec<DanglingTarget> {
        let mut dangling = Vec::new();
        for section in self.sections.values() {
            for option in section.all_options() {
                let target = option.target();
                if target == RESTART_TARGET || self.sections.contains_key(target) {
                    continue;
                }
                dangling.push(DanglingTarget {
                    section_id: section.id().to_string(),
                    option_id: option.id().to_string(),
                    target: target.to_string(),
                });
            }
        }
        dangling
    }

    pub fn context(&self) -> &ScriptContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ScriptContext {
        &mut self.context
    }

    /// Borrows the section table and the interpreter at the same time, for
    /// hosts that drive sections and options directly.
    pub fn split_mut(&mut self) -> (&IndexMap<String, Section>, &mut ScriptContext) {
        (&self.sections, &mut self.context)
    }

    /// Snapshot of the declared globals, and only those.
    pub fn get_state(&self) -> StateMap {
        let mut state = StateMap::new();
        for name in &self.vars {
            let value = self.context.engine().get_global(name).unwrap_or_else(|error| {
                log::warn!("Global {} could not be saved: {}", name, error);
                CxValue::Nil
            });
            state.insert(name.clone(), value);
        }
        state
    }

    /// Restores declared globals present in `state`. Other keys are ignored.
    pub fn set_state(&mut self, state: &StateMap) -> Result<(), CodexError> {
        for name in &self.vars {
            if let Some(value) = state.get(name) {
                self.context.engine_mut().set_global(name, value.clone())?;
            }
        }
        Ok(())
    }

    /// Progress of every visited section: visit count, hidden options and
    /// the section namespace.
    pub fn section_states(&self) -> BTreeMap<String, SectionState> {
        let mut states = BTreeMap::new();
        for section in self.sections.values().filter(|section| section.visits() > 0) {
            let hidden_options = section
                .all_options()
                .filter(|option| option.is_hidden())
                .map(|option| option.id().to_string())
                .collect();
            let vars = match self.context.engine().get_global(&section_namespace(section.id())) {
                Ok(CxValue::Map(vars)) => vars,
                Ok(_) => StateMap::new(),
                Err(error) => {
                    log::warn!(
                        "Section {} namespace could not be saved: {}",
                        section.id(),
                        error
                    );
                    StateMap::new()
                }
            };
            states.insert(
                section.id().to_string(),
                SectionState {
                    visits: section.visits(),
                    hidden_options,
                    vars,
                },
            );
        }
        states
    }

    /// Puts back section progress saved by [`Story::section_states`].
    /// Sections the story no longer has are skipped.
    pub fn restore_section_states(
        &mut self,
        states: &BTreeMap<String, SectionState>,
    ) -> Result<(), CodexError> {
        for (section_id, state) in states {
            let Some(section) = self.sections.get(section_id) else {
                log::warn!("Saved progress for unknown section {} ignored", section_id);
                continue;
            };
            section.restore(state.visits, &state.hidden_options);
            if !state.vars.is_empty() {
                let namespace = CxValue::Map(state.vars.clone());
                self.context
                    .engine_mut()
                    .set_global(&section_namespace(section_id), namespace)?;
            }
        }
        Ok(())
    }

    /// Makes `section_id` current again after a restore, without counting a
    /// visit or running its code.
    pub fn rebind(&mut self, section_id: &str) -> Result<(), CodexError> {
        let section = self
            .sections
            .get(section_id)
            .ok_or_else(|| section_not_found(section_id))?;
        log::info!("Resuming in section {}", section_id);
        section.rebind(&mut self.context);
        Ok(())
    }

    pub fn rng_state(&self) -> Option<u32> {
        self.context.engine().rng_state()
    }

    pub fn restore_rng_state(&mut self, state: u32) {
        self.context.engine_mut().set_rng_state(state);
    }

    /// Runs an event handler and returns its result as text.
    ///
    /// Unknown events and failing handlers produce a diagnostic string rather
    /// than an error, so hosts can show it as-is.
    pub fn trigger(&mut self, event_id: &str, args: &[CxValue]) -> String {
        if !self.events.contains_key(event_id) {
            log::warn!("Event trigger failed: no handler for {} in story", event_id);
            return format!("Unable to trigger event: {}", event_id);
        }
        log::info!("Triggering event {}", event_id);
        match self.context.call(&event_function(event_id), args) {
            Ok(value) => value.to_text(),
            Err(error) => {
                log::error!("Event {} failed: {}", event_id, error);
                format!("Event {} failed: {}", event_id, error.message)
            }
        }
    }

    pub fn replace_vars(&mut self, text: &str) -> String {
        self.context.render(text)
    }

    pub fn visit(&mut self, section_id: &str) -> Result<(), CodexError> {
        let section = self
            .sections
            .get(section_id)
            .ok_or_else(|| section_not_found(section_id))?;
        log::info!("Entering section {}", section_id);
        section.visit(&mut self.context);
        Ok(())
    }

    pub fn section_text(&mut self, section_id: &str) -> Result<String, CodexError> {
        let section = self
            .sections
            .get(section_id)
            .ok_or_else(|| section_not_found(section_id))?;
        Ok(section.text(&mut self.context))
    }

    pub fn available_options(&mut self, section_id: &str) -> Result<Vec<OptionView>, CodexError> {
        let section = self
            .sections
            .get(section_id)
            .ok_or_else(|| section_not_found(section_id))?;
        let available = section.options(&mut self.context);
        Ok(available
            .into_iter()
            .map(|option| OptionView {
                id: option.id().to_string(),
                text: option.text(&mut self.context),
            })
            .collect())
    }

    pub fn execute_option(
        &mut self,
        section_id: &str,
        option_id: &str,
    ) -> Result<OptionResult, CodexError> {
        let section = self
            .sections
            .get(section_id)
            .ok_or_else(|| section_not_found(section_id))?;
        let option = section.option(option_id).ok_or_else(|| {
            CodexError::new(
                "NAV_OPTION_NOT_FOUND",
                format!("Option \"{}\" not found in section \"{}\".", option_id, section_id),
            )
        })?;
        Ok(option.execute(&mut self.context))
    }
}

fn section_not_found(section_id: &str) -> CodexError {
    CodexError::new(
        "NAV_SECTION_NOT_FOUND",
        format!("Section \"{}\" not found.", section_id),
    )
}

fn load_error(code: &str, what: &str, error: CodexError) -> CodexError {
    CodexError {
        code: code.to_string(),
        message: format!("{} failed: {}", what, error),
        location: error.location,
    }
}
