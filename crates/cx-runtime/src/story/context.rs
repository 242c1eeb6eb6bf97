use std::collections::BTreeMap;

use cx_core::{CodexError, CxValue};
use indexmap::IndexMap;

use super::substitute::substitute;
use crate::helpers::rhai_bridge::rhai_identifier;
use crate::script::ScriptEngine;

/// Scratch map, reset on every visit.
pub const SCRATCH_NAME: &str = "temp";
/// Alias for the namespace of the section being visited.
pub const SECTION_ALIAS: &str = "s";
/// Setting this from an option effect redirects the next transition.
pub const REDIRECT_NAME: &str = "goto_section";
pub const POST_OPTION_HOOK: &str = "hook_post_option";

const SECTION_NAMESPACE_PREFIX: &str = "__s_";
const VISITS_KEY: &str = "visits";

pub fn section_namespace(section_id: &str) -> String {
    format!("{}{}", SECTION_NAMESPACE_PREFIX, rhai_identifier(section_id))
}

pub fn event_function(event_id: &str) -> String {
    format!("event_{}", event_id)
}

pub fn hook_function(hook_id: &str) -> String {
    format!("hook_{}", hook_id)
}

/// What an option effect left behind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EffectOutcome {
    pub succeeded: bool,
    pub redirect: Option<String>,
}

/// The interpreter handle threaded through every section and option call.
///
/// Besides owning the engine it tracks which section is bound to `s`, so
/// writes made through the alias can be copied back into that section's
/// namespace.
pub struct ScriptContext {
    engine: Box<dyn ScriptEngine>,
    bound_section: Option<String>,
}

impl ScriptContext {
    pub fn new(engine: Box<dyn ScriptEngine>) -> Self {
        Self {
            engine,
            bound_section: None,
        }
    }

    pub fn engine(&self) -> &dyn ScriptEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn ScriptEngine {
        self.engine.as_mut()
    }

    pub fn bound_section(&self) -> Option<&str> {
        self.bound_section.as_deref()
    }

    /// Declares the reserved bindings so scripts may assign them freely.
    pub fn prime(&mut self) -> Result<(), CodexError> {
        self.engine
            .set_global(SCRATCH_NAME, CxValue::Map(BTreeMap::new()))?;
        self.engine.set_global(REDIRECT_NAME, CxValue::Nil)?;
        self.engine
            .set_global(SECTION_ALIAS, CxValue::Map(BTreeMap::new()))
    }

    pub fn reset_scratch(&mut self) {
        if let Err(error) = self
            .engine
            .set_global(SCRATCH_NAME, CxValue::Map(BTreeMap::new()))
        {
            log::warn!("Could not reset scratch namespace: {}", error);
        }
    }

    pub fn init_section_namespace(
        &mut self,
        section_id: &str,
        vars: &IndexMap<String, CxValue>,
    ) -> Result<(), CodexError> {
        let namespace = vars
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<BTreeMap<_, _>>();
        self.engine
            .set_global(&section_namespace(section_id), CxValue::Map(namespace))
    }

    /// Points `s` at the section's namespace and records the visit count in it.
    pub fn bind_section(&mut self, section_id: &str, visits: u32) {
        let key = section_namespace(section_id);
        let mut namespace = match self.engine.get_global(&key) {
            Ok(CxValue::Map(namespace)) => namespace,
            Ok(_) => BTreeMap::new(),
            Err(error) => {
                log::warn!("Section \"{}\" namespace unreadable: {}", section_id, error);
                BTreeMap::new()
            }
        };
        namespace.insert(VISITS_KEY.to_string(), CxValue::Int(i64::from(visits)));
        let namespace = CxValue::Map(namespace);

        if let Err(error) = self.engine.set_global(&key, namespace.clone()) {
            log::warn!("Could not store section \"{}\" namespace: {}", section_id, error);
        }
        if let Err(error) = self.engine.set_global(SECTION_ALIAS, namespace) {
            log::warn!("Could not bind section \"{}\": {}", section_id, error);
        }
        self.bound_section = Some(section_id.to_string());
    }

    /// Copies `s` back into the bound section's namespace.
    pub fn commit_section(&mut self) {
        let Some(section_id) = self.bound_section.as_deref() else {
            return;
        };
        match self.engine.get_global(SECTION_ALIAS) {
            Ok(value @ CxValue::Map(_)) => {
                if let Err(error) = self.engine.set_global(&section_namespace(section_id), value) {
                    log::warn!("Could not commit section \"{}\": {}", section_id, error);
                }
            }
            Ok(other) => log::warn!(
                "`{}` was replaced by a {} in section \"{}\"; not committed",
                SECTION_ALIAS,
                other.type_name(),
                section_id
            ),
            Err(error) => log::warn!("Could not read `{}`: {}", SECTION_ALIAS, error),
        }
    }

    /// Runs statements, containing any failure. Returns whether it succeeded.
    pub fn run(&mut self, code: &str, origin: &str) -> bool {
        let succeeded = match self.engine.execute(code) {
            Ok(_) => true,
            Err(error) => {
                log::warn!("{} failed: {}", origin, error);
                false
            }
        };
        self.commit_section();
        succeeded
    }

    /// Evaluates a guard expression. Failures count as false.
    pub fn check(&mut self, expr: &str, origin: &str) -> bool {
        match self.engine.evaluate(expr) {
            Ok(value) => value.is_truthy(),
            Err(error) => {
                log::warn!("{} condition \"{}\" failed: {}", origin, expr, error);
                false
            }
        }
    }

    /// Evaluates one placeholder expression to text. Failures render as `""`.
    pub fn eval_text(&mut self, expr: &str) -> String {
        if expr.trim().is_empty() {
            return String::new();
        }
        match self.engine.evaluate(expr) {
            Ok(value) => value.to_text(),
            Err(error) => {
                log::warn!("Expression \"{}\" failed: {}", expr, error);
                String::new()
            }
        }
    }

    pub fn render(&mut self, template: &str) -> String {
        substitute(template, |expr| self.eval_text(expr))
    }

    pub fn call(&mut self, name: &str, args: &[CxValue]) -> Result<CxValue, CodexError> {
        let result = self.engine.call_function(name, args);
        self.commit_section();
        result
    }

    /// Invokes a zero-argument hook if it is defined. Returns whether it ran.
    pub fn call_hook(&mut self, name: &str) -> bool {
        if !self.engine.has_function(name) {
            return false;
        }
        if let Err(error) = self.call(name, &[]) {
            log::warn!("Hook {} failed: {}", name, error);
        }
        true
    }

    /// Runs an option effect followed by the post-option hook, then consumes
    /// the redirect binding.
    pub fn run_effect(&mut self, code: Option<&str>, origin: &str) -> EffectOutcome {
        let succeeded = match code {
            Some(code) => self.run(code, origin),
            None => true,
        };
        self.call_hook(POST_OPTION_HOOK);
        EffectOutcome {
            succeeded,
            redirect: self.take_redirect(),
        }
    }

    /// Reads and clears the redirect binding. Non-string values are
    /// stringified and an empty string counts as no redirect.
    pub fn take_redirect(&mut self) -> Option<String> {
        let value = match self.engine.get_global(REDIRECT_NAME) {
            Ok(value) => value,
            Err(error) => {
                log::warn!("Could not read `{}`: {}", REDIRECT_NAME, error);
                CxValue::Nil
            }
        };
        if !value.is_nil() {
            if let Err(error) = self.engine.set_global(REDIRECT_NAME, CxValue::Nil) {
                log::warn!("Could not clear `{}`: {}", REDIRECT_NAME, error);
            }
        }
        match value {
            CxValue::Nil => None,
            CxValue::Bool(false) => None,
            other => Some(other.to_text()).filter(|target| !target.is_empty()),
        }
    }
}
