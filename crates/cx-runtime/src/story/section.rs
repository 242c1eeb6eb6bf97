use std::cell::Cell;

use cx_core::{CxValue, SectionDoc};
use indexmap::IndexMap;

use super::context::ScriptContext;
use super::option::SectionOption;

/// A narrative state: text, choices and code run on entry.
///
/// Only the visit counter and the options' hidden flags change after parse.
#[derive(Debug, Clone)]
pub struct Section {
    id: String,
    title: Option<String>,
    text: String,
    run: Option<String>,
    vars: IndexMap<String, CxValue>,
    options: IndexMap<String, SectionOption>,
    visits: Cell<u32>,
}

impl Section {
    pub fn parse(id: &str, doc: &SectionDoc) -> Self {
        let options = doc
            .options
            .iter()
            .map(|(option_id, option)| {
                (option_id.clone(), SectionOption::parse(option_id, option, id))
            })
            .collect();
        Self {
            id: id.to_string(),
            title: doc.title.clone().filter(|title| !title.trim().is_empty()),
            text: doc.text.clone(),
            run: doc.run.clone().filter(|run| !run.trim().is_empty()),
            vars: doc.vars.clone(),
            options,
            visits: Cell::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }

    pub fn raw_text(&self) -> &str {
        &self.text
    }

    pub fn run_code(&self) -> Option<&str> {
        self.run.as_deref()
    }

    /// Initial contents of this section's namespace.
    pub fn local_vars(&self) -> &IndexMap<String, CxValue> {
        &self.vars
    }

    pub fn visits(&self) -> u32 {
        self.visits.get()
    }

    pub fn option(&self, option_id: &str) -> Option<&SectionOption> {
        self.options.get(option_id)
    }

    /// Every option in document order, available or not.
    pub fn all_options(&self) -> impl Iterator<Item = &SectionOption> {
        self.options.values()
    }

    /// Options that can be chosen right now, in document order.
    pub fn options(&self, context: &mut ScriptContext) -> Vec<&SectionOption> {
        self.options
            .values()
            .filter(|option| option.is_available(self, context))
            .collect()
    }

    pub fn text(&self, context: &mut ScriptContext) -> String {
        context.render(&self.text)
    }

    /// Puts back a saved visit count and the ids of hidden options.
    pub fn restore(&self, visits: u32, hidden_options: &[String]) {
        self.visits.set(visits);
        for option in self.options.values() {
            option.set_hidden(hidden_options.iter().any(|id| id == option.id()));
        }
    }

    /// Binds `s` to this section without counting a visit or running code.
    pub fn rebind(&self, context: &mut ScriptContext) {
        context.reset_scratch();
        context.bind_section(&self.id, self.visits.get());
    }

    /// Enters the section. The counter moves before any code runs, so run code
    /// and guards see the current visit.
    pub fn visit(&self, context: &mut ScriptContext) {
        let visits = self.visits.get().saturating_add(1);
        self.visits.set(visits);

        context.reset_scratch();
        context.bind_section(&self.id, visits);
        if let Some(run) = &self.run {
            context.run(run, &format!("Section {} run code", self.id));
        }
    }
}

#[cfg(test)]
mod section_tests {
    use super::*;
    use crate::script::{RhaiScriptEngine, ScriptEngine};
    use crate::story::context::section_namespace;
    use cx_core::OptionDoc;

    fn context() -> ScriptContext {
        let mut engine = RhaiScriptEngine::with_seed(1);
        engine.install_builtins().expect("builtins");
        let mut context = ScriptContext::new(Box::new(engine));
        context.prime().expect("prime");
        context
    }

    fn doc(run: Option<&str>) -> SectionDoc {
        SectionDoc {
            title: None,
            text: "Visit number {s.visits}.".to_string(),
            vars: IndexMap::from([("lamp_lit".to_string(), CxValue::Bool(false))]),
            run: run.map(str::to_string),
            options: IndexMap::from([
                (
                    "b_second".to_string(),
                    OptionDoc::Pair("Second".to_string(), "x".to_string()),
                ),
                (
                    "a_first".to_string(),
                    OptionDoc::Pair("First".to_string(), "y".to_string()),
                ),
            ]),
        }
    }

    #[test]
    fn visit_counts_before_run_code() {
        let mut context = context();
        let section = Section::parse("hall", &doc(Some("let seen_at = s.visits;")));
        context
            .init_section_namespace(section.id(), section.local_vars())
            .expect("namespace");
        for expected in 1..=3 {
            section.visit(&mut context);
            assert_eq!(section.visits(), expected);
            assert_eq!(
                context.engine().get_global("seen_at").expect("seen_at"),
                CxValue::Int(i64::from(expected))
            );
        }
        assert_eq!(section.text(&mut context), "Visit number 3.");
    }

    #[test]
    fn title_falls_back_to_id() {
        let section = Section::parse("hall", &doc(None));
        assert_eq!(section.title(), "hall");
    }

    #[test]
    fn options_keep_document_order_and_are_not_cached() {
        let mut context = context();
        let section = Section::parse("hall", &doc(None));
        section.visit(&mut context);
        let ids = section
            .options(&mut context)
            .iter()
            .map(|option| option.id().to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["b_second".to_string(), "a_first".to_string()]);

        section.option("a_first").expect("option").set_hidden(true);
        assert_eq!(section.options(&mut context).len(), 1);
        assert_eq!(section.all_options().count(), 2);
    }

    #[test]
    fn namespace_persists_while_scratch_is_cleared() {
        let mut context = context();
        let section = Section::parse(
            "hall",
            &doc(Some(
                "if s.visits == 1 { s.lamp_lit = true; temp.note = \"first\"; }",
            )),
        );
        context
            .init_section_namespace(section.id(), section.local_vars())
            .expect("namespace");

        section.visit(&mut context);
        assert_eq!(
            context.engine_mut().evaluate("temp.note").expect("temp"),
            CxValue::from("first")
        );

        section.visit(&mut context);
        assert_eq!(
            context.engine_mut().evaluate("temp.note").expect("temp"),
            CxValue::Nil
        );
        let namespace = context
            .engine()
            .get_global(&section_namespace("hall"))
            .expect("namespace");
        assert_eq!(
            namespace.as_map().and_then(|map| map.get("lamp_lit")),
            Some(&CxValue::Bool(true))
        );
    }

    #[test]
    fn restore_then_rebind_skips_run_code() {
        let mut context = context();
        let section = Section::parse("hall", &doc(Some("let entered = true;")));
        context
            .init_section_namespace(section.id(), section.local_vars())
            .expect("namespace");
        section.restore(4, &["a_first".to_string()]);
        section.rebind(&mut context);

        assert_eq!(section.visits(), 4);
        assert!(section.option("a_first").expect("option").is_hidden());
        assert!(!section.option("b_second").expect("option").is_hidden());
        assert_eq!(section.text(&mut context), "Visit number 4.");
        assert_eq!(
            context.engine().get_global("entered").expect("entered"),
            CxValue::Nil
        );
    }

    #[test]
    fn failing_run_code_still_counts_the_visit() {
        let mut context = context();
        let section = Section::parse("hall", &doc(Some("explode(")));
        section.visit(&mut context);
        assert_eq!(section.visits(), 1);
    }
}
