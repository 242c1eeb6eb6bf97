use std::cell::Cell;
use std::collections::BTreeSet;

use cx_core::OptionDoc;

use super::context::ScriptContext;
use super::section::Section;

/// Target that reloads the story instead of naming a section.
pub const RESTART_TARGET: &str = "restart";
/// Target alias for the owning section.
pub const SELF_TARGET: &str = "self";

pub const FLAG_FIRST: &str = "first";
pub const FLAG_NOT_FIRST: &str = "not_first";
pub const FLAG_ONCE: &str = "once";

/// Outcome of choosing an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionResult {
    /// Section to enter next, or [`RESTART_TARGET`].
    pub target: String,
    pub notify: Option<String>,
    /// Reserved for confirmation prompts; never set by the engine.
    pub confirm: Option<String>,
    /// Whether `goto_section` replaced the configured target.
    pub redirected: bool,
}

/// A choice shown in a section, leading to another section.
#[derive(Debug, Clone)]
pub struct SectionOption {
    id: String,
    text: String,
    target: String,
    condition: Option<String>,
    effect: Option<String>,
    notify: Option<String>,
    flags: BTreeSet<String>,
    hidden: Cell<bool>,
}

impl SectionOption {
    pub fn parse(id: &str, doc: &OptionDoc, owner_section_id: &str) -> Self {
        match doc {
            OptionDoc::Pair(text, goto) => {
                Self::new(id, text, resolve_target(Some(goto), owner_section_id))
            }
            OptionDoc::Record(record) => {
                let mut option = Self::new(
                    id,
                    &record.text,
                    resolve_target(record.goto.as_deref(), owner_section_id),
                );
                option.condition = non_blank(record.condition.as_deref());
                option.effect = non_blank(record.run.as_deref());
                option.notify = non_blank(record.notify.as_deref());
                option.flags = record.flags.iter().cloned().collect();
                option.hidden.set(record.hidden);
                option
            }
        }
    }

    fn new(id: &str, text: &str, target: String) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            target,
            condition: None,
            effect: None,
            notify: None,
            flags: BTreeSet::new(),
            hidden: Cell::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The text template as written.
    pub fn raw_text(&self) -> &str {
        &self.text
    }

    /// The text with placeholders expanded.
    pub fn text(&self, context: &mut ScriptContext) -> String {
        context.render(&self.text)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn flags(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
    }

    pub fn is_available(&self, section: &Section, context: &mut ScriptContext) -> bool {
        if self.is_hidden() {
            return false;
        }
        let visits = section.visits();
        if self.has_flag(FLAG_FIRST) && visits != 1 {
            return false;
        }
        if self.has_flag(FLAG_NOT_FIRST) && visits == 1 {
            return false;
        }
        match &self.condition {
            None => true,
            Some(condition) => {
                context.check(condition, &format!("Option {}.{}", section.id(), self.id))
            }
        }
    }

    /// Applies the option: effect, post-option hook, `once` flag, then target
    /// resolution. Effect failures are logged and do not stop the rest.
    pub fn execute(&self, context: &mut ScriptContext) -> OptionResult {
        let origin = format!("Option {} effect", self.id);
        let outcome = context.run_effect(self.effect.as_deref(), &origin);

        if self.has_flag(FLAG_ONCE) {
            self.hidden.set(true);
        }

        let (target, redirected) = match outcome.redirect {
            Some(redirect) if self.target != RESTART_TARGET => (redirect, true),
            _ => (self.target.clone(), false),
        };
        if redirected {
            log::info!("Option {} redirected from {} to {}", self.id, self.target, target);
        }

        let notify = self
            .notify
            .as_deref()
            .map(|template| context.render(template))
            .filter(|message| !message.is_empty());

        OptionResult {
            target,
            notify,
            confirm: None,
            redirected,
        }
    }
}

fn resolve_target(goto: Option<&str>, owner_section_id: &str) -> String {
    match goto.map(str::trim) {
        None | Some("") | Some(SELF_TARGET) => owner_section_id.to_string(),
        Some(target) => target.to_string(),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod option_tests {
    use super::*;
    use cx_core::{CxValue, OptionRecord, SectionDoc};
    use indexmap::IndexMap;

    use crate::script::{RhaiScriptEngine, ScriptEngine};

    fn context() -> ScriptContext {
        let mut engine = RhaiScriptEngine::with_seed(1);
        engine.install_builtins().expect("builtins");
        let mut context = ScriptContext::new(Box::new(engine));
        context.prime().expect("prime");
        context
    }

    fn record(text: &str) -> OptionRecord {
        OptionRecord {
            text: text.to_string(),
            goto: None,
            condition: None,
            run: None,
            notify: None,
            flags: Vec::new(),
            hidden: false,
        }
    }

    fn section(id: &str) -> Section {
        Section::parse(
            id,
            &SectionDoc {
                title: None,
                text: String::new(),
                vars: IndexMap::new(),
                run: None,
                options: IndexMap::new(),
            },
        )
    }

    #[test]
    fn pair_form_sets_text_and_target() {
        let option = SectionOption::parse(
            "north",
            &OptionDoc::Pair("Go north".to_string(), "north_room".to_string()),
            "start",
        );
        assert_eq!(option.raw_text(), "Go north");
        assert_eq!(option.target(), "north_room");
        assert!(!option.is_hidden());
    }

    #[test]
    fn self_and_missing_goto_resolve_to_owner() {
        let mut explicit = record("Look again");
        explicit.goto = Some("self".to_string());
        let option = SectionOption::parse("look", &OptionDoc::Record(explicit), "cave_entry");
        assert_eq!(option.target(), "cave_entry");

        let option = SectionOption::parse("wait", &OptionDoc::Record(record("Wait")), "cave_entry");
        assert_eq!(option.target(), "cave_entry");

        let option = SectionOption::parse(
            "stay",
            &OptionDoc::Pair("Stay".to_string(), "self".to_string()),
            "cave_entry",
        );
        assert_eq!(option.target(), "cave_entry");
    }

    #[test]
    fn visit_flags_gate_availability() {
        let mut context = context();
        let host = section("hall");
        let mut first = record("Only first");
        first.flags = vec!["first".to_string()];
        let first = SectionOption::parse("a", &OptionDoc::Record(first), "hall");
        let mut later = record("Not first");
        later.flags = vec!["not_first".to_string(), "sparkly".to_string()];
        let later = SectionOption::parse("b", &OptionDoc::Record(later), "hall");

        host.visit(&mut context);
        assert!(first.is_available(&host, &mut context));
        assert!(!later.is_available(&host, &mut context));
        assert!(later.has_flag("sparkly"));

        host.visit(&mut context);
        assert!(!first.is_available(&host, &mut context));
        assert!(later.is_available(&host, &mut context));
    }

    #[test]
    fn guard_is_evaluated_live_and_fails_closed() {
        let mut context = context();
        let host = section("hall");
        host.visit(&mut context);
        context
            .engine_mut()
            .set_global("gold", CxValue::Int(3))
            .expect("gold");

        let mut rich = record("Buy");
        rich.condition = Some("gold >= 5".to_string());
        let rich = SectionOption::parse("buy", &OptionDoc::Record(rich), "hall");
        assert!(!rich.is_available(&host, &mut context));
        context
            .engine_mut()
            .set_global("gold", CxValue::Int(5))
            .expect("gold");
        assert!(rich.is_available(&host, &mut context));

        let mut broken = record("Broken");
        broken.condition = Some("undefined_thing > 1".to_string());
        let broken = SectionOption::parse("x", &OptionDoc::Record(broken), "hall");
        assert!(!broken.is_available(&host, &mut context));
    }

    #[test]
    fn once_option_hides_after_execute() {
        let mut context = context();
        let host = section("hall");
        host.visit(&mut context);
        let mut once = record("Take the key");
        once.flags = vec!["once".to_string()];
        once.goto = Some("vault".to_string());
        let once = SectionOption::parse("key", &OptionDoc::Record(once), "hall");

        assert!(once.is_available(&host, &mut context));
        let result = once.execute(&mut context);
        assert_eq!(result.target, "vault");
        assert!(!once.is_available(&host, &mut context));
    }

    #[test]
    fn effect_redirect_applies_except_for_restart() {
        let mut context = context();
        let mut detour = record("Open the door");
        detour.goto = Some("hall".to_string());
        detour.run = Some("goto_section = \"trap\";".to_string());
        let detour = SectionOption::parse("door", &OptionDoc::Record(detour), "start");
        let result = detour.execute(&mut context);
        assert_eq!(result.target, "trap");
        assert!(result.redirected);

        let mut again = record("Start over");
        again.goto = Some("restart".to_string());
        again.run = Some("goto_section = \"trap\";".to_string());
        let again = SectionOption::parse("again", &OptionDoc::Record(again), "start");
        let result = again.execute(&mut context);
        assert_eq!(result.target, RESTART_TARGET);
        assert!(!result.redirected);
        assert_eq!(context.take_redirect(), None);
    }

    #[test]
    fn failed_effect_still_resolves_and_notifies() {
        let mut context = context();
        context
            .engine_mut()
            .set_global("gold", CxValue::Int(2))
            .expect("gold");
        let mut pay = record("Pay");
        pay.goto = Some("shop".to_string());
        pay.run = Some("gold -= ;".to_string());
        pay.notify = Some("You have {gold} gold".to_string());
        let pay = SectionOption::parse("pay", &OptionDoc::Record(pay), "start");
        let result = pay.execute(&mut context);
        assert_eq!(result.target, "shop");
        assert_eq!(result.notify.as_deref(), Some("You have 2 gold"));
        assert_eq!(result.confirm, None);

        let mut quiet = record("Quiet");
        quiet.notify = Some("{()}".to_string());
        let quiet = SectionOption::parse("quiet", &OptionDoc::Record(quiet), "start");
        assert_eq!(quiet.execute(&mut context).notify, None);
    }

    #[test]
    fn option_text_is_expanded() {
        let mut context = context();
        context
            .engine_mut()
            .set_global("coins", CxValue::Int(3))
            .expect("coins");
        let option = SectionOption::parse(
            "buy",
            &OptionDoc::Pair("Spend {coins} coins".to_string(), "shop".to_string()),
            "start",
        );
        assert_eq!(option.text(&mut context), "Spend 3 coins");
    }
}
