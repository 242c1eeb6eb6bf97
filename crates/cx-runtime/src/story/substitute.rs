use std::sync::OnceLock;

use regex::{Captures, Regex};

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(.*?)\}").expect("placeholder regex must compile"))
}

/// Replaces every `{expr}` in `template` with `eval(expr)`.
///
/// Placeholders are matched lazily and never nest: the first `}` closes the
/// expression.
pub fn substitute<F>(template: &str, mut eval: F) -> String
where
    F: FnMut(&str) -> String,
{
    if !template.contains('{') {
        return template.to_string();
    }
    placeholder_regex()
        .replace_all(template, |captures: &Captures<'_>| eval(&captures[1]))
        .into_owned()
}

#[cfg(test)]
mod substitute_tests {
    use super::*;

    #[test]
    fn expands_each_placeholder_in_order() {
        let mut seen = Vec::new();
        let out = substitute("You have {gold} gold and {hp} hp.", |expr| {
            seen.push(expr.to_string());
            expr.len().to_string()
        });
        assert_eq!(out, "You have 4 gold and 2 hp.");
        assert_eq!(seen, vec!["gold".to_string(), "hp".to_string()]);
    }

    #[test]
    fn leaves_plain_text_untouched_and_matches_lazily() {
        assert_eq!(substitute("no braces", |_| "x".to_string()), "no braces");
        assert_eq!(substitute("{a}}{b}", |expr| expr.to_uppercase()), "A}B");
        assert_eq!(substitute("{}", |expr| format!("[{}]", expr)), "[]");
    }
}
