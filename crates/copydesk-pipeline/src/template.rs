//! `{{placeholder}}` substitution for prompt templates.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::PipelineError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z][A-Za-z0-9_]*)\s*\}\}")
        .unwrap_or_else(|e| panic!("invalid placeholder regex: {e}"))
});

/// Named values available to a template.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    values: BTreeMap<String, String>,
}

impl PromptContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.to_owned(), value.into());
        self
    }

    /// Sets `key` to the list joined as a numbered list (`1. a\n2. b`).
    pub fn set_list(&mut self, key: &str, items: &[String]) -> &mut Self {
        let joined = items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. {item}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        self.set(key, joined)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Renders `template`, substituting every `{{name}}` from `context`.
///
/// # Errors
///
/// Returns [`PipelineError::Template`] listing every placeholder that has no
/// value, in order of first appearance.
pub fn render(
    name: &str,
    template: &str,
    context: &PromptContext,
) -> Result<String, PipelineError> {
    let mut missing: Vec<String> = Vec::new();
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let key = &caps[1];
        if let Some(value) = context.get(key) {
            value.to_owned()
        } else {
            if !missing.iter().any(|m| m == key) {
                missing.push(key.to_owned());
            }
            String::new()
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(PipelineError::Template {
            template: name.to_owned(),
            missing,
        })
    }
}

/// Placeholder names referenced by `template`, deduplicated.
pub(crate) fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let key = caps[1].to_owned();
        if !names.contains(&key) {
            names.push(key);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_all_placeholders() {
        let mut ctx = PromptContext::new();
        ctx.set("goal", "sprzedaż kursu").set("age", "25-45");
        let out = render("t", "Cel: {{goal}}, wiek: {{ age }}.", &ctx).unwrap();
        assert_eq!(out, "Cel: sprzedaż kursu, wiek: 25-45.");
    }

    #[test]
    fn repeated_placeholder_is_replaced_everywhere() {
        let mut ctx = PromptContext::new();
        ctx.set("hook", "H");
        assert_eq!(render("t", "{{hook}}/{{hook}}", &ctx).unwrap(), "H/H");
    }

    #[test]
    fn unresolved_placeholder_is_an_error() {
        let mut ctx = PromptContext::new();
        ctx.set("goal", "x");
        let err = render("email.subjects", "{{goal}} {{pains}} {{pains}} {{offer}}", &ctx)
            .unwrap_err();
        match err {
            PipelineError::Template { template, missing } => {
                assert_eq!(template, "email.subjects");
                assert_eq!(missing, vec!["pains".to_string(), "offer".to_string()]);
            }
            other => panic!("expected Template error, got {other:?}"),
        }
    }

    #[test]
    fn single_braces_are_left_alone() {
        let out = render("t", r#"Zwróć JSON: {"content": "..."}"#, &PromptContext::new()).unwrap();
        assert_eq!(out, r#"Zwróć JSON: {"content": "..."}"#);
    }

    #[test]
    fn numbered_list_formatting() {
        let mut ctx = PromptContext::new();
        ctx.set_list("pains", &["a".to_string(), "b".to_string()]);
        assert_eq!(ctx.get("pains"), Some("1. a\n2. b"));
    }

    #[test]
    fn placeholders_are_listed_once() {
        assert_eq!(
            placeholders("{{a}} {{b}} {{a}}"),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
