//! Prompt template catalogue.
//!
//! The bundled catalogue covers every stage. An optional YAML file maps
//! template keys to replacement text; keys not in the bundled set are
//! rejected, as are placeholders the pipeline has not filled in by the time
//! that template is rendered, so bad overrides fail at startup instead of
//! mid-run.
//!
//! ```yaml
//! ad.hooks: |
//!   Napisz 5 hooków dla {{name}} ...
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::PipelineError;
use crate::template::{placeholders, render, PromptContext};

/// Placeholders every stage can use: the profile fields and the goal.
const PROFILE_PLACEHOLDERS: &[&str] = &[
    "name",
    "ageRange",
    "gender",
    "languageSamples",
    "biography",
    "beliefs",
    "pains",
    "desires",
    "competitors",
    "offer",
    "benefits",
    "whyItWorks",
    "experience",
    "goal",
];

const AD_BODY: &[&str] = &["summary", "hook", "hooks", "structure"];
const AD_HUMANIZE: &[&str] = &["summary", "hook", "hooks", "structure", "content"];
const EMAIL_SUBJECTS: &[&str] = &[
    "emailStyle",
    "emotionalPoints",
    "narrativeAxis",
    "blueprintStyle",
];
const EMAIL_BODY: &[&str] = &[
    "emailStyle",
    "emotionalPoints",
    "narrativeAxis",
    "blueprintStyle",
    "subject",
    "alternativeSubject",
    "structure",
];
const EMAIL_CLEANUP: &[&str] = &[
    "emailStyle",
    "emotionalPoints",
    "narrativeAxis",
    "blueprintStyle",
    "subject",
    "alternativeSubject",
    "structure",
    "content",
];
const SOCIAL_POST: &[&str] = &["platform", "hook", "hooks", "theme", "form", "cta"];

/// Placeholders the pipeline has filled in by the time it renders `key`,
/// beyond [`PROFILE_PLACEHOLDERS`]. `None` for keys outside the catalogue.
fn stage_placeholders(key: &str) -> Option<&'static [&'static str]> {
    let extra: &'static [&'static str] = match key {
        "ad.preprocess" => &[],
        "ad.hooks" => &["summary"],
        "ad.body.PAS" | "ad.body.AIDA" => AD_BODY,
        "ad.humanize" => AD_HUMANIZE,
        "email.blueprint" => &["emailStyle"],
        "email.subjects" => EMAIL_SUBJECTS,
        "email.body.PAS" | "email.body.CJN" => EMAIL_BODY,
        "email.cleanup" => EMAIL_CLEANUP,
        "social.hook" => &["platform"],
        "social.post" => SOCIAL_POST,
        _ => return None,
    };
    Some(extra)
}

/// Every placeholder a template stored under `key` may reference.
#[must_use]
pub fn allowed_placeholders(key: &str) -> Option<Vec<&'static str>> {
    stage_placeholders(key).map(|extra| {
        PROFILE_PLACEHOLDERS
            .iter()
            .chain(extra)
            .copied()
            .collect()
    })
}

const PROFILE_BLOCK: &str = "Grupa docelowa: {{name}}\n\
Wiek: {{ageRange}}\n\
Płeć: {{gender}}\n\
Język grupy: {{languageSamples}}\n\
Biografia: {{biography}}\n\
Przekonania: {{beliefs}}\n\
Bolączki:\n{{pains}}\n\
Pragnienia:\n{{desires}}\n\
Konkurencja:\n{{competitors}}\n\
Oferta: {{offer}}\n\
Korzyści:\n{{benefits}}\n\
Dlaczego to działa: {{whyItWorks}}\n\
Doświadczenie: {{experience}}";

fn bundled_templates() -> BTreeMap<String, String> {
    let profile = PROFILE_BLOCK;
    let entries: [(&str, String); 12] = [
        (
            "ad.preprocess",
            format!(
                "{profile}\n\nStreść powyższy profil w kilku zdaniach, zachowując język grupy. \
                 Zwróć JSON: {{\"summary\": \"...\"}}"
            ),
        ),
        (
            "ad.hooks",
            "Profil: {{summary}}\nCel reklamy: {{goal}}\n\n\
             Zaproponuj 5 hooków otwierających reklamę wideo i oceń każdy w skali 1-10. \
             Zwróć JSON: {\"hooks\": [{\"hook\": \"...\", \"score\": 0}]}"
                .to_string(),
        ),
        (
            "ad.body.PAS",
            "Profil: {{summary}}\nCel: {{goal}}\nHook: {{hook}}\n\n\
             Napisz skrypt reklamy w strukturze Problem-Agitacja-Rozwiązanie. \
             Zwróć JSON: {\"content\": \"...\"}"
                .to_string(),
        ),
        (
            "ad.body.AIDA",
            "Profil: {{summary}}\nCel: {{goal}}\nHook: {{hook}}\n\n\
             Napisz skrypt reklamy w strukturze Uwaga-Zainteresowanie-Pożądanie-Akcja. \
             Zwróć JSON: {\"content\": \"...\"}"
                .to_string(),
        ),
        (
            "ad.humanize",
            "Przepisz skrypt tak, by brzmiał naturalnie, bez zmiany sensu:\n\n{{content}}\n\n\
             Zwróć JSON: {\"content\": \"...\"}"
                .to_string(),
        ),
        (
            "email.blueprint",
            format!(
                "{profile}\n\nCel maila: {{{{goal}}}}\nStyl: {{{{emailStyle}}}}\n\n\
                 Wskaż punkty emocjonalne, oś narracji i styl wiadomości. \
                 Zwróć JSON: {{\"emotionalPoints\": \"...\", \"narrativeAxis\": \"...\", \"style\": \"...\"}}"
            ),
        ),
        (
            "email.subjects",
            "Punkty emocjonalne: {{emotionalPoints}}\nOś narracji: {{narrativeAxis}}\n\
             Cel: {{goal}}\n\n\
             Zaproponuj dwa alternatywne tematy wiadomości. \
             Zwróć JSON: {\"subject1\": \"...\", \"subject2\": \"...\"}"
                .to_string(),
        ),
        (
            "email.body.PAS",
            format!(
                "{profile}\n\nTemat: {{{{subject}}}}\nPunkty emocjonalne: {{{{emotionalPoints}}}}\n\
                 Oś narracji: {{{{narrativeAxis}}}}\nStyl: {{{{blueprintStyle}}}}\nCel: {{{{goal}}}}\n\n\
                 Napisz treść maila w strukturze Problem-Agitacja-Rozwiązanie. \
                 Zwróć JSON: {{\"content\": \"...\"}}"
            ),
        ),
        (
            "email.body.CJN",
            format!(
                "{profile}\n\nTemat: {{{{subject}}}}\nPunkty emocjonalne: {{{{emotionalPoints}}}}\n\
                 Oś narracji: {{{{narrativeAxis}}}}\nStyl: {{{{blueprintStyle}}}}\nCel: {{{{goal}}}}\n\n\
                 Napisz treść maila jako narrację podważającą przekonania grupy (CJN). \
                 Zwróć JSON: {{\"content\": \"...\"}}"
            ),
        ),
        (
            "email.cleanup",
            "Uporządkuj akapity i interpunkcję maila, nie zmieniając treści:\n\n{{content}}\n\n\
             Zwróć JSON: {\"content\": \"...\"}"
                .to_string(),
        ),
        (
            "social.hook",
            format!(
                "{profile}\n\nPlatforma: {{{{platform}}}}\nCel posta: {{{{goal}}}}\n\n\
                 Zaproponuj hooki, temat, formę i wezwanie do działania. \
                 Zwróć JSON: {{\"hooks\": [\"...\"], \"theme\": \"...\", \"form\": \"...\", \"cta\": \"...\"}}"
            ),
        ),
        (
            "social.post",
            "Platforma: {{platform}}\nHook: {{hook}}\nTemat: {{theme}}\nForma: {{form}}\n\
             CTA: {{cta}}\nCel: {{goal}}\n\n\
             Napisz post zaczynający się od hooka. Zwróć JSON: {\"content\": \"...\"}"
                .to_string(),
        ),
    ];
    entries
        .into_iter()
        .map(|(key, text)| (key.to_owned(), text))
        .collect()
}

/// Template key for the body stage of `structure`, e.g. `email.body.CJN`.
#[must_use]
pub fn body_key(channel: &str, structure: &str) -> String {
    format!("{channel}.body.{structure}")
}

/// Keyed prompt templates.
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    templates: BTreeMap<String, String>,
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self::bundled()
    }
}

impl PromptCatalog {
    /// The catalogue compiled into the binary.
    #[must_use]
    pub fn bundled() -> Self {
        Self {
            templates: bundled_templates(),
        }
    }

    /// Bundled catalogue with the entries of `yaml` layered on top.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Catalog`] if the YAML is malformed, names an
    /// unknown template key, or references a placeholder that is not filled
    /// in before that template is rendered.
    pub fn with_overrides_from_str(yaml: &str) -> Result<Self, PipelineError> {
        let overrides: BTreeMap<String, String> = serde_yaml::from_str(yaml)
            .map_err(|e| PipelineError::Catalog(format!("invalid prompt YAML: {e}")))?;

        let mut catalog = Self::bundled();
        for (key, text) in overrides {
            let Some(allowed) = allowed_placeholders(&key) else {
                return Err(PipelineError::Catalog(format!(
                    "unknown prompt template key '{key}'"
                )));
            };
            if let Some(unknown) = placeholders(&text)
                .into_iter()
                .find(|p| !allowed.contains(&p.as_str()))
            {
                return Err(PipelineError::Catalog(format!(
                    "template '{key}' uses placeholder '{unknown}', \
                     which is not available at that stage"
                )));
            }
            catalog.templates.insert(key, text);
        }
        Ok(catalog)
    }

    /// Loads the catalogue, applying the YAML file at `path` when given.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Catalog`] if the file cannot be read or its
    /// content is rejected by [`PromptCatalog::with_overrides_from_str`].
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let Some(path) = path else {
            return Ok(Self::bundled());
        };
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Catalog(format!("failed to read {}: {e}", path.display()))
        })?;
        let catalog = Self::with_overrides_from_str(&yaml)?;
        tracing::info!(path = %path.display(), "loaded prompt overrides");
        Ok(catalog)
    }

    /// Template keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Raw template text for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }

    /// Renders the template `key` against `context`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Catalog`] if `key` is not in the catalogue.
    /// - [`PipelineError::Template`] if a placeholder has no value.
    pub fn render(&self, key: &str, context: &PromptContext) -> Result<String, PipelineError> {
        let template = self
            .get(key)
            .ok_or_else(|| PipelineError::Catalog(format!("missing prompt template '{key}'")))?;
        render(key, template, context)
    }
}
