//! Sequential stage runner for one generation request.
//!
//! Each stage renders its prompt, calls one edge function under
//! [`retry_linear`], then validates the fields it expects. Missing or empty
//! fields are replaced with fallback text and the stage is recorded in
//! `fallback_stages`; a call that still fails after its retries aborts the
//! whole run with [`PipelineError::Stage`]. Retrying a failed run always
//! starts again from the first stage.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use copydesk_core::{
    AppConfig, AudienceProfile, Blueprint, Channel, ChannelOption, GeneratedArtifact,
    GenerationRequest, SocialBrief, Structure, PROFILE_FIELDS,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::client::FunctionsClient;
use crate::error::PipelineError;
use crate::fallback;
use crate::prompts::{body_key, PromptCatalog};
use crate::retry::retry_linear;
use crate::stages::{self, StageSpec};
use crate::template::PromptContext;

/// Runs the per-channel stage plans against a [`FunctionsClient`].
#[derive(Debug)]
pub struct Pipeline {
    client: FunctionsClient,
    catalog: PromptCatalog,
    retry_delay_ms: u64,
    rng: Mutex<StdRng>,
}

/// Per-run bookkeeping shared by the stage helpers.
struct Run<'a> {
    run_id: Uuid,
    request: &'a GenerationRequest,
    context: PromptContext,
    fallback_stages: Vec<String>,
}

impl Pipeline {
    #[must_use]
    pub fn new(client: FunctionsClient, catalog: PromptCatalog, retry_delay_ms: u64) -> Self {
        Self {
            client,
            catalog,
            retry_delay_ms,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Builds a pipeline from the application config, loading prompt
    /// overrides from `prompts_path` when set.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Http`] if the HTTP client cannot be built, or
    /// [`PipelineError::Catalog`] if the prompt overrides are rejected.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let client = FunctionsClient::new(
            &config.functions_url,
            &config.functions_anon_key,
            config.pipeline_request_timeout_secs,
        )?;
        let catalog = PromptCatalog::load(config.prompts_path.as_deref())?;
        Ok(Self::new(client, catalog, config.pipeline_retry_delay_ms))
    }

    /// Replaces the structure-choice RNG, e.g. with a seeded one in tests.
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Draws one structure uniformly from `channel`'s pair; `None` for social.
    pub fn choose_structure(&self, channel: Channel) -> Option<Structure> {
        let options = channel.structures();
        if options.is_empty() {
            return None;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Some(options[rng.random_range(0..options.len())])
    }

    /// Runs every stage for `request` and assembles the artifact.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidRequest`] if the request fails validation.
    /// - [`PipelineError::Template`] / [`PipelineError::Catalog`] if a prompt
    ///   cannot be rendered.
    /// - [`PipelineError::Stage`] if a stage call fails after its retries.
    pub async fn run(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, PipelineError> {
        request.validate()?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "pipeline_run",
            run_id = %run_id,
            channel = %request.channel,
        );

        async {
            let started = Instant::now();
            tracing::info!("pipeline run started");
            let mut run = Run::new(run_id, request);
            let result = match request.channel {
                Channel::Ad => self.run_ad(&mut run).await,
                Channel::Email => self.run_email(&mut run).await,
                Channel::Social => self.run_social(&mut run).await,
            };
            match &result {
                Ok(artifact) => tracing::info!(
                    elapsed_ms = started.elapsed().as_millis(),
                    structure = artifact.structure.map(Structure::as_str),
                    fallback_stages = artifact.fallback_stages.len(),
                    "pipeline run finished"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = started.elapsed().as_millis(),
                    stage = e.failed_stage(),
                    error = %e,
                    "pipeline run aborted"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    // -----------------------------------------------------------------------
    // Channel plans
    // -----------------------------------------------------------------------

    async fn run_ad(&self, run: &mut Run<'_>) -> Result<GeneratedArtifact, PipelineError> {
        let response = self
            .call(stages::PREPROCESS_PROFILE, "ad.preprocess", run, json!({}))
            .await?;
        let summary = run.text_or(
            stages::PREPROCESS_PROFILE,
            &response,
            "summary",
            fallback::SUMMARY,
        );
        run.context.set("summary", summary);

        let response = self
            .call(stages::GENERATE_HOOKS, "ad.hooks", run, json!({}))
            .await?;
        let hooks = run.hooks_or_fallback(stages::GENERATE_HOOKS, &response);
        let selected_hook = hooks[0].clone();
        run.context
            .set("hook", selected_hook.clone())
            .set_list("hooks", &hooks);

        let structure = self.pick_structure(run)?;
        run.context.set("structure", structure.as_str());
        let response = self
            .call(
                stages::GENERATE_AD_SCRIPT,
                &body_key("ad", structure.as_str()),
                run,
                json!({ "structure": structure.as_str(), "hook": selected_hook }),
            )
            .await?;
        let draft = run.text_or(
            stages::GENERATE_AD_SCRIPT,
            &response,
            "content",
            fallback::CONTENT,
        );
        run.context.set("content", draft.clone());

        let response = self
            .call(stages::HUMANIZE_AD_SCRIPT, "ad.humanize", run, json!({}))
            .await?;
        let body = run.text_or(stages::HUMANIZE_AD_SCRIPT, &response, "content", &draft);

        Ok(run.artifact(hooks, selected_hook, body, Some(structure)))
    }

    async fn run_email(&self, run: &mut Run<'_>) -> Result<GeneratedArtifact, PipelineError> {
        let style = run.request.option.map_or("", ChannelOption::as_str);
        run.context.set("emailStyle", style);

        let response = self
            .call(
                stages::GENERATE_EMAIL_BLUEPRINT,
                "email.blueprint",
                run,
                json!({ "style": style }),
            )
            .await?;
        let blueprint = run.blueprint_or_fallback(&response);
        run.context
            .set("emotionalPoints", blueprint.emotional_points.clone())
            .set("narrativeAxis", blueprint.narrative_axis.clone())
            .set("blueprintStyle", blueprint.style.clone());

        let response = self
            .call(
                stages::GENERATE_SUBJECT_LINES,
                "email.subjects",
                run,
                json!({}),
            )
            .await?;
        let (subject, alternative) = run.subjects_or_fallback(&response);
        run.context
            .set("subject", subject.clone())
            .set("alternativeSubject", alternative.clone());

        let structure = self.pick_structure(run)?;
        run.context.set("structure", structure.as_str());
        let response = self
            .call(
                stages::GENERATE_EMAIL_CONTENT,
                &body_key("email", structure.as_str()),
                run,
                json!({ "structure": structure.as_str(), "subject": subject }),
            )
            .await?;
        let draft = run.text_or(
            stages::GENERATE_EMAIL_CONTENT,
            &response,
            "content",
            fallback::CONTENT,
        );
        run.context.set("content", draft.clone());

        let response = self
            .call(stages::CLEANUP_EMAIL, "email.cleanup", run, json!({}))
            .await?;
        let body = match non_empty_str(&response, "content") {
            Some(cleaned) => cleaned,
            None => {
                run.record_fallback(stages::CLEANUP_EMAIL, "content");
                fallback::split_paragraphs(&draft)
            }
        };

        let mut artifact = run.artifact(Vec::new(), subject.clone(), body, Some(structure));
        artifact.subject = Some(subject);
        artifact.alternative_subject = Some(alternative);
        artifact.blueprint = Some(blueprint);
        Ok(artifact)
    }

    async fn run_social(&self, run: &mut Run<'_>) -> Result<GeneratedArtifact, PipelineError> {
        let platform = run.request.option.map_or("", ChannelOption::as_str);
        run.context.set("platform", platform);

        let response = self
            .call(
                stages::GENERATE_SOCIAL_HOOK,
                "social.hook",
                run,
                json!({ "platform": platform }),
            )
            .await?;
        let hooks = run.hooks_or_fallback(stages::GENERATE_SOCIAL_HOOK, &response);
        let selected_hook = hooks[0].clone();
        let stage = stages::GENERATE_SOCIAL_HOOK;
        let brief = SocialBrief {
            theme: run.text_or(stage, &response, "theme", fallback::MISSING),
            form: run.text_or(stage, &response, "form", fallback::MISSING),
            cta: run.text_or(stage, &response, "cta", fallback::MISSING),
        };
        run.context
            .set("hook", selected_hook.clone())
            .set_list("hooks", &hooks)
            .set("theme", brief.theme.clone())
            .set("form", brief.form.clone())
            .set("cta", brief.cta.clone());

        let response = self
            .call(
                stages::GENERATE_SOCIAL_POST,
                "social.post",
                run,
                json!({ "platform": platform, "hook": selected_hook }),
            )
            .await?;
        let body = run.text_or(
            stages::GENERATE_SOCIAL_POST,
            &response,
            "content",
            fallback::CONTENT,
        );

        let mut artifact = run.artifact(hooks, selected_hook, body, None);
        artifact.social = Some(brief);
        Ok(artifact)
    }

    // -----------------------------------------------------------------------
    // Stage plumbing
    // -----------------------------------------------------------------------

    fn pick_structure(&self, run: &Run<'_>) -> Result<Structure, PipelineError> {
        let channel = run.request.channel;
        self.choose_structure(channel).ok_or_else(|| {
            PipelineError::Catalog(format!("channel {channel} has no body structures"))
        })
    }

    /// Renders `template_key`, merges `extra` into the common payload, and
    /// invokes the stage's function with retry.
    async fn call(
        &self,
        stage: StageSpec,
        template_key: &str,
        run: &Run<'_>,
        extra: Value,
    ) -> Result<Value, PipelineError> {
        let prompt = self.catalog.render(template_key, &run.context)?;

        let mut payload = json!({
            "prompt": prompt,
            "targetAudience": run.request.audience,
            "goal": run.request.goal,
            "channel": run.request.channel,
        });
        if let (Value::Object(base), Value::Object(extra)) = (&mut payload, extra) {
            base.extend(extra);
        }

        let started = Instant::now();
        let client = &self.client;
        let payload = &payload;
        let result = retry_linear(stage.max_attempts, self.retry_delay_ms, |attempt| {
            tracing::debug!(stage = stage.function, attempt, "invoking function");
            client.invoke(stage.function, payload)
        })
        .await;

        match result {
            Ok(value) => {
                tracing::info!(
                    stage = stage.function,
                    elapsed_ms = started.elapsed().as_millis(),
                    "stage completed"
                );
                Ok(value)
            }
            Err(source) => Err(PipelineError::Stage {
                stage: stage.function,
                source: Box::new(source),
            }),
        }
    }
}

impl<'a> Run<'a> {
    fn new(run_id: Uuid, request: &'a GenerationRequest) -> Self {
        let mut context = profile_context(&request.audience);
        context.set("goal", request.goal.clone());
        Self {
            run_id,
            request,
            context,
            fallback_stages: Vec::new(),
        }
    }

    fn record_fallback(&mut self, stage: StageSpec, field: &str) {
        tracing::warn!(
            stage = stage.function,
            field,
            "response failed validation, using fallback text"
        );
        if !self.fallback_stages.iter().any(|s| s == stage.function) {
            self.fallback_stages.push(stage.function.to_owned());
        }
    }

    fn text_or(
        &mut self,
        stage: StageSpec,
        response: &Value,
        field: &str,
        fallback: &str,
    ) -> String {
        non_empty_str(response, field).unwrap_or_else(|| {
            self.record_fallback(stage, field);
            fallback.to_owned()
        })
    }

    fn hooks_or_fallback(&mut self, stage: StageSpec, response: &Value) -> Vec<String> {
        let hooks = parse_hooks(response);
        if hooks.is_empty() {
            self.record_fallback(stage, "hooks");
            vec![fallback::HOOK.to_owned()]
        } else {
            hooks
        }
    }

    fn blueprint_or_fallback(&mut self, response: &Value) -> Blueprint {
        let stage = stages::GENERATE_EMAIL_BLUEPRINT;
        Blueprint {
            emotional_points: self.text_or(stage, response, "emotionalPoints", fallback::MISSING),
            narrative_axis: self.text_or(stage, response, "narrativeAxis", fallback::MISSING),
            style: self.text_or(stage, response, "style", fallback::MISSING),
        }
    }

    fn subjects_or_fallback(&mut self, response: &Value) -> (String, String) {
        let stage = stages::GENERATE_SUBJECT_LINES;
        (
            self.text_or(stage, response, "subject1", fallback::SUBJECT),
            self.text_or(stage, response, "subject2", fallback::SUBJECT),
        )
    }

    fn artifact(
        &mut self,
        hooks: Vec<String>,
        selected_hook: String,
        body: String,
        structure: Option<Structure>,
    ) -> GeneratedArtifact {
        GeneratedArtifact {
            run_id: self.run_id,
            channel: self.request.channel,
            hooks,
            selected_hook,
            body,
            subject: None,
            alternative_subject: None,
            structure,
            blueprint: None,
            social: None,
            fallback_stages: std::mem::take(&mut self.fallback_stages),
        }
    }
}

/// Prompt context pre-filled with every profile field under its camelCase key.
fn profile_context(profile: &AudienceProfile) -> PromptContext {
    let mut context = PromptContext::new();
    for field in PROFILE_FIELDS {
        if let Some(text) = profile.text(field) {
            context.set(field.as_str(), text.trim());
        } else if let Some(slots) = profile.slots(field) {
            let items: Vec<String> = slots.iter().map(|s| s.trim().to_owned()).collect();
            context.set_list(field.as_str(), &items);
        }
    }
    context
}

fn non_empty_str(response: &Value, field: &str) -> Option<String> {
    response
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Extracts hook candidates, best first.
///
/// Accepts plain strings or `{"hook"|"text": ..., "score": n}` objects.
/// Objects are ordered by descending score; unscored entries keep their
/// position after scored ones.
pub(crate) fn parse_hooks(response: &Value) -> Vec<String> {
    let Some(items) = response.get("hooks").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut ranked: Vec<(Option<f64>, String)> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(text) => Some((None, text.trim().to_owned())),
            Value::Object(map) => {
                let text = map
                    .get("hook")
                    .or_else(|| map.get("text"))
                    .and_then(Value::as_str)?;
                let score = map.get("score").and_then(Value::as_f64);
                Some((score, text.trim().to_owned()))
            }
            _ => None,
        })
        .filter(|(_, text)| !text.is_empty())
        .collect();

    // Stable sort keeps response order among equal or missing scores.
    ranked.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    ranked.into_iter().map(|(_, text)| text).collect()
}
