use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audience::AudienceProfile;
use crate::channel::{Channel, ChannelOption, Structure};
use crate::CoreError;

/// Saved project titles are cut to this many characters.
pub const TITLE_MAX_CHARS: usize = 50;

const UNTITLED: &str = "Bez tytułu";

/// Everything one pipeline run needs. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub audience: AudienceProfile,
    pub channel: Channel,
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<ChannelOption>,
}

impl GenerationRequest {
    /// Builds a request after checking the goal, the option/channel pairing,
    /// and the audience profile itself.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EmptyGoal`] if `goal` is blank.
    /// - [`CoreError::MissingOption`] if email/social has no option.
    /// - [`CoreError::InvalidOption`] if the option belongs to another channel.
    /// - [`CoreError::Validation`] if the profile is incomplete.
    pub fn new(
        audience: AudienceProfile,
        channel: Channel,
        goal: &str,
        option: Option<ChannelOption>,
    ) -> Result<Self, CoreError> {
        let request = Self {
            audience,
            channel,
            goal: goal.trim().to_string(),
            option,
        };
        request.validate()?;
        Ok(request)
    }

    /// # Errors
    ///
    /// See [`GenerationRequest::new`].
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.goal.trim().is_empty() {
            return Err(CoreError::EmptyGoal);
        }
        match (self.channel.has_option_step(), self.option) {
            (true, None) => {
                return Err(CoreError::MissingOption {
                    channel: self.channel,
                })
            }
            (_, Some(opt)) if opt.channel() != self.channel => {
                return Err(CoreError::InvalidOption {
                    channel: self.channel,
                    option: opt.as_str().to_string(),
                })
            }
            _ => {}
        }
        self.audience.validate()?;
        Ok(())
    }
}

/// Intermediate email stage output consumed by later email stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub emotional_points: String,
    pub narrative_axis: String,
    pub style: String,
}

/// Theme/form/call-to-action chosen alongside social hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialBrief {
    pub theme: String,
    pub form: String,
    pub cta: String,
}

/// Output of one pipeline run.
///
/// `hooks` and `selected_hook` are fixed at generation time; editing `body`
/// in the result view never touches them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifact {
    pub run_id: Uuid,
    pub channel: Channel,
    pub hooks: Vec<String>,
    pub selected_hook: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<Structure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint: Option<Blueprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social: Option<SocialBrief>,
    /// Stages whose response failed validation and were replaced by fallback text.
    #[serde(default)]
    pub fallback_stages: Vec<String>,
}

/// Derives a saved project's title: the first [`TITLE_MAX_CHARS`] characters
/// of the email subject, or of the selected hook for other channels.
#[must_use]
pub fn project_title(artifact: &GeneratedArtifact) -> String {
    let source = match artifact.channel {
        Channel::Email => artifact
            .subject
            .as_deref()
            .unwrap_or(&artifact.selected_hook),
        Channel::Ad | Channel::Social => &artifact.selected_hook,
    };
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return UNTITLED.to_string();
    }
    trimmed.chars().take(TITLE_MAX_CHARS).collect()
}
