mod app_config;
pub mod audience;
pub mod channel;
mod config;
pub mod generation;

pub use app_config::{AppConfig, Environment};
pub use audience::{
    unique_by_id, AudienceProfile, ProfileField, ValidationError, BENEFIT_SLOTS, COMPETITOR_SLOTS,
    DESIRE_SLOTS, PAIN_SLOTS, PROFILE_FIELDS,
};
pub use channel::{Channel, ChannelOption, EmailStyle, SocialPlatform, Structure};
pub use config::{load_app_config, load_app_config_from_env};
pub use generation::{
    project_title, Blueprint, GeneratedArtifact, GenerationRequest, SocialBrief, TITLE_MAX_CHARS,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    #[error("invalid structure tag: {0}")]
    InvalidStructure(String),

    #[error("invalid option '{option}' for channel {channel}")]
    InvalidOption { channel: Channel, option: String },

    #[error("{channel} generation requires a style or platform choice")]
    MissingOption { channel: Channel },

    #[error("goal must not be empty")]
    EmptyGoal,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
