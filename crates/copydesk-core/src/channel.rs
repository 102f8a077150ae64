use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Content channel the user is generating copy for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Ad,
    Email,
    Social,
}

impl Channel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Ad => "ad",
            Channel::Email => "email",
            Channel::Social => "social",
        }
    }

    /// Interchangeable body structures for this channel. Empty for social.
    #[must_use]
    pub fn structures(self) -> &'static [Structure] {
        match self {
            Channel::Ad => &[Structure::Pas, Structure::Aida],
            Channel::Email => &[Structure::Pas, Structure::Cjn],
            Channel::Social => &[],
        }
    }

    /// Whether the wizard asks for a style (email) or platform (social).
    #[must_use]
    pub fn has_option_step(self) -> bool {
        !matches!(self, Channel::Ad)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ad" | "ad-script" | "ads" => Ok(Channel::Ad),
            "email" => Ok(Channel::Email),
            "social" => Ok(Channel::Social),
            other => Err(CoreError::InvalidChannel(other.to_string())),
        }
    }
}

/// Persuasive copywriting structure used as an alternate prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Structure {
    /// Problem, Agitate, Solution.
    #[serde(rename = "PAS")]
    Pas,
    /// Attention, Interest, Desire, Action.
    #[serde(rename = "AIDA")]
    Aida,
    /// Belief-challenging narrative.
    #[serde(rename = "CJN")]
    Cjn,
}

impl Structure {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Structure::Pas => "PAS",
            Structure::Aida => "AIDA",
            Structure::Cjn => "CJN",
        }
    }
}

impl std::fmt::Display for Structure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Structure {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAS" => Ok(Structure::Pas),
            "AIDA" => Ok(Structure::Aida),
            "CJN" => Ok(Structure::Cjn),
            other => Err(CoreError::InvalidStructure(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStyle {
    Direct,
    Story,
    Educational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Facebook,
    Instagram,
    Linkedin,
    Tiktok,
}

/// Channel-specific choice made on the wizard's style/platform step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelOption {
    EmailStyle(EmailStyle),
    Platform(SocialPlatform),
}

impl ChannelOption {
    /// Parses `value` as the option kind `channel` expects.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOption`] if the value is unknown or the
    /// channel has no option step.
    pub fn parse(channel: Channel, value: &str) -> Result<Self, CoreError> {
        let normalized = value.trim().to_ascii_lowercase();
        let parsed = match (channel, normalized.as_str()) {
            (Channel::Email, "direct") => Some(Self::EmailStyle(EmailStyle::Direct)),
            (Channel::Email, "story") => Some(Self::EmailStyle(EmailStyle::Story)),
            (Channel::Email, "educational") => Some(Self::EmailStyle(EmailStyle::Educational)),
            (Channel::Social, "facebook") => Some(Self::Platform(SocialPlatform::Facebook)),
            (Channel::Social, "instagram") => Some(Self::Platform(SocialPlatform::Instagram)),
            (Channel::Social, "linkedin") => Some(Self::Platform(SocialPlatform::Linkedin)),
            (Channel::Social, "tiktok") => Some(Self::Platform(SocialPlatform::Tiktok)),
            _ => None,
        };
        parsed.ok_or_else(|| CoreError::InvalidOption {
            channel,
            option: value.to_string(),
        })
    }

    /// Channel this option belongs to.
    #[must_use]
    pub fn channel(self) -> Channel {
        match self {
            Self::EmailStyle(_) => Channel::Email,
            Self::Platform(_) => Channel::Social,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailStyle(EmailStyle::Direct) => "direct",
            Self::EmailStyle(EmailStyle::Story) => "story",
            Self::EmailStyle(EmailStyle::Educational) => "educational",
            Self::Platform(SocialPlatform::Facebook) => "facebook",
            Self::Platform(SocialPlatform::Instagram) => "instagram",
            Self::Platform(SocialPlatform::Linkedin) => "linkedin",
            Self::Platform(SocialPlatform::Tiktok) => "tiktok",
        }
    }

    /// Choices offered for `channel`, in display order.
    #[must_use]
    pub fn choices(channel: Channel) -> &'static [ChannelOption] {
        match channel {
            Channel::Email => &[
                Self::EmailStyle(EmailStyle::Direct),
                Self::EmailStyle(EmailStyle::Story),
                Self::EmailStyle(EmailStyle::Educational),
            ],
            Channel::Social => &[
                Self::Platform(SocialPlatform::Facebook),
                Self::Platform(SocialPlatform::Instagram),
                Self::Platform(SocialPlatform::Linkedin),
                Self::Platform(SocialPlatform::Tiktok),
            ],
            Channel::Ad => &[],
        }
    }
}
