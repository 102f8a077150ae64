use copydesk_core::Channel;

/// One edge-function call in a channel's plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSpec {
    /// Edge-function name; doubles as the stage name in logs and errors.
    pub function: &'static str,
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

pub const PREPROCESS_PROFILE: StageSpec = StageSpec {
    function: "preprocess-profile",
    max_attempts: 3,
};
pub const GENERATE_HOOKS: StageSpec = StageSpec {
    function: "generate-hooks",
    max_attempts: 3,
};
pub const GENERATE_AD_SCRIPT: StageSpec = StageSpec {
    function: "generate-ad-script",
    max_attempts: 3,
};
pub const HUMANIZE_AD_SCRIPT: StageSpec = StageSpec {
    function: "humanize-ad-script",
    max_attempts: 2,
};

pub const GENERATE_EMAIL_BLUEPRINT: StageSpec = StageSpec {
    function: "generate-email-blueprint",
    max_attempts: 3,
};
pub const GENERATE_SUBJECT_LINES: StageSpec = StageSpec {
    function: "generate-subject-lines",
    max_attempts: 3,
};
pub const GENERATE_EMAIL_CONTENT: StageSpec = StageSpec {
    function: "generate-email-content",
    max_attempts: 5,
};
pub const CLEANUP_EMAIL: StageSpec = StageSpec {
    function: "cleanup-email",
    max_attempts: 2,
};

pub const GENERATE_SOCIAL_HOOK: StageSpec = StageSpec {
    function: "generate-social-hook",
    max_attempts: 3,
};
pub const GENERATE_SOCIAL_POST: StageSpec = StageSpec {
    function: "generate-social-post",
    max_attempts: 3,
};

/// Ordered stages run for `channel`.
#[must_use]
pub fn plan(channel: Channel) -> &'static [StageSpec] {
    match channel {
        Channel::Ad => &[
            PREPROCESS_PROFILE,
            GENERATE_HOOKS,
            GENERATE_AD_SCRIPT,
            HUMANIZE_AD_SCRIPT,
        ],
        Channel::Email => &[
            GENERATE_EMAIL_BLUEPRINT,
            GENERATE_SUBJECT_LINES,
            GENERATE_EMAIL_CONTENT,
            CLEANUP_EMAIL,
        ],
        Channel::Social => &[GENERATE_SOCIAL_HOOK, GENERATE_SOCIAL_POST],
    }
}
