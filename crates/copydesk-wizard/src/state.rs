use copydesk_core::{ProfileField, PROFILE_FIELDS};
use serde::{Deserialize, Serialize};

/// Where the wizard is. Exactly one dialog is shown per state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum WizardState {
    /// Choosing between an existing audience and a new one.
    Selecting,
    /// Filling the audience form, one field per step.
    FillingForm { step: ProfileField },
    AwaitingGoal,
    /// Email style or social platform choice.
    AwaitingStyle,
    Generating,
    ShowingResult,
    Error { message: String, retry: bool },
    Closed,
}

impl WizardState {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            WizardState::Selecting => "selecting",
            WizardState::FillingForm { .. } => "filling the form",
            WizardState::AwaitingGoal => "awaiting the goal",
            WizardState::AwaitingStyle => "awaiting the style",
            WizardState::Generating => "generating",
            WizardState::ShowingResult => "showing the result",
            WizardState::Error { .. } => "showing an error",
            WizardState::Closed => "closed",
        }
    }
}

/// A step the user can edit and submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", content = "field", rename_all = "camelCase")]
pub enum Step {
    Form(ProfileField),
    Goal,
    Style,
}

pub(crate) const FIRST_FORM_STEP: ProfileField = PROFILE_FIELDS[0];
pub(crate) const LAST_FORM_STEP: ProfileField = PROFILE_FIELDS[PROFILE_FIELDS.len() - 1];

pub(crate) fn next_form_step(step: ProfileField) -> Option<ProfileField> {
    let idx = PROFILE_FIELDS.iter().position(|f| *f == step)?;
    PROFILE_FIELDS.get(idx + 1).copied()
}

pub(crate) fn previous_form_step(step: ProfileField) -> Option<ProfileField> {
    let idx = PROFILE_FIELDS.iter().position(|f| *f == step)?;
    idx.checked_sub(1).map(|i| PROFILE_FIELDS[i])
}

/// Which dialog is open. Derived from [`WizardState`]; at most one is `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
    pub selector: bool,
    pub form: bool,
    pub goal: bool,
    pub style: bool,
    pub generating: bool,
    pub result: bool,
    pub error: bool,
}

impl Visibility {
    #[must_use]
    pub fn of(state: &WizardState) -> Self {
        let mut v = Visibility::default();
        match state {
            WizardState::Selecting => v.selector = true,
            WizardState::FillingForm { .. } => v.form = true,
            WizardState::AwaitingGoal => v.goal = true,
            WizardState::AwaitingStyle => v.style = true,
            WizardState::Generating => v.generating = true,
            WizardState::ShowingResult => v.result = true,
            WizardState::Error { .. } => v.error = true,
            WizardState::Closed => {}
        }
        v
    }

    /// Number of open dialogs; 0 or 1.
    #[must_use]
    pub fn open_count(self) -> usize {
        [
            self.selector,
            self.form,
            self.goal,
            self.style,
            self.generating,
            self.result,
            self.error,
        ]
        .into_iter()
        .filter(|open| *open)
        .count()
    }
}
