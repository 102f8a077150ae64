use copydesk_core::{CoreError, ValidationError};
use thiserror::Error;

use crate::state::Step;

/// Errors returned by [`crate::Wizard`] operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WizardError {
    /// A submission is already in flight.
    #[error("a submission is already in progress")]
    Busy,

    /// The caller submitted a step the wizard is no longer on.
    #[error("step {submitted:?} is not the current step ({current:?})")]
    StaleStep {
        submitted: Step,
        current: Option<Step>,
    },

    /// The current step failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("goal must not be empty")]
    EmptyGoal,

    /// The request assembled for generation is invalid.
    #[error("invalid generation request: {0}")]
    Request(String),

    /// The current step only completes through [`crate::Wizard::begin_submit`].
    #[error("step {0:?} must be submitted")]
    SubmitRequired(Step),

    /// The step can be advanced with `go_next` and has nothing to submit.
    #[error("step {0:?} has nothing to submit")]
    NothingToSubmit(Step),

    /// The operation does not apply to the current state.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    /// Generation requires a premium account; the wizard has been closed.
    #[error("premium subscription required")]
    PremiumRequired { redirect: String },

    /// The outcome passed to `complete_submit` does not match the ticket.
    #[error("outcome does not match the submitted action")]
    OutcomeMismatch,
}

impl From<CoreError> for WizardError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => WizardError::Validation(e),
            CoreError::EmptyGoal => WizardError::EmptyGoal,
            other => WizardError::Request(other.to_string()),
        }
    }
}

/// Why a generated result could not be turned into a saved project.
///
/// The result view keeps its text either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("no signed-in user")]
    MissingUser,

    #[error("no saved audience profile")]
    MissingAudience,
}
