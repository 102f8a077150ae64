//! Audience-and-copy wizard as a single explicit state machine.
//!
//! Flow: pick or create an audience, fill the 13-step profile form, state a
//! goal, pick an email style or social platform where the channel needs one,
//! then generate and review the result.

pub mod error;
pub mod result;
pub mod state;
pub mod toast;
pub mod wizard;

pub use error::{SaveError, WizardError};
pub use result::ResultView;
pub use state::{Step, Visibility, WizardState};
pub use toast::{Toast, ToastKind};
pub use wizard::{
    Completion, Entitlement, SubmitAction, SubmitOutcome, Ticket, Wizard, WizardSnapshot,
    PRICING_PATH,
};
