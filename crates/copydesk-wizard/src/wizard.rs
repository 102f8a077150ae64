//! The wizard state machine.
//!
//! The wizard itself never performs I/O. Work that needs the network or the
//! database is requested through [`Wizard::begin_submit`], which hands back a
//! [`Ticket`] and a [`SubmitAction`]; the caller performs the action and
//! reports back with [`Wizard::complete_submit`]. Only one ticket can be in
//! flight at a time, and tickets issued before a `close` or `reset` are
//! ignored when they complete.

use copydesk_core::{
    AudienceProfile, Channel, ChannelOption, GeneratedArtifact, GenerationRequest, ProfileField,
    ValidationError,
};
use copydesk_db::NewProject;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SaveError, WizardError};
use crate::result::ResultView;
use crate::state::{
    next_form_step, previous_form_step, Step, Visibility, WizardState, FIRST_FORM_STEP,
    LAST_FORM_STEP,
};
use crate::toast::{self, Toast};

/// Default redirect for users without a premium account.
pub const PRICING_PATH: &str = "/pricing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entitlement {
    Free,
    Premium,
}

impl Entitlement {
    #[must_use]
    pub fn from_premium_flag(is_premium: bool) -> Self {
        if is_premium {
            Entitlement::Premium
        } else {
            Entitlement::Free
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmitKind {
    SaveProfile,
    Generate,
}

/// Proof that a submission was started. Pass it back to
/// [`Wizard::complete_submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    id: u64,
    epoch: u64,
    kind: SubmitKind,
}

/// Work the caller must perform for a submitted step.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitAction {
    /// Persist the (trimmed) profile and report its id.
    SaveProfile(AudienceProfile),
    /// Run the generation pipeline.
    Generate(GenerationRequest),
}

/// Result of a [`SubmitAction`], reported by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    ProfileSaved(Uuid),
    Generated(Box<GeneratedArtifact>),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The ticket belonged to an earlier session or a finished submission.
    Ignored,
}

/// Serializable wizard state for resuming later.
///
/// The in-flight submission is never part of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot {
    pub channel: Channel,
    pub state: WizardState,
    pub profile: AudienceProfile,
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<ChannelOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<GenerationRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultView>,
}

#[derive(Debug)]
pub struct Wizard {
    channel: Channel,
    entitlement: Entitlement,
    pricing_url: String,
    state: WizardState,
    profile: AudienceProfile,
    goal: String,
    option: Option<ChannelOption>,
    request: Option<GenerationRequest>,
    result: Option<ResultView>,
    in_flight: Option<Ticket>,
    epoch: u64,
    next_ticket: u64,
    toasts: Vec<Toast>,
}

impl Wizard {
    #[must_use]
    pub fn new(channel: Channel, entitlement: Entitlement) -> Self {
        Self {
            channel,
            entitlement,
            pricing_url: PRICING_PATH.to_string(),
            state: WizardState::Selecting,
            profile: AudienceProfile::default(),
            goal: String::new(),
            option: None,
            request: None,
            result: None,
            in_flight: None,
            epoch: 0,
            next_ticket: 0,
            toasts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_pricing_url(mut self, url: impl Into<String>) -> Self {
        self.pricing_url = url.into();
        self
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    #[must_use]
    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// The step the user is currently editing, if any.
    #[must_use]
    pub fn current_step(&self) -> Option<Step> {
        match self.state {
            WizardState::FillingForm { step } => Some(Step::Form(step)),
            WizardState::AwaitingGoal => Some(Step::Goal),
            WizardState::AwaitingStyle => Some(Step::Style),
            _ => None,
        }
    }

    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::of(&self.state)
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub fn profile(&self) -> &AudienceProfile {
        &self.profile
    }

    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    #[must_use]
    pub fn option(&self) -> Option<ChannelOption> {
        self.option
    }

    #[must_use]
    pub fn result(&self) -> Option<&ResultView> {
        self.result.as_ref()
    }

    pub fn result_mut(&mut self) -> Option<&mut ResultView> {
        self.result.as_mut()
    }

    #[must_use]
    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn take_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    // -----------------------------------------------------------------------
    // Audience selection and form
    // -----------------------------------------------------------------------

    /// Starts a blank audience form.
    ///
    /// # Errors
    ///
    /// [`WizardError::InvalidTransition`] unless the wizard is selecting.
    pub fn create_new(&mut self) -> Result<(), WizardError> {
        self.expect_selecting("create a new audience")?;
        self.profile = AudienceProfile::default();
        self.transition(WizardState::FillingForm {
            step: FIRST_FORM_STEP,
        });
        Ok(())
    }

    /// Uses a saved audience and skips the form.
    ///
    /// # Errors
    ///
    /// - [`WizardError::InvalidTransition`] unless the wizard is selecting.
    /// - [`WizardError::Request`] if the profile has no id.
    /// - [`WizardError::Validation`] if the stored profile is incomplete.
    pub fn select_existing(&mut self, profile: AudienceProfile) -> Result<(), WizardError> {
        self.expect_selecting("select an audience")?;
        if profile.id.is_none() {
            return Err(WizardError::Request(
                "audience profile has not been saved".to_string(),
            ));
        }
        profile.validate()?;
        self.profile = profile;
        self.transition(WizardState::AwaitingGoal);
        Ok(())
    }

    /// Sets a scalar profile field.
    ///
    /// # Errors
    ///
    /// [`WizardError::InvalidTransition`] outside the form or for list fields.
    pub fn set_text(&mut self, field: ProfileField, value: &str) -> Result<(), WizardError> {
        self.expect_form("edit the profile")?;
        let target = self
            .profile
            .text_mut(field)
            .ok_or(WizardError::InvalidTransition {
                action: "set text on a list field",
                state: "filling the form",
            })?;
        *target = value.to_string();
        Ok(())
    }

    /// Sets one slot of a fixed-size list field.
    ///
    /// # Errors
    ///
    /// - [`WizardError::InvalidTransition`] outside the form or for scalar
    ///   fields.
    /// - [`WizardError::Validation`] if `slot` is out of range.
    pub fn set_slot(
        &mut self,
        field: ProfileField,
        slot: usize,
        value: &str,
    ) -> Result<(), WizardError> {
        self.expect_form("edit the profile")?;
        let slots = self
            .profile
            .slots_mut(field)
            .ok_or(WizardError::InvalidTransition {
                action: "set a slot on a text field",
                state: "filling the form",
            })?;
        let len = slots.len();
        let target = slots.get_mut(slot).ok_or_else(|| ValidationError {
            field,
            slot: Some(slot),
            message: format!("only {len} slots available"),
        })?;
        *target = value.to_string();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Goal and channel option
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// [`WizardError::InvalidTransition`] outside the goal step.
    pub fn set_goal(&mut self, goal: &str) -> Result<(), WizardError> {
        if self.state != WizardState::AwaitingGoal {
            return Err(self.invalid("set the goal"));
        }
        self.goal = goal.to_string();
        Ok(())
    }

    /// # Errors
    ///
    /// - [`WizardError::InvalidTransition`] outside the style step.
    /// - [`WizardError::Request`] if the option belongs to another channel.
    pub fn set_option(&mut self, option: ChannelOption) -> Result<(), WizardError> {
        if self.state != WizardState::AwaitingStyle {
            return Err(self.invalid("choose a style"));
        }
        if option.channel() != self.channel {
            return Err(copydesk_core::CoreError::InvalidOption {
                channel: self.channel,
                option: option.as_str().to_string(),
            }
            .into());
        }
        self.option = Some(option);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Validates the current step and moves to the next one.
    ///
    /// # Errors
    ///
    /// - [`WizardError::Busy`] while a submission is in flight.
    /// - [`WizardError::Validation`] / [`WizardError::EmptyGoal`] if the step
    ///   is incomplete; an error toast is queued and the step is kept.
    /// - [`WizardError::SubmitRequired`] on a step that completes by submit.
    pub fn go_next(&mut self) -> Result<(), WizardError> {
        self.expect_idle()?;
        match self.state.clone() {
            WizardState::FillingForm { step } => {
                if let Err(e) = self.profile.validate_field(step) {
                    self.toasts.push(Toast::error(toast::missing_field(step.as_str())));
                    return Err(e.into());
                }
                match next_form_step(step) {
                    Some(next) if step != LAST_FORM_STEP => {
                        self.transition(WizardState::FillingForm { step: next });
                        Ok(())
                    }
                    _ => Err(WizardError::SubmitRequired(Step::Form(step))),
                }
            }
            WizardState::AwaitingGoal => {
                self.check_goal()?;
                if self.channel.has_option_step() {
                    self.transition(WizardState::AwaitingStyle);
                    Ok(())
                } else {
                    Err(WizardError::SubmitRequired(Step::Goal))
                }
            }
            WizardState::AwaitingStyle => Err(WizardError::SubmitRequired(Step::Style)),
            _ => Err(self.invalid("advance")),
        }
    }

    /// Moves to the previous step. Entered values are kept.
    ///
    /// # Errors
    ///
    /// - [`WizardError::Busy`] while a submission is in flight.
    /// - [`WizardError::InvalidTransition`] where there is no previous step.
    pub fn go_back(&mut self) -> Result<(), WizardError> {
        self.expect_idle()?;
        let previous = match self.state {
            WizardState::FillingForm { step } => match previous_form_step(step) {
                Some(prev) => WizardState::FillingForm { step: prev },
                None => WizardState::Selecting,
            },
            WizardState::AwaitingGoal => WizardState::Selecting,
            WizardState::AwaitingStyle => WizardState::AwaitingGoal,
            WizardState::Error { .. } => self.last_branch_state(),
            _ => return Err(self.invalid("go back")),
        };
        self.transition(previous);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Starts submitting `step`, which must be the current step.
    ///
    /// The last form step yields [`SubmitAction::SaveProfile`]; the last
    /// branch step (goal for ads, style otherwise) yields
    /// [`SubmitAction::Generate`] and moves to `Generating`.
    ///
    /// # Errors
    ///
    /// - [`WizardError::Busy`] while another submission is in flight.
    /// - [`WizardError::StaleStep`] if `step` is not the current step.
    /// - [`WizardError::NothingToSubmit`] for steps advanced with `go_next`.
    /// - [`WizardError::Validation`] / [`WizardError::EmptyGoal`] /
    ///   [`WizardError::Request`] if the data is incomplete.
    /// - [`WizardError::PremiumRequired`] without a premium account; the
    ///   wizard is closed.
    pub fn begin_submit(&mut self, step: Step) -> Result<(Ticket, SubmitAction), WizardError> {
        self.expect_idle()?;
        let current = self.current_step();
        if current != Some(step) {
            tracing::debug!(?step, ?current, "ignoring submit for a stale step");
            return Err(WizardError::StaleStep {
                submitted: step,
                current,
            });
        }

        match step {
            Step::Form(field) if field == LAST_FORM_STEP => {
                if let Err(e) = self.profile.validate() {
                    self.toasts.push(Toast::error(toast::missing_field(e.field.as_str())));
                    return Err(e.into());
                }
                let profile = self.profile.clone().trimmed();
                let ticket = self.issue(SubmitKind::SaveProfile);
                Ok((ticket, SubmitAction::SaveProfile(profile)))
            }
            Step::Form(_) => Err(WizardError::NothingToSubmit(step)),
            Step::Goal if self.channel.has_option_step() => Err(WizardError::NothingToSubmit(step)),
            Step::Goal | Step::Style => self.start_generation(),
        }
    }

    /// Applies the outcome of a submission. Processing ends regardless of the
    /// outcome.
    ///
    /// # Errors
    ///
    /// [`WizardError::OutcomeMismatch`] if `outcome` does not fit the ticket's
    /// action.
    pub fn complete_submit(
        &mut self,
        ticket: Ticket,
        outcome: SubmitOutcome,
    ) -> Result<Completion, WizardError> {
        if ticket.epoch != self.epoch || self.in_flight != Some(ticket) {
            tracing::debug!(ticket = ticket.id, "ignoring completion of a stale ticket");
            return Ok(Completion::Ignored);
        }
        self.in_flight = None;

        match (ticket.kind, outcome) {
            (SubmitKind::SaveProfile, SubmitOutcome::ProfileSaved(id)) => {
                self.profile = std::mem::take(&mut self.profile).trimmed();
                self.profile.id = Some(id);
                self.toasts.push(Toast::success(toast::PROFILE_SAVED));
                self.transition(WizardState::AwaitingGoal);
            }
            (SubmitKind::SaveProfile, SubmitOutcome::Failed(reason)) => {
                tracing::warn!(reason = %reason, "audience profile save failed");
                self.toasts.push(Toast::error(toast::save_failed(&reason)));
            }
            (SubmitKind::Generate, SubmitOutcome::Generated(artifact)) => {
                self.result = Some(ResultView::new(*artifact));
                self.transition(WizardState::ShowingResult);
            }
            (SubmitKind::Generate, SubmitOutcome::Failed(reason)) => {
                tracing::warn!(reason = %reason, "generation failed");
                self.toasts.push(Toast::error(toast::generation_failed(&reason)));
                self.transition(WizardState::Error {
                    message: reason,
                    retry: true,
                });
            }
            (kind, _) => {
                if kind == SubmitKind::Generate {
                    self.transition(WizardState::Error {
                        message: WizardError::OutcomeMismatch.to_string(),
                        retry: true,
                    });
                }
                return Err(WizardError::OutcomeMismatch);
            }
        }
        Ok(Completion::Applied)
    }

    /// Restarts generation from the first stage with the same request.
    ///
    /// # Errors
    ///
    /// - [`WizardError::Busy`] while a submission is in flight.
    /// - [`WizardError::InvalidTransition`] unless a retryable error is shown.
    pub fn retry(&mut self) -> Result<(Ticket, SubmitAction), WizardError> {
        self.expect_idle()?;
        let retryable = matches!(self.state, WizardState::Error { retry: true, .. });
        let Some(request) = self.request.clone().filter(|_| retryable) else {
            return Err(self.invalid("retry"));
        };
        self.result = None;
        self.transition(WizardState::Generating);
        let ticket = self.issue(SubmitKind::Generate);
        Ok((ticket, SubmitAction::Generate(request)))
    }

    /// Closes the wizard. Any in-flight submission is abandoned.
    pub fn close(&mut self) {
        self.in_flight = None;
        self.epoch += 1;
        self.transition(WizardState::Closed);
    }

    /// Returns to audience selection with everything cleared except toasts.
    pub fn reset(&mut self) {
        self.in_flight = None;
        self.epoch += 1;
        self.profile = AudienceProfile::default();
        self.goal.clear();
        self.option = None;
        self.request = None;
        self.result = None;
        self.transition(WizardState::Selecting);
    }

    // -----------------------------------------------------------------------
    // Result
    // -----------------------------------------------------------------------

    /// Builds the project row for the shown result, queueing an error toast
    /// on failure. The result stays editable either way.
    ///
    /// # Errors
    ///
    /// [`SaveError::MissingUser`] / [`SaveError::MissingAudience`].
    pub fn project_draft(&mut self, user_id: Option<Uuid>) -> Result<NewProject, SaveError> {
        let audience_id = self.profile.id;
        let draft = match &self.result {
            Some(view) => view.project_draft(user_id, audience_id),
            None => Err(SaveError::MissingAudience),
        };
        if let Err(e) = &draft {
            let message = match e {
                SaveError::MissingUser => toast::MISSING_USER,
                SaveError::MissingAudience => toast::MISSING_AUDIENCE,
            };
            tracing::warn!(error = %e, "project cannot be saved");
            self.toasts.push(Toast::error(message));
        }
        draft
    }

    /// Queues the confirmation toast after the caller stored a project.
    pub fn project_saved(&mut self, project_id: Uuid) {
        tracing::info!(%project_id, "project saved");
        self.toasts.push(Toast::success(toast::PROJECT_SAVED));
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn snapshot(&self) -> WizardSnapshot {
        WizardSnapshot {
            channel: self.channel,
            state: self.state.clone(),
            profile: self.profile.clone(),
            goal: self.goal.clone(),
            option: self.option,
            request: self.request.clone(),
            result: self.result.clone(),
        }
    }

    /// Rebuilds a wizard from a snapshot.
    ///
    /// A snapshot taken mid-generation resumes in the error state with a
    /// retry offer, since the interrupted run cannot be picked up.
    #[must_use]
    pub fn restore(snapshot: WizardSnapshot, entitlement: Entitlement) -> Self {
        let state = match snapshot.state {
            WizardState::Generating => WizardState::Error {
                message: toast::INTERRUPTED.to_string(),
                retry: snapshot.request.is_some(),
            },
            WizardState::ShowingResult if snapshot.result.is_none() => WizardState::AwaitingGoal,
            other => other,
        };
        let mut wizard = Self::new(snapshot.channel, entitlement);
        wizard.state = state;
        wizard.profile = snapshot.profile;
        wizard.goal = snapshot.goal;
        wizard.option = snapshot.option;
        wizard.request = snapshot.request;
        wizard.result = snapshot.result;
        wizard
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn start_generation(&mut self) -> Result<(Ticket, SubmitAction), WizardError> {
        if self.entitlement != Entitlement::Premium {
            tracing::info!(channel = %self.channel, "generation blocked, premium required");
            self.toasts.push(Toast::error(toast::PREMIUM_REQUIRED));
            self.close();
            return Err(WizardError::PremiumRequired {
                redirect: self.pricing_url.clone(),
            });
        }
        self.check_goal()?;

        let built =
            GenerationRequest::new(self.profile.clone(), self.channel, &self.goal, self.option);
        let request = match built {
            Ok(request) => request,
            Err(e) => {
                self.toasts.push(Toast::error(toast::generation_failed(&e.to_string())));
                return Err(e.into());
            }
        };
        self.request = Some(request.clone());
        self.result = None;
        self.transition(WizardState::Generating);
        let ticket = self.issue(SubmitKind::Generate);
        Ok((ticket, SubmitAction::Generate(request)))
    }

    fn check_goal(&mut self) -> Result<(), WizardError> {
        if self.goal.trim().is_empty() {
            self.toasts.push(Toast::error(toast::EMPTY_GOAL));
            return Err(WizardError::EmptyGoal);
        }
        Ok(())
    }

    fn issue(&mut self, kind: SubmitKind) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket {
            id: self.next_ticket,
            epoch: self.epoch,
            kind,
        };
        self.in_flight = Some(ticket);
        ticket
    }

    fn last_branch_state(&self) -> WizardState {
        if self.channel.has_option_step() {
            WizardState::AwaitingStyle
        } else {
            WizardState::AwaitingGoal
        }
    }

    fn transition(&mut self, next: WizardState) {
        tracing::debug!(
            channel = %self.channel,
            from = self.state.name(),
            to = next.name(),
            "wizard transition"
        );
        self.state = next;
    }

    fn expect_idle(&self) -> Result<(), WizardError> {
        if self.in_flight.is_some() {
            return Err(WizardError::Busy);
        }
        Ok(())
    }

    fn expect_selecting(&self, action: &'static str) -> Result<(), WizardError> {
        self.expect_idle()?;
        if self.state != WizardState::Selecting {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    fn expect_form(&self, action: &'static str) -> Result<(), WizardError> {
        self.expect_idle()?;
        if !matches!(self.state, WizardState::FillingForm { .. }) {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> WizardError {
        WizardError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }
}
