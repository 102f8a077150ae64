//! Wizard flows driven end to end without I/O.

use copydesk_core::{
    AudienceProfile, Channel, ChannelOption, EmailStyle, GeneratedArtifact, ProfileField,
    SocialPlatform, Structure, PROFILE_FIELDS,
};
use copydesk_wizard::{
    Completion, Entitlement, SaveError, Step, SubmitAction, SubmitOutcome, ToastKind, Wizard,
    WizardError, WizardSnapshot, WizardState,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fill_current_step(wizard: &mut Wizard, field: ProfileField) {
    match field.slot_count() {
        Some(n) => {
            for slot in 0..n {
                wizard
                    .set_slot(field, slot, &format!("{field} {slot}"))
                    .expect("set_slot");
            }
        }
        None => {
            let value = match field {
                ProfileField::AgeRange => "25-45".to_string(),
                ProfileField::Gender => "female".to_string(),
                other => format!("{other} value"),
            };
            wizard.set_text(field, &value).expect("set_text");
        }
    }
}

/// Walks the form to its last step, filling every field.
fn fill_form(wizard: &mut Wizard) {
    wizard.create_new().expect("create_new");
    for field in PROFILE_FIELDS {
        assert_eq!(wizard.current_step(), Some(Step::Form(field)));
        fill_current_step(wizard, field);
        if field != ProfileField::Experience {
            wizard.go_next().expect("go_next");
        }
    }
}

fn saved_profile() -> AudienceProfile {
    AudienceProfile {
        id: Some(Uuid::new_v4()),
        name: "Biegacze".to_string(),
        age_range: "25-45".to_string(),
        gender: "female".to_string(),
        language_samples: "x".to_string(),
        biography: "x".to_string(),
        beliefs: "x".to_string(),
        pains: std::array::from_fn(|i| format!("p{i}")),
        desires: std::array::from_fn(|i| format!("d{i}")),
        competitors: std::array::from_fn(|i| format!("c{i}")),
        offer: "x".to_string(),
        benefits: std::array::from_fn(|i| format!("b{i}")),
        why_it_works: "x".to_string(),
        experience: "x".to_string(),
        ..AudienceProfile::default()
    }
}

fn email_artifact() -> GeneratedArtifact {
    GeneratedArtifact {
        run_id: Uuid::new_v4(),
        channel: Channel::Email,
        hooks: Vec::new(),
        selected_hook: "Pierwszy temat".to_string(),
        body: "Treść maila".to_string(),
        subject: Some("Pierwszy temat".to_string()),
        alternative_subject: Some("Drugi temat".to_string()),
        structure: Some(Structure::Pas),
        blueprint: None,
        social: None,
        fallback_stages: Vec::new(),
    }
}

/// An email wizard waiting on the style step with a saved audience.
fn email_wizard_at_style() -> Wizard {
    let mut wizard = Wizard::new(Channel::Email, Entitlement::Premium);
    wizard.select_existing(saved_profile()).expect("select");
    wizard.set_goal("Zapis na webinar").expect("goal");
    wizard.go_next().expect("to style");
    wizard
        .set_option(ChannelOption::EmailStyle(EmailStyle::Story))
        .expect("style");
    wizard
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

#[test]
fn empty_slot_blocks_advancing_and_queues_toast() {
    let mut wizard = Wizard::new(Channel::Ad, Entitlement::Premium);
    wizard.create_new().unwrap();
    for field in [
        ProfileField::Name,
        ProfileField::AgeRange,
        ProfileField::Gender,
    ] {
        fill_current_step(&mut wizard, field);
        wizard.go_next().unwrap();
    }
    assert_eq!(wizard.current_step(), Some(Step::Form(ProfileField::Competitors)));
    wizard.set_slot(ProfileField::Competitors, 0, "A").unwrap();
    wizard.set_slot(ProfileField::Competitors, 1, "B").unwrap();

    let err = wizard.go_next().unwrap_err();
    match err {
        WizardError::Validation(e) => {
            assert_eq!(e.field, ProfileField::Competitors);
            assert_eq!(e.slot, Some(2));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(wizard.current_step(), Some(Step::Form(ProfileField::Competitors)));
    assert_eq!(wizard.toasts().len(), 1);
    assert_eq!(wizard.toasts()[0].kind, ToastKind::Error);
}

#[test]
fn slot_index_out_of_range_is_rejected() {
    let mut wizard = Wizard::new(Channel::Ad, Entitlement::Premium);
    wizard.create_new().unwrap();
    let err = wizard
        .set_slot(ProfileField::Competitors, 3, "D")
        .unwrap_err();
    assert!(matches!(err, WizardError::Validation(_)));
}

#[test]
fn last_form_step_saves_profile_then_asks_for_goal() {
    let mut wizard = Wizard::new(Channel::Ad, Entitlement::Premium);
    fill_form(&mut wizard);

    assert_eq!(
        wizard.go_next(),
        Err(WizardError::SubmitRequired(Step::Form(ProfileField::Experience)))
    );

    let (ticket, action) = wizard
        .begin_submit(Step::Form(ProfileField::Experience))
        .expect("submit profile");
    let SubmitAction::SaveProfile(profile) = action else {
        panic!("expected SaveProfile");
    };
    assert_eq!(profile.age_range, "25-45");
    assert!(wizard.is_processing());

    let id = Uuid::new_v4();
    assert_eq!(
        wizard.complete_submit(ticket, SubmitOutcome::ProfileSaved(id)),
        Ok(Completion::Applied)
    );
    assert!(!wizard.is_processing());
    assert_eq!(wizard.state(), &WizardState::AwaitingGoal);
    assert_eq!(wizard.profile().id, Some(id));
}

#[test]
fn failed_profile_save_keeps_form_and_clears_processing() {
    let mut wizard = Wizard::new(Channel::Ad, Entitlement::Premium);
    fill_form(&mut wizard);
    let (ticket, _) = wizard
        .begin_submit(Step::Form(ProfileField::Experience))
        .unwrap();

    wizard
        .complete_submit(ticket, SubmitOutcome::Failed("timeout".to_string()))
        .unwrap();

    assert!(!wizard.is_processing());
    assert_eq!(wizard.current_step(), Some(Step::Form(ProfileField::Experience)));
    assert!(wizard
        .toasts()
        .iter()
        .any(|t| t.kind == ToastKind::Error && t.message.contains("timeout")));
}

#[test]
fn go_back_from_first_form_step_returns_to_selection() {
    let mut wizard = Wizard::new(Channel::Social, Entitlement::Premium);
    wizard.create_new().unwrap();
    fill_current_step(&mut wizard, ProfileField::Name);
    wizard.go_next().unwrap();
    wizard.go_back().unwrap();
    assert_eq!(wizard.current_step(), Some(Step::Form(ProfileField::Name)));
    assert_eq!(wizard.profile().name, "name value");
    wizard.go_back().unwrap();
    assert_eq!(wizard.state(), &WizardState::Selecting);
}

// ---------------------------------------------------------------------------
// In-flight guard
// ---------------------------------------------------------------------------

#[test]
fn duplicate_submission_is_refused_while_processing() {
    let mut wizard = Wizard::new(Channel::Ad, Entitlement::Premium);
    fill_form(&mut wizard);
    let step = Step::Form(ProfileField::Experience);
    let _ticket = wizard.begin_submit(step).unwrap();

    assert_eq!(wizard.begin_submit(step), Err(WizardError::Busy));
    assert_eq!(wizard.go_back(), Err(WizardError::Busy));
}

#[test]
fn resubmitting_an_advanced_step_does_not_trigger_it_again() {
    let mut wizard = Wizard::new(Channel::Ad, Entitlement::Premium);
    fill_form(&mut wizard);
    let step = Step::Form(ProfileField::Experience);
    let (ticket, _) = wizard.begin_submit(step).unwrap();
    wizard
        .complete_submit(ticket, SubmitOutcome::ProfileSaved(Uuid::new_v4()))
        .unwrap();

    let err = wizard.begin_submit(step).unwrap_err();
    assert_eq!(
        err,
        WizardError::StaleStep {
            submitted: step,
            current: Some(Step::Goal),
        }
    );
    assert!(!wizard.is_processing());
}

#[test]
fn completing_the_same_ticket_twice_is_ignored() {
    let mut wizard = Wizard::new(Channel::Ad, Entitlement::Premium);
    fill_form(&mut wizard);
    let (ticket, _) = wizard
        .begin_submit(Step::Form(ProfileField::Experience))
        .unwrap();
    let id = Uuid::new_v4();
    wizard
        .complete_submit(ticket, SubmitOutcome::ProfileSaved(id))
        .unwrap();
    assert_eq!(
        wizard.complete_submit(ticket, SubmitOutcome::Failed("late".to_string())),
        Ok(Completion::Ignored)
    );
    assert_eq!(wizard.state(), &WizardState::AwaitingGoal);
}

#[test]
fn ticket_from_before_close_is_ignored() {
    let mut wizard = email_wizard_at_style();
    let (ticket, _) = wizard.begin_submit(Step::Style).unwrap();
    wizard.close();

    let outcome = SubmitOutcome::Generated(Box::new(email_artifact()));
    assert_eq!(
        wizard.complete_submit(ticket, outcome),
        Ok(Completion::Ignored)
    );
    assert_eq!(wizard.state(), &WizardState::Closed);
    assert!(wizard.result().is_none());
    assert_eq!(wizard.visibility().open_count(), 0);
}

#[test]
fn ticket_from_before_reset_is_ignored() {
    let mut wizard = email_wizard_at_style();
    let (ticket, _) = wizard.begin_submit(Step::Style).unwrap();
    wizard.reset();
    assert_eq!(
        wizard.complete_submit(ticket, SubmitOutcome::Failed("x".to_string())),
        Ok(Completion::Ignored)
    );
    assert_eq!(wizard.state(), &WizardState::Selecting);
}

#[test]
fn mismatched_outcome_is_an_error() {
    let mut wizard = email_wizard_at_style();
    let (ticket, _) = wizard.begin_submit(Step::Style).unwrap();
    assert_eq!(
        wizard.complete_submit(ticket, SubmitOutcome::ProfileSaved(Uuid::new_v4())),
        Err(WizardError::OutcomeMismatch)
    );
    assert!(!wizard.is_processing());
    assert!(matches!(wizard.state(), WizardState::Error { .. }));
}

// ---------------------------------------------------------------------------
// Channel branches
// ---------------------------------------------------------------------------

#[test]
fn ad_generates_straight_from_goal() {
    let mut wizard = Wizard::new(Channel::Ad, Entitlement::Premium);
    wizard.select_existing(saved_profile()).unwrap();
    assert_eq!(wizard.go_next(), Err(WizardError::EmptyGoal));
    wizard.set_goal("Sprzedaż butów").unwrap();
    assert_eq!(wizard.go_next(), Err(WizardError::SubmitRequired(Step::Goal)));

    let (_, action) = wizard.begin_submit(Step::Goal).unwrap();
    let SubmitAction::Generate(request) = action else {
        panic!("expected Generate");
    };
    assert_eq!(request.channel, Channel::Ad);
    assert_eq!(request.goal, "Sprzedaż butów");
    assert!(request.option.is_none());
    assert_eq!(wizard.state(), &WizardState::Generating);
    assert!(wizard.visibility().generating);
}

#[test]
fn email_goal_step_leads_to_style() {
    let mut wizard = Wizard::new(Channel::Email, Entitlement::Premium);
    wizard.select_existing(saved_profile()).unwrap();
    wizard.set_goal("Webinar").unwrap();
    assert_eq!(
        wizard.begin_submit(Step::Goal),
        Err(WizardError::NothingToSubmit(Step::Goal))
    );
    wizard.go_next().unwrap();
    assert_eq!(wizard.state(), &WizardState::AwaitingStyle);
    assert!(wizard.visibility().style);
}

#[test]
fn social_rejects_email_style_and_accepts_platform() {
    let mut wizard = Wizard::new(Channel::Social, Entitlement::Premium);
    wizard.select_existing(saved_profile()).unwrap();
    wizard.set_goal("Zasięgi").unwrap();
    wizard.go_next().unwrap();

    assert!(matches!(
        wizard.set_option(ChannelOption::EmailStyle(EmailStyle::Direct)),
        Err(WizardError::Request(_))
    ));
    wizard
        .set_option(ChannelOption::Platform(SocialPlatform::Linkedin))
        .unwrap();
    let (_, action) = wizard.begin_submit(Step::Style).unwrap();
    let SubmitAction::Generate(request) = action else {
        panic!("expected Generate");
    };
    assert_eq!(
        request.option,
        Some(ChannelOption::Platform(SocialPlatform::Linkedin))
    );
}

#[test]
fn missing_premium_closes_wizard_with_redirect() {
    let mut wizard = Wizard::new(Channel::Ad, Entitlement::Free);
    wizard.select_existing(saved_profile()).unwrap();
    wizard.set_goal("Sprzedaż").unwrap();

    let err = wizard.begin_submit(Step::Goal).unwrap_err();
    assert_eq!(
        err,
        WizardError::PremiumRequired {
            redirect: "/pricing".to_string()
        }
    );
    assert_eq!(wizard.state(), &WizardState::Closed);
    assert!(!wizard.is_processing());
}

// ---------------------------------------------------------------------------
// Generation outcome, retry, result
// ---------------------------------------------------------------------------

#[test]
fn generation_failure_offers_full_retry_with_same_request() {
    let mut wizard = email_wizard_at_style();
    let (ticket, first) = wizard.begin_submit(Step::Style).unwrap();
    wizard
        .complete_submit(
            ticket,
            SubmitOutcome::Failed("stage generate-subject-lines failed".to_string()),
        )
        .unwrap();

    assert!(matches!(
        wizard.state(),
        WizardState::Error { retry: true, .. }
    ));
    assert!(wizard.visibility().error);

    let (retry_ticket, second) = wizard.retry().unwrap();
    assert_eq!(first, second);
    assert_eq!(wizard.state(), &WizardState::Generating);
    assert_ne!(ticket, retry_ticket);
}

#[test]
fn retry_outside_error_state_is_invalid() {
    let mut wizard = email_wizard_at_style();
    assert!(matches!(
        wizard.retry(),
        Err(WizardError::InvalidTransition { .. })
    ));
}

#[test]
fn email_result_toggle_swaps_subjects_without_touching_body() {
    let mut wizard = email_wizard_at_style();
    let (ticket, _) = wizard.begin_submit(Step::Style).unwrap();
    wizard
        .complete_submit(ticket, SubmitOutcome::Generated(Box::new(email_artifact())))
        .unwrap();
    assert!(wizard.visibility().result);

    let view = wizard.result_mut().expect("result shown");
    let body_before = view.body().to_string();
    view.toggle_subject();
    assert_eq!(view.subject(), Some("Drugi temat"));
    assert_eq!(view.alternative_subject(), Some("Pierwszy temat"));
    assert_eq!(view.body(), body_before);
}

#[test]
fn project_draft_failures_keep_result_and_toast() {
    let mut wizard = email_wizard_at_style();
    let (ticket, _) = wizard.begin_submit(Step::Style).unwrap();
    wizard
        .complete_submit(ticket, SubmitOutcome::Generated(Box::new(email_artifact())))
        .unwrap();
    wizard
        .result_mut()
        .expect("result")
        .edit_body("Poprawiona treść");
    wizard.take_toasts();

    assert_eq!(wizard.project_draft(None), Err(SaveError::MissingUser));
    assert_eq!(wizard.toasts().len(), 1);
    assert_eq!(
        wizard.result().map(|r| r.body().to_string()),
        Some("Poprawiona treść".to_string())
    );

    let draft = wizard.project_draft(Some(Uuid::new_v4())).unwrap();
    assert_eq!(draft.content, "Poprawiona treść");
    assert_eq!(draft.title, "Pierwszy temat");
    assert_eq!(draft.structure.as_deref(), Some("PAS"));
    assert_eq!(Some(draft.audience_id), wizard.profile().id);
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[test]
fn snapshot_round_trips_through_json() {
    let wizard = email_wizard_at_style();
    let json = serde_json::to_string(&wizard.snapshot()).unwrap();
    let snapshot: WizardSnapshot = serde_json::from_str(&json).unwrap();
    let restored = Wizard::restore(snapshot, Entitlement::Premium);

    assert_eq!(restored.state(), &WizardState::AwaitingStyle);
    assert_eq!(restored.goal(), "Zapis na webinar");
    assert_eq!(
        restored.option(),
        Some(ChannelOption::EmailStyle(EmailStyle::Story))
    );
}

#[test]
fn restoring_mid_generation_never_restores_processing() {
    let mut wizard = email_wizard_at_style();
    let _ = wizard.begin_submit(Step::Style).unwrap();
    let snapshot = wizard.snapshot();
    assert_eq!(snapshot.state, WizardState::Generating);

    let mut restored = Wizard::restore(snapshot, Entitlement::Premium);
    assert!(!restored.is_processing());
    assert!(matches!(
        restored.state(),
        WizardState::Error { retry: true, .. }
    ));
    assert!(restored.retry().is_ok());
}
