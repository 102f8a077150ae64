//! Line-oriented driver for the audience-and-copy wizard.
//!
//! The state machine lives in `copydesk-wizard`; this module only reads
//! answers, performs the submitted actions through a [`Backend`], and prints
//! what the wizard shows. At any prompt `:back` goes to the previous step and
//! `:quit` (or end of input) closes the wizard.

use std::io::{BufRead, Write};
use std::path::Path;

use copydesk_core::{
    AudienceProfile, Channel, ChannelOption, GeneratedArtifact, GenerationRequest, ProfileField,
    PROFILE_FIELDS,
};
use copydesk_db::NewProject;
use copydesk_pipeline::Pipeline;
use copydesk_wizard::{
    Entitlement, SubmitAction, SubmitOutcome, Ticket, ToastKind, Wizard, WizardError,
    WizardSnapshot, WizardState,
};
use uuid::Uuid;

use crate::generate::render_artifact;

/// Side effects the wizard asks for.
pub(crate) trait Backend {
    async fn save_profile(&self, profile: &AudienceProfile) -> anyhow::Result<Uuid>;
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GeneratedArtifact>;
    async fn save_project(&self, project: &NewProject) -> anyhow::Result<Uuid>;
}

struct DbBackend<'a> {
    pool: &'a sqlx::PgPool,
    pipeline: &'a Pipeline,
    user_id: Uuid,
}

impl Backend for DbBackend<'_> {
    async fn save_profile(&self, profile: &AudienceProfile) -> anyhow::Result<Uuid> {
        Ok(copydesk_db::insert_audience(self.pool, self.user_id, profile).await?)
    }

    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GeneratedArtifact> {
        Ok(self.pipeline.run(request).await?)
    }

    async fn save_project(&self, project: &NewProject) -> anyhow::Result<Uuid> {
        Ok(copydesk_db::insert_project(self.pool, project).await?)
    }
}

/// Runs the wizard on stdin/stdout for `user_id`.
///
/// With `state_file`, a snapshot saved by an earlier session is resumed and
/// the final state is written back when the wizard closes.
///
/// # Errors
///
/// Returns an error if the user does not exist, a database query fails, or
/// the terminal cannot be read or written.
pub(crate) async fn run_interactive(
    pool: &sqlx::PgPool,
    pipeline: &Pipeline,
    pricing_url: &str,
    user_id: Uuid,
    channel: Channel,
    state_file: Option<&Path>,
) -> anyhow::Result<()> {
    let user = copydesk_db::find_user(pool, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user '{user_id}' not found"))?;
    let entitlement = Entitlement::from_premium_flag(user.is_premium);
    tracing::info!(%user_id, ?entitlement, %channel, "starting wizard");

    let wizard = match state_file.filter(|p| p.exists()) {
        Some(path) => {
            let snapshot: WizardSnapshot = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            if snapshot.channel != channel {
                anyhow::bail!(
                    "saved wizard in {} is for channel {}, not {channel}",
                    path.display(),
                    snapshot.channel
                );
            }
            Wizard::restore(snapshot, entitlement)
        }
        None => Wizard::new(channel, entitlement),
    }
    .with_pricing_url(pricing_url);

    let audiences = copydesk_db::list_audiences_for_user(pool, user_id).await?;
    let backend = DbBackend {
        pool,
        pipeline,
        user_id,
    };
    let stdin = std::io::stdin();
    let mut session = Session::new(
        wizard,
        audiences,
        user_id,
        stdin.lock(),
        std::io::stdout(),
        backend,
    );
    let outcome = session.drive().await;

    if let Some(path) = state_file {
        let json = serde_json::to_string_pretty(&session.wizard.snapshot())?;
        std::fs::write(path, json)?;
    }
    outcome
}

enum Input {
    Text(String),
    Back,
    Quit,
}

pub(crate) struct Session<R, W, B> {
    wizard: Wizard,
    audiences: Vec<AudienceProfile>,
    user_id: Uuid,
    input: R,
    out: W,
    backend: B,
}

impl<R: BufRead, W: Write, B: Backend> Session<R, W, B> {
    pub(crate) fn new(
        wizard: Wizard,
        audiences: Vec<AudienceProfile>,
        user_id: Uuid,
        input: R,
        out: W,
        backend: B,
    ) -> Self {
        Self {
            wizard,
            audiences,
            user_id,
            input,
            out,
            backend,
        }
    }

    /// Loops until the wizard is closed.
    pub(crate) async fn drive(&mut self) -> anyhow::Result<()> {
        loop {
            self.flush_toasts()?;
            match self.wizard.state().clone() {
                WizardState::Selecting => self.select()?,
                WizardState::FillingForm { step } => self.fill(step).await?,
                WizardState::AwaitingGoal => self.ask_goal().await?,
                WizardState::AwaitingStyle => self.ask_style().await?,
                WizardState::ShowingResult => self.review().await?,
                WizardState::Error { message, retry } => self.recover(&message, retry).await?,
                WizardState::Generating => {
                    anyhow::bail!("wizard is generating with no request in flight")
                }
                WizardState::Closed => return Ok(()),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    fn select(&mut self) -> anyhow::Result<()> {
        for (i, audience) in self.audiences.iter().enumerate() {
            writeln!(self.out, "  {}. {} ({})", i + 1, audience.name, audience.age_range)?;
        }
        let prompt = if self.audiences.is_empty() {
            "No saved audiences. Press enter to create one"
        } else {
            "Pick an audience number, or press enter to create a new one"
        };
        match self.read(prompt)? {
            Input::Text(answer) if answer.trim().is_empty() || answer.trim() == "n" => {
                self.apply(Wizard::create_new)?;
            }
            Input::Text(answer) => {
                let picked = answer
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| self.audiences.get(i))
                    .cloned();
                match picked {
                    Some(profile) => self.apply(|w| w.select_existing(profile))?,
                    None => writeln!(self.out, "! no audience numbered {}", answer.trim())?,
                }
            }
            Input::Back | Input::Quit => self.close(),
        }
        Ok(())
    }

    async fn fill(&mut self, field: ProfileField) -> anyhow::Result<()> {
        let position = PROFILE_FIELDS
            .iter()
            .position(|f| *f == field)
            .map_or(0, |i| i + 1);
        writeln!(self.out, "[{position}/{}] {field}", PROFILE_FIELDS.len())?;

        match field.slot_count() {
            Some(count) => {
                for slot in 0..count {
                    let current = self
                        .wizard
                        .profile()
                        .slots(field)
                        .and_then(|s| s.get(slot))
                        .cloned()
                        .unwrap_or_default();
                    let prompt = format!("  {}/{count} [{current}]", slot + 1);
                    match self.read(&prompt)? {
                        Input::Text(answer) if answer.trim().is_empty() => {}
                        Input::Text(answer) => {
                            self.apply(|w| w.set_slot(field, slot, &answer))?;
                        }
                        Input::Back => return self.back(),
                        Input::Quit => {
                            self.close();
                            return Ok(());
                        }
                    }
                }
            }
            None => {
                let current = self.wizard.profile().text(field).unwrap_or_default().to_string();
                match self.read(&format!("  [{current}]"))? {
                    Input::Text(answer) if answer.trim().is_empty() => {}
                    Input::Text(answer) => self.apply(|w| w.set_text(field, &answer))?,
                    Input::Back => return self.back(),
                    Input::Quit => {
                        self.close();
                        return Ok(());
                    }
                }
            }
        }
        self.advance().await
    }

    async fn ask_goal(&mut self) -> anyhow::Result<()> {
        let current = self.wizard.goal().to_string();
        match self.read(&format!("Goal of the copy [{current}]"))? {
            Input::Text(answer) => {
                if !answer.trim().is_empty() {
                    self.apply(|w| w.set_goal(&answer))?;
                }
                self.advance().await
            }
            Input::Back => self.back(),
            Input::Quit => {
                self.close();
                Ok(())
            }
        }
    }

    async fn ask_style(&mut self) -> anyhow::Result<()> {
        let channel = self.wizard.channel();
        let choices = ChannelOption::choices(channel);
        for (i, choice) in choices.iter().enumerate() {
            writeln!(self.out, "  {}. {}", i + 1, choice.as_str())?;
        }
        let current = self.wizard.option().map_or("", ChannelOption::as_str);
        let label = if channel == Channel::Email {
            "Email style"
        } else {
            "Platform"
        };
        match self.read(&format!("{label} [{current}]"))? {
            Input::Text(answer) => {
                let answer = answer.trim();
                if !answer.is_empty() {
                    let by_number = answer
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|i| choices.get(i).copied());
                    match by_number.map_or_else(|| ChannelOption::parse(channel, answer), Ok) {
                        Ok(option) => self.apply(|w| w.set_option(option))?,
                        Err(e) => {
                            writeln!(self.out, "! {e}")?;
                            return Ok(());
                        }
                    }
                }
                self.advance().await
            }
            Input::Back => self.back(),
            Input::Quit => {
                self.close();
                Ok(())
            }
        }
    }

    async fn review(&mut self) -> anyhow::Result<()> {
        self.print_result()?;
        let email = self.wizard.channel() == Channel::Email;
        let menu = if email {
            "[s]ave, [t]oggle subject, [e]dit body, [n]ew, [q]uit"
        } else {
            "[s]ave, [e]dit body, [n]ew, [q]uit"
        };
        let answer = match self.read(menu)? {
            Input::Text(answer) => answer.trim().to_ascii_lowercase(),
            Input::Back | Input::Quit => {
                self.close();
                return Ok(());
            }
        };
        match answer.as_str() {
            "s" => self.save_project().await?,
            "t" if email => {
                if let Some(view) = self.wizard.result_mut() {
                    view.toggle_subject();
                }
            }
            "e" => {
                let body = self.read_block("New body, end with a line containing only '.'")?;
                if let Some(view) = self.wizard.result_mut() {
                    view.edit_body(body);
                }
            }
            "n" => self.wizard.reset(),
            "q" => self.close(),
            other => writeln!(self.out, "! unknown choice '{other}'")?,
        }
        Ok(())
    }

    async fn recover(&mut self, message: &str, retry: bool) -> anyhow::Result<()> {
        writeln!(self.out, "Generation failed: {message}")?;
        let menu = if retry {
            "[r]etry, [b]ack, [q]uit"
        } else {
            "[b]ack, [q]uit"
        };
        match self.read(menu)? {
            Input::Text(answer) => match answer.trim() {
                "r" if retry => match self.wizard.retry() {
                    Ok((ticket, action)) => self.execute(ticket, action).await?,
                    Err(e) => writeln!(self.out, "! {e}")?,
                },
                "b" => self.back()?,
                "q" => self.close(),
                other => writeln!(self.out, "! unknown choice '{other}'")?,
            },
            Input::Back => self.back()?,
            Input::Quit => self.close(),
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Moves past the current step, submitting it when the wizard asks for it.
    async fn advance(&mut self) -> anyhow::Result<()> {
        match self.wizard.go_next() {
            Ok(()) => Ok(()),
            Err(WizardError::SubmitRequired(step)) => match self.wizard.begin_submit(step) {
                Ok((ticket, action)) => self.execute(ticket, action).await,
                Err(WizardError::PremiumRequired { redirect }) => {
                    self.flush_toasts()?;
                    writeln!(self.out, "Upgrade to premium to generate copy: {redirect}")?;
                    Ok(())
                }
                Err(e) => self.report(&e),
            },
            Err(e) => self.report(&e),
        }
    }

    async fn execute(&mut self, ticket: Ticket, action: SubmitAction) -> anyhow::Result<()> {
        let outcome = match action {
            SubmitAction::SaveProfile(profile) => {
                match self.backend.save_profile(&profile).await {
                    Ok(id) => SubmitOutcome::ProfileSaved(id),
                    Err(e) => SubmitOutcome::Failed(format!("{e:#}")),
                }
            }
            SubmitAction::Generate(request) => {
                writeln!(self.out, "Generating {} copy...", request.channel)?;
                self.out.flush()?;
                match self.backend.generate(&request).await {
                    Ok(artifact) => SubmitOutcome::Generated(Box::new(artifact)),
                    Err(e) => SubmitOutcome::Failed(format!("{e:#}")),
                }
            }
        };
        let saved = matches!(outcome, SubmitOutcome::ProfileSaved(_));
        self.wizard.complete_submit(ticket, outcome)?;
        if saved {
            self.audiences.insert(0, self.wizard.profile().clone());
        }
        Ok(())
    }

    async fn save_project(&mut self) -> anyhow::Result<()> {
        let Ok(project) = self.wizard.project_draft(Some(self.user_id)) else {
            return Ok(());
        };
        match self.backend.save_project(&project).await {
            Ok(id) => self.wizard.project_saved(id),
            Err(e) => writeln!(self.out, "! project could not be saved: {e:#}")?,
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Terminal plumbing
    // -----------------------------------------------------------------------

    fn read(&mut self, prompt: &str) -> anyhow::Result<Input> {
        write!(self.out, "{prompt}: ")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Input::Quit);
        }
        let line = line.trim_end_matches(['\r', '\n']);
        Ok(match line.trim() {
            ":back" => Input::Back,
            ":quit" => Input::Quit,
            _ => Input::Text(line.to_string()),
        })
    }

    fn read_block(&mut self, prompt: &str) -> anyhow::Result<String> {
        writeln!(self.out, "{prompt}")?;
        self.out.flush()?;
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line == "." {
                break;
            }
            lines.push(line.to_string());
        }
        Ok(lines.join("\n"))
    }

    fn apply(
        &mut self,
        op: impl FnOnce(&mut Wizard) -> Result<(), WizardError>,
    ) -> anyhow::Result<()> {
        match op(&mut self.wizard) {
            Ok(()) => Ok(()),
            Err(e) => self.report(&e),
        }
    }

    fn back(&mut self) -> anyhow::Result<()> {
        let result = self.wizard.go_back();
        match result {
            Ok(()) => Ok(()),
            Err(e) => self.report(&e),
        }
    }

    fn close(&mut self) {
        self.wizard.close();
    }

    fn report(&mut self, error: &WizardError) -> anyhow::Result<()> {
        self.flush_toasts()?;
        writeln!(self.out, "! {error}")?;
        Ok(())
    }

    fn flush_toasts(&mut self) -> anyhow::Result<()> {
        for toast in self.wizard.take_toasts() {
            let marker = match toast.kind {
                ToastKind::Success => "ok",
                ToastKind::Error => "error",
            };
            writeln!(self.out, "[{marker}] {}", toast.message)?;
        }
        Ok(())
    }

    fn print_result(&mut self) -> anyhow::Result<()> {
        let Some(view) = self.wizard.result() else {
            return Ok(());
        };
        let text = render_artifact(view.artifact(), view.body());
        write!(self.out, "{text}")?;
        Ok(())
    }
}
