use copydesk_core::{GeneratedArtifact, Structure};
use copydesk_db::NewProject;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SaveError;

/// Editable view over a generated artifact.
///
/// The body is editable; hooks and the selected hook stay as generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    artifact: GeneratedArtifact,
    body: String,
}

impl ResultView {
    #[must_use]
    pub fn new(artifact: GeneratedArtifact) -> Self {
        let body = artifact.body.clone();
        Self { artifact, body }
    }

    /// The artifact as generated, with the current subject selection applied.
    #[must_use]
    pub fn artifact(&self) -> &GeneratedArtifact {
        &self.artifact
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn edit_body(&mut self, text: impl Into<String>) {
        self.body = text.into();
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.artifact.subject.as_deref()
    }

    #[must_use]
    pub fn alternative_subject(&self) -> Option<&str> {
        self.artifact.alternative_subject.as_deref()
    }

    /// Swaps the subject with its alternative. No-op when either is missing.
    pub fn toggle_subject(&mut self) {
        if self.artifact.subject.is_some() && self.artifact.alternative_subject.is_some() {
            std::mem::swap(
                &mut self.artifact.subject,
                &mut self.artifact.alternative_subject,
            );
        }
    }

    #[must_use]
    pub fn hooks(&self) -> &[String] {
        &self.artifact.hooks
    }

    #[must_use]
    pub fn selected_hook(&self) -> &str {
        &self.artifact.selected_hook
    }

    #[must_use]
    pub fn structure(&self) -> Option<Structure> {
        self.artifact.structure
    }

    /// Builds the project row for the current view.
    ///
    /// # Errors
    ///
    /// [`SaveError::MissingUser`] without a user id,
    /// [`SaveError::MissingAudience`] without a saved audience id.
    pub fn project_draft(
        &self,
        user_id: Option<Uuid>,
        audience_id: Option<Uuid>,
    ) -> Result<NewProject, SaveError> {
        let user_id = user_id.ok_or(SaveError::MissingUser)?;
        let audience_id = audience_id.ok_or(SaveError::MissingAudience)?;
        Ok(NewProject::from_artifact(
            user_id,
            audience_id,
            &self.artifact,
            &self.body,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copydesk_core::Channel;

    fn email_view() -> ResultView {
        ResultView::new(GeneratedArtifact {
            run_id: Uuid::nil(),
            channel: Channel::Email,
            hooks: Vec::new(),
            selected_hook: "Temat A".to_string(),
            body: "Treść".to_string(),
            subject: Some("Temat A".to_string()),
            alternative_subject: Some("Temat B".to_string()),
            structure: Some(Structure::Cjn),
            blueprint: None,
            social: None,
            fallback_stages: Vec::new(),
        })
    }

    #[test]
    fn toggle_swaps_subjects_and_keeps_body() {
        let mut view = email_view();
        view.edit_body("Moja wersja");
        view.toggle_subject();
        assert_eq!(view.subject(), Some("Temat B"));
        assert_eq!(view.alternative_subject(), Some("Temat A"));
        assert_eq!(view.body(), "Moja wersja");
        view.toggle_subject();
        assert_eq!(view.subject(), Some("Temat A"));
    }

    #[test]
    fn edit_body_keeps_hooks() {
        let mut view = email_view();
        view.edit_body("Nowa treść");
        assert_eq!(view.selected_hook(), "Temat A");
        assert_eq!(view.artifact().body, "Treść");
    }

    #[test]
    fn draft_uses_toggled_subject_for_title() {
        let mut view = email_view();
        view.toggle_subject();
        let draft = view
            .project_draft(Some(Uuid::new_v4()), Some(Uuid::new_v4()))
            .unwrap();
        assert_eq!(draft.title, "Temat B");
        assert_eq!(draft.content, "Treść");
        assert_eq!(draft.structure.as_deref(), Some("CJN"));
    }

    #[test]
    fn draft_requires_user_then_audience() {
        let view = email_view();
        assert_eq!(
            view.project_draft(None, Some(Uuid::new_v4())),
            Err(SaveError::MissingUser)
        );
        assert_eq!(
            view.project_draft(Some(Uuid::new_v4()), None),
            Err(SaveError::MissingAudience)
        );
        assert_eq!(view.body(), "Treść");
    }
}
