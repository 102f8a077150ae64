use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
}

/// A user-facing notification queued by the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }
}

pub(crate) const PROFILE_SAVED: &str = "Grupa docelowa została zapisana.";
pub(crate) const PROJECT_SAVED: &str = "Projekt został zapisany.";
pub(crate) const PREMIUM_REQUIRED: &str = "Generowanie treści wymaga konta premium.";
pub(crate) const EMPTY_GOAL: &str = "Podaj cel, zanim przejdziesz dalej.";
pub(crate) const MISSING_USER: &str = "Musisz być zalogowany, aby zapisać projekt.";
pub(crate) const MISSING_AUDIENCE: &str =
    "Brak zapisanej grupy docelowej. Projekt nie został zapisany.";
pub(crate) const INTERRUPTED: &str = "Generowanie zostało przerwane. Spróbuj ponownie.";

pub(crate) fn missing_field(field: &str) -> String {
    format!("Uzupełnij wszystkie pola w kroku „{field}”.")
}

pub(crate) fn save_failed(reason: &str) -> String {
    format!("Nie udało się zapisać grupy docelowej: {reason}")
}

pub(crate) fn generation_failed(reason: &str) -> String {
    format!("Nie udało się wygenerować treści: {reason}")
}
