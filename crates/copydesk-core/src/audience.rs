//! Target-audience profile and its field-level validation schema.
//!
//! A profile is authored one field at a time by the wizard, validated per
//! field on every step, and validated as a whole before it is persisted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const PAIN_SLOTS: usize = 5;
pub const DESIRE_SLOTS: usize = 5;
pub const COMPETITOR_SLOTS: usize = 3;
pub const BENEFIT_SLOTS: usize = 5;

/// Upper bound on any single text value, counted in characters.
const MAX_FIELD_CHARS: usize = 4000;

/// Every profile field in the order the form collects them.
pub const PROFILE_FIELDS: [ProfileField; 13] = [
    ProfileField::Name,
    ProfileField::AgeRange,
    ProfileField::Gender,
    ProfileField::Competitors,
    ProfileField::LanguageSamples,
    ProfileField::Biography,
    ProfileField::Beliefs,
    ProfileField::Pains,
    ProfileField::Desires,
    ProfileField::Offer,
    ProfileField::Benefits,
    ProfileField::WhyItWorks,
    ProfileField::Experience,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileField {
    Name,
    AgeRange,
    Gender,
    Competitors,
    LanguageSamples,
    Biography,
    Beliefs,
    Pains,
    Desires,
    Offer,
    Benefits,
    WhyItWorks,
    Experience,
}

impl ProfileField {
    /// Number of fixed slots for list fields, `None` for scalar text fields.
    #[must_use]
    pub fn slot_count(self) -> Option<usize> {
        match self {
            ProfileField::Pains => Some(PAIN_SLOTS),
            ProfileField::Desires => Some(DESIRE_SLOTS),
            ProfileField::Competitors => Some(COMPETITOR_SLOTS),
            ProfileField::Benefits => Some(BENEFIT_SLOTS),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::AgeRange => "ageRange",
            ProfileField::Gender => "gender",
            ProfileField::Competitors => "competitors",
            ProfileField::LanguageSamples => "languageSamples",
            ProfileField::Biography => "biography",
            ProfileField::Beliefs => "beliefs",
            ProfileField::Pains => "pains",
            ProfileField::Desires => "desires",
            ProfileField::Offer => "offer",
            ProfileField::Benefits => "benefits",
            ProfileField::WhyItWorks => "whyItWorks",
            ProfileField::Experience => "experience",
        }
    }
}

impl std::fmt::Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field-level validation failure. `slot` is set for list fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}{}: {message}", slot_suffix(.slot))]
pub struct ValidationError {
    pub field: ProfileField,
    pub slot: Option<usize>,
    pub message: String,
}

#[allow(clippy::ref_option)] // thiserror passes fields by reference
fn slot_suffix(slot: &Option<usize>) -> String {
    slot.map(|s| format!("[{s}]")).unwrap_or_default()
}

impl ValidationError {
    fn new(field: ProfileField, slot: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            field,
            slot,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub name: String,
    pub age_range: String,
    pub gender: String,
    pub language_samples: String,
    pub biography: String,
    pub beliefs: String,
    pub pains: [String; PAIN_SLOTS],
    pub desires: [String; DESIRE_SLOTS],
    pub competitors: [String; COMPETITOR_SLOTS],
    pub offer: String,
    pub benefits: [String; BENEFIT_SLOTS],
    pub why_it_works: String,
    pub experience: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AudienceProfile {
    /// Scalar value of `field`, or `None` when `field` is a list field.
    #[must_use]
    pub fn text(&self, field: ProfileField) -> Option<&str> {
        let value = match field {
            ProfileField::Name => &self.name,
            ProfileField::AgeRange => &self.age_range,
            ProfileField::Gender => &self.gender,
            ProfileField::LanguageSamples => &self.language_samples,
            ProfileField::Biography => &self.biography,
            ProfileField::Beliefs => &self.beliefs,
            ProfileField::Offer => &self.offer,
            ProfileField::WhyItWorks => &self.why_it_works,
            ProfileField::Experience => &self.experience,
            ProfileField::Competitors
            | ProfileField::Pains
            | ProfileField::Desires
            | ProfileField::Benefits => return None,
        };
        Some(value.as_str())
    }

    pub fn text_mut(&mut self, field: ProfileField) -> Option<&mut String> {
        match field {
            ProfileField::Name => Some(&mut self.name),
            ProfileField::AgeRange => Some(&mut self.age_range),
            ProfileField::Gender => Some(&mut self.gender),
            ProfileField::LanguageSamples => Some(&mut self.language_samples),
            ProfileField::Biography => Some(&mut self.biography),
            ProfileField::Beliefs => Some(&mut self.beliefs),
            ProfileField::Offer => Some(&mut self.offer),
            ProfileField::WhyItWorks => Some(&mut self.why_it_works),
            ProfileField::Experience => Some(&mut self.experience),
            ProfileField::Competitors
            | ProfileField::Pains
            | ProfileField::Desires
            | ProfileField::Benefits => None,
        }
    }

    /// Slot values of a list field, or `None` when `field` is scalar.
    #[must_use]
    pub fn slots(&self, field: ProfileField) -> Option<&[String]> {
        match field {
            ProfileField::Pains => Some(&self.pains),
            ProfileField::Desires => Some(&self.desires),
            ProfileField::Competitors => Some(&self.competitors),
            ProfileField::Benefits => Some(&self.benefits),
            _ => None,
        }
    }

    pub fn slots_mut(&mut self, field: ProfileField) -> Option<&mut [String]> {
        match field {
            ProfileField::Pains => Some(&mut self.pains),
            ProfileField::Desires => Some(&mut self.desires),
            ProfileField::Competitors => Some(&mut self.competitors),
            ProfileField::Benefits => Some(&mut self.benefits),
            _ => None,
        }
    }

    /// Validates a single field.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found: an empty value, an empty
    /// slot, or a value longer than the per-field character limit.
    pub fn validate_field(&self, field: ProfileField) -> Result<(), ValidationError> {
        if let Some(slots) = self.slots(field) {
            for (idx, value) in slots.iter().enumerate() {
                check_text(field, Some(idx), value)?;
            }
            return Ok(());
        }
        let value = self.text(field).unwrap_or_default();
        check_text(field, None, value)
    }

    /// Validates every field in form order.
    ///
    /// # Errors
    ///
    /// Returns the first failing field's [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        PROFILE_FIELDS
            .iter()
            .try_for_each(|field| self.validate_field(*field))
    }

    /// Returns the profile with every text value trimmed.
    #[must_use]
    pub fn trimmed(mut self) -> Self {
        for field in PROFILE_FIELDS {
            if let Some(value) = self.text_mut(field) {
                *value = value.trim().to_string();
            } else if let Some(slots) = self.slots_mut(field) {
                for slot in slots {
                    *slot = slot.trim().to_string();
                }
            }
        }
        self
    }
}

fn check_text(
    field: ProfileField,
    slot: Option<usize>,
    value: &str,
) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        let message = if slot.is_some() {
            "every slot must be filled in"
        } else {
            "this field is required"
        };
        return Err(ValidationError::new(field, slot, message));
    }
    if trimmed.chars().count() > MAX_FIELD_CHARS {
        return Err(ValidationError::new(
            field,
            slot,
            format!("must be at most {MAX_FIELD_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Drops repeated profiles, keeping the first occurrence of each id.
///
/// Profiles without an id are unsaved drafts and are dropped.
#[must_use]
pub fn unique_by_id(profiles: Vec<AudienceProfile>) -> Vec<AudienceProfile> {
    let mut seen = HashSet::new();
    profiles
        .into_iter()
        .filter(|p| p.id.is_some_and(|id| seen.insert(id)))
        .collect()
}
