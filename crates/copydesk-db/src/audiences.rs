//! Database operations for the `target_audiences` table.
//!
//! Columns are snake_case and a few are named differently from the in-memory
//! profile (`main_offer` ↔ `offer`). All conversion goes through
//! [`AudienceRow`] so the mapping lives in one place.

use chrono::{DateTime, Utc};
use copydesk_core::{unique_by_id, AudienceProfile};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `target_audiences` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AudienceRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub age_range: String,
    pub gender: String,
    pub language_samples: String,
    pub biography: String,
    pub beliefs: String,
    pub pains: Vec<String>,
    pub desires: Vec<String>,
    pub competitors: Vec<String>,
    pub main_offer: String,
    pub benefits: Vec<String>,
    pub why_it_works: String,
    pub experience: String,
    pub created_at: DateTime<Utc>,
}

const AUDIENCE_COLUMNS: &str = "id, user_id, name, age_range, gender, language_samples, biography, \
     beliefs, pains, desires, competitors, main_offer, benefits, why_it_works, experience, created_at";

fn fixed_slots<const N: usize>(
    id: Uuid,
    column: &str,
    values: Vec<String>,
) -> Result<[String; N], DbError> {
    <[String; N]>::try_from(values).map_err(|v| {
        DbError::Integrity(format!(
            "target_audiences.{column} for {id} has {} entries, expected {N}",
            v.len()
        ))
    })
}

impl TryFrom<AudienceRow> for AudienceProfile {
    type Error = DbError;

    fn try_from(row: AudienceRow) -> Result<Self, Self::Error> {
        Ok(AudienceProfile {
            id: Some(row.id),
            user_id: Some(row.user_id),
            pains: fixed_slots(row.id, "pains", row.pains)?,
            desires: fixed_slots(row.id, "desires", row.desires)?,
            competitors: fixed_slots(row.id, "competitors", row.competitors)?,
            benefits: fixed_slots(row.id, "benefits", row.benefits)?,
            name: row.name,
            age_range: row.age_range,
            gender: row.gender,
            language_samples: row.language_samples,
            biography: row.biography,
            beliefs: row.beliefs,
            offer: row.main_offer,
            why_it_works: row.why_it_works,
            experience: row.experience,
            created_at: Some(row.created_at),
        })
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a validated profile owned by `user_id` and returns its new id.
///
/// The profile is validated again here; an incomplete profile never
/// reaches the table.
///
/// # Errors
///
/// Returns [`DbError::Integrity`] if the profile fails validation, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn insert_audience(
    pool: &PgPool,
    user_id: Uuid,
    profile: &AudienceProfile,
) -> Result<Uuid, DbError> {
    profile
        .validate()
        .map_err(|e| DbError::Integrity(format!("refusing to store incomplete profile: {e}")))?;
    let profile = profile.clone().trimmed();

    let id = Uuid::new_v4();
    let inserted: Uuid = sqlx::query_scalar(
        "INSERT INTO target_audiences \
             (id, user_id, name, age_range, gender, language_samples, biography, beliefs, \
              pains, desires, competitors, main_offer, benefits, why_it_works, experience) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         RETURNING id",
    )
    .bind(id)
    .bind(user_id)
    .bind(&profile.name)
    .bind(&profile.age_range)
    .bind(&profile.gender)
    .bind(&profile.language_samples)
    .bind(&profile.biography)
    .bind(&profile.beliefs)
    .bind(profile.pains.as_slice())
    .bind(profile.desires.as_slice())
    .bind(profile.competitors.as_slice())
    .bind(&profile.offer)
    .bind(profile.benefits.as_slice())
    .bind(&profile.why_it_works)
    .bind(&profile.experience)
    .fetch_one(pool)
    .await?;

    Ok(inserted)
}

/// Returns one profile by id, only if it belongs to `user_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Integrity`]
/// if the stored row has malformed list columns.
pub async fn get_audience(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<AudienceProfile>, DbError> {
    let row = sqlx::query_as::<_, AudienceRow>(&format!(
        "SELECT {AUDIENCE_COLUMNS} FROM target_audiences WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(AudienceProfile::try_from).transpose()
}

/// Returns every profile owned by `user_id`, newest first, with no repeated ids.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Integrity`]
/// if any stored row has malformed list columns.
pub async fn list_audiences_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<AudienceProfile>, DbError> {
    let rows = sqlx::query_as::<_, AudienceRow>(&format!(
        "SELECT {AUDIENCE_COLUMNS} FROM target_audiences \
         WHERE user_id = $1 \
         ORDER BY created_at DESC, id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let profiles = rows
        .into_iter()
        .map(AudienceProfile::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(unique_by_id(profiles))
}

/// Deletes a profile owned by `user_id`. Returns `false` if nothing matched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_audience(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM target_audiences WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
