//! Database operations for the `projects` table (saved generated artifacts).

use chrono::{DateTime, Utc};
use copydesk_core::{project_title, Channel, GeneratedArtifact};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `projects` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub user_id: Uuid,
    /// `NULL` once the source audience has been deleted.
    pub audience_id: Option<Uuid>,
    pub channel: String,
    pub title: String,
    pub content: String,
    pub hooks: serde_json::Value,
    pub selected_hook: String,
    pub subject: Option<String>,
    pub alternative_subject: Option<String>,
    pub structure: Option<String>,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Values for a new `projects` row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub user_id: Uuid,
    pub audience_id: Uuid,
    pub channel: Channel,
    pub title: String,
    pub content: String,
    pub hooks: Vec<String>,
    pub selected_hook: String,
    pub subject: Option<String>,
    pub alternative_subject: Option<String>,
    pub structure: Option<String>,
    pub run_id: Uuid,
}

impl NewProject {
    /// Builds a row from an artifact as currently shown in the result view.
    ///
    /// `content` is the (possibly user-edited) body; the title is derived from
    /// the artifact's subject or hook.
    #[must_use]
    pub fn from_artifact(
        user_id: Uuid,
        audience_id: Uuid,
        artifact: &GeneratedArtifact,
        content: &str,
    ) -> Self {
        Self {
            user_id,
            audience_id,
            channel: artifact.channel,
            title: project_title(artifact),
            content: content.to_string(),
            hooks: artifact.hooks.clone(),
            selected_hook: artifact.selected_hook.clone(),
            subject: artifact.subject.clone(),
            alternative_subject: artifact.alternative_subject.clone(),
            structure: artifact.structure.map(|s| s.as_str().to_string()),
            run_id: artifact.run_id,
        }
    }
}

const PROJECT_COLUMNS: &str = "id, user_id, audience_id, channel, title, content, hooks, \
     selected_hook, subject, alternative_subject, structure, run_id, created_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a project and returns its generated id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a foreign-key
/// violation for an unknown user or audience).
pub async fn insert_project(pool: &PgPool, project: &NewProject) -> Result<Uuid, DbError> {
    let id = Uuid::new_v4();
    let inserted: Uuid = sqlx::query_scalar(
        "INSERT INTO projects \
             (id, user_id, audience_id, channel, title, content, hooks, selected_hook, \
              subject, alternative_subject, structure, run_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING id",
    )
    .bind(id)
    .bind(project.user_id)
    .bind(project.audience_id)
    .bind(project.channel.as_str())
    .bind(&project.title)
    .bind(&project.content)
    .bind(serde_json::json!(project.hooks))
    .bind(&project.selected_hook)
    .bind(project.subject.as_deref())
    .bind(project.alternative_subject.as_deref())
    .bind(project.structure.as_deref())
    .bind(project.run_id)
    .fetch_one(pool)
    .await?;

    Ok(inserted)
}

/// Returns one project owned by `user_id`, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_project(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<ProjectRow>, DbError> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns up to `limit` projects owned by `user_id`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_projects_for_user(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<ProjectRow>, DbError> {
    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects \
         WHERE user_id = $1 \
         ORDER BY created_at DESC, id \
         LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Deletes a project owned by `user_id`. Returns `false` if nothing matched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_project(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
