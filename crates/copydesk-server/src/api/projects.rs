//! Saved project handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use copydesk_core::GeneratedArtifact;
use copydesk_db::ProjectRow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{CurrentUser, RequestId};

use super::audiences::not_found;
use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ProjectsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(in crate::api) struct CreateProjectRequest {
    pub audience_id: Uuid,
    pub artifact: GeneratedArtifact,
    /// Body as edited on the result screen; defaults to the generated body.
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct CreateProjectResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(in crate::api) struct ProjectItem {
    pub id: Uuid,
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

impl From<ProjectRow> for ProjectItem {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            audience_id: row.audience_id,
            channel: row.channel,
            title: row.title,
            content: row.content,
            hooks: row.hooks,
            selected_hook: row.selected_hook,
            subject: row.subject,
            alternative_subject: row.alternative_subject,
            structure: row.structure,
            run_id: row.run_id,
            created_at: row.created_at,
        }
    }
}

/// GET /api/v1/projects?limit=N, newest first.
pub(in crate::api) async fn list_projects(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ProjectsQuery>,
) -> Result<Json<ApiResponse<Vec<ProjectItem>>>, ApiError> {
    let limit = normalize_limit(params.limit);
    let rows = copydesk_db::list_projects_for_user(&state.pool, user.user_id, limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ProjectItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/projects
///
/// Saves a generated artifact. The audience must belong to the caller.
pub(in crate::api) async fn create_project(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateProjectResponse>>), ApiError> {
    let rid = &req_id.0;

    copydesk_db::get_audience(&state.pool, user.user_id, body.audience_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| not_found(rid, "audience"))?;

    let content = body
        .content
        .as_deref()
        .unwrap_or(body.artifact.body.as_str());
    if content.trim().is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "project content must not be empty",
        ));
    }

    let project = copydesk_db::NewProject::from_artifact(
        user.user_id,
        body.audience_id,
        &body.artifact,
        content,
    );
    let id = copydesk_db::insert_project(&state.pool, &project)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    tracing::info!(user_id = %user.user_id, project_id = %id, "project saved");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CreateProjectResponse { id },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/projects/{id}
pub(in crate::api) async fn get_project(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProjectItem>>, ApiError> {
    let rid = &req_id.0;
    let row = copydesk_db::get_project(&state.pool, user.user_id, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| not_found(rid, "project"))?;

    Ok(Json(ApiResponse {
        data: ProjectItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/projects/{id}
pub(in crate::api) async fn delete_project(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let deleted = copydesk_db::delete_project(&state.pool, user.user_id, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(rid, "project"))
    }
}
