//! Audience profile handlers. Every query is scoped to the signed-in user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use copydesk_core::AudienceProfile;
use uuid::Uuid;

use crate::middleware::{CurrentUser, RequestId};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, serde::Serialize)]
pub(in crate::api) struct CreateAudienceResponse {
    pub id: Uuid,
}

pub(in crate::api) fn not_found(req_id: &str, what: &str) -> ApiError {
    ApiError::new(req_id, "not_found", format!("{what} not found"))
}

/// GET /api/v1/audiences: the user's saved audiences, newest first.
pub(in crate::api) async fn list_audiences(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<AudienceProfile>>>, ApiError> {
    let audiences = copydesk_db::list_audiences_for_user(&state.pool, user.user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: audiences,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/audiences: validate and store a new audience profile.
pub(in crate::api) async fn create_audience(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<AudienceProfile>,
) -> Result<(StatusCode, Json<ApiResponse<CreateAudienceResponse>>), ApiError> {
    let rid = &req_id.0;
    let profile = body.trimmed();
    if let Err(e) = profile.validate() {
        return Err(ApiError::new(rid, "validation_error", e.to_string()));
    }

    let id = copydesk_db::insert_audience(&state.pool, user.user_id, &profile)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    tracing::info!(user_id = %user.user_id, audience_id = %id, "audience created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CreateAudienceResponse { id },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/audiences/{id}
pub(in crate::api) async fn get_audience(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AudienceProfile>>, ApiError> {
    let rid = &req_id.0;
    let audience = copydesk_db::get_audience(&state.pool, user.user_id, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| not_found(rid, "audience"))?;

    Ok(Json(ApiResponse {
        data: audience,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/audiences/{id}. Saved projects keep their content.
pub(in crate::api) async fn delete_audience(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let deleted = copydesk_db::delete_audience(&state.pool, user.user_id, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(rid, "audience"))
    }
}
