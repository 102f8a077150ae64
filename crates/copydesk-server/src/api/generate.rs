//! Generation handler: runs the prompt pipeline for a saved audience.

use axum::{extract::State, Extension, Json};
use copydesk_core::{Channel, ChannelOption, GeneratedArtifact, GenerationRequest};
use copydesk_pipeline::PipelineError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{CurrentUser, RequestId};

use super::audiences::not_found;
use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(in crate::api) struct GenerateRequest {
    pub audience_id: Uuid,
    pub channel: Channel,
    pub goal: String,
    /// Email style or social platform, e.g. `"story"` or `"tiktok"`.
    pub option: Option<String>,
    /// Store the result as a project right away.
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(in crate::api) struct GenerateResponse {
    pub artifact: GeneratedArtifact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
}

fn map_pipeline_error(req_id: &str, error: &PipelineError) -> ApiError {
    match error {
        PipelineError::InvalidRequest(e) => {
            ApiError::new(req_id, "validation_error", e.to_string())
        }
        PipelineError::Stage { stage, .. } => {
            tracing::error!(stage, error = %error, "generation aborted");
            ApiError::new(
                req_id,
                "upstream_error",
                format!("generation failed at stage {stage}"),
            )
        }
        other => {
            tracing::error!(error = %other, "generation failed");
            ApiError::new(req_id, "internal_error", "generation failed")
        }
    }
}

/// POST /api/v1/generate, premium only.
pub(in crate::api) async fn generate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<ApiResponse<GenerateResponse>>, ApiError> {
    let rid = &req_id.0;

    if !user.is_premium {
        tracing::info!(user_id = %user.user_id, "generation refused, premium required");
        return Err(
            ApiError::new(rid, "payment_required", "premium subscription required")
                .with_redirect(state.pricing_url.as_ref()),
        );
    }

    let option = body
        .option
        .as_deref()
        .map(|value| ChannelOption::parse(body.channel, value))
        .transpose()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let audience = copydesk_db::get_audience(&state.pool, user.user_id, body.audience_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| not_found(rid, "audience"))?;

    let request = GenerationRequest::new(audience, body.channel, &body.goal, option)
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let artifact = state
        .pipeline
        .run(&request)
        .await
        .map_err(|e| map_pipeline_error(rid, &e))?;

    let project_id = if body.save {
        let project = copydesk_db::NewProject::from_artifact(
            user.user_id,
            body.audience_id,
            &artifact,
            &artifact.body,
        );
        let id = copydesk_db::insert_project(&state.pool, &project)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
        Some(id)
    } else {
        None
    };

    Ok(Json(ApiResponse {
        data: GenerateResponse {
            artifact,
            project_id,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{
        authed_request, complete_profile, insert_session, json_body, test_state,
    };
    use super::super::{build_app, default_rate_limit_state};
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount(server: &MockServer, function: &str, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(format!("/functions/v1/{function}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn free_user_gets_payment_required_with_redirect(pool: sqlx::PgPool) {
        insert_session(&pool, "free", false, "NOW() + INTERVAL '1 hour'").await;
        let app = build_app(test_state(pool, "http://127.0.0.1:9"), default_rate_limit_state());

        let body = json!({
            "audienceId": uuid::Uuid::new_v4(),
            "channel": "ad",
            "goal": "Sprzedaż",
        });
        let response = app
            .oneshot(authed_request("POST", "/api/v1/generate", "free", Some(body)))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "payment_required");
        assert_eq!(json["error"]["redirect"], "/pricing");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn email_generation_saves_project_with_structure_tag(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        mount(
            &server,
            "generate-email-blueprint",
            json!({"emotionalPoints": "a", "narrativeAxis": "b", "style": "c"}),
        )
        .await;
        mount(
            &server,
            "generate-subject-lines",
            json!({"subject1": "Temat, który ma zdecydowanie więcej niż pięćdziesiąt znaków", "subject2": "Krótki"}),
        )
        .await;
        mount(&server, "generate-email-content", json!({"content": "Treść"})).await;
        mount(&server, "cleanup-email", json!({"content": "Treść po korekcie"})).await;

        let user = insert_session(&pool, "premium", true, "NOW() + INTERVAL '1 hour'").await;
        let audience = copydesk_db::insert_audience(&pool, user, &complete_profile("Mamy"))
            .await
            .expect("insert audience");
        let app = build_app(
            test_state(pool.clone(), &server.uri()),
            default_rate_limit_state(),
        );

        let body = json!({
            "audienceId": audience,
            "channel": "email",
            "goal": "Zapis na webinar",
            "option": "story",
            "save": true,
        });
        let response = app
            .oneshot(authed_request("POST", "/api/v1/generate", "premium", Some(body)))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        let artifact = &json["data"]["artifact"];
        assert_eq!(artifact["alternativeSubject"], "Krótki");
        assert_eq!(artifact["body"], "Treść po korekcie");
        let structure = artifact["structure"].as_str().expect("structure tag");
        assert!(structure == "PAS" || structure == "CJN");

        let project_id: uuid::Uuid = json["data"]["projectId"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("project id");
        let row = copydesk_db::get_project(&pool, user, project_id)
            .await
            .expect("query")
            .expect("project saved");
        assert_eq!(row.structure.as_deref(), Some(structure));
        assert_eq!(row.title.chars().count(), 50);
        assert_eq!(row.title, "Temat, który ma zdecydowanie więcej niż pięćdziesi");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn failing_stage_maps_to_bad_gateway(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let user = insert_session(&pool, "premium", true, "NOW() + INTERVAL '1 hour'").await;
        let audience = copydesk_db::insert_audience(&pool, user, &complete_profile("Mamy"))
            .await
            .expect("insert audience");
        let app = build_app(test_state(pool, &server.uri()), default_rate_limit_state());

        let body = json!({
            "audienceId": audience,
            "channel": "social",
            "goal": "Zasięgi",
            "option": "tiktok",
        });
        let response = app
            .oneshot(authed_request("POST", "/api/v1/generate", "premium", Some(body)))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "upstream_error");
        assert!(json["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("generate-social-hook")));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unknown_option_is_a_validation_error(pool: sqlx::PgPool) {
        insert_session(&pool, "premium", true, "NOW() + INTERVAL '1 hour'").await;
        let app = build_app(test_state(pool, "http://127.0.0.1:9"), default_rate_limit_state());

        let body = json!({
            "audienceId": uuid::Uuid::new_v4(),
            "channel": "email",
            "goal": "x",
            "option": "tiktok",
        });
        let response = app
            .oneshot(authed_request("POST", "/api/v1/generate", "premium", Some(body)))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
