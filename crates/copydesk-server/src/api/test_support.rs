//! Shared fixtures for router tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use copydesk_core::AudienceProfile;
use copydesk_pipeline::{FunctionsClient, Pipeline, PromptCatalog};
use uuid::Uuid;

use super::AppState;

pub(crate) fn test_state(pool: sqlx::PgPool, functions_url: &str) -> AppState {
    let client =
        FunctionsClient::new(functions_url, "anon-key", 5).expect("client construction");
    AppState {
        pool,
        pipeline: Arc::new(Pipeline::new(client, PromptCatalog::bundled(), 0)),
        pricing_url: Arc::from("/pricing"),
    }
}

/// Inserts a user plus a session for `token`; returns the user id.
///
/// `expires_sql` is a trusted SQL expression such as `NOW() + INTERVAL '1 hour'`.
pub(crate) async fn insert_session(
    pool: &sqlx::PgPool,
    token: &str,
    is_premium: bool,
    expires_sql: &str,
) -> Uuid {
    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, is_premium) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(format!("{user_id}@example.com"))
        .bind(is_premium)
        .execute(pool)
        .await
        .expect("insert user");
    sqlx::query(&format!(
        "INSERT INTO user_sessions (token_hash, user_id, expires_at) VALUES ($1, $2, {expires_sql})"
    ))
    .bind(copydesk_db::hash_token(token))
    .bind(user_id)
    .execute(pool)
    .await
    .expect("insert session");
    user_id
}

pub(crate) fn authed_request(
    method: &str,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub(crate) fn complete_profile(name: &str) -> AudienceProfile {
    AudienceProfile {
        name: name.to_string(),
        age_range: "25-45".to_string(),
        gender: "female".to_string(),
        language_samples: "Nie mam czasu".to_string(),
        biography: "Etat, dwoje dzieci".to_string(),
        beliefs: "Zdrowe jedzenie jest drogie".to_string(),
        pains: std::array::from_fn(|i| format!("bolączka {i}")),
        desires: std::array::from_fn(|i| format!("pragnienie {i}")),
        competitors: std::array::from_fn(|i| format!("konkurent {i}")),
        offer: "Kurs gotowania".to_string(),
        benefits: std::array::from_fn(|i| format!("korzyść {i}")),
        why_it_works: "Krótkie przepisy".to_string(),
        experience: "Dietetyczka".to_string(),
        ..AudienceProfile::default()
    }
}

pub(crate) async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json parse")
}
