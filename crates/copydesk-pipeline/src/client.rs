//! HTTP client for the hosted LLM edge functions.
//!
//! Every call is a `POST {base}/functions/v1/{name}` with a JSON body. Hosted
//! function gateways cache aggressively, so each request carries no-cache
//! headers, a timestamp query parameter, and three throwaway body fields
//! (`cacheBuster`, `timestamp`, `randomValue`) that make every body unique.

use std::time::Duration;

use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::PipelineError;

/// Client for the edge-function endpoints.
///
/// Use [`FunctionsClient::new`] with the project's functions base URL; tests
/// point it at a wiremock server.
pub struct FunctionsClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl FunctionsClient {
    /// Creates a client with the given base URL, bearer key, and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(base_url: &str, anon_key: &str, timeout_secs: u64) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("copydesk/0.1 (copy-pipeline)")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            anon_key: anon_key.to_owned(),
        })
    }

    pub(crate) fn function_url(&self, function: &str) -> String {
        format!("{}/functions/v1/{function}", self.base_url)
    }

    /// Invokes one function once (no retry) and returns its JSON body.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Http`] on network failure or timeout.
    /// - [`PipelineError::UnexpectedStatus`] on a non-2xx status.
    /// - [`PipelineError::Deserialize`] if the body is not JSON.
    /// - [`PipelineError::Remote`] if the body is `{"error": "..."}`.
    pub async fn invoke(&self, function: &str, payload: &Value) -> Result<Value, PipelineError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let body = with_cache_busters(payload, now_ms);

        let response = self
            .client
            .post(self.function_url(function))
            .bearer_auth(&self.anon_key)
            .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .header(PRAGMA, "no-cache")
            .query(&[("_", now_ms.to_string())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::UnexpectedStatus {
                status: status.as_u16(),
                function: function.to_owned(),
            });
        }

        let text = response.text().await?;
        let value: Value =
            serde_json::from_str(&text).map_err(|source| PipelineError::Deserialize {
                context: format!("function {function}"),
                source,
            })?;

        check_remote_error(function, &value)?;
        Ok(value)
    }
}

/// Returns `payload` (as an object) with the cache-defeating fields added.
///
/// Non-object payloads are wrapped as `{"payload": ...}`.
pub(crate) fn with_cache_busters(payload: &Value, now_ms: i64) -> Value {
    let mut object = match payload {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("payload".to_owned(), other.clone());
            map
        }
    };
    object.insert(
        "cacheBuster".to_owned(),
        Value::String(Uuid::new_v4().to_string()),
    );
    object.insert("timestamp".to_owned(), Value::from(now_ms));
    object.insert("randomValue".to_owned(), Value::from(rand::random::<f64>()));
    Value::Object(object)
}

fn check_remote_error(function: &str, body: &Value) -> Result<(), PipelineError> {
    if let Some(message) = body.get("error").and_then(Value::as_str) {
        return Err(PipelineError::Remote {
            function: function.to_owned(),
            message: message.to_owned(),
        });
    }
    Ok(())
}

impl std::fmt::Debug for FunctionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionsClient")
            .field("base_url", &self.base_url)
            .field("anon_key", &"[redacted]")
            .finish_non_exhaustive()
    }
}
