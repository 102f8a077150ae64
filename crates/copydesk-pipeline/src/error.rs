use thiserror::Error;

/// Errors returned by the edge-function client and the prompt pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The function endpoint answered with a non-2xx status.
    #[error("unexpected HTTP status {status} from function {function}")]
    UnexpectedStatus { status: u16, function: String },

    /// The function answered `{"error": "..."}`.
    #[error("function {function} returned an error: {message}")]
    Remote { function: String, message: String },

    /// The response body could not be decoded as JSON.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A prompt template referenced a placeholder with no value.
    #[error("template {template} has unresolved placeholders: {}", missing.join(", "))]
    Template {
        template: String,
        missing: Vec<String>,
    },

    /// The prompt catalogue could not be loaded.
    #[error("prompt catalogue error: {0}")]
    Catalog(String),

    /// The generation request itself is invalid.
    #[error("invalid generation request: {0}")]
    InvalidRequest(#[from] copydesk_core::CoreError),

    /// A stage failed after exhausting its retries; the run was aborted.
    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Name of the stage that aborted the run, if any.
    #[must_use]
    pub fn failed_stage(&self) -> Option<&'static str> {
        match self {
            PipelineError::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }
}
