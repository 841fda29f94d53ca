use crate::schema::{Schema, SchemaViolation};
use crate::types::Source;
use async_trait::async_trait;
use kura_http::HttpError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prose answer from search-grounded generation plus the citations the
/// upstream attached to it, in the order it returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundedText {
    pub text: String,
    pub citations: Vec<Source>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// No credential configured; raised before any I/O.
    #[error("upstream model is not configured")]
    Unavailable,

    /// The call failed on the wire or the service answered with an error status.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// A response arrived but did not have the expected shape.
    #[error("upstream format error: {0}")]
    Format(String),
}

impl From<HttpError> for UpstreamError {
    fn from(err: HttpError) -> Self {
        if err.is_decode() {
            UpstreamError::Format(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

impl From<SchemaViolation> for UpstreamError {
    fn from(violation: SchemaViolation) -> Self {
        UpstreamError::Format(violation.to_string())
    }
}

/// Everything the pipeline knows about the hosted model.
///
/// Structured output and search grounding are separate calls because the
/// upstream refuses to combine them.
#[async_trait]
pub trait UpstreamModelClient: Send + Sync {
    /// Whether a credential is configured. Never touches the network.
    fn is_available(&self) -> bool;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    /// Generate a JSON payload constrained to `schema`.
    ///
    /// The returned value has already been checked against `schema`; a
    /// payload that does not conform is reported as [`UpstreamError::Format`].
    async fn generate_structured(&self, prompt: &str, schema: &Schema)
        -> Result<Value, UpstreamError>;

    /// Generate free text with web-search grounding enabled.
    ///
    /// Citations lacking a title or a URI are dropped; the rest keep the
    /// upstream's order, duplicates included.
    async fn generate_with_search(&self, prompt: &str) -> Result<GroundedText, UpstreamError>;
}
