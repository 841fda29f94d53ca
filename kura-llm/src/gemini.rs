use crate::schema::Schema;
use crate::traits::{GroundedText, UpstreamError, UpstreamModelClient};
use crate::types::Source;
use async_trait::async_trait;
use kura_common::{KuraError, Result};
use kura_config::UpstreamConfig;
use kura_http::{Auth, HttpClient, RequestOpts};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::LazyLock;
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";
const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    safety_settings: Option<Vec<GeminiSafetySetting>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Schema>,
}

#[derive(Debug, Serialize)]
struct GeminiSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    google_search: EmptyObject,
}

#[derive(Debug, Default, Serialize)]
struct EmptyObject {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<GeminiGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GeminiGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GeminiGroundingChunk {
    #[serde(default)]
    web: Option<GeminiWebChunk>,
}

#[derive(Debug, Deserialize)]
struct GeminiWebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    total_token_count: Option<u32>,
}

/// Google Gemini `generateContent` client.
///
/// Built without a key it still constructs, but reports itself unavailable
/// and refuses every call before touching the network.
#[derive(Clone)]
pub struct GeminiClient {
    http: HttpClient,
    api_key: Option<String>,
    model: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.http.base().as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiClient {
    /// Create a client for `model` behind `endpoint` (the API version root).
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = HttpClient::new(endpoint)
            .map_err(|e| KuraError::Client(format!("Failed to create HTTP client: {e}")))?
            .with_timeout(timeout);

        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(Self {
            http,
            api_key,
            model,
        })
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(KuraError::Config("upstream.model must not be empty".into()));
        }
        Self::new(
            &config.endpoint,
            config.credential().map(str::to_string),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn credential(&self) -> std::result::Result<&str, UpstreamError> {
        self.api_key.as_deref().ok_or(UpstreamError::Unavailable)
    }

    // Only high-probability harm is blocked: posts under review routinely quote violent speech.
    fn create_safety_settings() -> Vec<GeminiSafetySetting> {
        [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .into_iter()
        .map(|category| GeminiSafetySetting {
            category,
            threshold: "BLOCK_ONLY_HIGH",
        })
        .collect()
    }

    fn user_contents(prompt: &str) -> Vec<GeminiContent> {
        vec![GeminiContent {
            role: "user",
            parts: vec![GeminiPart {
                text: prompt.to_string(),
            }],
        }]
    }

    fn structured_request(prompt: &str, schema: &Schema) -> GeminiRequest {
        GeminiRequest {
            contents: Self::user_contents(prompt),
            generation_config: Some(GeminiGenerationConfig {
                temperature: Some(0.2),
                response_mime_type: Some(JSON_MIME_TYPE),
                response_schema: Some(schema.clone()),
            }),
            safety_settings: Some(Self::create_safety_settings()),
            tools: None,
        }
    }

    fn search_request(prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: Self::user_contents(prompt),
            generation_config: None,
            safety_settings: Some(Self::create_safety_settings()),
            tools: Some(vec![GeminiTool {
                google_search: EmptyObject::default(),
            }]),
        }
    }

    async fn send(
        &self,
        request: &GeminiRequest,
        api_key: &str,
    ) -> std::result::Result<GeminiResponse, UpstreamError> {
        let path = format!("models/{}:generateContent", self.model);
        let opts = RequestOpts {
            auth: Some(Auth::Header {
                name: API_KEY_HEADER,
                value: Cow::Borrowed(api_key),
            }),
            ..Default::default()
        };

        tracing::debug!(model = %self.model, grounded = request.tools.is_some(), "gemini.request");
        let response: GeminiResponse = self.http.post_json_opts(&path, request, opts).await?;

        tracing::debug!(
            model = %self.model,
            candidates = response.candidates.len(),
            tokens_used = ?response.usage_metadata.as_ref().and_then(|u| u.total_token_count),
            "gemini.response"
        );
        Ok(response)
    }
}

fn first_candidate(
    response: &GeminiResponse,
) -> std::result::Result<&GeminiCandidate, UpstreamError> {
    let Some(candidate) = response.candidates.first() else {
        let reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
            .unwrap_or("none given");
        return Err(UpstreamError::Format(format!(
            "no candidates returned (block reason: {reason})"
        )));
    };

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(UpstreamError::Format(
            "content blocked by safety filters".to_string(),
        ));
    }
    Ok(candidate)
}

/// Concatenated answer text of a candidate, skipping thought parts.
fn candidate_text(candidate: &GeminiCandidate) -> String {
    candidate
        .content
        .iter()
        .flat_map(|c| &c.parts)
        .filter(|p| p.thought != Some(true))
        .filter_map(|p| p.text.as_deref())
        .collect()
}

fn candidate_citations(candidate: &GeminiCandidate) -> Vec<Source> {
    candidate
        .grounding_metadata
        .iter()
        .flat_map(|m| &m.grounding_chunks)
        .filter_map(|chunk| chunk.web.as_ref())
        .filter_map(|web| {
            let title = web.title.as_deref().filter(|t| !t.trim().is_empty())?;
            let uri = web.uri.as_deref().filter(|u| !u.trim().is_empty())?;
            Some(Source::new(title, uri))
        })
        .collect()
}

static JSON_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\}|\[.*?\])\s*```").ok());

/// Pull the object out of the first ```json fenced block if the model added one.
fn extract_json_block(text: &str) -> Option<&str> {
    JSON_FENCE
        .as_ref()?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[async_trait]
impl UpstreamModelClient for GeminiClient {
    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Schema,
    ) -> std::result::Result<Value, UpstreamError> {
        let api_key = self.credential()?;
        let request = Self::structured_request(prompt, schema);
        let response = self.send(&request, api_key).await?;

        let text = candidate_text(first_candidate(&response)?);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(UpstreamError::Format("empty structured response".to_string()));
        }

        let json_str = extract_json_block(trimmed).unwrap_or(trimmed);
        let payload: Value = serde_json::from_str(json_str)
            .map_err(|e| UpstreamError::Format(format!("response is not JSON: {e}")))?;
        schema.validate(&payload)?;
        Ok(payload)
    }

    async fn generate_with_search(
        &self,
        prompt: &str,
    ) -> std::result::Result<GroundedText, UpstreamError> {
        let api_key = self.credential()?;
        let request = Self::search_request(prompt);
        let response = self.send(&request, api_key).await?;

        let candidate = first_candidate(&response)?;
        let grounded = GroundedText {
            text: candidate_text(candidate),
            citations: candidate_citations(candidate),
        };
        tracing::debug!(
            model = %self.model,
            citations = grounded.citations.len(),
            text_len = grounded.text.len(),
            "gemini.grounded"
        );
        Ok(grounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(raw: Value) -> GeminiResponse {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn structured_request_carries_schema_and_no_tools() {
        let schema = Schema::object()
            .property("summary", Schema::string())
            .required(["summary"]);
        let body = serde_json::to_value(GeminiClient::structured_request("hi", &schema)).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], json!("hi"));
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            json!("application/json")
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], json!("OBJECT"));
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn search_request_enables_grounding_without_schema() {
        let body = serde_json::to_value(GeminiClient::search_request("claim")).unwrap();
        assert_eq!(body["tools"], json!([{ "googleSearch": {} }]));
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn citations_missing_title_or_uri_are_dropped_in_order() {
        let response = decode(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Verdict: False." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://a.example", "title": "A" } },
                        { "web": { "uri": "https://b.example" } },
                        { "web": { "title": "C only" } },
                        { "retrievedContext": { "uri": "gs://ignored" } },
                        { "web": { "uri": "https://d.example", "title": "  " } },
                        { "web": { "uri": "https://e.example", "title": "E" } },
                        { "web": { "uri": "https://a.example", "title": "A" } }
                    ]
                }
            }]
        }));
        let candidate = first_candidate(&response).unwrap();

        assert_eq!(
            candidate_citations(candidate),
            vec![
                Source::new("A", "https://a.example"),
                Source::new("E", "https://e.example"),
                Source::new("A", "https://a.example"),
            ]
        );
    }

    #[test]
    fn text_parts_are_concatenated_and_thoughts_skipped() {
        let response = decode(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "thinking...", "thought": true },
                    { "text": "Verdict: True. " },
                    { "text": "Results were announced." }
                ]}
            }]
        }));
        let candidate = first_candidate(&response).unwrap();
        assert_eq!(
            candidate_text(candidate),
            "Verdict: True. Results were announced."
        );
    }

    #[test]
    fn missing_candidates_report_block_reason() {
        let response = decode(json!({ "promptFeedback": { "blockReason": "OTHER" } }));
        match first_candidate(&response) {
            Err(UpstreamError::Format(msg)) => assert!(msg.contains("OTHER")),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn safety_finish_is_a_format_error() {
        let response = decode(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }));
        assert!(matches!(
            first_candidate(&response),
            Err(UpstreamError::Format(_))
        ));
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_block(text), Some("{\"a\": 1}"));
        assert_eq!(extract_json_block("{\"a\": 1}"), None);
    }

    #[test]
    fn only_the_first_fenced_block_is_taken() {
        let text = "```json\n{\"a\": 1}\n```\nAlternatively:\n```json\n{\"b\": 2}\n```";
        assert_eq!(extract_json_block(text), Some("{\"a\": 1}"));

        let nested = "```json\n{\"a\": {\"b\": 2}}\n```";
        assert_eq!(extract_json_block(nested), Some("{\"a\": {\"b\": 2}}"));
    }

    #[tokio::test]
    async fn missing_key_is_unavailable_before_any_io() {
        // Unroutable endpoint: any network attempt would surface as Transport.
        let client = GeminiClient::new(
            "http://127.0.0.1:9/v1beta",
            Some("   ".into()),
            "gemini-2.5-flash".into(),
            Duration::from_millis(50),
        )
        .unwrap();

        assert!(!client.is_available());
        let schema = Schema::object();
        assert_eq!(
            client.generate_structured("x", &schema).await,
            Err(UpstreamError::Unavailable)
        );
        assert_eq!(
            client.generate_with_search("x").await,
            Err(UpstreamError::Unavailable)
        );
    }

    #[test]
    fn debug_output_hides_the_key() {
        let client = GeminiClient::new(
            "https://generativelanguage.googleapis.com/v1beta",
            Some("AIza-very-secret".into()),
            "gemini-2.5-flash".into(),
            Duration::from_secs(1),
        )
        .unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn from_config_rejects_blank_model() {
        let config = UpstreamConfig {
            model: " ".into(),
            ..UpstreamConfig::default()
        };
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(KuraError::Config(_))
        ));
    }
}
