use crate::outcome::{settle, Outcome};
use crate::schema::Schema;
use crate::traits::{UpstreamError, UpstreamModelClient};
use crate::types::{AnalysisResult, Sentiment};
use std::sync::Arc;

/// Structured sentiment/risk assessment of election-related posts.
///
/// `analyze` never fails: when the upstream cannot answer, the caller gets
/// [`AnalysisResult::fallback`].
#[derive(Clone)]
pub struct ContentAnalyzer {
    client: Arc<dyn UpstreamModelClient>,
}

impl ContentAnalyzer {
    pub fn new(client: Arc<dyn UpstreamModelClient>) -> Self {
        Self { client }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    pub async fn analyze(&self, text: &str) -> AnalysisResult {
        self.analyze_outcome(text).await.into_inner()
    }

    /// Like [`analyze`](Self::analyze), but keeps whether the fallback was used.
    pub async fn analyze_outcome(&self, text: &str) -> Outcome<AnalysisResult> {
        let outcome = settle(self.try_analyze(text), AnalysisResult::fallback).await;
        match &outcome {
            Outcome::Answered(result) => tracing::debug!(
                model = self.client.model_name(),
                sentiment = result.sentiment.as_str(),
                risk_score = result.risk_score.get(),
                "analyze.answered"
            ),
            Outcome::Degraded { cause, .. } => tracing::warn!(
                model = self.client.model_name(),
                error = %cause,
                "analyze.degraded"
            ),
        }
        outcome
    }

    async fn try_analyze(&self, text: &str) -> Result<AnalysisResult, UpstreamError> {
        let prompt = build_analysis_prompt(text);
        let payload = self
            .client
            .generate_structured(&prompt, &analysis_schema())
            .await?;
        serde_json::from_value(payload).map_err(|e| UpstreamError::Format(e.to_string()))
    }
}

/// Response schema mirroring [`AnalysisResult`].
pub fn analysis_schema() -> Schema {
    Schema::object()
        .property(
            "sentiment",
            Schema::string_enum(Sentiment::ALL.iter().map(|s| s.as_str())),
        )
        .property("riskScore", Schema::number())
        .property("summary", Schema::string())
        .property("topics", Schema::array(Schema::string()))
        .required(["sentiment", "riskScore", "summary", "topics"])
}

fn build_analysis_prompt(text: &str) -> String {
    format!(
        "Analyze the following social media post related to the Kenyan general election.\n\
         Determine its sentiment, a risk score from 0 to 100 reflecting its potential to incite \
         violence or spread misinformation, a short summary, and its key topics.\n\n\
         Post: \"{text}\""
    )
}
