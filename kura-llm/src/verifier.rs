use crate::outcome::{settle, Outcome};
use crate::traits::{UpstreamError, UpstreamModelClient};
use crate::types::{Score, VerificationResult};
use crate::verdict::FreeTextVerdictParser;
use std::sync::Arc;

/// Confidence reported whenever a search-grounded answer came back.
///
/// It is not derived from the model; it only separates "an answer was
/// obtained" from "no answer".
pub const GROUNDED_CONFIDENCE: i64 = 85;

/// Search-grounded fact checking of claims about Kenyan civic and election events.
#[derive(Clone)]
pub struct ClaimVerifier {
    client: Arc<dyn UpstreamModelClient>,
    parser: FreeTextVerdictParser,
}

impl ClaimVerifier {
    pub fn new(client: Arc<dyn UpstreamModelClient>) -> Self {
        Self {
            client,
            parser: FreeTextVerdictParser::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    pub async fn verify(&self, claim: &str) -> VerificationResult {
        self.verify_outcome(claim).await.into_inner()
    }

    pub async fn verify_outcome(&self, claim: &str) -> Outcome<VerificationResult> {
        let outcome = settle(self.try_verify(claim), || VerificationResult::failed(claim)).await;
        match &outcome {
            Outcome::Answered(result) => tracing::debug!(
                model = self.client.model_name(),
                verdict = result.verdict.as_str(),
                sources = result.sources.len(),
                "verify.answered"
            ),
            Outcome::Degraded { cause, .. } => tracing::warn!(
                model = self.client.model_name(),
                error = %cause,
                "verify.degraded"
            ),
        }
        outcome
    }

    async fn try_verify(&self, claim: &str) -> Result<VerificationResult, UpstreamError> {
        if !self.client.is_available() {
            return Err(UpstreamError::Unavailable);
        }

        let prompt = build_verification_prompt(claim);
        let grounded = self.client.generate_with_search(&prompt).await?;

        let answered = !grounded.text.is_empty();
        Ok(VerificationResult {
            claim: claim.to_string(),
            verdict: self.parser.parse(&grounded.text),
            confidence: Score::new(if answered { GROUNDED_CONFIDENCE } else { 0 }),
            sources: grounded.citations,
            explanation: grounded.text,
        })
    }
}

fn build_verification_prompt(claim: &str) -> String {
    format!(
        "Verify this claim related to Kenyan civic or election events: \"{claim}\".\n\
         Start your answer with a single line of the form \
         \"Verdict: <True|False|Unverified|Misleading>\", then give a confidence score \
         from 0 to 100 and a brief explanation of what you found."
    )
}
