use anyhow::Result;
use futures::future::join_all;
use kura_config::KuraConfig;
use kura_llm::analyzer::ContentAnalyzer;
use kura_llm::connect_upstream;
use kura_llm::types::{AnalysisResult, VerificationResult};
use kura_llm::verifier::ClaimVerifier;
use serde::Serialize;

/// Both pipeline entry points wired to one shared upstream client.
pub struct Tether {
    analyzer: ContentAnalyzer,
    verifier: ClaimVerifier,
    model: String,
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub available: bool,
    pub model: String,
}

impl Tether {
    pub fn status(&self) -> Status {
        Status {
            available: self.analyzer.is_available(),
            model: self.model.clone(),
        }
    }

    /// Analyze every text concurrently; results keep the input order.
    pub async fn analyze_all(&self, texts: &[String]) -> Vec<AnalysisResult> {
        join_all(texts.iter().map(|text| self.analyzer.analyze(text))).await
    }

    pub async fn verify(&self, claim: &str) -> VerificationResult {
        self.verifier.verify(claim).await
    }
}

pub fn build_from_config(cfg: &KuraConfig) -> Result<Tether> {
    let client = connect_upstream(&cfg.upstream)?;
    if !client.is_available() {
        tracing::warn!("no upstream credential configured; results will be fallbacks");
    }

    Ok(Tether {
        model: client.model_name().to_string(),
        analyzer: ContentAnalyzer::new(client.clone()),
        verifier: ClaimVerifier::new(client),
    })
}
