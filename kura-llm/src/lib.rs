//! Claim verification and content analysis backed by a hosted language model.
//!
//! Two entry points, both total from the caller's point of view:
//!
//! - [`analyzer::ContentAnalyzer::analyze`] turns a post into an
//!   [`types::AnalysisResult`] using schema-constrained generation.
//! - [`verifier::ClaimVerifier::verify`] checks a claim with search-grounded
//!   generation and returns a [`types::VerificationResult`] with citations.
//!
//! Both depend on an injected [`traits::UpstreamModelClient`]; the concrete
//! Gemini implementation lives in [`gemini`]. Failures never escape: they
//! become fixed fallback results, and the `*_outcome` variants expose which
//! one happened.
//!
//! # Examples
//! ```no_run
//! use kura_config::UpstreamConfig;
//! use kura_llm::{analyzer::ContentAnalyzer, connect_upstream};
//!
//! # #[tokio::main]
//! # async fn main() -> kura_common::Result<()> {
//! let client = connect_upstream(&UpstreamConfig::default())?;
//! let analyzer = ContentAnalyzer::new(client);
//! let result = analyzer.analyze("Peaceful queues in Kisumu this morning").await;
//! assert!(result.risk_score.get() <= 100);
//! # Ok(())
//! # }
//! ```
pub mod analyzer;
pub mod gemini;
pub mod outcome;
pub mod schema;
pub mod traits;
pub mod types;
pub mod verdict;
pub mod verifier;

#[cfg(test)]
mod test_support;

use gemini::GeminiClient;
use kura_config::{Provider, UpstreamConfig};
use std::sync::Arc;
use traits::UpstreamModelClient;

/// Build the upstream client described by `config`.
///
/// A missing credential is not an error here: the returned client reports
/// `is_available() == false` and the pipeline degrades to its fallbacks.
pub fn connect_upstream(
    config: &UpstreamConfig,
) -> kura_common::Result<Arc<dyn UpstreamModelClient>> {
    match config.provider {
        Provider::Gemini => {
            let client = GeminiClient::from_config(config)?;
            tracing::info!(
                model = %config.model,
                available = client.is_available(),
                "upstream.gemini.ready"
            );
            Ok(Arc::new(client))
        }
    }
}
