#![cfg(feature = "e2e")]

mod common;

use kura_config::UpstreamConfig;
use kura_llm::analyzer::ContentAnalyzer;
use kura_llm::connect_upstream;
use kura_llm::verifier::ClaimVerifier;

fn live_config_or_skip() -> UpstreamConfig {
    let key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        tracing::debug!("Skipping: GEMINI_API_KEY not set");
        panic!("SKIP");
    });
    UpstreamConfig {
        api_key: Some(key),
        model: std::env::var("KURA_GEMINI_MODEL")
            .unwrap_or_else(|_| kura_config::DEFAULT_GEMINI_MODEL.to_string()),
        ..UpstreamConfig::default()
    }
}

#[tokio::test]
#[ignore]
async fn gemini_analyze_smoketest() {
    common::init_test_tracing();
    let analyzer = ContentAnalyzer::new(connect_upstream(&live_config_or_skip()).unwrap());

    let outcome = analyzer
        .analyze_outcome("Long but peaceful queues at polling stations in Nakuru this morning.")
        .await;
    tracing::debug!(?outcome, "live analysis");

    assert!(!outcome.is_degraded(), "analysis degraded: {:?}", outcome.cause());
    assert!(!outcome.value().summary.trim().is_empty());
}

#[tokio::test]
#[ignore]
async fn gemini_verify_smoketest() {
    common::init_test_tracing();
    let verifier = ClaimVerifier::new(connect_upstream(&live_config_or_skip()).unwrap());

    let outcome = verifier
        .verify_outcome("Kenya held a general election in August 2022")
        .await;
    tracing::debug!(?outcome, "live verification");

    assert!(!outcome.is_degraded(), "verification degraded: {:?}", outcome.cause());
    assert_eq!(outcome.value().confidence.get(), 85);
}
