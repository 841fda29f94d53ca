#![allow(dead_code)]

use std::sync::OnceLock;

use kura_common::observability::{LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "kura-tests",
            emit_stderr: true,
            format: if std::env::var("KURA_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
            ..LogConfig::default()
        };

        kura_common::observability::init_logging(config).unwrap_or_default()
    });
}

pub const MODEL: &str = "test-model";
pub const API_KEY: &str = "test-key";
pub const GENERATE_PATH: &str = "/v1beta/models/test-model:generateContent";

/// Wrap `text` in a single-candidate `generateContent` response.
pub fn text_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "totalTokenCount": 42 }
    })
}
