use crate::schema::Schema;
use crate::traits::{GroundedText, UpstreamError, UpstreamModelClient};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) enum Reply {
    Structured(Result<Value, UpstreamError>),
    Search(Result<GroundedText, UpstreamError>),
    Panic,
}

/// Canned upstream that records how it was called.
pub(crate) struct StubClient {
    available: bool,
    reply: Reply,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    last_schema: Mutex<Option<Schema>>,
}

impl StubClient {
    pub(crate) fn new(reply: Reply) -> Self {
        Self {
            available: true,
            reply,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            last_schema: Mutex::new(None),
        }
    }

    pub(crate) fn structured(payload: Result<Value, UpstreamError>) -> Self {
        Self::new(Reply::Structured(payload))
    }

    pub(crate) fn search(grounded: Result<GroundedText, UpstreamError>) -> Self {
        Self::new(Reply::Search(grounded))
    }

    /// No credential: refuses like a real client, but still counts calls.
    pub(crate) fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Reply::Panic)
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }

    pub(crate) fn last_schema(&self) -> Option<Schema> {
        self.last_schema.lock().unwrap().clone()
    }

    fn record(&self, prompt: &str) -> Result<(), UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        if self.available {
            Ok(())
        } else {
            Err(UpstreamError::Unavailable)
        }
    }
}

#[async_trait]
impl UpstreamModelClient for StubClient {
    fn is_available(&self) -> bool {
        self.available
    }

    fn model_name(&self) -> &str {
        "stub"
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Schema,
    ) -> Result<Value, UpstreamError> {
        self.record(prompt)?;
        *self.last_schema.lock().unwrap() = Some(schema.clone());
        match &self.reply {
            Reply::Structured(reply) => reply.clone(),
            Reply::Search(_) => panic!("structured call on a search stub"),
            Reply::Panic => panic!("stub client exploded"),
        }
    }

    async fn generate_with_search(&self, prompt: &str) -> Result<GroundedText, UpstreamError> {
        self.record(prompt)?;
        match &self.reply {
            Reply::Search(reply) => reply.clone(),
            Reply::Structured(_) => panic!("search call on a structured stub"),
            Reply::Panic => panic!("stub client exploded"),
        }
    }
}
