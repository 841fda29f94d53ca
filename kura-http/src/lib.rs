//! Minimal JSON-over-HTTP client with safe logging and flexible auth.
//!
//! - Request options: header `Auth` and timeout
//! - Redacts sensitive headers and query params and never logs secret values
//! - One attempt per call: failures are classified and returned, never retried
//! - Optional *raw* request/response logging via `KURA_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), kura_http::HttpError> {
//! let client = kura_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .post_json_opts("v1/items", &serde_json::json!({}), kura_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: header credentials are sanitized before use, and logs only say
//! whether a request was authenticated, never the secret.
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), final errors, and (optionally)
//! raw request/response lines (target `http.raw`) when `KURA_HTTP_RAW=1`.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::time::Duration;
use thiserror::Error;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "KURA_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;

/// Header and query names whose values never reach the logs.
const SECRET_NAMES: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "x-goog-api-key",
    "token",
    "secret",
    "client_secret",
    "bearer",
];

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SECRET_NAMES.contains(&lower.as_str())
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    if let Some(bytes) = body {
        if let Ok(s) = std::str::from_utf8(bytes) {
            let mut s = s.to_string();
            if s.len() > RAW_MAX_BODY {
                truncate_at_char_boundary(&mut s, RAW_MAX_BODY);
                s.push('…');
            }
            parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
        } else {
            parts.push(format!("--data-binary @- # ({} bytes)", bytes.len()));
        }
    }
    let (host_path, query) = redact_query(url);
    let rendered_query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    if rendered_query.is_empty() {
        parts.push(format!("'{}://{}'", url.scheme(), host_path));
    } else {
        parts.push(format!("'{}://{}?{}'", url.scheme(), host_path, rendered_query));
    }
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_secret_name(&key) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// True when a response arrived but its body could not be decoded.
    ///
    /// Everything else (bad URL, send failure, non-2xx status) happened
    /// before a usable response existed.
    pub fn is_decode(&self) -> bool {
        matches!(self, HttpError::Decode(..))
    }
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use kura_http::Auth;
/// use std::borrow::Cow;
///
/// let auth = Auth::Header {
///     name: "x-goog-api-key",
///     value: Cow::Borrowed("secret"),
/// };
/// let Auth::Header { name, .. } = auth;
/// assert_eq!(name, "x-goog-api-key");
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Credential in a custom header (e.g. Gemini: `x-goog-api-key`)
    Header { name: &'a str, value: Cow<'a, str> },
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use kura_http::{Auth, RequestOpts};
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     auth: Some(Auth::Header {
///         name: "x-goog-api-key",
///         value: Cow::Borrowed("demo"),
///     }),
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub auth: Option<Auth<'a>>,
}

// ==============================
// Client
// ==============================

#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// A trailing slash is appended when missing so that relative paths
    /// extend the base instead of replacing its last segment.
    ///
    /// ```no_run
    /// use kura_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/v1")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(60));
    /// assert_eq!(client.base().as_str(), "https://api.example.com/v1/");
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let normalized = if base.ends_with('/') {
            Cow::Borrowed(base)
        } else {
            Cow::Owned(format!("{base}/"))
        };
        let base = Url::parse(&normalized).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(60),
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    ///
    /// ```no_run
    /// use kura_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?
    ///     .with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// POST JSON with per-request options (auth/timeout).
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json_internal(Method::POST, path, body, opts)
            .await
    }

    async fn request_json_internal<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resolve_url(path)?;
        let headers = request_headers(&opts)?;
        let payload = serde_json::to_vec(body).map_err(|e| HttpError::Build(e.to_string()))?;
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let req_id = uuid::Uuid::new_v4().simple().to_string();

        let (host_path, redacted_q) = redact_query(&url);
        tracing::debug!(
            req_id = %req_id,
            method = %method,
            host_path = %host_path,
            query = ?redacted_q,
            timeout_ms = timeout.as_millis() as u64,
            authenticated = opts.auth.is_some(),
            body_len = payload.len(),
            "http.request.start"
        );
        if raw_enabled() {
            let curl = make_curl(&method, &url, &headers, Some(payload.as_slice()));
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let request = self
            .inner
            .request(method, url)
            .timeout(timeout)
            .headers(headers)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload);

        let exchange = Exchange::send(request, &req_id).await?;
        exchange.log(&req_id);
        exchange.into_json(&req_id)
    }

    /// Join `path` onto the base; a leading `/` does not reset the base path.
    fn resolve_url(&self, path: &str) -> Result<Url, HttpError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Url(e.to_string()))
    }
}

fn request_headers(opts: &RequestOpts<'_>) -> Result<HeaderMap, HttpError> {
    let mut headers = HeaderMap::new();
    if let Some(Auth::Header { name, value }) = &opts.auth {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HttpError::Build(format!("invalid auth header name: {e}")))?;
        let mut value = HeaderValue::from_str(&sanitize_secret(value)?)
            .map_err(|e| HttpError::Build(format!("invalid auth header value: {e}")))?;
        value.set_sensitive(true);
        headers.insert(name, value);
    }
    Ok(headers)
}

/// A fully received response, before its status is interpreted.
struct Exchange {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    elapsed: Duration,
}

impl Exchange {
    async fn send(request: reqwest::RequestBuilder, req_id: &str) -> Result<Self, HttpError> {
        let network = |stage: &'static str| {
            move |err: reqwest::Error| {
                let message = err.to_string();
                tracing::warn!(req_id = %req_id, stage, message = %message, "http.network_error");
                HttpError::Network(message)
            }
        };

        let started = std::time::Instant::now();
        let response = request.send().await.map_err(network("send"))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(network("body"))?.to_vec();

        Ok(Self {
            status,
            headers,
            body,
            elapsed: started.elapsed(),
        })
    }

    fn upstream_request_id(&self) -> &str {
        ["x-request-id", "x-goog-request-id"]
            .iter()
            .find_map(|name| self.headers.get(*name))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
    }

    fn log(&self, req_id: &str) {
        let duration_ms = self.elapsed.as_millis() as u64;
        tracing::debug!(
            req_id = %req_id,
            status = %self.status,
            duration_ms,
            body_len = content_len(&self.headers, self.body.len()),
            x_request_id = %self.upstream_request_id(),
            "http.response.headers"
        );

        if raw_enabled() {
            let shown = &self.body[..self.body.len().min(RAW_MAX_BODY)];
            tracing::info!(
                target: "http.raw",
                %req_id,
                status = %self.status,
                duration_ms,
                headers = ?redact_headers(&self.headers),
                body = %String::from_utf8_lossy(shown),
                truncated = self.body.len() > RAW_MAX_BODY
            );
        }
    }

    fn into_json<T: DeserializeOwned>(self, req_id: &str) -> Result<T, HttpError> {
        let snippet = snip_body(&self.body);
        tracing::trace!(req_id = %req_id, body_snippet = %snippet, "http.response.body_snippet");

        if !self.status.is_success() {
            let message = extract_error_message(&self.body);
            let request_id = self.upstream_request_id().to_string();
            tracing::warn!(
                req_id = %req_id,
                status = %self.status,
                message = %message,
                x_request_id = %request_id,
                body_snippet = %snippet,
                "http.error"
            );
            return Err(HttpError::Api {
                status: self.status,
                message,
                request_id,
            });
        }

        serde_json::from_slice::<T>(&self.body).map_err(|e| {
            tracing::warn!(
                req_id = %req_id,
                serde_line = e.line(),
                serde_col = e.column(),
                serde_err = %e,
                body_snippet = %snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(e.to_string(), snippet)
        })
    }
}

// ==============================
// Helpers
// ==============================

fn extract_error_message(body: &[u8]) -> String {
    // Google/OpenAI style: {"error":{"message":"...", "status":"..."}}
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
        #[serde(default)]
        status: Option<String>,
    }

    // Generic: {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<Envelope>(body) {
        return match env.error.status {
            Some(status) => format!("{} ({})", env.error.message, status),
            None => env.error.message,
        };
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        if !m.message.is_empty() {
            return m.message;
        }
        if !m.detail.is_empty() {
            return m.detail;
        }
        if !m.error.is_empty() {
            return m.error;
        }
    }
    snip_body(body)
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        truncate_at_char_boundary(&mut snip, 500);
        snip.push_str("...");
    }
    snip
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    let mut cut = max.min(s.len());
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

fn sanitize_secret(raw: &str) -> Result<String, HttpError> {
    // Trim outer spaces/quotes, then drop any interior ASCII whitespace.
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::Build("credential is empty".into()));
    }
    if !s.is_ascii() {
        return Err(HttpError::Build("credential contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "credential contains control characters".into(),
        ));
    }
    Ok(s)
}

fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret_name(&k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}

fn content_len(headers: &HeaderMap, body_len: usize) -> usize {
    headers
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(body_len)
}
