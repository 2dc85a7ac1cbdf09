//! Transport seam between the pipeline and the network.
//!
//! `Transport` is the trait the pipeline talks to; `HttpTransport` is the
//! reqwest-backed implementation. The transport owns the inner retry layer:
//! a fixed set of server-side statuses is retried a bounded number of times
//! with a fixed backoff factor before a reply ever reaches the pipeline.
//!
//! POST is retried alongside GET. Every endpoint this crate consumes is an
//! idempotent lookup, so the blanket retry is safe here; callers adding
//! mutating endpoints must not route them through this transport.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{HttpMethod, Params};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Statuses the transport retries on its own before surfacing a reply.
const RETRYABLE_STATUS: &[u16] = &[429, 500, 502, 503, 504];

/// Additional sends allowed on a retryable status.
const MAX_TRANSPORT_RETRIES: u32 = 3;

/// Fixed backoff factor between transport-level retries (ms, scaled by
/// the retry ordinal).
const TRANSPORT_BACKOFF_MS: u64 = 500;

const USER_AGENT: &str = "HEARTH/0.1.0 (real-estate-client)";

// ---------------------------------------------------------------------------
// Request / reply types
// ---------------------------------------------------------------------------

/// A fully-built outbound request: absolute URL, fixed header set, and the
/// caller-supplied parameters (query string for GET, JSON body for POST).
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Params,
}

/// The outcome of one logical dispatch, after any transport-level retries.
#[derive(Debug, Clone)]
pub struct TransportReply {
    pub status: u16,
    /// Integer-seconds `Retry-After` header value, when present and parseable.
    pub retry_after_secs: Option<u64>,
    pub body: String,
}

impl TransportReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Connection-level failures. HTTP statuses are never errors at this layer;
/// the pipeline classifies them.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Io(String),
}

/// Abstraction over the network dispatch of one request.
///
/// The pipeline holds a `dyn Transport`, which lets tests substitute a
/// deterministic scripted transport and count invocations.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, request: &ApiRequest) -> Result<TransportReply, TransportError>;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    /// Build the HTTP client with the fixed per-request timeout.
    pub fn new(timeout_secs: u64) -> anyhow::Result<Self> {
        use anyhow::Context;
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http })
    }

    /// Issue the request exactly once.
    async fn send_once(&self, request: &ApiRequest) -> Result<TransportReply, TransportError> {
        let builder = match request.method {
            HttpMethod::Get => {
                let url = append_query(&request.url, &request.params);
                self.http.get(url)
            }
            HttpMethod::Post => self.http.post(&request.url).json(&request.params),
        };

        let builder = request
            .headers
            .iter()
            .fold(builder, |b, (name, value)| b.header(name, value));

        let resp = builder.send().await.map_err(classify_reqwest_error)?;

        let status = resp.status().as_u16();
        let retry_after_secs = resp
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok());

        let body = resp.text().await.map_err(classify_reqwest_error)?;

        Ok(TransportReply { status, retry_after_secs, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch(&self, request: &ApiRequest) -> Result<TransportReply, TransportError> {
        let mut reply = self.send_once(request).await?;

        let mut retries = 0u32;
        while RETRYABLE_STATUS.contains(&reply.status) && retries < MAX_TRANSPORT_RETRIES {
            retries += 1;
            let delay = TRANSPORT_BACKOFF_MS * retries as u64;
            warn!(
                status = reply.status,
                retry = retries,
                delay_ms = delay,
                url = %request.url,
                "Transport-level retry"
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
            reply = self.send_once(request).await?;
        }

        debug!(status = reply.status, retries, url = %request.url, "Transport reply");
        Ok(reply)
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Io(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Query encoding
// ---------------------------------------------------------------------------

/// Render one parameter value for the query string. Strings pass through,
/// lists are comma-joined, other scalars use their JSON rendering.
fn query_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Append URL-encoded query parameters to a base URL.
fn append_query(url: &str, params: &Params) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let query = params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                urlencoding::encode(k),
                urlencoding::encode(&query_value(v))
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{url}?{query}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, serde_json::Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_query_value_string() {
        assert_eq!(query_value(&json!("Austin, TX")), "Austin, TX");
    }

    #[test]
    fn test_query_value_number() {
        assert_eq!(query_value(&json!(250000)), "250000");
        assert_eq!(query_value(&json!(2.5)), "2.5");
    }

    #[test]
    fn test_query_value_list() {
        assert_eq!(
            query_value(&json!(["house", "condo"])),
            "house,condo"
        );
    }

    #[test]
    fn test_append_query_empty() {
        let url = append_query("https://api.example.com/v1/health", &Params::new());
        assert_eq!(url, "https://api.example.com/v1/health");
    }

    #[test]
    fn test_append_query_encodes() {
        let p = params(&[
            ("location", json!("Portland, OR")),
            ("price_min", json!(300000)),
        ]);
        let url = append_query("https://api.example.com/v1/properties/search", &p);
        assert!(url.contains("location=Portland%2C%20OR"));
        assert!(url.contains("price_min=300000"));
        assert!(url.contains('?'));
    }

    #[test]
    fn test_reply_is_success() {
        let mut reply = TransportReply { status: 200, retry_after_secs: None, body: String::new() };
        assert!(reply.is_success());
        reply.status = 204;
        assert!(reply.is_success());
        reply.status = 429;
        assert!(!reply.is_success());
        reply.status = 301;
        assert!(!reply.is_success());
    }

    #[test]
    fn test_retryable_status_set() {
        for s in [429u16, 500, 502, 503, 504] {
            assert!(RETRYABLE_STATUS.contains(&s));
        }
        assert!(!RETRYABLE_STATUS.contains(&404));
        assert!(!RETRYABLE_STATUS.contains(&501));
    }

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new(30).is_ok());
    }
}
