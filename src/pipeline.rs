//! Resilient outbound request pipeline.
//!
//! `RequestPipeline::execute` drives one logical upstream call through an
//! explicit state machine: the request is sent, and each reply moves the
//! call to `Success`, `WaitThenRetry` (rate limited, sleep `Retry-After`
//! then re-issue), `BackoffThenRetry` (retryable failure, exponential
//! jitter-free backoff), or `GaveUp`. A single attempt budget covers both
//! retry paths, so the total number of sends is auditable: at most
//! `max_attempts` dispatches per call, each of which the transport may
//! expand by its own bounded status-code retries.
//!
//! The credential precondition is checked before any network I/O and is
//! never retried.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::transport::{ApiRequest, HttpTransport, Transport, TransportError, TransportReply};
use crate::types::{Endpoint, Params, PipelineError};

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Where one dispatched attempt leaves the call.
enum CallState {
    Success(Value),
    /// 429 reached the pipeline; sleep this many seconds, then re-issue.
    WaitThenRetry { secs: u64 },
    /// Retryable failure; re-issue after exponential backoff.
    BackoffThenRetry(PipelineError),
    /// Terminal failure; surfaced to the caller immediately.
    GaveUp(PipelineError),
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct RequestPipeline {
    config: PipelineConfig,
    transport: Arc<dyn Transport>,
}

impl RequestPipeline {
    /// Build a pipeline over an explicit transport (tests inject scripted
    /// transports here).
    pub fn new(config: PipelineConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Build a pipeline over the reqwest transport with the configured
    /// timeout.
    pub fn with_http(config: PipelineConfig) -> anyhow::Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.retry.timeout_secs)?);
        Ok(Self::new(config, transport))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one logical upstream call.
    ///
    /// Returns the decoded JSON payload unchanged, or one typed error.
    /// Never returns a partially-decoded or empty-but-successful result.
    pub async fn execute(
        &self,
        endpoint: &Endpoint,
        params: Params,
    ) -> Result<Value, PipelineError> {
        let request = self.build_request(endpoint, params)?;

        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            info!(endpoint = %endpoint, attempt, max_attempts, "Issuing upstream request");

            match self.issue(&request).await {
                CallState::Success(payload) => {
                    info!(endpoint = %endpoint, attempt, "Upstream request succeeded");
                    return Ok(payload);
                }
                CallState::WaitThenRetry { secs } => {
                    if attempt >= max_attempts {
                        warn!(endpoint = %endpoint, "Rate limit persisted through attempt budget");
                        return Err(PipelineError::UpstreamHttp {
                            status: 429,
                            message: "rate limited; attempt budget exhausted".to_string(),
                        });
                    }
                    warn!(endpoint = %endpoint, wait_secs = secs, "Rate limited; waiting before re-issue");
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                }
                CallState::BackoffThenRetry(err) => {
                    if attempt >= max_attempts {
                        warn!(endpoint = %endpoint, error = %err, "Attempt budget exhausted");
                        return Err(err);
                    }
                    let delay = self.config.retry.base_backoff_ms * 2u64.pow(attempt - 1);
                    debug!(endpoint = %endpoint, attempt, delay_ms = delay, error = %err, "Retrying after backoff");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                CallState::GaveUp(err) => {
                    warn!(endpoint = %endpoint, attempt, error = %err, "Upstream request failed");
                    return Err(err);
                }
            }
        }
    }

    // -- Internal helpers --------------------------------------------------

    /// Precondition check and request construction. Runs before any
    /// network I/O; a missing credential fails here, unretried.
    fn build_request(
        &self,
        endpoint: &Endpoint,
        params: Params,
    ) -> Result<ApiRequest, PipelineError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                PipelineError::Configuration(
                    "API key not found. Set the configured credential environment variable."
                        .to_string(),
                )
            })?;

        let headers = vec![
            ("Authorization".to_string(), format!("Bearer {api_key}")),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];

        Ok(ApiRequest {
            method: endpoint.method,
            url: format!(
                "{}/{}",
                self.config.base_url.trim_end_matches('/'),
                endpoint.path
            ),
            headers,
            params,
        })
    }

    /// Dispatch once and classify the outcome into a call state.
    async fn issue(&self, request: &ApiRequest) -> CallState {
        match self.transport.dispatch(request).await {
            Err(TransportError::Timeout) => {
                CallState::BackoffThenRetry(PipelineError::UpstreamTimeout)
            }
            Err(TransportError::Io(msg)) => {
                CallState::BackoffThenRetry(PipelineError::Transport(msg))
            }
            Ok(reply) => self.classify(reply),
        }
    }

    fn classify(&self, reply: TransportReply) -> CallState {
        debug!(status = reply.status, "Response status received");

        // 429 still reaching this layer means the transport's own retries
        // are exhausted; honor Retry-After and re-issue within the budget.
        if reply.status == 429 {
            let secs = reply
                .retry_after_secs
                .unwrap_or(self.config.retry.default_retry_after_secs);
            return CallState::WaitThenRetry { secs };
        }

        if !reply.is_success() {
            return CallState::GaveUp(PipelineError::UpstreamHttp {
                status: reply.status,
                message: embedded_error_message(&reply.body),
            });
        }

        match serde_json::from_str::<Value>(&reply.body) {
            Err(e) => CallState::BackoffThenRetry(PipelineError::UpstreamData(format!(
                "failed to decode response body: {e}"
            ))),
            Ok(payload) if is_empty_payload(&payload) => CallState::BackoffThenRetry(
                PipelineError::UpstreamData("empty response from upstream API".to_string()),
            ),
            Ok(payload) => CallState::Success(payload),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// A successfully-decoded body still fails validation when it carries no
/// data: null, empty object/array/string, false, or zero.
fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Best-effort extraction of a structured error message from a non-2xx body.
fn embedded_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = value.get("error") {
            return match msg {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no error detail in response body".to_string()
    } else if trimmed.len() > 200 {
        format!("{}...", &trimmed[..200])
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
