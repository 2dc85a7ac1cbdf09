//! Shared types for the HEARTH client.
//!
//! Endpoint descriptors, request parameter aliases, and the typed
//! failure taxonomy used across the pipeline and operations modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// HTTP methods the upstream API is consumed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable descriptor of one upstream operation: a path suffix under the
/// configured base URL plus the method it is called with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub path: &'static str,
    pub method: HttpMethod,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Property listing search.
pub const SEARCH: Endpoint = Endpoint { path: "properties/search", method: HttpMethod::Get };
/// Single-property detail lookup by zpid or address.
pub const DETAILS: Endpoint = Endpoint { path: "properties/details", method: HttpMethod::Get };
/// Automated valuation estimate lookup.
pub const ZESTIMATES: Endpoint = Endpoint { path: "zestimates", method: HttpMethod::Get };
/// Market trend metrics for a location.
pub const MARKET_TRENDS: Endpoint = Endpoint { path: "market/trends", method: HttpMethod::Get };
/// Lightweight reachability probe.
pub const HEALTH: Endpoint = Endpoint { path: "health", method: HttpMethod::Get };

/// Request parameters: string keys mapped to scalar or list JSON values.
/// Built fresh per call; nothing is shared across calls.
pub type Params = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Typed failures raised by the request pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing credential or an otherwise unusable request. Never retried;
    /// the caller must fix configuration before calling again.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request exceeded the fixed wall-clock timeout. Retryable.
    #[error("Upstream API request timed out. Please try again later.")]
    UpstreamTimeout,

    /// Non-2xx status after all retries, with any error text the upstream
    /// embedded in the response body. Not retried further by the pipeline.
    #[error("Upstream API HTTP error {status}: {message}")]
    UpstreamHttp { status: u16, message: String },

    /// Decoded but empty or structurally-unexpected payload. Retryable
    /// within the outer budget, then surfaced.
    #[error("Upstream data error: {0}")]
    UpstreamData(String),

    /// Connection-level failure below the HTTP layer. Retryable.
    #[error("Upstream API request failed: {0}")]
    Transport(String),
}

impl PipelineError {
    /// Whether the outer backoff layer may re-issue the call for this kind.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::UpstreamTimeout
                | PipelineError::UpstreamData(_)
                | PipelineError::Transport(_)
        )
    }
}

/// Failures from the mortgage engine. The engine is pure; the only failure
/// mode is numerically-invalid input (fail-fast policy).
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MortgageError {
    #[error("Invalid mortgage input: {0}")]
    InvalidInput(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_display() {
        assert_eq!(format!("{}", HttpMethod::Get), "GET");
        assert_eq!(format!("{}", HttpMethod::Post), "POST");
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(format!("{SEARCH}"), "GET properties/search");
        assert_eq!(format!("{HEALTH}"), "GET health");
    }

    #[test]
    fn test_endpoint_constants() {
        assert_eq!(SEARCH.path, "properties/search");
        assert_eq!(DETAILS.path, "properties/details");
        assert_eq!(ZESTIMATES.path, "zestimates");
        assert_eq!(MARKET_TRENDS.path, "market/trends");
        assert_eq!(HEALTH.path, "health");
    }

    #[test]
    fn test_error_retryability() {
        assert!(PipelineError::UpstreamTimeout.is_retryable());
        assert!(PipelineError::UpstreamData("empty response".into()).is_retryable());
        assert!(PipelineError::Transport("connection reset".into()).is_retryable());
        assert!(!PipelineError::Configuration("no key".into()).is_retryable());
        assert!(!PipelineError::UpstreamHttp { status: 404, message: "not found".into() }
            .is_retryable());
    }

    #[test]
    fn test_error_display() {
        let e = PipelineError::UpstreamHttp {
            status: 503,
            message: "maintenance".into(),
        };
        assert_eq!(format!("{e}"), "Upstream API HTTP error 503: maintenance");

        let e = PipelineError::Configuration("API key not found".into());
        assert!(format!("{e}").contains("API key not found"));
    }

    #[test]
    fn test_mortgage_error_display() {
        let e = MortgageError::InvalidInput("home_price must be positive".into());
        assert!(format!("{e}").contains("home_price"));
    }
}
