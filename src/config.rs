//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The API credential is referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`; absence is not an error at
//! load time — the pipeline reports it lazily on the first call.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the upstream real-estate API, fixed at config time.
    pub base_url: String,
    /// Name of the environment variable holding the bearer credential.
    pub api_key_env: String,
}

/// Retry and timeout tuning for the request pipeline.
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Outer attempt budget, covering backoff retries and rate-limit
    /// re-issues alike.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for the outer exponential backoff (doubled per attempt).
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Wait applied on a 429 response that carries no Retry-After header.
    #[serde(default = "default_retry_after_secs")]
    pub default_retry_after_secs: u64,
    /// Fixed wall-clock timeout per request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_base_backoff_ms() -> u64 {
    1000
}
fn default_retry_after_secs() -> u64 {
    60
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            default_retry_after_secs: default_retry_after_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// The immutable value handed to the pipeline constructor. Built once at
/// startup; read-only afterwards. Test code constructs these directly with
/// alternate credentials and base URLs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub base_url: String,
    /// `None` means no credential is configured — every call fails with a
    /// configuration error before any network I/O.
    pub api_key: Option<String>,
    pub retry: RetryConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve the configured credential env var and assemble the immutable
    /// pipeline configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            base_url: self.api.base_url.clone(),
            api_key: std::env::var(&self.api.api_key_env).ok().filter(|k| !k.is_empty()),
            retry: self.retry.clone(),
        }
    }
}

impl PipelineConfig {
    /// Convenience constructor for tests and embedding callers.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            retry: RetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        // This test requires config.toml to be in the working directory.
        let result = AppConfig::load("config.toml");
        if let Ok(cfg) = result {
            assert!(cfg.api.base_url.starts_with("https://"));
            assert_eq!(cfg.api.api_key_env, "ZILLOW_API_KEY");
            assert_eq!(cfg.retry.max_attempts, 5);
            assert_eq!(cfg.retry.timeout_secs, 30);
        }
        // If config.toml isn't found, that's acceptable in some test environments
    }

    #[test]
    fn test_retry_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.base_backoff_ms, 1000);
        assert_eq!(retry.default_retry_after_secs, 60);
        assert_eq!(retry.timeout_secs, 30);
    }

    #[test]
    fn test_retry_partial_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [api]
            base_url = "https://example.com/v1"
            api_key_env = "TEST_KEY"

            [retry]
            max_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.base_backoff_ms, 1000); // default fills in
    }

    #[test]
    fn test_pipeline_config_new() {
        let cfg = PipelineConfig::new("https://example.com/v1", Some("k".into()));
        assert_eq!(cfg.base_url, "https://example.com/v1");
        assert_eq!(cfg.api_key.as_deref(), Some("k"));
        assert_eq!(cfg.retry.max_attempts, 5);
    }
}
