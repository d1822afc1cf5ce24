//! Generation client.
//!
//! [`GenerationClient`] owns the immutable [`GenerationConfig`], a pooled
//! HTTP client and the injected [`Sleeper`]. Each `generate()` call pauses
//! briefly to stay under upstream rate limits, then either does a single
//! local-proxy round trip or runs the direct-API attempt loop.

mod direct;
mod proxy;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::{GenerationConfig, TransportMode};
use crate::retry::{RetryConfig, Sleeper, TokioSleeper, with_retry};
use crate::traits::DescriptionGenerator;
use crate::{CopysmithError, DEFAULT_MAX_TOKENS, GenerationOutcome, GenerationRequest, Result};

/// Raw bodies are cut to this many characters before logging.
const LOG_SNIPPET_CHARS: usize = 1000;

/// Client for drafting product descriptions through a chat-completion API.
#[derive(Clone)]
pub struct GenerationClient {
    config: GenerationConfig,
    http: Client,
    retry: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl GenerationClient {
    /// Create a client from configuration.
    ///
    /// Fails only if the HTTP client cannot be built.
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(crate::version::user_agent())
            .build()
            .map_err(|e| CopysmithError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http,
            retry: RetryConfig::default(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the attempt-loop configuration.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the sleep used for throttling and backoff.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate text for `prompt`, bounded by `max_tokens`.
    ///
    /// Never panics and never returns a partial result: the outcome is
    /// either the generated text or a classified failure.
    pub async fn generate(&self, prompt: &str, max_tokens: u32) -> GenerationOutcome {
        self.generate_text(prompt, max_tokens).await.into()
    }

    /// [`generate`](Self::generate) with the default token budget (500).
    pub async fn generate_default(&self, prompt: &str) -> GenerationOutcome {
        self.generate(prompt, DEFAULT_MAX_TOKENS).await
    }

    /// Like [`generate`](Self::generate), as a `Result`.
    pub async fn generate_text(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(CopysmithError::InvalidInput("prompt must not be empty".into()));
        }
        if max_tokens == 0 {
            return Err(CopysmithError::InvalidInput(
                "max_tokens must be positive".into(),
            ));
        }
        if self.config.api_key.trim().is_empty() {
            return Err(CopysmithError::MissingApiKey);
        }

        let request = GenerationRequest::new(prompt, max_tokens);

        // Self-throttle on every call, not only on retries.
        self.sleeper.sleep(self.retry.throttle).await;

        let transport = self.config.transport;
        debug!(transport = transport.as_str(), max_tokens, "generating text");
        let result = match transport {
            TransportMode::LocalProxy => self.request_local_proxy(&request).await,
            TransportMode::Direct => {
                let client = self;
                let request = &request;
                with_retry(&self.retry, self.sleeper.as_ref(), move |attempt| {
                    client.request_direct(request, attempt)
                })
                .await
            }
        };

        match &result {
            Ok(text) => info!(
                transport = transport.as_str(),
                chars = text.chars().count(),
                "generation succeeded"
            ),
            Err(e) => info!(
                transport = transport.as_str(),
                kind = e.kind().as_str(),
                error = %e,
                "generation failed"
            ),
        }
        result
    }
}

#[async_trait]
impl DescriptionGenerator for GenerationClient {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> GenerationOutcome {
        GenerationClient::generate(self, prompt, max_tokens).await
    }
}

/// Record per-request metrics.
fn record_request(transport: TransportMode, start: Instant, result: &Result<String>) {
    let status = match result {
        Ok(_) => "ok",
        Err(e) => e.kind().as_str(),
    };
    metrics::counter!(crate::telemetry::REQUESTS_TOTAL,
        "transport" => transport.as_str(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(crate::telemetry::REQUEST_DURATION_SECONDS,
        "transport" => transport.as_str(),
    )
    .record(start.elapsed().as_secs_f64());
}

/// The first [`LOG_SNIPPET_CHARS`] characters of `body`.
pub(crate) fn log_snippet(body: &str) -> &str {
    match body.char_indices().nth(LOG_SNIPPET_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_snippet_bounds_length() {
        let long = "ж".repeat(LOG_SNIPPET_CHARS + 50);
        assert_eq!(log_snippet(&long).chars().count(), LOG_SNIPPET_CHARS);
        assert_eq!(log_snippet("short"), "short");
    }

    #[test]
    fn log_snippet_bounds_oversized_identifier() {
        let leaked = format!("user_{}", "a".repeat(200_000));
        assert!(crate::detect::is_leaked_identifier(&leaked));
        let snippet = log_snippet(&leaked);
        assert_eq!(snippet.len(), LOG_SNIPPET_CHARS);
        assert!(snippet.starts_with("user_"));
    }
}
