//! One direct chat-completion request and its classification.

use std::time::Instant;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use super::{GenerationClient, log_snippet, record_request};
use crate::config::TransportMode;
use crate::detect::IDENTIFIER_PREFIX;
use crate::extract::{classify_body, is_empty_body};
use crate::{CopysmithError, GenerationRequest, Result, telemetry};

impl GenerationClient {
    /// A single attempt against `{base_url}/chat/completions`.
    pub(super) async fn request_direct(
        &self,
        request: &GenerationRequest,
        attempt: u32,
    ) -> Result<String> {
        let url = self.config.chat_completions_url();
        debug!(attempt, %url, model = %self.config.model_id, "sending chat completion request");

        let start = Instant::now();
        let result = self.send_direct(&url, request).await;
        record_request(TransportMode::Direct, start, &result);
        result
    }

    async fn send_direct(&self, url: &str, request: &GenerationRequest) -> Result<String> {
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("X-Title", self.config.app_title.as_str())
            .json(&request.chat_payload(&self.config.model_id))
            .send()
            .await
            .map_err(|e| CopysmithError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CopysmithError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), body = log_snippet(&body), "API response");

        // A bare identifier instead of a JSON document, whatever the status.
        if body.starts_with(IDENTIFIER_PREFIX) {
            warn!(body = log_snippet(&body), "API returned a bare user identifier");
            metrics::counter!(telemetry::LEAKED_IDENTIFIERS_TOTAL, "source" => "raw_body")
                .increment(1);
            return Err(CopysmithError::UserIdResponse { raw: None });
        }

        let decoded: Option<Value> = serde_json::from_str(&body).ok();

        if status != StatusCode::OK {
            let detail = decoded
                .as_ref()
                .and_then(|v| v.pointer("/error/message"))
                .and_then(Value::as_str);
            warn!(
                status = status.as_u16(),
                detail = detail.unwrap_or_default(),
                "API returned an error status"
            );
            return Err(CopysmithError::from_status(status.as_u16(), detail));
        }

        match decoded {
            Some(body) if !is_empty_body(&body) => classify_body(&body),
            _ => {
                warn!("empty or undecodable API response");
                Err(CopysmithError::EmptyResponse)
            }
        }
    }
}
