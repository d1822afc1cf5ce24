//! Local proxy round trip.

use std::time::Instant;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{GenerationClient, log_snippet, record_request};
use crate::config::TransportMode;
use crate::detect::is_leaked_identifier;
use crate::{CopysmithError, GenerationRequest, Result};

#[derive(Deserialize)]
struct ProxyResponse {
    description: String,
}

impl GenerationClient {
    /// One request/response cycle against the local proxy; no retries.
    pub(super) async fn request_local_proxy(&self, request: &GenerationRequest) -> Result<String> {
        let start = Instant::now();
        let result = self.send_local_proxy(request).await;
        record_request(TransportMode::LocalProxy, start, &result);
        result
    }

    async fn send_local_proxy(&self, request: &GenerationRequest) -> Result<String> {
        let url = &self.config.local_api_url;
        debug!(%url, "sending local proxy request");

        let response = self
            .http
            .post(url)
            .json(&request.proxy_payload(&self.config.api_key))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "local API returned an error status");
            return Err(CopysmithError::Api {
                status: status.as_u16(),
                message: format!("Local API error (status {})", status.as_u16()),
            });
        }

        let body = response.text().await?;
        debug!(body = log_snippet(&body), "local API response");

        let parsed: ProxyResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "invalid local API response");
            CopysmithError::InvalidResponse
        })?;

        if is_leaked_identifier(&parsed.description) {
            warn!(
                description = log_snippet(&parsed.description),
                "local API returned a user identifier"
            );
            return Err(CopysmithError::UserIdResponse { raw: None });
        }

        Ok(parsed.description)
    }
}
