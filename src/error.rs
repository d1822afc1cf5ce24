//! Copysmith error types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, machine-readable classification of a failure.
///
/// The snake_case form (see [`ErrorKind::as_str`]) is what callers and the
/// admin UI see in a [`GenerationOutcome::Failure`](crate::GenerationOutcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingApiKey,
    TransportError,
    ApiError,
    EmptyResponse,
    InvalidResponse,
    UserIdResponse,
    ApiFailed,
    InvalidInput,
    ConfigurationError,
    StorageError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingApiKey => "missing_api_key",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::ApiError => "api_error",
            ErrorKind::EmptyResponse => "empty_response",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::UserIdResponse => "user_id_response",
            ErrorKind::ApiFailed => "api_failed",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::ConfigurationError => "configuration_error",
            ErrorKind::StorageError => "storage_error",
        }
    }

    /// Whether the upstream response shape was not understood or carried a
    /// leaked identifier. Only malformed failures are retried.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ErrorKind::InvalidResponse | ErrorKind::UserIdResponse)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Copysmith error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CopysmithError {
    // Caller errors
    #[error("API key is not configured. Add your OpenRouter API key to the settings.")]
    MissingApiKey,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Provider/network errors
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    // Response shape errors
    #[error("empty response from API")]
    EmptyResponse,

    #[error("malformed format of API response, try again")]
    InvalidResponse,

    /// The upstream returned its own session identifier instead of content.
    ///
    /// `raw` holds the identifier-shaped text when it arrived in a genuine
    /// content field; after retries are exhausted that text is served as a
    /// best-effort result.
    #[error("API returned a user identifier instead of content, retrying")]
    UserIdResponse { raw: Option<String> },

    #[error("no valid response from API after {attempts} attempts")]
    ApiFailed { attempts: u32 },

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Persistence errors
    #[error("storage error: {0}")]
    Storage(String),
}

impl CopysmithError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CopysmithError::MissingApiKey => ErrorKind::MissingApiKey,
            CopysmithError::InvalidInput(_) => ErrorKind::InvalidInput,
            CopysmithError::Transport(_) => ErrorKind::TransportError,
            CopysmithError::Api { .. } => ErrorKind::ApiError,
            CopysmithError::EmptyResponse => ErrorKind::EmptyResponse,
            CopysmithError::InvalidResponse => ErrorKind::InvalidResponse,
            CopysmithError::UserIdResponse { .. } => ErrorKind::UserIdResponse,
            CopysmithError::ApiFailed { .. } => ErrorKind::ApiFailed,
            CopysmithError::Configuration(_) => ErrorKind::ConfigurationError,
            CopysmithError::Storage(_) => ErrorKind::StorageError,
        }
    }

    /// Shorthand for `self.kind().is_malformed()`.
    pub fn is_malformed(&self) -> bool {
        self.kind().is_malformed()
    }

    /// Build an `Api` error with operator guidance for well-known statuses.
    pub fn from_status(status: u16, upstream_detail: Option<&str>) -> Self {
        let message = match status {
            401 => "Authentication failed. Check your OpenRouter API key in the settings.".to_string(),
            403 => "Access denied. Your API key may not have permission to use this model."
                .to_string(),
            429 => "Rate limit exceeded. Try again later or upgrade your OpenRouter plan."
                .to_string(),
            code => format!(
                "API error (status {code}). {}",
                upstream_detail.unwrap_or_default()
            )
            .trim_end()
            .to_string(),
        };
        CopysmithError::Api { status, message }
    }
}

impl From<reqwest::Error> for CopysmithError {
    fn from(err: reqwest::Error) -> Self {
        CopysmithError::Transport(err.to_string())
    }
}

/// Result type alias for Copysmith operations
pub type Result<T> = std::result::Result<T, CopysmithError>;
