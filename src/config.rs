//! Configuration loading.
//!
//! Settings are loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.copysmith/config.toml` (user)
//! 3. `/etc/copysmith/config.toml` (system)
//! 4. built-in defaults
//!
//! The API key is loaded separately with mandatory permission checks:
//! 1. `~/.copysmith/secrets.toml` (user, must be 0600)
//! 2. `/etc/copysmith/secrets.toml` (system, must be 0600)
//! 3. `OPENROUTER_API_KEY` environment variable
//!
//! Both are turned into a [`GenerationConfig`], an immutable value handed
//! to the client at construction.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{CopysmithError, Result};

/// Default chat-completion API base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "anthropic/claude-3-haiku:beta";

/// Default local proxy endpoint.
pub const DEFAULT_LOCAL_API_URL: &str = "http://localhost:5000/api/generate";

/// Default value of the `X-Title` header.
pub const DEFAULT_APP_TITLE: &str = "WooCommerce Product Description Generator";

/// Environment variable consulted when no secrets file holds a key.
pub const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

/// How a call reaches the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Straight to the upstream chat-completion API.
    #[default]
    Direct,
    /// Through a locally hosted stand-in service.
    LocalProxy,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Direct => "direct",
            TransportMode::LocalProxy => "local_proxy",
        }
    }
}

/// Everything the generation client needs, fixed for its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model_id: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
    pub transport: TransportMode,
    pub local_api_url: String,
    pub app_title: String,
}

impl GenerationConfig {
    /// Direct-mode config with defaults and the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model_id: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            request_timeout_secs: default_timeout(),
            transport: TransportMode::Direct,
            local_api_url: DEFAULT_LOCAL_API_URL.to_string(),
            app_title: DEFAULT_APP_TITLE.to_string(),
        }
    }

    /// Override the API base URL (for testing with wiremock).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model_id = model.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn transport(mut self, mode: TransportMode) -> Self {
        self.transport = mode;
        self
    }

    pub fn local_api_url(mut self, url: impl Into<String>) -> Self {
        self.local_api_url = url.into();
        self
    }

    pub fn app_title(mut self, title: impl Into<String>) -> Self {
        self.app_title = title.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `{base_url}/chat/completions`, tolerant of a trailing slash.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// On-disk settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub batch: BatchSettings,
}

/// `[api]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub transport: TransportMode,
    #[serde(default = "default_local_api_url")]
    pub local_api_url: String,
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout(),
            transport: TransportMode::default(),
            local_api_url: default_local_api_url(),
            title: default_title(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_local_api_url() -> String {
    DEFAULT_LOCAL_API_URL.to_string()
}

fn default_title() -> String {
    DEFAULT_APP_TITLE.to_string()
}

/// `[batch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSettings {
    /// Persist each generated description as soon as it arrives (default: true).
    #[serde(default = "default_auto_save")]
    pub auto_save: bool,
    /// Save generated full descriptions (default: true).
    #[serde(default = "default_update_field")]
    pub update_full: bool,
    /// Save generated short descriptions (default: true).
    #[serde(default = "default_update_field")]
    pub update_short: bool,
    /// Extra requests when a result is still identifier-shaped (default: 3).
    #[serde(default = "default_identifier_retries")]
    pub identifier_retries: u32,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            auto_save: default_auto_save(),
            update_full: default_update_field(),
            update_short: default_update_field(),
            identifier_retries: default_identifier_retries(),
        }
    }
}

fn default_auto_save() -> bool {
    true
}

fn default_update_field() -> bool {
    true
}

fn default_identifier_retries() -> u32 {
    3
}

/// Secrets file contents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Settings {
    /// Load settings from the standard locations.
    ///
    /// An explicit path must exist. Without one, the first existing standard
    /// file is used, or defaults when there is none.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CopysmithError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            CopysmithError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(CopysmithError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".copysmith").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/copysmith/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Combine settings with an API key into the client's config.
    pub fn generation_config(&self, api_key: impl Into<String>) -> GenerationConfig {
        GenerationConfig::new(api_key)
            .base_url(&self.api.base_url)
            .model(&self.api.model)
            .timeout_secs(self.api.timeout_secs)
            .transport(self.api.transport)
            .local_api_url(&self.api.local_api_url)
            .app_title(&self.api.title)
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (the key may come from the
    /// environment).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".copysmith").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/copysmith/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load a secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            CopysmithError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            CopysmithError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            CopysmithError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(CopysmithError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// The API key, falling back to `OPENROUTER_API_KEY`.
    ///
    /// Blank values count as missing.
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_owned)
            .or_else(|| {
                std::env::var(API_KEY_ENV_VAR)
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
            })
    }
}
