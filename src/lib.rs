//! Copysmith - product description drafting over chat-completion APIs
//!
//! This crate drafts e-commerce product descriptions through an
//! OpenRouter-style chat-completion API. The upstream sometimes answers
//! with its own session identifier (`user_...`) instead of generated text;
//! the [`GenerationClient`] recognises that across several response shapes
//! and retries with linear backoff until it gets real content or runs out
//! of attempts.
//!
//! # Example
//!
//! ```rust,no_run
//! use copysmith::{GenerationClient, GenerationConfig, GenerationOutcome};
//!
//! #[tokio::main]
//! async fn main() -> copysmith::Result<()> {
//!     let client = GenerationClient::new(GenerationConfig::new("sk-or-your-key"))?;
//!
//!     match client.generate("Describe a solid oak dining table", 500).await {
//!         GenerationOutcome::Success { text } => println!("{text}"),
//!         GenerationOutcome::Failure { kind, message } => eprintln!("{kind}: {message}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Batch generation
//!
//! ```rust,no_run
//! use copysmith::batch::{BatchRunner, JsonFileStore};
//! use copysmith::{GenerationClient, GenerationConfig, Product};
//!
//! #[tokio::main]
//! async fn main() -> copysmith::Result<()> {
//!     let client = GenerationClient::new(GenerationConfig::new("sk-or-your-key"))?;
//!     let store = JsonFileStore::new("descriptions.json");
//!     let products = vec![Product::new(42, "Oak Table").attribute("Material", "Oak")];
//!
//!     let report = BatchRunner::new(&client, &store).run(&products).await;
//!     println!("{} of {} fields generated", report.succeeded(), report.processed);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod retry;
pub mod telemetry;
pub mod traits;
pub mod types;
mod version;

// Re-export main types at crate root
pub use client::GenerationClient;
pub use config::{GenerationConfig, Settings, TransportMode};
pub use detect::is_leaked_identifier;
pub use error::{CopysmithError, ErrorKind, Result};
pub use retry::{RetryConfig, Sleeper, TokioSleeper};
pub use traits::{DescriptionGenerator, DescriptionStore};
pub use version::{GIT_BRANCH, GIT_SHA, PKG_VERSION, git_dirty, version_string};

// Re-export all types
pub use types::{
    ChatCompletionRequest, DEFAULT_MAX_TOKENS, DescriptionField, GenerationOutcome,
    GenerationRequest, Message, Product, ProxyRequest, Role,
};
