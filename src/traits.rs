//! Seams between the generation core and its collaborators.

use async_trait::async_trait;

use crate::{DescriptionField, GenerationOutcome, Result};

/// Anything that can turn a prompt into description text.
///
/// Implemented by [`GenerationClient`](crate::GenerationClient); the batch
/// runner only depends on this trait.
#[async_trait]
pub trait DescriptionGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> GenerationOutcome;
}

/// Where generated descriptions are persisted.
///
/// The shop backend owns the real storage; this crate ships a JSON file
/// implementation in [`batch::JsonFileStore`](crate::batch::JsonFileStore).
#[async_trait]
pub trait DescriptionStore: Send + Sync {
    async fn save(&self, product_id: u64, field: DescriptionField, text: &str) -> Result<()>;
}
