//! Public types for the Copysmith API.

mod generate;
mod message;
mod outcome;
mod product;

pub use generate::{
    ChatCompletionRequest, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P,
    GenerationRequest, ProxyRequest, SYSTEM_PROMPT,
};
pub use message::{Message, Role};
pub use outcome::GenerationOutcome;
pub use product::{DescriptionField, Product};
