//! Request types for description generation.

use serde::Serialize;

use super::message::Message;

/// Default response length bound when the caller does not supply one.
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Sampling temperature sent with every request.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Nucleus sampling threshold sent with every request.
pub const DEFAULT_TOP_P: f32 = 0.9;

/// Copywriter persona sent as the system message.
pub const SYSTEM_PROMPT: &str = "You are a professional e-commerce copywriter. \
Your task is to write engaging, accurate and persuasive product descriptions. \
Focus on benefits, features and value. Use the active voice, be concise and \
optimize for SEO. Always keep a professional tone that matches the brand voice. \
Write in Russian.";

/// A single generation request.
///
/// Built per call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    prompt: String,
    max_tokens: u32,
    system_prompt: &'static str,
    temperature: f32,
    top_p: f32,
}

impl GenerationRequest {
    /// Create a request with the fixed system prompt and sampling settings.
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            system_prompt: SYSTEM_PROMPT,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn top_p(&self) -> f32 {
        self.top_p
    }

    /// Chat-completion body for the direct API.
    pub fn chat_payload<'a>(&'a self, model: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model,
            messages: vec![Message::system(self.system_prompt), Message::user(&self.prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }

    /// Body for the local proxy service.
    pub fn proxy_payload<'a>(&'a self, api_key: &'a str) -> ProxyRequest<'a> {
        ProxyRequest {
            api_key,
            prompt: &self.prompt,
            max_tokens: self.max_tokens,
        }
    }
}

/// `POST {base_url}/chat/completions` body.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Local proxy request body.
#[derive(Debug, Serialize)]
pub struct ProxyRequest<'a> {
    pub api_key: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_payload_shape() {
        let request = GenerationRequest::new("Describe a widget", 321);
        let json = serde_json::to_value(request.chat_payload("test/model")).unwrap();

        assert_eq!(json["model"], "test/model");
        assert_eq!(json["max_tokens"], 321);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Describe a widget");
        assert!((json["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!((json["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn proxy_payload_shape() {
        let request = GenerationRequest::new("Describe a widget", 100);
        let json = serde_json::to_value(request.proxy_payload("demo_key")).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "api_key": "demo_key",
                "prompt": "Describe a widget",
                "max_tokens": 100
            })
        );
    }
}
