//! Locating generated text in a chat-completion response body.
//!
//! The upstream does not always answer in the documented
//! `choices[0].message.content` shape. Extraction is an ordered list of
//! [`Shape`] strategies, each returning an optional string; the first hit
//! wins and is then screened by the leaked-identifier detector.

use serde_json::Value;
use tracing::{debug, warn};

use crate::client::log_snippet;
use crate::detect::{IDENTIFIER_PREFIX, is_leaked_identifier};
use crate::error::{CopysmithError, Result};

/// Top-level scalar fields consulted, in priority order.
pub const CONTENT_FIELDS: &[&str] = &[
    "content",
    "response",
    "message",
    "output",
    "result",
    "text",
    "generated_text",
];

/// Strings at or below this many bytes are ignored by the fallback scan.
const FALLBACK_MIN_LEN: usize = 10;

/// A response shape the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `choices[0].message.content`
    ChoiceMessageContent,
    /// `choices[0].text`
    ChoiceText,
    /// `choices[0].content`
    ChoiceContent,
    /// A named top-level string field, see [`CONTENT_FIELDS`].
    TopLevelField(&'static str),
    /// First long-enough string (or array head) among top-level fields,
    /// in document order.
    FallbackScan,
}

impl Shape {
    /// Strategies in the order they are tried.
    pub fn ordered() -> Vec<Shape> {
        let mut shapes = vec![
            Shape::ChoiceMessageContent,
            Shape::ChoiceText,
            Shape::ChoiceContent,
        ];
        shapes.extend(CONTENT_FIELDS.iter().map(|f| Shape::TopLevelField(*f)));
        shapes.push(Shape::FallbackScan);
        shapes
    }

    /// Whether this shape is a field the upstream uses for generated content.
    ///
    /// Identifier-shaped text found in a content field is kept as a
    /// best-effort result for when retries run out; the fallback scan only
    /// guesses, so its hits are not.
    pub fn is_content_field(&self) -> bool {
        !matches!(self, Shape::FallbackScan)
    }

    /// Try this strategy against a decoded body.
    pub fn extract(&self, body: &Value) -> Option<String> {
        match self {
            Shape::ChoiceMessageContent => first_choice(body)?
                .get("message")?
                .get("content")?
                .as_str()
                .map(str::to_owned),
            Shape::ChoiceText => first_choice(body)?.get("text")?.as_str().map(str::to_owned),
            Shape::ChoiceContent => first_choice(body)?
                .get("content")?
                .as_str()
                .map(str::to_owned),
            Shape::TopLevelField(name) => body.get(*name)?.as_str().map(str::to_owned),
            Shape::FallbackScan => fallback_scan(body),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Shape::ChoiceMessageContent => "choices[0].message.content",
            Shape::ChoiceText => "choices[0].text",
            Shape::ChoiceContent => "choices[0].content",
            Shape::TopLevelField(name) => *name,
            Shape::FallbackScan => "fallback_scan",
        }
    }
}

fn first_choice(body: &Value) -> Option<&Value> {
    body.get("choices")?.as_array()?.first()
}

fn fallback_scan(body: &Value) -> Option<String> {
    let object = body.as_object()?;
    object.values().find_map(|value| match value {
        Value::String(s) if s.len() > FALLBACK_MIN_LEN => Some(s.clone()),
        Value::Array(items) => match items.first() {
            Some(Value::String(s)) if s.len() > FALLBACK_MIN_LEN => Some(s.clone()),
            _ => None,
        },
        _ => None,
    })
}

/// A successful extraction, before identifier screening.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub shape: Shape,
    pub text: String,
}

/// Run the strategies in order and return the first hit.
pub fn find_content(body: &Value) -> Option<Extracted> {
    Shape::ordered()
        .into_iter()
        .find_map(|shape| shape.extract(body).map(|text| Extracted { shape, text }))
}

/// Classify a decoded 200 response body into generated text or a failure.
///
/// - a hit that looks like a leaked identifier is `UserIdResponse`;
/// - no hit but an `id` starting with `user_` is `UserIdResponse`;
/// - nothing recognisable is `InvalidResponse`.
pub fn classify_body(body: &Value) -> Result<String> {
    if let Some(Extracted { shape, text }) = find_content(body) {
        if is_leaked_identifier(&text) {
            warn!(
                shape = shape.label(),
                text = log_snippet(&text),
                "API returned a user identifier as content"
            );
            metrics::counter!(crate::telemetry::LEAKED_IDENTIFIERS_TOTAL,
                "source" => shape.label(),
            )
            .increment(1);
            let raw = shape.is_content_field().then_some(text);
            return Err(CopysmithError::UserIdResponse { raw });
        }
        debug!(shape = shape.label(), "extracted generated text");
        return Ok(text);
    }

    if let Some(id) = body.get("id").and_then(Value::as_str)
        && id.starts_with(IDENTIFIER_PREFIX)
    {
        warn!(
            id = log_snippet(id),
            "API returned a user identifier instead of content"
        );
        metrics::counter!(crate::telemetry::LEAKED_IDENTIFIERS_TOTAL, "source" => "id")
            .increment(1);
        return Err(CopysmithError::UserIdResponse { raw: None });
    }

    warn!("unrecognised API response structure");
    Err(CopysmithError::InvalidResponse)
}

/// Whether a decoded body counts as empty (`null`, `false`, `0`, `""`,
/// `"0"`, `{}` or `[]`).
pub fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
