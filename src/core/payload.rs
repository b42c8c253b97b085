//! Tolerant decoding of the backend's `response` payload.
//!
//! The automation pipeline behind the chat endpoint is not always
//! strict-JSON-compliant: replies arrive as canonical JSON, as
//! python-dict-literal strings with single quotes, or as bare prose.
//! Decoding is total. Every input maps to exactly one [`AssistantPayload`];
//! inputs that defeat every structured strategy degrade to plain text with
//! the raw string preserved unchanged.

use serde_json::Value;

/// The decoded form of one assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantPayload {
    Text { text: String },
    Image { image_url: String },
}

impl AssistantPayload {
    pub fn text(text: impl Into<String>) -> Self {
        AssistantPayload::Text { text: text.into() }
    }

    pub fn image(image_url: impl Into<String>) -> Self {
        AssistantPayload::Image {
            image_url: image_url.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, AssistantPayload::Image { .. })
    }
}

/// Decode a wire payload that may already be structured.
///
/// Strings go through the full strategy ladder in [`decode_str`]. Objects
/// skip straight to discriminator inspection. Anything else (arrays,
/// numbers) is rendered as its JSON text, and `null` as empty text.
pub fn decode(raw: &Value) -> AssistantPayload {
    match raw {
        Value::String(s) => decode_str(s),
        Value::Null => AssistantPayload::text(""),
        other => classify(other).unwrap_or_else(|| AssistantPayload::text(other.to_string())),
    }
}

/// Decode a raw reply string. Strategies in order, first success wins:
///
/// 1. strict JSON parse, then discriminator inspection;
/// 2. python-dict-literal recovery (single quotes swapped for double
///    quotes), then the same inspection;
/// 3. the whole raw string as literal text.
pub fn decode_str(raw: &str) -> AssistantPayload {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        if let Some(payload) = classify(&value) {
            return payload;
        }
    }

    if let Ok(value) = serde_json::from_str::<Value>(&requote_python_literal(raw)) {
        if let Some(payload) = classify(&value) {
            return payload;
        }
    }

    AssistantPayload::text(raw)
}

/// Inspect a parsed value for the known reply shapes.
///
/// `{"type": "image", "imageUrl": ...}` wins first; an image discriminator
/// without a URL falls through to the bare `text` field, and a JSON string
/// scalar decodes to its inner text. Returns `None` when no shape matches
/// so the caller can try the next strategy.
fn classify(value: &Value) -> Option<AssistantPayload> {
    match value {
        Value::String(inner) => Some(AssistantPayload::text(inner.clone())),
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("image") {
                if let Some(url) = map.get("imageUrl").and_then(Value::as_str) {
                    return Some(AssistantPayload::image(url));
                }
            }
            map.get("text")
                .and_then(Value::as_str)
                .map(AssistantPayload::text)
        }
        _ => None,
    }
}

/// Rewrite a python-dict-literal string into parseable JSON.
///
/// Raw newlines inside the literal are escaped, escaped single quotes are
/// parked behind a sentinel so the global quote swap cannot break them,
/// then every remaining single quote becomes a double quote. The transform
/// is heuristic and lossy for pathological inputs; callers always retain
/// the raw string as the fallback of last resort.
fn requote_python_literal(raw: &str) -> String {
    const SENTINEL: &str = "__SQUOTE__";
    raw.replace('\n', "\\n")
        .replace("\\'", SENTINEL)
        .replace('\'', "\"")
        .replace(SENTINEL, "'")
}
