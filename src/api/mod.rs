use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Clone, Debug)]
pub struct TurnRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub session_id: String,
}

/// Reply to `POST api/chat` and `POST api/chat/upload`.
///
/// `response` stays a raw [`Value`] here; the payload decoder owns the
/// interpretation of its loosely structured contents. `title` is only
/// present on responses that created a conversation server-side.
#[derive(Deserialize, Clone, Debug)]
pub struct TurnResponse {
    pub message_id: String,
    pub conversation_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub response: Value,
}

/// One entry in `GET api/conversations`. The endpoint returns full
/// conversation documents; the sidebar only needs the identity fields.
#[derive(Deserialize, Clone, Debug)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ConversationDetail {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    pub created_at: DateTime<Utc>,
}

/// A stored message as the backend persists it. Assistant `content` is the
/// raw reply payload, so history goes through the same decoder as live
/// replies.
#[derive(Deserialize, Clone, Debug)]
pub struct WireMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
