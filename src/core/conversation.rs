use chrono::{DateTime, Utc};

use crate::core::attachment::AttachmentMeta;
use crate::core::constants::TITLE_MAX_CHARS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptRole {
    User,
    Assistant,
    /// Local app output such as `/help`. Never sent to the server and
    /// never written to the transcript log.
    AppInfo,
}

impl TranscriptRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TranscriptRole::User => "user",
            TranscriptRole::Assistant => "assistant",
            TranscriptRole::AppInfo => "app/info",
        }
    }

    pub fn from_api_role(role: &str) -> Result<Self, String> {
        Self::try_from(role)
    }

    pub fn is_user(self) -> bool {
        self == TranscriptRole::User
    }

    pub fn is_assistant(self) -> bool {
        self == TranscriptRole::Assistant
    }

    pub fn is_app(self) -> bool {
        self == TranscriptRole::AppInfo
    }
}

impl AsRef<str> for TranscriptRole {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for TranscriptRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(TranscriptRole::User),
            "assistant" => Ok(TranscriptRole::Assistant),
            "app/info" => Ok(TranscriptRole::AppInfo),
            _ => Err(format!("invalid transcript role: {value}")),
        }
    }
}

/// How an assistant message's body should be interpreted. User and app
/// messages are always `Text`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MessageKind {
    #[default]
    Text,
    /// A generated image. The URL has already been rewritten to the
    /// backend's image proxy by the time it lands here.
    Image { url: String },
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub role: TranscriptRole,
    pub content: String,
    pub kind: MessageKind,
    pub attachments: Vec<AttachmentMeta>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(id: impl Into<String>, role: TranscriptRole, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            kind: MessageKind::Text,
            attachments: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, TranscriptRole::User, content)
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, TranscriptRole::Assistant, content)
    }

    pub fn assistant_image(id: impl Into<String>, url: impl Into<String>) -> Self {
        let mut msg = Self::new(id, TranscriptRole::Assistant, "");
        msg.kind = MessageKind::Image { url: url.into() };
        msg
    }

    pub fn app_info(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, TranscriptRole::AppInfo, content)
    }

    pub fn with_attachments(mut self, attachments: Vec<AttachmentMeta>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }

    pub fn is_app(&self) -> bool {
        self.role.is_app()
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, MessageKind::Image { .. })
    }

    pub fn image_url(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::Image { url } => Some(url),
            MessageKind::Text => None,
        }
    }
}

/// One chat thread. Created locally with a provisional identity on the
/// first send; the server-assigned id and title replace the provisional
/// ones exactly once, when the first turn completes.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    provisional: bool,
}

impl Conversation {
    pub fn provisional(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
            provisional: true,
        }
    }

    /// A conversation whose identity is already canonical, e.g. history
    /// fetched from the server.
    pub fn established(
        id: impl Into<String>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            messages: Vec::new(),
            created_at,
            provisional: false,
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.provisional
    }

    /// Replace the provisional identity with the server-assigned one.
    /// Applies at most once; later calls are ignored so a retried turn
    /// cannot rewrite an already-reconciled conversation.
    pub fn adopt_identity(&mut self, id: impl Into<String>, title: Option<String>) {
        if !self.provisional {
            return;
        }
        self.id = id.into();
        if let Some(title) = title {
            if !title.is_empty() {
                self.title = title;
            }
        }
        self.provisional = false;
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Generates client-side identifiers in the `msg-<millis>` / `conv-<millis>`
/// form. Two ids minted within the same millisecond get a disambiguating
/// suffix so ids stay unique within a conversation.
#[derive(Debug, Default)]
pub struct IdSource {
    last_millis: i64,
    seq: u32,
}

impl IdSource {
    pub fn message_id(&mut self) -> String {
        self.next("msg")
    }

    pub fn conversation_id(&mut self) -> String {
        self.next("conv")
    }

    fn next(&mut self, prefix: &str) -> String {
        let millis = Utc::now().timestamp_millis();
        if millis == self.last_millis {
            self.seq += 1;
            format!("{prefix}-{millis}-{}", self.seq)
        } else {
            self.last_millis = millis;
            self.seq = 0;
            format!("{prefix}-{millis}")
        }
    }
}

/// Derive a provisional conversation title from the first user message,
/// truncated the same way the server truncates its canonical titles.
pub fn derive_title(content: &str) -> String {
    let trimmed = content.trim();
    let truncated: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        format!("{truncated}...")
    } else {
        truncated
    }
}

/// Title for a turn that carries attachments but no text.
pub fn derive_attachment_title(attachments: &[AttachmentMeta]) -> String {
    match attachments {
        [] => String::new(),
        [single] => derive_title(&single.file_name),
        [first, rest @ ..] => derive_title(&format!("{} (+{} more)", first.file_name, rest.len())),
    }
}
