#[cfg(test)]
use crate::api::{ConversationDetail, ConversationSummary, TurnRequest, TurnResponse, WireMessage};
#[cfg(test)]
use crate::core::app::ui_state::UiState;
#[cfg(test)]
use crate::core::app::{App, SessionContext};
#[cfg(test)]
use crate::core::attachment::PreparedAttachment;
#[cfg(test)]
use crate::core::config::Config;
#[cfg(test)]
use crate::core::conversation::IdSource;
#[cfg(test)]
use crate::core::request::ChatTransport;
#[cfg(test)]
use crate::ui::theme::Theme;
#[cfg(test)]
use crate::utils::logging::LoggingState;
#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use chrono::Utc;
#[cfg(test)]
use std::collections::{HashMap, VecDeque};
#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::time::Duration;

/// A transport whose replies are scripted in memory. Each send pops the
/// next queued reply; requests are captured for inspection.
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<TurnResponse, String>>>,
    reply_delay: Option<Duration>,
    listing: Vec<ConversationSummary>,
    details: HashMap<String, ConversationDetail>,
    pub sent: Mutex<Vec<TurnRequest>>,
    pub deleted: Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: Result<TurnResponse, String>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Delay every send, so tests can cancel mid-flight under paused time.
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = Some(delay);
        self
    }

    pub fn with_stored(mut self, summary: ConversationSummary, detail: ConversationDetail) -> Self {
        self.details.insert(summary.id.clone(), detail);
        self.listing.push(summary);
        self
    }

    fn next_reply(&self) -> Result<TurnResponse, String> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted reply".to_string()))
    }

    async fn simulate_latency(&self) {
        if let Some(delay) = self.reply_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send_text(&self, request: &TurnRequest) -> Result<TurnResponse, String> {
        self.sent.lock().unwrap().push(request.clone());
        self.simulate_latency().await;
        self.next_reply()
    }

    async fn send_upload(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        session_id: &str,
        _attachments: &[PreparedAttachment],
    ) -> Result<TurnResponse, String> {
        self.sent.lock().unwrap().push(TurnRequest {
            message: message.to_string(),
            conversation_id: conversation_id.map(str::to_string),
            session_id: session_id.to_string(),
        });
        self.simulate_latency().await;
        self.next_reply()
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, String> {
        Ok(self.listing.clone())
    }

    async fn fetch_conversation(&self, id: &str) -> Result<ConversationDetail, String> {
        self.details
            .get(id)
            .cloned()
            .ok_or_else(|| format!("Konversation nicht gefunden: {id}"))
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), String> {
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

#[cfg(test)]
pub fn create_test_app() -> App {
    create_test_app_with_transport(Arc::new(ScriptedTransport::new()))
}

#[cfg(test)]
pub fn create_test_app_with_transport(transport: Arc<dyn ChatTransport>) -> App {
    let session = SessionContext {
        transport,
        base_url: "https://chat.example.com".to_string(),
        session_id: "sess-test".to_string(),
        logging: LoggingState::new(None),
        turn_cancel_token: None,
        current_request_id: 0,
        ids: IdSource::default(),
    };

    let ui = UiState::from_config(Theme::dark_default(), &Config::default());

    App { session, ui }
}

#[cfg(test)]
pub fn text_reply(
    message_id: &str,
    conversation_id: &str,
    title: Option<&str>,
    text: &str,
) -> TurnResponse {
    TurnResponse {
        message_id: message_id.to_string(),
        conversation_id: conversation_id.to_string(),
        title: title.map(str::to_string),
        response: serde_json::Value::String(text.to_string()),
    }
}

#[cfg(test)]
pub fn conversation_summary(id: &str, title: &str) -> ConversationSummary {
    ConversationSummary {
        id: id.to_string(),
        title: title.to_string(),
        created_at: Utc::now(),
        updated_at: None,
    }
}

/// A stored conversation as the server would return it, with assistant
/// content still in raw payload form.
#[cfg(test)]
pub fn stored_conversation(id: &str, title: &str, messages: &[(&str, &str)]) -> ConversationDetail {
    ConversationDetail {
        id: id.to_string(),
        title: title.to_string(),
        messages: messages
            .iter()
            .enumerate()
            .map(|(i, (role, content))| WireMessage {
                id: format!("msg-h-{i}"),
                role: role.to_string(),
                content: content.to_string(),
                timestamp: Utc::now(),
            })
            .collect(),
        created_at: Utc::now(),
    }
}
