//! Dispatch and lifecycle of one chat turn against the backend.
//!
//! At most one turn is in flight per conversation view. Each dispatched
//! turn carries a request id; outcomes come back over an unbounded channel
//! tagged with that id, and the receiving loop drops events whose id is no
//! longer current. Cancellation is a [`CancellationToken`] raced against
//! the transport call, so a reply that loses the race is dropped before it
//! ever reaches the channel.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::{ConversationDetail, ConversationSummary, TurnRequest, TurnResponse};
use crate::core::attachment::PreparedAttachment;
use crate::core::constants::{TEXT_REQUEST_TIMEOUT, UPLOAD_REQUEST_TIMEOUT};
use crate::utils::url::construct_api_url;

#[derive(Clone, Debug)]
pub enum TurnEvent {
    Completed(TurnResponse),
    Failed(String),
}

/// Transport contract for everything the chat view asks of the backend.
///
/// Production uses [`HttpChatTransport`]; tests script the reply sequence
/// in memory. Errors are user-presentable strings, already formatted.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, request: &TurnRequest) -> Result<TurnResponse, String>;

    async fn send_upload(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        session_id: &str,
        attachments: &[PreparedAttachment],
    ) -> Result<TurnResponse, String>;

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, String>;

    async fn fetch_conversation(&self, id: &str) -> Result<ConversationDetail, String>;

    async fn delete_conversation(&self, id: &str) -> Result<(), String>;
}

pub struct TurnParams {
    pub transport: std::sync::Arc<dyn ChatTransport>,
    pub message: String,
    pub conversation_id: Option<String>,
    pub session_id: String,
    pub attachments: Vec<PreparedAttachment>,
    pub cancel_token: CancellationToken,
    pub request_id: u64,
}

/// Hands turns to the transport on background tasks and funnels their
/// outcomes into a single receiver owned by the chat loop.
#[derive(Clone)]
pub struct TurnDispatcher {
    tx: mpsc::UnboundedSender<(TurnEvent, u64)>,
}

impl TurnDispatcher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(TurnEvent, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_turn(&self, params: TurnParams) {
        let tx_clone = self.tx.clone();
        tokio::spawn(async move {
            let TurnParams {
                transport,
                message,
                conversation_id,
                session_id,
                attachments,
                cancel_token,
                request_id,
            } = params;

            tokio::select! {
                outcome = async {
                    if attachments.is_empty() {
                        let request = TurnRequest {
                            message,
                            conversation_id,
                            session_id,
                        };
                        transport.send_text(&request).await
                    } else {
                        transport
                            .send_upload(
                                &message,
                                conversation_id.as_deref(),
                                &session_id,
                                &attachments,
                            )
                            .await
                    }
                } => {
                    tracing::debug!(request_id, ok = outcome.is_ok(), "turn resolved");
                    let event = match outcome {
                        Ok(reply) => TurnEvent::Completed(reply),
                        Err(error) => TurnEvent::Failed(error),
                    };
                    let _ = tx_clone.send((event, request_id));
                }
                _ = cancel_token.cancelled() => {
                    tracing::debug!(request_id, "turn cancelled before resolution");
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, event: TurnEvent, request_id: u64) {
        let _ = self.tx.send((event, request_id));
    }
}

/// The production transport over `reqwest`.
pub struct HttpChatTransport {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpChatTransport {
    pub fn new(client: reqwest::Client, base_url: String, bearer_token: Option<String>) -> Self {
        Self {
            client,
            base_url,
            bearer_token,
        }
    }

    fn request(&self, method: reqwest::Method, endpoint: &str) -> reqwest::RequestBuilder {
        let url = construct_api_url(&self.base_url, endpoint);
        let builder = self.client.request(method, url);
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn read_reply<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, String> {
        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(format_api_error(&error_text));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| format_api_error(&e.to_string()))
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send_text(&self, request: &TurnRequest) -> Result<TurnResponse, String> {
        let response = self
            .request(reqwest::Method::POST, "api/chat")
            .timeout(TEXT_REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| format_api_error(&e.to_string()))?;
        Self::read_reply(response).await
    }

    async fn send_upload(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        session_id: &str,
        attachments: &[PreparedAttachment],
    ) -> Result<TurnResponse, String> {
        let mut form = reqwest::multipart::Form::new()
            .text("message", message.to_string())
            .text("session_id", session_id.to_string());
        if let Some(id) = conversation_id {
            form = form.text("conversation_id", id.to_string());
        }
        for attachment in attachments {
            let part = reqwest::multipart::Part::bytes(attachment.bytes.clone())
                .file_name(attachment.meta.file_name.clone())
                .mime_str(&attachment.mime)
                .map_err(|e| format_api_error(&e.to_string()))?;
            form = form.part("files", part);
        }

        let response = self
            .request(reqwest::Method::POST, "api/chat/upload")
            .timeout(UPLOAD_REQUEST_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(|e| format_api_error(&e.to_string()))?;
        Self::read_reply(response).await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, String> {
        let response = self
            .request(reqwest::Method::GET, "api/conversations")
            .timeout(TEXT_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| format_api_error(&e.to_string()))?;
        Self::read_reply(response).await
    }

    async fn fetch_conversation(&self, id: &str) -> Result<ConversationDetail, String> {
        let response = self
            .request(reqwest::Method::GET, &format!("api/conversations/{id}"))
            .timeout(TEXT_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| format_api_error(&e.to_string()))?;
        Self::read_reply(response).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), String> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("api/conversations/{id}"))
            .timeout(TEXT_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| format_api_error(&e.to_string()))?;
        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(format_api_error(&error_text));
        }
        Ok(())
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(|message| message.as_str().map(str::to_owned)),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("detail")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

/// Format a backend error body for transcript display: pretty JSON with a
/// one-line summary when one can be extracted, fenced verbatim otherwise.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error:\n```\n<empty>\n```".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            if let Some(summary) = extract_error_summary(&json_value) {
                if !summary.is_empty() {
                    return format!("API Error: {}\n```json\n{}\n```", summary, pretty_json);
                }
            }
            return format!("API Error:\n```json\n{}\n```", pretty_json);
        }
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("API Error:\n```xml\n{}\n```", trimmed)
    } else {
        format!("API Error:\n```\n{}\n```", trimmed)
    }
}
