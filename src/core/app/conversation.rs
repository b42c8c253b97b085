use super::{session::SessionContext, ui_state::UiState};
use crate::api::{TurnResponse, WireMessage};
use crate::core::attachment::prepare_attachment;
use crate::core::conversation::{
    derive_attachment_title, derive_title, Conversation, Message, TranscriptRole,
};
use crate::core::payload::{self, AssistantPayload};
use crate::core::request::TurnParams;
use crate::ui::picker::{conversation_picker, NEW_CONVERSATION_ID};
use crate::utils::url::proxied_image_url;
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Turn lifecycle and conversation switching, borrowed from the app for the
/// duration of one operation.
///
/// The rules it enforces: one outstanding request at a time, submit while
/// outstanding means cancel, replies tagged with a superseded request id
/// are dropped, and only a fresh text reply animates.
pub struct ConversationController<'a> {
    session: &'a mut SessionContext,
    ui: &'a mut UiState,
}

impl<'a> ConversationController<'a> {
    pub fn new(session: &'a mut SessionContext, ui: &'a mut UiState) -> Self {
        Self { session, ui }
    }

    /// Turn the drafted input into a dispatchable request.
    ///
    /// Returns `None` when there is nothing to send, or when a request is
    /// already outstanding; in the latter case the submit counts as a
    /// cancel and the draft stays in the input box.
    pub fn begin_turn(&mut self) -> Option<TurnParams> {
        if self.session.is_turn_outstanding() {
            self.cancel_active_turn();
            return None;
        }

        let text = self.ui.get_input_text().trim().to_string();
        if text.is_empty() && self.ui.pending_attachments.is_empty() {
            // Enter on an empty draft doubles as the skip control for a
            // reveal in progress.
            self.ui.snap_reveal();
            return None;
        }

        self.ui.snap_reveal();
        self.ui.clear_status();

        let attachments = std::mem::take(&mut self.ui.pending_attachments);
        let attachment_meta: Vec<_> = attachments.iter().map(|a| a.meta.clone()).collect();

        let message_id = self.session.ids.message_id();
        let user_message =
            Message::user(message_id, text.clone()).with_attachments(attachment_meta);
        if let Err(e) = self
            .session
            .logging
            .log_message(&user_message, &self.ui.user_display_name)
        {
            eprintln!("Failed to log message: {e}");
        }

        let conversation = self.ensure_conversation();
        if conversation.is_provisional() && conversation.title.is_empty() {
            conversation.title = if text.is_empty() {
                derive_attachment_title(&user_message.attachments)
            } else {
                derive_title(&text)
            };
        }
        conversation.push(user_message);

        // The server only learns the conversation id once it has assigned
        // one itself; a provisional id never goes on the wire.
        let conversation_id = if conversation.is_provisional() {
            None
        } else {
            Some(conversation.id.clone())
        };

        self.ui.clear_input();
        self.ui.scroll_to_bottom();

        self.session.current_request_id += 1;
        let token = CancellationToken::new();
        self.session.turn_cancel_token = Some(token.clone());
        self.ui.pulse_start = Instant::now();

        Some(TurnParams {
            transport: std::sync::Arc::clone(&self.session.transport),
            message: text,
            conversation_id,
            session_id: self.session.session_id.clone(),
            attachments,
            cancel_token: token,
            request_id: self.session.current_request_id,
        })
    }

    /// Fold a completed turn into the conversation. Replies from a request
    /// that was cancelled or superseded are dropped without a trace.
    pub fn apply_reply(&mut self, response: TurnResponse, request_id: u64) {
        if !self.resolve_turn(request_id) {
            return;
        }
        let typewriter_enabled = self.ui.typewriter_enabled;
        let Some(conversation) = self.ui.conversation.as_mut() else {
            return;
        };

        if conversation.is_provisional() {
            conversation.adopt_identity(response.conversation_id.clone(), response.title.clone());
        }

        let message = match payload::decode(&response.response) {
            AssistantPayload::Text { text } => Message::assistant(response.message_id, text),
            AssistantPayload::Image { image_url } => Message::assistant_image(
                response.message_id,
                proxied_image_url(&self.session.base_url, &image_url),
            ),
        };

        if let Err(e) = self
            .session
            .logging
            .log_message(&message, &self.ui.user_display_name)
        {
            eprintln!("Failed to log response: {e}");
        }

        let animate = typewriter_enabled && !message.is_image() && !message.content.is_empty();
        let message_id = message.id.clone();
        let content = message.content.clone();
        conversation.push(message);

        if animate {
            self.ui.start_reveal(message_id, &content);
        }
        self.ui.scroll_to_bottom();
    }

    /// Surface a failed turn as a synthetic assistant reply describing the
    /// error. The entry is local only: never animated, never logged, never
    /// persisted server-side, and the optimistic user message stays put.
    pub fn apply_failure(&mut self, error: String, request_id: u64) {
        if !self.resolve_turn(request_id) {
            return;
        }
        let message_id = self.session.ids.message_id();
        if let Some(conversation) = self.ui.conversation.as_mut() {
            conversation.push(Message::assistant(message_id, error));
        }
        self.ui.scroll_to_bottom();
    }

    /// Check that an event belongs to the outstanding request and mark the
    /// turn resolved. Returns false for anything stale.
    fn resolve_turn(&mut self, request_id: u64) -> bool {
        if request_id != self.session.current_request_id || !self.session.is_turn_outstanding() {
            tracing::debug!(
                request_id,
                current = self.session.current_request_id,
                "dropping stale turn event"
            );
            return false;
        }
        self.session.turn_cancel_token = None;
        true
    }

    /// Abort the outstanding request. The optimistic user message stays in
    /// the transcript and nothing marks the cancellation.
    pub fn cancel_active_turn(&mut self) {
        if let Some(token) = &self.session.turn_cancel_token {
            token.cancel();
        }
        self.session.turn_cancel_token = None;
        // A cancel also settles whatever is still typing out.
        self.ui.snap_reveal();
    }

    /// Fetch the server's conversation list and show the picker.
    pub async fn open_picker(&mut self) -> Result<(), String> {
        let summaries = self.session.transport.list_conversations().await?;
        let active_id = self.ui.conversation.as_ref().map(|c| c.id.clone());
        self.ui.picker = Some(conversation_picker(&summaries, active_id.as_deref()));
        Ok(())
    }

    /// Act on the row chosen in the picker.
    pub async fn confirm_picker_selection(&mut self) -> Result<(), String> {
        let Some(choice) = self
            .ui
            .picker
            .as_ref()
            .and_then(|p| p.selected_id())
            .map(str::to_string)
        else {
            self.ui.picker = None;
            return Ok(());
        };
        if choice == NEW_CONVERSATION_ID {
            self.start_new_conversation();
            Ok(())
        } else {
            self.open_conversation(&choice).await
        }
    }

    /// Load a stored conversation and replace the one on screen. Cancels
    /// any outstanding request; its reply would belong to the old view.
    pub async fn open_conversation(&mut self, id: &str) -> Result<(), String> {
        self.cancel_active_turn();
        let detail = self.session.transport.fetch_conversation(id).await?;

        let mut conversation =
            Conversation::established(detail.id, detail.title, detail.created_at);
        for wire in &detail.messages {
            match self.decode_stored_message(wire) {
                Some(message) => conversation.push(message),
                None => tracing::warn!(role = %wire.role, "skipping message with unknown role"),
            }
        }

        if let Err(e) = self
            .session
            .logging
            .rewrite_from_conversation(&conversation, &self.ui.user_display_name)
        {
            eprintln!("Failed to rewrite log file: {e}");
        }

        self.ui.conversation = Some(conversation);
        self.ui.picker = None;
        self.ui.clear_status();
        self.ui.scroll_to_bottom();
        Ok(())
    }

    /// Stored assistant content is the raw reply payload, so it goes
    /// through the same decoding as a live reply. History never animates.
    fn decode_stored_message(&self, wire: &WireMessage) -> Option<Message> {
        let role = TranscriptRole::from_api_role(&wire.role).ok()?;
        let message = if role.is_assistant() {
            match payload::decode_str(&wire.content) {
                AssistantPayload::Text { text } => Message::assistant(wire.id.clone(), text),
                AssistantPayload::Image { image_url } => Message::assistant_image(
                    wire.id.clone(),
                    proxied_image_url(&self.session.base_url, &image_url),
                ),
            }
        } else {
            Message::new(wire.id.clone(), role, wire.content.clone())
        };
        Some(message)
    }

    /// Reset to an empty view. The next send starts a fresh provisional
    /// conversation.
    pub fn start_new_conversation(&mut self) {
        self.cancel_active_turn();
        self.ui.conversation = None;
        self.ui.picker = None;
        self.ui.clear_status();
        self.ui.scroll_to_bottom();
    }

    /// Delete a stored conversation. If it is the one on screen, the view
    /// resets as well.
    pub async fn delete_conversation(&mut self, id: &str) -> Result<(), String> {
        self.session.transport.delete_conversation(id).await?;
        if let Some(picker) = self.ui.picker.as_mut() {
            picker.remove_item(id);
        }
        if self
            .ui
            .conversation
            .as_ref()
            .is_some_and(|c| c.id == id && !c.is_provisional())
        {
            // Deleting from inside the picker keeps it open.
            let picker = self.ui.picker.take();
            self.start_new_conversation();
            self.ui.picker = picker;
        }
        Ok(())
    }

    /// Stage a file for the next send and report the result in the status
    /// line.
    pub fn attach_file(&mut self, path: &str) {
        match prepare_attachment(Path::new(path)) {
            Ok(prepared) => {
                let chip = prepared.meta.chip();
                self.ui.pending_attachments.push(prepared);
                self.ui.set_status(format!("Attached {chip}"));
            }
            Err(e) => self.ui.set_status(e),
        }
    }

    /// Append an informational entry to the transcript, creating a blank
    /// provisional conversation if none is open yet.
    pub fn add_info(&mut self, content: impl Into<String>) {
        let message_id = self.session.ids.message_id();
        self.ensure_conversation().push(Message::app_info(message_id, content));
    }

    fn ensure_conversation(&mut self) -> &mut Conversation {
        let ids = &mut self.session.ids;
        self.ui
            .conversation
            .get_or_insert_with(|| Conversation::provisional(ids.conversation_id(), String::new()))
    }

    pub fn set_status<S: Into<String>>(&mut self, s: S) {
        self.ui.set_status(s);
    }

    pub fn clear_status(&mut self) {
        self.ui.clear_status();
    }
}
