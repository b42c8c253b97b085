use crate::core::attachment::PreparedAttachment;
use crate::core::config::Config;
use crate::core::conversation::{Conversation, Message, MessageKind};
use crate::core::typewriter::Typewriter;
use crate::ui::picker::PickerState;
use crate::ui::theme::Theme;
use std::time::{Duration, Instant};
use tui_textarea::{CursorMove, TextArea};

/// Reveal animation bound to one assistant message by id. At most one
/// exists at a time; a newer reveal, a conversation switch, or a snap
/// retires it.
struct ActiveReveal {
    message_id: String,
    typewriter: Typewriter,
}

pub struct UiState {
    /// The conversation on screen. `None` until the first send of a fresh
    /// session or after "new conversation".
    pub conversation: Option<Conversation>,
    reveal: Option<ActiveReveal>,
    textarea: TextArea<'static>,
    input: String,
    pub pending_attachments: Vec<PreparedAttachment>,
    pub picker: Option<PickerState>,
    pub status: Option<String>,
    pub status_set_at: Option<Instant>,
    pub user_display_name: String,
    pub typewriter_enabled: bool,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    /// Phase anchor for the pending-reply indicator animation.
    pub pulse_start: Instant,
    pub exit_requested: bool,
    pub theme: Theme,
}

impl UiState {
    pub(crate) fn from_config(theme: Theme, config: &Config) -> Self {
        let mut ui = Self {
            conversation: None,
            reveal: None,
            textarea: TextArea::default(),
            input: String::new(),
            pending_attachments: Vec::new(),
            picker: None,
            status: None,
            status_set_at: None,
            user_display_name: config
                .display_name
                .clone()
                .unwrap_or_else(|| "Du".to_string()),
            typewriter_enabled: config.typewriter_enabled(),
            scroll_offset: 0,
            auto_scroll: true,
            pulse_start: Instant::now(),
            exit_requested: false,
            theme,
        };
        ui.configure_textarea();
        ui
    }

    pub(crate) fn configure_textarea(&mut self) {
        let textarea_style = self
            .theme
            .input_text_style
            .patch(ratatui::style::Style::default().bg(self.theme.background_color));
        self.textarea.set_style(textarea_style);
        self.textarea
            .set_cursor_style(self.theme.input_cursor_style);
        self.textarea
            .set_cursor_line_style(self.theme.input_cursor_line_style);
    }

    // --- input ---

    pub fn get_input_text(&self) -> &str {
        &self.input
    }

    pub fn set_input_text(&mut self, text: String) {
        self.input = text;
        let lines: Vec<String> = if self.input.is_empty() {
            Vec::new()
        } else {
            self.input.split('\n').map(|s| s.to_string()).collect()
        };
        self.textarea = TextArea::from(lines);
        if !self.input.is_empty() {
            let last_row = self.textarea.lines().len().saturating_sub(1) as u16;
            let last_col = self
                .textarea
                .lines()
                .last()
                .map(|l| l.chars().count() as u16)
                .unwrap_or(0);
            self.textarea.move_cursor(CursorMove::Jump(last_row, last_col));
        }
        self.configure_textarea();
    }

    pub fn clear_input(&mut self) {
        self.set_input_text(String::new());
    }

    /// Feed a key event to the editor and mirror its buffer back into
    /// `input`. Returns true when the buffer changed.
    pub fn handle_input_event(&mut self, event: impl Into<tui_textarea::Input>) -> bool {
        let changed = self.textarea.input(event);
        self.sync_input_from_textarea();
        changed
    }

    /// Break the current line at the cursor. Used for Alt+Enter, since a
    /// plain Enter submits instead of editing.
    pub fn insert_newline(&mut self) {
        self.textarea.insert_str("\n");
        self.sync_input_from_textarea();
    }

    /// Insert pasted text at the cursor, newlines included.
    pub fn insert_text(&mut self, text: &str) {
        self.textarea.insert_str(text);
        self.sync_input_from_textarea();
    }

    pub fn sync_input_from_textarea(&mut self) {
        self.input = self.textarea.lines().join("\n");
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    /// Rows the input editor needs. tui-textarea scrolls long lines instead
    /// of wrapping, so this is the line count, capped to keep the transcript
    /// visible.
    pub fn input_area_height(&self) -> u16 {
        (self.textarea.lines().len().max(1)).min(6) as u16
    }

    // --- transcript ---

    pub fn transcript(&self) -> &[Message] {
        self.conversation
            .as_ref()
            .map(|c| c.messages.as_slice())
            .unwrap_or(&[])
    }

    /// The newest assistant reply, once it is ready to leave the app.
    /// A reply still typing out is withheld so a copy never captures a
    /// half-revealed string; image replies yield their URL.
    pub fn copyable_last_reply(&self) -> Result<String, &'static str> {
        let message = self
            .transcript()
            .iter()
            .rev()
            .find(|m| m.role.is_assistant())
            .ok_or("No reply to copy yet")?;
        if self
            .reveal
            .as_ref()
            .is_some_and(|active| active.message_id == message.id)
        {
            return Err("Reply is still typing out");
        }
        match &message.kind {
            MessageKind::Image { url } => Ok(url.clone()),
            MessageKind::Text => Ok(message.content.clone()),
        }
    }

    // --- reveal ---

    /// Begin revealing an assistant message. Any previous reveal snaps to
    /// its full text first so only the newest message animates.
    pub fn start_reveal(&mut self, message_id: impl Into<String>, text: &str) {
        self.snap_reveal();
        let mut typewriter = Typewriter::new(text);
        typewriter.start();
        if !typewriter.is_complete() {
            self.reveal = Some(ActiveReveal {
                message_id: message_id.into(),
                typewriter,
            });
        }
    }

    /// Advance the active reveal one step. Returns true when the visible
    /// prefix changed and a redraw is due.
    pub fn tick_reveal(&mut self) -> bool {
        let Some(active) = self.reveal.as_mut() else {
            return false;
        };
        let changed = active.typewriter.tick();
        if active.typewriter.is_complete() {
            self.reveal = None;
        }
        changed
    }

    /// Finish the active reveal immediately with the full text visible.
    pub fn snap_reveal(&mut self) {
        self.reveal = None;
    }

    pub fn is_reveal_active(&self) -> bool {
        self.reveal.is_some()
    }

    /// Content of a message as it should be drawn right now: the revealed
    /// prefix while this message is animating, the full text otherwise.
    pub fn visible_content<'m>(&'m self, message: &'m Message) -> &'m str {
        match &self.reveal {
            Some(active) if active.message_id == message.id => active.typewriter.visible(),
            _ => &message.content,
        }
    }

    // --- status line ---

    pub fn set_status<S: Into<String>>(&mut self, s: S) {
        self.status = Some(s.into());
        self.status_set_at = Some(Instant::now());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
        self.status_set_at = None;
    }

    /// Drop a stale status message so it does not linger forever.
    pub fn expire_status(&mut self, max_age: Duration) {
        if self
            .status_set_at
            .is_some_and(|set_at| set_at.elapsed() > max_age)
        {
            self.clear_status();
        }
    }

    // --- scrolling ---

    pub fn scroll_up(&mut self, amount: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(amount);
        self.auto_scroll = false;
    }

    /// Scroll toward the newest output. The renderer clamps the offset and
    /// re-enables follow mode once the bottom is reached.
    pub fn scroll_down(&mut self, amount: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(amount);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.auto_scroll = true;
    }
}
