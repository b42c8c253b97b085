use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::core::conversation::{Conversation, Message, MessageKind};

pub struct LoggingState {
    file_path: Option<String>,
    is_active: bool,
}

impl LoggingState {
    pub fn new(log_file: Option<String>) -> Self {
        LoggingState {
            file_path: log_file,
            is_active: false,
        }
    }

    pub fn set_log_file(&mut self, path: String) -> Result<String, Box<dyn std::error::Error>> {
        // Test if we can create/write to the file
        self.test_file_access(&path)?;

        self.file_path = Some(path.clone());
        self.is_active = true;

        Ok(format!("Logging enabled to: {path}"))
    }

    pub fn toggle_logging(
        &mut self,
        pause_message: &str,
    ) -> Result<String, Box<dyn std::error::Error>> {
        match &self.file_path {
            Some(path) => {
                if self.is_active {
                    // Write pause message to log BEFORE pausing
                    self.log_line(&format!("## {}", pause_message))?;
                    self.is_active = false;
                    Ok(format!("Logging paused (file: {path})"))
                } else {
                    self.is_active = true;
                    Ok(format!("Logging resumed to: {path}"))
                }
            }
            None => {
                Err("No log file specified. Use /log <filename> to enable logging first.".into())
            }
        }
    }

    /// Append one transcript message in the on-disk format. No-ops while
    /// logging is paused or unconfigured.
    pub fn log_message(
        &self,
        message: &Message,
        user_display_name: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(rendered) = render_for_log(message, user_display_name) {
            self.log_line(&rendered)?;
        }
        Ok(())
    }

    fn log_line(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        if !self.is_active || self.file_path.is_none() {
            return Ok(());
        }

        self.write_to_log(content)
    }

    fn write_to_log(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let file_path = match self.file_path.as_ref() {
            Some(path) => path,
            None => return Ok(()),
        };

        // Open file in append mode
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        let mut writer = BufWriter::with_capacity(64 * 1024, file);

        // Write each line of content, preserving the exact formatting
        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }

        // Empty line after each message for spacing, matching screen display
        writeln!(writer)?;

        writer.flush()?;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn get_status_string(&self) -> String {
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!(
                "active ({})",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
            (Some(path), false) => format!(
                "paused ({})",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
        }
    }

    /// Replace the log with the full transcript of `conversation`. Used
    /// when the user opens a different conversation while logging, so the
    /// file mirrors what is on screen.
    pub fn rewrite_from_conversation(
        &self,
        conversation: &Conversation,
        user_display_name: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !self.is_active || self.file_path.is_none() {
            return Ok(());
        }

        let file_path = self.file_path.as_ref().ok_or("log file vanished")?;
        let target_path = Path::new(file_path);
        let parent = target_path.parent().unwrap_or_else(|| Path::new("."));

        // Temp file in the same directory so the rename stays atomic
        let mut temp_file = NamedTempFile::new_in(parent)?;

        for msg in &conversation.messages {
            if let Some(rendered) = render_for_log(msg, user_display_name) {
                for line in rendered.lines() {
                    writeln!(temp_file, "{line}")?;
                }
                writeln!(temp_file)?;
            }
        }

        temp_file.flush()?;
        temp_file.as_file().sync_all()?;

        // Original file only replaced after the complete write
        temp_file.persist(file_path)?;

        Ok(())
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}

/// On-disk form of one message: user turns carry the display-name prefix,
/// assistant text goes verbatim, generated images log as a reference line.
/// App messages stay off the record. Image attachments embed their
/// thumbnail so markdown viewers show what was sent.
fn render_for_log(message: &Message, user_display_name: &str) -> Option<String> {
    if message.is_user() {
        let mut rendered = format!("{}: {}", user_display_name, message.content);
        for attachment in &message.attachments {
            rendered.push_str(&format!("\n[attached: {}]", attachment.chip()));
            if let Some(preview) = &attachment.preview {
                rendered.push_str(&format!("\n![{}]({})", attachment.file_name, preview));
            }
        }
        Some(rendered)
    } else if message.is_assistant() {
        match &message.kind {
            MessageKind::Image { url } => Some(format!("[image] {url}")),
            MessageKind::Text if !message.content.is_empty() => Some(message.content.clone()),
            MessageKind::Text => None,
        }
    } else {
        None
    }
}
