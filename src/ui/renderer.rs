//! Full-frame draw: transcript, input box, and the conversation picker
//! overlay. Transcript lines are pre-wrapped here so scroll arithmetic
//! always matches what ends up on screen.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::app::{App, UiState};
use crate::core::conversation::TranscriptRole;

pub fn ui(f: &mut Frame, app: &mut App) {
    let input_area_height = app.ui.input_area_height();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(input_area_height + 2), // +2 for borders
        ])
        .split(f.area());

    draw_transcript(f, app, chunks[0]);
    draw_input(f, app, chunks[1]);

    if app.ui.picker.is_some() {
        draw_picker(f, app);
    }
}

fn draw_transcript(f: &mut Frame, app: &mut App, area: Rect) {
    let lines = build_transcript_lines(&app.ui, area.width);

    let available_height = area.height.saturating_sub(1); // Account for title
    let total_lines = lines.len().min(u16::MAX as usize) as u16;
    let max_offset = total_lines.saturating_sub(available_height);

    if app.ui.auto_scroll {
        app.ui.scroll_offset = max_offset;
    } else if app.ui.scroll_offset > max_offset {
        app.ui.scroll_offset = max_offset;
    }

    let title = format!(
        "plausch v{} - {} • Logging: {}",
        env!("CARGO_PKG_VERSION"),
        conversation_heading(&app.ui),
        app.session.logging.get_status_string()
    );

    let transcript = Paragraph::new(lines)
        .style(Style::default().bg(app.ui.theme.background_color))
        .block(Block::default().title(Span::styled(title, app.ui.theme.title_style)))
        .scroll((app.ui.scroll_offset, 0));

    f.render_widget(transcript, area);
}

fn conversation_heading(ui: &UiState) -> &str {
    match &ui.conversation {
        Some(c) if !c.title.is_empty() => c.title.as_str(),
        _ => "New conversation",
    }
}

fn draw_input(f: &mut Frame, app: &mut App, area: Rect) {
    let outstanding = app.session.is_turn_outstanding();

    let title: Span = if let Some(status) = &app.ui.status {
        Span::styled(status.clone(), app.ui.theme.input_title_style)
    } else if outstanding {
        Span::styled(
            "Waiting for the reply (Enter or Esc cancels, Ctrl+C quits)",
            app.ui.theme.input_title_style,
        )
    } else {
        Span::styled(
            "Type your message (/help for help, Ctrl+C to quit)",
            app.ui.theme.input_title_style,
        )
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.ui.theme.input_border_style)
        .title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(app.ui.textarea(), inner);

    if outstanding {
        draw_pending_indicator(f, app, area);
    }
}

/// Pulse symbol one cell in from the right border of the input box, in the
/// spot the cursor can never reach.
fn draw_pending_indicator(f: &mut Frame, app: &App, input_area: Rect) {
    if input_area.width < 4 || input_area.height < 3 {
        return;
    }

    // Two cycles per second, ramping up and back down.
    let elapsed = app.ui.pulse_start.elapsed().as_millis() as f32 / 1000.0;
    let pulse_phase = (elapsed * 2.0) % 2.0;
    let pulse_intensity = if pulse_phase < 1.0 {
        pulse_phase
    } else {
        2.0 - pulse_phase
    };
    let symbol = if pulse_intensity < 0.33 {
        "○"
    } else if pulse_intensity < 0.66 {
        "◐"
    } else {
        "●"
    };

    let cell = Rect {
        x: input_area.x + input_area.width - 3,
        y: input_area.y + 1,
        width: 1,
        height: 1,
    };
    f.render_widget(Clear, cell);
    f.render_widget(
        Paragraph::new(symbol).style(app.ui.theme.pending_indicator_style),
        cell,
    );
}

fn draw_picker(f: &mut Frame, app: &mut App) {
    let Some(picker) = &app.ui.picker else {
        return;
    };

    let area = centered_rect(60, 70, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.ui.theme.input_border_style)
        .title(Span::styled(
            picker.title.clone(),
            app.ui.theme.title_style,
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let items: Vec<ListItem> = picker
        .items
        .iter()
        .map(|item| ListItem::new(item.label.clone()))
        .collect();
    let list = List::new(items)
        .style(Style::default().bg(app.ui.theme.background_color))
        .highlight_style(app.ui.theme.selection_highlight_style);

    let mut state = ListState::default();
    state.select(Some(picker.selected));
    f.render_stateful_widget(list, rows[0], &mut state);

    let hint = Paragraph::new("Enter open • d delete • Esc close")
        .style(app.ui.theme.system_text_style);
    f.render_widget(hint, rows[1]);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r)[1];

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical)[1]
}

/// Build the transcript as display-width-wrapped lines. A reveal in
/// progress shows its visible prefix; everything else renders in full.
fn build_transcript_lines(ui: &UiState, width: u16) -> Vec<Line<'static>> {
    let theme = &ui.theme;
    let width = width.max(1) as usize;
    let mut lines: Vec<Line<'static>> = Vec::new();

    for message in ui.transcript() {
        match message.role {
            TranscriptRole::User => {
                let prefix = format!("{}: ", ui.user_display_name);
                push_wrapped(
                    &mut lines,
                    Some((&prefix, theme.user_prefix_style)),
                    &message.content,
                    theme.user_text_style,
                    width,
                );
                for meta in &message.attachments {
                    push_wrapped(
                        &mut lines,
                        Some(("  + ", theme.system_text_style)),
                        &meta.chip(),
                        theme.system_text_style,
                        width,
                    );
                }
            }
            TranscriptRole::Assistant => {
                if let Some(url) = message.image_url() {
                    push_wrapped(
                        &mut lines,
                        Some(("[Bild] ", theme.system_text_style)),
                        url,
                        theme.assistant_text_style,
                        width,
                    );
                } else {
                    // Heuristic: failed turns land as replies starting with
                    // "API Error", rendered in the error style.
                    let style = if message.content.starts_with("API Error") {
                        theme.error_text_style
                    } else {
                        theme.assistant_text_style
                    };
                    push_wrapped(&mut lines, None, ui.visible_content(message), style, width);
                }
            }
            TranscriptRole::AppInfo => {
                push_wrapped(
                    &mut lines,
                    None,
                    &message.content,
                    theme.system_text_style,
                    width,
                );
            }
        }
        lines.push(Line::from(""));
    }

    lines
}

/// Wrap `text` to the frame width and append it, with an optional styled
/// prefix on the first line and matching indentation on continuations.
fn push_wrapped(
    lines: &mut Vec<Line<'static>>,
    prefix: Option<(&str, Style)>,
    text: &str,
    text_style: Style,
    width: usize,
) {
    let prefix_width = prefix.map(|(p, _)| UnicodeWidthStr::width(p)).unwrap_or(0);
    let body_width = width.saturating_sub(prefix_width).max(1);
    let wrapped = wrap_text(text, body_width);

    if wrapped.is_empty() {
        if let Some((p, style)) = prefix {
            lines.push(Line::from(Span::styled(p.to_string(), style)));
        }
        return;
    }

    for (i, segment) in wrapped.into_iter().enumerate() {
        let line = match (i, prefix) {
            (0, Some((p, style))) => Line::from(vec![
                Span::styled(p.to_string(), style),
                Span::styled(segment, text_style),
            ]),
            (_, Some(_)) => Line::from(vec![
                Span::raw(" ".repeat(prefix_width)),
                Span::styled(segment, text_style),
            ]),
            (_, None) => Line::from(Span::styled(segment, text_style)),
        };
        lines.push(line);
    }
}

/// Greedy word wrap by display width. Words wider than the line break
/// mid-word; explicit newlines are respected.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();

    for raw_line in text.split('\n') {
        if raw_line.is_empty() {
            out.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_width = 0usize;

        for word in raw_line.split(' ') {
            if word.is_empty() {
                continue;
            }
            let word_width = UnicodeWidthStr::width(word);

            if current_width > 0 && current_width + 1 + word_width <= width {
                current.push(' ');
                current.push_str(word);
                current_width += 1 + word_width;
                continue;
            }
            if current_width > 0 {
                out.push(std::mem::take(&mut current));
                current_width = 0;
            }
            if word_width <= width {
                current.push_str(word);
                current_width = word_width;
            } else {
                place_oversized_word(&mut out, &mut current, &mut current_width, word, width);
            }
        }
        out.push(current);
    }

    out
}

fn place_oversized_word(
    out: &mut Vec<String>,
    current: &mut String,
    current_width: &mut usize,
    word: &str,
    width: usize,
) {
    for ch in word.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if *current_width + ch_width > width && *current_width > 0 {
            out.push(std::mem::take(current));
            *current_width = 0;
        }
        current.push(ch);
        *current_width += ch_width;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::{Conversation, Message};
    use crate::utils::test_utils::create_test_app;

    #[test]
    fn wrap_text_honors_word_boundaries() {
        let wrapped = wrap_text("Die Dämmung der obersten Geschossdecke", 15);
        assert_eq!(wrapped, vec!["Die Dämmung der", "obersten", "Geschossdecke"]);
        for line in &wrapped {
            assert!(UnicodeWidthStr::width(line.as_str()) <= 15);
        }
    }

    #[test]
    fn wrap_text_breaks_oversized_tokens() {
        let wrapped = wrap_text("https://bauki.eu/api/conversations/0123456789", 20);
        assert!(wrapped.len() > 1);
        for line in &wrapped {
            assert!(UnicodeWidthStr::width(line.as_str()) <= 20);
        }
        assert_eq!(
            wrapped.concat(),
            "https://bauki.eu/api/conversations/0123456789"
        );
    }

    #[test]
    fn wrap_text_keeps_explicit_newlines() {
        let wrapped = wrap_text("erste Zeile\n\ndritte Zeile", 40);
        assert_eq!(wrapped, vec!["erste Zeile", "", "dritte Zeile"]);
    }

    #[test]
    fn transcript_lines_carry_the_user_prefix_once() {
        let mut app = create_test_app();
        let mut conversation = Conversation::provisional("conv-1", "Test");
        conversation.push(Message::user(
            "msg-1",
            "Eine lange Frage zur Dämmung der obersten Geschossdecke im Altbau",
        ));
        app.ui.conversation = Some(conversation);

        let lines = build_transcript_lines(&app.ui, 30);
        let rendered: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();

        assert!(rendered[0].starts_with("Du: "));
        assert!(rendered.len() > 2);
        assert!(rendered[1].starts_with("    "));
        assert_eq!(rendered.last().map(String::as_str), Some(""));
    }

    #[test]
    fn image_messages_render_as_a_labelled_link() {
        let mut app = create_test_app();
        let mut conversation = Conversation::provisional("conv-1", "Test");
        conversation.push(Message::assistant_image(
            "msg-1",
            "https://chat.example.com/api/proxy-image?url=abc",
        ));
        app.ui.conversation = Some(conversation);

        let lines = build_transcript_lines(&app.ui, 120);
        let first: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(
            first,
            "[Bild] https://chat.example.com/api/proxy-image?url=abc"
        );
    }

    #[test]
    fn reveal_in_progress_shows_only_the_visible_prefix() {
        let mut app = create_test_app();
        let mut conversation = Conversation::provisional("conv-1", "Test");
        conversation.push(Message::assistant("msg-1", "Hallo zurück aus dem Test"));
        app.ui.conversation = Some(conversation);
        app.ui.start_reveal("msg-1".to_string(), "Hallo zurück aus dem Test");

        let lines = build_transcript_lines(&app.ui, 120);
        let first: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(first.len() < "Hallo zurück aus dem Test".len());
    }

    #[test]
    fn error_replies_render_in_the_error_style() {
        let mut app = create_test_app();
        let mut conversation = Conversation::provisional("conv-1", "Test");
        conversation.push(Message::assistant("msg-1", "API Error: model overloaded"));
        conversation.push(Message::assistant("msg-2", "Eine normale Antwort"));
        app.ui.conversation = Some(conversation);

        let lines = build_transcript_lines(&app.ui, 120);
        assert_eq!(lines[0].spans[0].style, app.ui.theme.error_text_style);
        assert_eq!(lines[2].spans[0].style, app.ui.theme.assistant_text_style);
    }

    #[test]
    fn attachment_chips_follow_the_user_message() {
        use crate::core::attachment::{AttachmentKind, AttachmentMeta};

        let mut app = create_test_app();
        let mut conversation = Conversation::provisional("conv-1", "Test");
        conversation.push(
            Message::user("msg-1", "Hier der Grundriss").with_attachments(vec![AttachmentMeta {
                file_name: "grundriss.pdf".into(),
                kind: AttachmentKind::Pdf,
                size_bytes: 2048,
                preview: None,
            }]),
        );
        app.ui.conversation = Some(conversation);

        let lines = build_transcript_lines(&app.ui, 120);
        let chip_line: String = lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(chip_line, "  + grundriss.pdf (PDF, 2 KB)");
    }
}
