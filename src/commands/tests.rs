use super::*;
use crate::core::conversation::{Conversation, TranscriptRole};
use crate::utils::test_utils::create_test_app;

#[test]
fn plain_text_passes_through_untouched() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "Hallo, wer baut hier?");
    match result {
        CommandResult::ProcessAsMessage(text) => assert_eq!(text, "Hallo, wer baut hier?"),
        _ => panic!("expected ProcessAsMessage"),
    }
}

#[test]
fn unknown_command_is_treated_as_a_message() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "/unbekannt foo");
    assert!(matches!(result, CommandResult::ProcessAsMessage(_)));
}

#[test]
fn lone_slash_is_treated_as_a_message() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "/");
    assert!(matches!(result, CommandResult::ProcessAsMessage(_)));
}

#[test]
fn command_names_are_case_insensitive() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "/QUIT");
    assert!(matches!(result, CommandResult::Continue));
    assert!(app.ui.exit_requested);
}

#[test]
fn help_lists_every_command_in_the_transcript() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "/help");
    assert!(matches!(result, CommandResult::Continue));

    let transcript = app.ui.transcript();
    assert_eq!(transcript.len(), 1);
    let entry = &transcript[0];
    assert_eq!(entry.role, TranscriptRole::AppInfo);
    for command in all_commands() {
        assert!(
            entry.content.contains(&format!("/{}", command.name)),
            "help is missing /{}",
            command.name
        );
    }
}

#[test]
fn new_discards_the_open_conversation() {
    let mut app = create_test_app();
    app.ui.conversation = Some(Conversation::provisional("conv-1", "Dachausbau"));

    let result = process_input(&mut app, "/new");
    assert!(matches!(result, CommandResult::Continue));
    assert!(app.ui.conversation.is_none());
}

#[test]
fn chats_requests_the_picker() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "/chats");
    assert!(matches!(result, CommandResult::OpenConversationPicker));
}

#[test]
fn attach_without_args_shows_usage() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "/attach");
    assert!(matches!(result, CommandResult::Continue));
    assert_eq!(app.ui.status.as_deref(), Some("Usage: /attach <path>"));
    assert!(app.ui.pending_attachments.is_empty());
}

#[test]
fn attach_missing_file_reports_the_error() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "/attach /no/such/grundriss.pdf");
    assert!(matches!(result, CommandResult::Continue));
    let status = app.ui.status.as_deref().unwrap_or("");
    assert!(status.contains("Could not read"), "got: {status}");
    assert!(app.ui.pending_attachments.is_empty());
}

#[test]
fn attach_stages_a_readable_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("angebot.pdf");
    std::fs::write(&path, b"%PDF-1.4 fake body").expect("write temp file");

    let mut app = create_test_app();
    let input = format!("/attach {}", path.display());
    let result = process_input(&mut app, &input);
    assert!(matches!(result, CommandResult::Continue));
    assert_eq!(app.ui.pending_attachments.len(), 1);
    let status = app.ui.status.as_deref().unwrap_or("");
    assert!(status.contains("angebot.pdf"), "got: {status}");
}

#[test]
fn log_without_a_file_reports_how_to_enable() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "/log");
    assert!(matches!(result, CommandResult::Continue));
    let status = app.ui.status.as_deref().unwrap_or("");
    assert!(status.contains("No log file specified"), "got: {status}");
}

#[test]
fn log_with_a_file_enables_logging() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("protokoll.md");

    let mut app = create_test_app();
    let input = format!("/log {}", path.display());
    let result = process_input(&mut app, &input);
    assert!(matches!(result, CommandResult::Continue));
    assert!(app.session.logging.is_active());
    let status = app.ui.status.as_deref().unwrap_or("");
    assert!(status.contains("Logging enabled"), "got: {status}");
}

#[test]
fn typewriter_switches_session_state() {
    let mut app = create_test_app();
    assert!(app.ui.typewriter_enabled);

    process_input(&mut app, "/typewriter off");
    assert!(!app.ui.typewriter_enabled);

    process_input(&mut app, "/typewriter");
    assert!(app.ui.typewriter_enabled);

    process_input(&mut app, "/typewriter vielleicht");
    assert!(app.ui.typewriter_enabled);
    assert_eq!(
        app.ui.status.as_deref(),
        Some("Usage: /typewriter [on|off|toggle]")
    );
}
