use crate::api::TurnResponse;
use crate::core::attachment::{AttachmentKind, AttachmentMeta, PreparedAttachment};
use crate::core::conversation::TranscriptRole;
use crate::core::request::{TurnDispatcher, TurnEvent};
use crate::ui::picker::NEW_CONVERSATION_ID;
use crate::utils::test_utils::{
    conversation_summary, create_test_app, create_test_app_with_transport, stored_conversation,
    text_reply, ScriptedTransport,
};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn first_turn_creates_provisional_conversation() {
    let mut app = create_test_app();
    app.ui
        .set_input_text("Hallo, was kostet ein Dachausbau?".to_string());
    let params = app.conversation().begin_turn().expect("turn starts");

    assert_eq!(params.message, "Hallo, was kostet ein Dachausbau?");
    assert_eq!(params.conversation_id, None);
    assert_eq!(params.session_id, "sess-test");
    assert_eq!(params.request_id, 1);

    let conversation = app.ui.conversation.as_ref().unwrap();
    assert!(conversation.is_provisional());
    assert!(conversation.id.starts_with("conv-"));
    assert_eq!(conversation.title, "Hallo, was kostet ein Dachausb...");
    assert_eq!(conversation.messages.len(), 1);
    assert!(conversation.messages[0].is_user());
    assert!(conversation.messages[0].id.starts_with("msg-"));

    assert_eq!(app.ui.get_input_text(), "");
    assert!(app.session.is_turn_outstanding());
}

#[test]
fn empty_submit_is_ignored() {
    let mut app = create_test_app();
    app.ui.set_input_text("   ".to_string());
    assert!(app.conversation().begin_turn().is_none());
    assert!(app.ui.conversation.is_none());
    assert!(!app.session.is_turn_outstanding());
}

#[test]
fn empty_submit_skips_an_active_reveal() {
    let mut app = create_test_app();
    app.ui.set_input_text("Hallo".to_string());
    let params = app.conversation().begin_turn().unwrap();
    app.conversation().apply_reply(
        text_reply("msg-1", "conv-1", None, "Eine längere Antwort, die animiert"),
        params.request_id,
    );
    assert!(app.ui.is_reveal_active());

    // Enter with nothing drafted acts as "show it all now".
    assert!(app.conversation().begin_turn().is_none());
    assert!(!app.ui.is_reveal_active());
    assert_eq!(app.ui.conversation.as_ref().unwrap().messages.len(), 2);
}

#[test]
fn text_reply_reconciles_identity_and_animates() {
    let mut app = create_test_app();
    app.ui.set_input_text("Hallo".to_string());
    let params = app.conversation().begin_turn().unwrap();

    let reply = text_reply(
        "msg-srv-1",
        "conv-srv-9",
        Some("Begrüßung"),
        "Hallo! Wie kann ich Ihnen helfen?",
    );
    app.conversation().apply_reply(reply, params.request_id);

    let conversation = app.ui.conversation.as_ref().unwrap();
    assert!(!conversation.is_provisional());
    assert_eq!(conversation.id, "conv-srv-9");
    assert_eq!(conversation.title, "Begrüßung");
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(
        conversation.messages[1].content,
        "Hallo! Wie kann ich Ihnen helfen?"
    );
    assert!(!app.session.is_turn_outstanding());
    assert!(app.ui.is_reveal_active());

    let mut ticks = 0;
    while app.ui.is_reveal_active() {
        app.ui.tick_reveal();
        ticks += 1;
        assert!(ticks <= 64, "short reply should finish revealing quickly");
    }
    let assistant = &app.ui.conversation.as_ref().unwrap().messages[1];
    assert_eq!(
        app.ui.visible_content(assistant),
        "Hallo! Wie kann ich Ihnen helfen?"
    );
}

#[test]
fn reconciliation_happens_only_once() {
    let mut app = create_test_app();
    app.ui.set_input_text("Hallo".to_string());
    let params = app.conversation().begin_turn().unwrap();
    app.conversation().apply_reply(
        text_reply("msg-1", "conv-srv-9", Some("Begrüßung"), "Hallo!"),
        params.request_id,
    );

    app.ui.set_input_text("Und die Kosten?".to_string());
    let params = app.conversation().begin_turn().unwrap();
    assert_eq!(params.conversation_id, Some("conv-srv-9".to_string()));
    assert_eq!(params.request_id, 2);

    // A reply that names a different conversation cannot rewrite identity.
    app.conversation().apply_reply(
        text_reply("msg-2", "conv-other", Some("Anders"), "Kommt darauf an."),
        params.request_id,
    );
    let conversation = app.ui.conversation.as_ref().unwrap();
    assert_eq!(conversation.id, "conv-srv-9");
    assert_eq!(conversation.title, "Begrüßung");
    assert_eq!(conversation.messages.len(), 4);
}

#[test]
fn image_reply_is_proxied_and_never_animates() {
    let mut app = create_test_app();
    app.ui.set_input_text("Zeig mir den Grundriss".to_string());
    let params = app.conversation().begin_turn().unwrap();

    let reply = TurnResponse {
        message_id: "msg-srv-2".to_string(),
        conversation_id: "conv-srv-9".to_string(),
        title: None,
        response: serde_json::Value::String(
            "{'type': 'image', 'imageUrl': 'https://cdn.example.org/plan.png'}".to_string(),
        ),
    };
    app.conversation().apply_reply(reply, params.request_id);

    let conversation = app.ui.conversation.as_ref().unwrap();
    let assistant = conversation.last_message().unwrap();
    assert!(assistant.is_image());
    let url = assistant.image_url().unwrap();
    assert!(url.starts_with("https://chat.example.com/api/proxy-image?url="));
    assert!(url.contains("plan.png"));
    assert!(!app.ui.is_reveal_active());

    // Server sent no title, so the derived draft title stays.
    assert_eq!(conversation.title, "Zeig mir den Grundriss");
    assert!(!conversation.is_provisional());
}

#[test]
fn submit_while_outstanding_cancels_instead_of_sending() {
    let mut app = create_test_app();
    app.ui.set_input_text("Erste Frage".to_string());
    let params = app.conversation().begin_turn().unwrap();
    assert!(!params.cancel_token.is_cancelled());

    app.ui.set_input_text("Zweite Frage".to_string());
    assert!(app.conversation().begin_turn().is_none());

    assert!(params.cancel_token.is_cancelled());
    assert!(!app.session.is_turn_outstanding());
    // The draft survives; only the first message made it into the
    // transcript.
    assert_eq!(app.ui.get_input_text(), "Zweite Frage");
    assert_eq!(app.ui.conversation.as_ref().unwrap().messages.len(), 1);
}

#[test]
fn cancel_settles_a_reveal_in_progress() {
    let mut app = create_test_app();
    app.ui.set_input_text("Hallo".to_string());
    let params = app.conversation().begin_turn().unwrap();
    app.conversation().apply_reply(
        text_reply("msg-1", "conv-1", None, "Eine längere Antwort, die animiert"),
        params.request_id,
    );
    assert!(app.ui.is_reveal_active());

    app.conversation().cancel_active_turn();
    assert!(!app.ui.is_reveal_active());
}

#[test]
fn late_reply_after_cancel_is_discarded() {
    let mut app = create_test_app();
    app.ui.set_input_text("Erste Frage".to_string());
    let params = app.conversation().begin_turn().unwrap();
    app.conversation().cancel_active_turn();

    app.conversation().apply_reply(
        text_reply("msg-1", "conv-1", None, "Zu spät"),
        params.request_id,
    );

    let conversation = app.ui.conversation.as_ref().unwrap();
    assert_eq!(conversation.messages.len(), 1);
    assert!(conversation.is_provisional());
    assert!(!app.ui.is_reveal_active());
}

#[test]
fn reply_for_superseded_request_is_discarded() {
    let mut app = create_test_app();
    app.ui.set_input_text("Erste Frage".to_string());
    let first = app.conversation().begin_turn().unwrap();
    app.conversation().cancel_active_turn();

    app.ui.set_input_text("Zweite Frage".to_string());
    let second = app.conversation().begin_turn().unwrap();
    assert_eq!(second.request_id, first.request_id + 1);

    app.conversation().apply_reply(
        text_reply("msg-alt", "conv-alt", None, "Antwort auf die erste"),
        first.request_id,
    );
    assert_eq!(app.ui.conversation.as_ref().unwrap().messages.len(), 2);
    assert!(app.session.is_turn_outstanding());

    app.conversation().apply_reply(
        text_reply("msg-neu", "conv-neu", None, "Antwort auf die zweite"),
        second.request_id,
    );
    let conversation = app.ui.conversation.as_ref().unwrap();
    assert_eq!(conversation.messages.len(), 3);
    assert_eq!(conversation.id, "conv-neu");
    assert!(!app.session.is_turn_outstanding());
}

#[test]
fn failure_surfaces_exactly_one_error_reply() {
    let mut app = create_test_app();
    app.ui.set_input_text("Hallo".to_string());
    let params = app.conversation().begin_turn().unwrap();

    let error = "API Error:\n```\nDer Server ist gerade nicht erreichbar.\n```".to_string();
    app.conversation().apply_failure(error.clone(), params.request_id);

    let conversation = app.ui.conversation.as_ref().unwrap();
    assert_eq!(conversation.messages.len(), 2);
    let replies: Vec<_> = conversation
        .messages
        .iter()
        .filter(|m| m.role == TranscriptRole::Assistant)
        .collect();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].content, error);
    assert!(!replies[0].content.is_empty());
    // Typewriter is on by default, yet an error reply must not animate.
    assert!(!app.ui.is_reveal_active());
    assert!(!app.session.is_turn_outstanding());

    // A late duplicate of the same failure does not add a second entry.
    app.conversation().apply_failure(error, params.request_id);
    assert_eq!(app.ui.conversation.as_ref().unwrap().messages.len(), 2);
}

#[test]
fn attachment_only_submit_is_allowed() {
    let mut app = create_test_app();
    app.ui.pending_attachments.push(PreparedAttachment {
        meta: AttachmentMeta {
            file_name: "grundriss.pdf".to_string(),
            kind: AttachmentKind::Pdf,
            size_bytes: 420_000,
            preview: None,
        },
        mime: "application/pdf".to_string(),
        bytes: vec![0x25, 0x50, 0x44, 0x46],
    });

    let params = app.conversation().begin_turn().expect("attachments carry the turn");
    assert_eq!(params.message, "");
    assert_eq!(params.attachments.len(), 1);
    assert!(app.ui.pending_attachments.is_empty());

    let conversation = app.ui.conversation.as_ref().unwrap();
    assert_eq!(conversation.title, "grundriss.pdf");
    assert_eq!(conversation.messages[0].attachments.len(), 1);
}

#[tokio::test]
async fn open_conversation_decodes_stored_payloads() {
    let transport = Arc::new(ScriptedTransport::new().with_stored(
        conversation_summary("conv-7", "Dämmung"),
        stored_conversation(
            "conv-7",
            "Dämmung",
            &[
                ("user", "Welche Dämmung empfiehlst du?"),
                (
                    "assistant",
                    "{'type': 'image', 'imageUrl': 'https://cdn.example.org/daemmung.png'}",
                ),
                ("assistant", "Mineralwolle ist üblich."),
            ],
        ),
    ));
    let mut app = create_test_app_with_transport(transport);

    app.conversation()
        .open_conversation("conv-7")
        .await
        .expect("stored conversation loads");

    let conversation = app.ui.conversation.as_ref().unwrap();
    assert_eq!(conversation.id, "conv-7");
    assert!(!conversation.is_provisional());
    assert_eq!(conversation.messages.len(), 3);
    assert!(conversation.messages[0].is_user());
    assert!(conversation.messages[1].is_image());
    assert!(conversation.messages[1]
        .image_url()
        .unwrap()
        .starts_with("https://chat.example.com/api/proxy-image?url="));
    assert_eq!(conversation.messages[2].content, "Mineralwolle ist üblich.");
    // History never animates.
    assert!(!app.ui.is_reveal_active());
}

#[tokio::test]
async fn opening_a_conversation_abandons_the_outstanding_turn() {
    let transport = Arc::new(ScriptedTransport::new().with_stored(
        conversation_summary("conv-7", "Dämmung"),
        stored_conversation("conv-7", "Dämmung", &[("user", "Welche Dämmung?")]),
    ));
    let mut app = create_test_app_with_transport(transport);

    app.ui.set_input_text("Hallo".to_string());
    let params = app.conversation().begin_turn().unwrap();

    app.conversation()
        .open_conversation("conv-7")
        .await
        .unwrap();
    assert!(params.cancel_token.is_cancelled());

    // The reply for the abandoned turn arrives afterwards and is dropped.
    app.conversation().apply_reply(
        text_reply("msg-1", "conv-x", None, "Verspätet"),
        params.request_id,
    );
    let conversation = app.ui.conversation.as_ref().unwrap();
    assert_eq!(conversation.id, "conv-7");
    assert_eq!(conversation.messages.len(), 1);
}

#[tokio::test]
async fn picker_selection_starts_a_fresh_conversation() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_stored(
                conversation_summary("conv-1", "Dachausbau"),
                stored_conversation("conv-1", "Dachausbau", &[]),
            )
            .with_stored(
                conversation_summary("conv-2", "Keller"),
                stored_conversation("conv-2", "Keller", &[]),
            ),
    );
    let mut app = create_test_app_with_transport(transport);

    app.conversation().open_picker().await.unwrap();
    let picker = app.ui.picker.as_ref().unwrap();
    assert_eq!(picker.items.len(), 3);
    assert_eq!(picker.selected_id(), Some(NEW_CONVERSATION_ID));

    app.conversation().confirm_picker_selection().await.unwrap();
    assert!(app.ui.conversation.is_none());
    assert!(app.ui.picker.is_none());
}

#[tokio::test]
async fn deleting_the_current_conversation_resets_the_view() {
    let transport = Arc::new(ScriptedTransport::new().with_stored(
        conversation_summary("conv-1", "Dachausbau"),
        stored_conversation("conv-1", "Dachausbau", &[("user", "Hallo")]),
    ));
    let scripted = Arc::clone(&transport);
    let mut app = create_test_app_with_transport(transport);

    app.conversation().open_conversation("conv-1").await.unwrap();
    app.conversation().open_picker().await.unwrap();
    app.conversation().delete_conversation("conv-1").await.unwrap();

    assert_eq!(scripted.deleted.lock().unwrap().as_slice(), ["conv-1"]);
    assert!(app.ui.conversation.is_none());
    // Picker stays open with the deleted row gone.
    let picker = app.ui.picker.as_ref().unwrap();
    assert!(picker.items.iter().all(|item| item.id != "conv-1"));
}

#[tokio::test(start_paused = true)]
async fn dispatcher_delivers_completion_to_the_controller() {
    let transport = Arc::new(ScriptedTransport::new().with_reply(Ok(text_reply(
        "msg-srv-1",
        "conv-srv-1",
        Some("Begrüßung"),
        "Hallo!",
    ))));
    let scripted = Arc::clone(&transport);
    let mut app = create_test_app_with_transport(transport);
    let (dispatcher, mut rx) = TurnDispatcher::new();

    app.ui.set_input_text("Hallo".to_string());
    let params = app.conversation().begin_turn().unwrap();
    dispatcher.spawn_turn(params);

    let (event, request_id) = rx.recv().await.expect("turn resolves");
    match event {
        TurnEvent::Completed(reply) => app.conversation().apply_reply(reply, request_id),
        TurnEvent::Failed(error) => app.conversation().apply_failure(error, request_id),
    }

    let sent = scripted.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].session_id, "sess-test");
    assert_eq!(sent[0].conversation_id, None);
    drop(sent);

    let conversation = app.ui.conversation.as_ref().unwrap();
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.id, "conv-srv-1");
}

#[tokio::test(start_paused = true)]
async fn dispatcher_sends_nothing_for_a_cancelled_turn() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_reply(Ok(text_reply("msg-srv-1", "conv-srv-1", None, "Hallo!")))
            .with_reply_delay(Duration::from_millis(500)),
    );
    let mut app = create_test_app_with_transport(transport);
    let (dispatcher, mut rx) = TurnDispatcher::new();

    app.ui.set_input_text("Hallo".to_string());
    let params = app.conversation().begin_turn().unwrap();
    dispatcher.spawn_turn(params);

    // Let the spawned task reach the transport's sleep, then cancel.
    tokio::task::yield_now().await;
    app.conversation().cancel_active_turn();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(rx.try_recv().is_err());
    assert_eq!(app.ui.conversation.as_ref().unwrap().messages.len(), 1);
    assert!(!app.session.is_turn_outstanding());
}

#[tokio::test(start_paused = true)]
async fn dispatcher_routes_attachments_through_upload() {
    let transport = Arc::new(ScriptedTransport::new().with_reply(Ok(text_reply(
        "msg-srv-1",
        "conv-srv-1",
        None,
        "Der Grundriss sieht gut aus.",
    ))));
    let scripted = Arc::clone(&transport);
    let mut app = create_test_app_with_transport(transport);
    let (dispatcher, mut rx) = TurnDispatcher::new();

    app.ui.set_input_text("Passt das so?".to_string());
    app.ui.pending_attachments.push(PreparedAttachment {
        meta: AttachmentMeta {
            file_name: "grundriss.pdf".to_string(),
            kind: AttachmentKind::Pdf,
            size_bytes: 420_000,
            preview: None,
        },
        mime: "application/pdf".to_string(),
        bytes: vec![0x25, 0x50, 0x44, 0x46],
    });
    let params = app.conversation().begin_turn().unwrap();
    assert_eq!(params.attachments.len(), 1);
    dispatcher.spawn_turn(params);

    let (event, request_id) = rx.recv().await.expect("upload resolves");
    if let TurnEvent::Completed(reply) = event {
        app.conversation().apply_reply(reply, request_id);
    }

    let sent = scripted.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, "Passt das so?");
    drop(sent);
    assert_eq!(app.ui.conversation.as_ref().unwrap().messages.len(), 2);
}
