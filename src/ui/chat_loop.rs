//! Main chat event loop.
//!
//! Owns the terminal, drives the frame/reveal cadence, routes key events,
//! and folds turn outcomes from the dispatcher back into the app.

use std::error::Error;
use std::io;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use crate::commands::{process_input, CommandResult};
use crate::core::app::{bootstrap, App, AppInitConfig};
use crate::core::config::Config;
use crate::core::constants::REVEAL_TICK;
use crate::core::request::{TurnDispatcher, TurnEvent};
use crate::ui::picker::NEW_CONVERSATION_ID;
use crate::ui::renderer::ui;
use crate::utils::clipboard::copy_to_clipboard;

/// Event-poll timeout when nothing is animating.
const IDLE_POLL: Duration = Duration::from_millis(50);
/// Status messages vanish on their own after this long.
const STATUS_MAX_AGE: Duration = Duration::from_secs(60);
/// Transcript rows jumped per PageUp/PageDown.
const SCROLL_PAGE: u16 = 10;

pub async fn run_chat(init: AppInitConfig) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    let mut app = bootstrap(init, &mut config)?;

    // Terminal only after the app came up; setup errors stay readable.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (dispatcher, mut rx) = TurnDispatcher::new();
    let result = run_event_loop(&mut terminal, &mut app, &dispatcher, &mut rx).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    dispatcher: &TurnDispatcher,
    rx: &mut mpsc::UnboundedReceiver<(TurnEvent, u64)>,
) -> Result<(), Box<dyn Error>> {
    let mut last_reveal_tick = Instant::now();

    loop {
        if app.ui.exit_requested {
            return Ok(());
        }

        app.ui.expire_status(STATUS_MAX_AGE);
        terminal.draw(|f| ui(f, app))?;

        // Outcomes before input, so a finished turn is on screen for the
        // keystroke that follows it.
        drain_turn_events(app, rx);

        let timeout = if app.ui.is_reveal_active() {
            REVEAL_TICK
        } else {
            IDLE_POLL
        };
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key(app, dispatcher, key).await;
                }
                Event::Paste(text) => {
                    app.ui.insert_text(&text);
                }
                _ => {}
            }
        }

        if app.ui.is_reveal_active() && last_reveal_tick.elapsed() >= REVEAL_TICK {
            app.ui.tick_reveal();
            last_reveal_tick = Instant::now();
        }
    }
}

/// Apply every queued turn outcome. Stale request ids are dropped inside
/// the controller.
fn drain_turn_events(app: &mut App, rx: &mut mpsc::UnboundedReceiver<(TurnEvent, u64)>) {
    while let Ok((event, request_id)) = rx.try_recv() {
        match event {
            TurnEvent::Completed(reply) => app.conversation().apply_reply(reply, request_id),
            TurnEvent::Failed(error) => app.conversation().apply_failure(error, request_id),
        }
    }
}

async fn handle_key(app: &mut App, dispatcher: &TurnDispatcher, key: KeyEvent) {
    // Ctrl+C always quits, even with the picker open.
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.request_exit();
        return;
    }

    if app.ui.picker.is_some() {
        handle_picker_key(app, key).await;
        return;
    }

    match key.code {
        KeyCode::Esc => {
            app.conversation().cancel_active_turn();
        }
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            app.ui.insert_newline();
        }
        KeyCode::Enter => {
            submit(app, dispatcher).await;
        }
        KeyCode::PageUp => {
            app.ui.scroll_up(SCROLL_PAGE);
        }
        KeyCode::PageDown => {
            app.ui.scroll_down(SCROLL_PAGE);
        }
        KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            open_conversation_picker(app).await;
        }
        KeyCode::Char('y') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            copy_last_reply(app);
        }
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.conversation().clear_status();
        }
        _ => {
            app.ui.handle_input_event(key);
        }
    }
}

/// Dispatch the drafted input: slash commands through the registry,
/// everything else as a chat turn.
async fn submit(app: &mut App, dispatcher: &TurnDispatcher) {
    let input_text = app.ui.get_input_text().to_string();

    match process_input(app, &input_text) {
        CommandResult::Continue => {
            app.ui.clear_input();
        }
        CommandResult::OpenConversationPicker => {
            app.ui.clear_input();
            open_conversation_picker(app).await;
        }
        CommandResult::ProcessAsMessage(_) => {
            if let Some(params) = app.conversation().begin_turn() {
                dispatcher.spawn_turn(params);
            }
        }
    }
}

async fn open_conversation_picker(app: &mut App) {
    if let Err(e) = app.conversation().open_picker().await {
        app.conversation().set_status(format!("Picker error: {}", e));
    }
}

fn copy_last_reply(app: &mut App) {
    match app.ui.copyable_last_reply() {
        Ok(content) => match copy_to_clipboard(&content) {
            Ok(()) => app.conversation().set_status("Copied last reply"),
            Err(e) => app.conversation().set_status(format!("Clipboard error: {e}")),
        },
        Err(reason) => app.conversation().set_status(reason),
    }
}

async fn handle_picker_key(app: &mut App, key: KeyEvent) {
    let Some(picker) = app.ui.picker.as_mut() else {
        return;
    };

    match key.code {
        KeyCode::Esc => {
            app.ui.picker = None;
        }
        KeyCode::Up | KeyCode::Char('k') => {
            picker.move_up();
        }
        KeyCode::Down | KeyCode::Char('j') => {
            picker.move_down();
        }
        KeyCode::Enter => {
            if let Err(e) = app.conversation().confirm_picker_selection().await {
                app.conversation().set_status(format!("Open error: {}", e));
            }
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            let Some(id) = picker.selected_id().map(str::to_string) else {
                return;
            };
            if id == NEW_CONVERSATION_ID {
                return;
            }
            if let Err(e) = app.conversation().delete_conversation(&id).await {
                app.conversation().set_status(format!("Delete error: {}", e));
            }
        }
        _ => {}
    }
}
