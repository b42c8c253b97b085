mod registry;
#[cfg(test)]
mod tests;

pub use registry::{all_commands, CommandInvocation};

use crate::core::app::App;

pub enum CommandResult {
    Continue,
    ProcessAsMessage(String),
    OpenConversationPicker,
}

pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return CommandResult::ProcessAsMessage(input.to_string());
    }

    let mut parts = trimmed[1..].splitn(2, ' ');
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    if let Some(command) = registry::find_command(command_name) {
        let invocation = CommandInvocation {
            input: trimmed,
            args,
        };
        (command.handler)(app, invocation)
    } else {
        CommandResult::ProcessAsMessage(input.to_string())
    }
}

pub(super) fn handle_help(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let mut help = String::from("Commands:\n");
    for command in all_commands() {
        help.push_str(&format!("  /{:<12}{}\n", command.name, command.help));
    }
    help.push_str("\nKeys:\n");
    help.push_str("  Enter              send, or cancel the request in flight\n");
    help.push_str("  Alt+Enter          insert a newline\n");
    help.push_str("  Ctrl+P             open the conversation picker\n");
    help.push_str("  Ctrl+Y             copy the last reply\n");
    help.push_str("  Esc                cancel the request in flight\n");
    help.push_str("  PageUp/PageDown    scroll the transcript\n");
    help.push_str("  Ctrl+C             quit\n");
    app.conversation().add_info(help);
    CommandResult::Continue
}

pub(super) fn handle_log(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let parts: Vec<&str> = invocation.input.split_whitespace().collect();

    match parts.len() {
        1 => match app.session.logging.toggle_logging("Logging paused") {
            Ok(message) => {
                app.conversation().set_status(message);
                CommandResult::Continue
            }
            Err(e) => {
                app.conversation().set_status(format!("Log error: {}", e));
                CommandResult::Continue
            }
        },
        2 => {
            let filename = parts[1];
            match app.session.logging.set_log_file(filename.to_string()) {
                Ok(message) => {
                    app.conversation().set_status(message);
                    CommandResult::Continue
                }
                Err(e) => {
                    app.conversation()
                        .set_status(format!("Logfile error: {}", e));
                    CommandResult::Continue
                }
            }
        }
        _ => {
            app.conversation().set_status("Usage: /log [filename]");
            CommandResult::Continue
        }
    }
}

pub(super) fn handle_new(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.conversation().start_new_conversation();
    CommandResult::Continue
}

pub(super) fn handle_chats(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::OpenConversationPicker
}

pub(super) fn handle_attach(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.conversation().set_status("Usage: /attach <path>");
        return CommandResult::Continue;
    }
    app.conversation().attach_file(invocation.args);
    CommandResult::Continue
}

pub(super) fn handle_typewriter(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let action = invocation.args.split_whitespace().next().unwrap_or("");
    let new_state = match action.to_ascii_lowercase().as_str() {
        "on" => true,
        "off" => false,
        "toggle" | "" => !app.ui.typewriter_enabled,
        _ => {
            app.conversation()
                .set_status("Usage: /typewriter [on|off|toggle]");
            return CommandResult::Continue;
        }
    };
    app.ui.typewriter_enabled = new_state;
    app.conversation().set_status(format!(
        "Typewriter {} for this session. Persist with: plausch set typewriter {}",
        if new_state { "on" } else { "off" },
        if new_state { "on" } else { "off" },
    ));
    CommandResult::Continue
}

pub(super) fn handle_quit(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.request_exit();
    CommandResult::Continue
}
