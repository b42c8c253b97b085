use super::CommandResult;
use crate::core::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    pub args: &'a str,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        help: "Show available commands and key bindings.",
        handler: super::handle_help,
    },
    Command {
        name: "new",
        help: "Start a new conversation.",
        handler: super::handle_new,
    },
    Command {
        name: "chats",
        help: "Open the conversation picker.",
        handler: super::handle_chats,
    },
    Command {
        name: "attach",
        help: "Stage a file to send with the next message: /attach <path>",
        handler: super::handle_attach,
    },
    Command {
        name: "log",
        help: "Toggle transcript logging or set the log file: /log [file]",
        handler: super::handle_log,
    },
    Command {
        name: "typewriter",
        help: "Switch the reveal animation for fresh replies: /typewriter [on|off]",
        handler: super::handle_typewriter,
    },
    Command {
        name: "quit",
        help: "Leave the chat.",
        handler: super::handle_quit,
    },
];
