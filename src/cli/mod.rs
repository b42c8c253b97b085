//! Command-line interface parsing and handling
//!
//! Parses the argument surface and routes each invocation: configuration
//! and credential edits run to completion on the spot, everything else
//! starts the interactive chat.

use std::error::Error;

use clap::{Parser, Subcommand};

use crate::auth;
use crate::core::app::AppInitConfig;
use crate::core::config::Config;
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "plausch")]
#[command(version)]
#[command(about = "A full-screen terminal chat client for conversational assistant backends")]
#[command(
    long_about = "Plausch is a full-screen terminal chat client that talks to a conversational \
assistant backend over HTTP. Replies are typed out the way the web client types them and can be \
interrupted at any point.\n\n\
Authentication:\n\
  Backends that require login take a bearer token; store one with 'plausch auth'.\n\
  Tokens live in your system keyring, one per server.\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send, or cancel the request in flight\n\
  Alt+Enter         Insert a newline\n\
  Esc               Cancel the request in flight\n\
  Ctrl+P            Open the conversation picker\n\
  Ctrl+Y            Copy the last reply\n\
  PageUp/PageDown   Scroll the transcript\n\
  Ctrl+C            Quit\n\n\
Commands:\n\
  /help             Show available commands\n\
  /attach <path>    Stage a file for the next message\n\
  /log [filename]   Enable or pause transcript logging"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Backend base URL, overriding the configured one
    #[arg(short = 's', long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Enable transcript logging to the given file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a bearer token for the backend in the system keyring
    Auth {
        /// Token value; prompted for when omitted
        token: Option<String>,
    },
    /// Remove the stored bearer token for the backend
    Deauth,
    /// Start the chat interface (default)
    Chat,
    /// Set a configuration value, or list them all
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key
        value: Option<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

/// Diagnostics are opt-in: `PLAUSCH_LOG=debug plausch 2>debug.log`.
/// Nothing is emitted when the variable is unset, which keeps the
/// alternate screen clean.
fn init_tracing() {
    if std::env::var_os("PLAUSCH_LOG").is_none() {
        return;
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PLAUSCH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Auth { token } => {
            let server = resolve_server(args.server)?;
            auth::run_auth_setup(&server, token)
        }
        Commands::Deauth => {
            let server = resolve_server(args.server)?;
            auth::run_deauth(&server)
        }
        Commands::Set { key, value } => handle_set(key, value),
        Commands::Unset { key } => handle_unset(&key),
        Commands::Chat => {
            run_chat(AppInitConfig {
                server: args.server,
                log_file: args.log,
            })
            .await
        }
    }
}

/// Credential operations need to know which server they are for, even
/// when the chat itself is never started.
fn resolve_server(flag: Option<String>) -> Result<String, Box<dyn Error>> {
    if let Some(server) = flag {
        return Ok(server);
    }
    let config = Config::load()?;
    config.server_url.ok_or_else(|| {
        "No server configured. Pass --server <url> or run `plausch set server-url <url>`.".into()
    })
}

fn handle_set(key: Option<String>, value: Option<String>) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    let Some(key) = key else {
        config.print_all();
        return Ok(());
    };
    let Some(value) = value else {
        return Err(format!("No value given. Usage: plausch set {key} <value>").into());
    };
    config.apply_set(&key, &value)?;
    config.save()?;
    println!("Set {key} = {value}");
    Ok(())
}

fn handle_unset(key: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    config.apply_unset(key)?;
    config.save()?;
    println!("Unset {key}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_surface_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn bare_invocation_defaults_to_chat() {
        let args = Args::try_parse_from(["plausch"]).unwrap();
        assert!(args.command.is_none());
        assert!(args.server.is_none());
        assert!(args.log.is_none());
    }

    #[test]
    fn global_flags_reach_subcommands() {
        let args =
            Args::try_parse_from(["plausch", "auth", "--server", "https://bauki.eu"]).unwrap();
        assert_eq!(args.server.as_deref(), Some("https://bauki.eu"));
        assert!(matches!(args.command, Some(Commands::Auth { token: None })));
    }

    #[test]
    fn set_accepts_key_value_pairs() {
        let args = Args::try_parse_from(["plausch", "set", "theme", "light"]).unwrap();
        match args.command {
            Some(Commands::Set { key, value }) => {
                assert_eq!(key.as_deref(), Some("theme"));
                assert_eq!(value.as_deref(), Some("light"));
            }
            _ => panic!("expected the set subcommand"),
        }
    }

    #[test]
    fn log_flag_takes_a_file() {
        let args = Args::try_parse_from(["plausch", "--log", "chat.md"]).unwrap();
        assert_eq!(args.log.as_deref(), Some("chat.md"));
    }
}
