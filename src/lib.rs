//! Plausch is a full-screen terminal client for a conversational assistant
//! backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns runtime state: the conversation model, the turn
//!   dispatcher and its cancellation bookkeeping, the tolerant reply-payload
//!   decoder, and the typewriter reveal.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives user input, reveal ticks, and display updates.
//! - [`commands`] implements slash-command parsing and command execution
//!   used by the chat loop.
//! - [`api`] defines the wire types exchanged with the backend HTTP API.
//! - [`auth`] stores the optional bearer token in the OS keyring.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which initializes and dispatches into
//! [`core::app`] and [`ui::chat_loop`] for interactive sessions.

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod core;
pub mod ui;
pub mod utils;
