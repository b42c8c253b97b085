//! Terminal UI layer for interactive chat sessions.
//!
//! The UI module owns rendering, keyboard handling, and loop control for
//! the text user interface.
//!
//! Key submodules:
//! - [`chat_loop`]: the main interaction loop that dispatches user input to
//!   [`crate::commands`] and folds turn outcomes from
//!   [`crate::core::request`] back into the app.
//! - [`renderer`]: frame composition, transcript wrapping, and overlays.
//! - [`picker`]: the conversation-selection overlay.
//! - [`theme`]: color/style policy.
//!
//! Ownership boundary: this layer presents and captures interaction state,
//! while [`crate::core`] owns domain logic and backend coordination.

pub mod chat_loop;
pub mod picker;
pub mod renderer;
pub mod theme;
