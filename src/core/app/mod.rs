use crate::core::config::Config;

pub mod conversation;
pub mod session;
pub mod ui_state;
#[cfg(test)]
mod tests;

pub use conversation::ConversationController;
pub use session::{SessionBootstrap, SessionContext};
pub use ui_state::UiState;

/// Startup parameters resolved from the command line.
pub struct AppInitConfig {
    pub server: Option<String>,
    pub log_file: Option<String>,
}

pub struct App {
    pub session: SessionContext,
    pub ui: UiState,
}

/// Build a ready-to-run app from CLI arguments and the config file. May
/// write the config back once, when a session id is minted on first run.
pub fn bootstrap(init: AppInitConfig, config: &mut Config) -> Result<App, Box<dyn std::error::Error>> {
    let SessionBootstrap { session, theme } =
        session::prepare(init.server, init.log_file, config)?;

    let mut app = App {
        session,
        ui: UiState::from_config(theme, config),
    };
    app.ui.clear_input();
    Ok(app)
}

impl App {
    pub fn conversation(&mut self) -> ConversationController<'_> {
        ConversationController::new(&mut self.session, &mut self.ui)
    }

    pub fn request_exit(&mut self) {
        self.ui.exit_requested = true;
    }
}
