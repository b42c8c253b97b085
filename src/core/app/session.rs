use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::auth::TokenStore;
use crate::core::config::Config;
use crate::core::conversation::IdSource;
use crate::core::request::{ChatTransport, HttpChatTransport};
use crate::ui::theme::Theme;
use crate::utils::logging::LoggingState;
use crate::utils::url::normalize_base_url;

/// Long-lived per-session state: the transport, the stable session id sent
/// with every turn, and the bookkeeping for the turn in flight.
pub struct SessionContext {
    pub transport: Arc<dyn ChatTransport>,
    pub base_url: String,
    pub session_id: String,
    pub logging: LoggingState,
    /// Token for the outstanding request. `Some` exactly while a turn is in
    /// flight; cancelling and resolving both clear it.
    pub turn_cancel_token: Option<CancellationToken>,
    /// Id of the newest dispatched request. Events tagged with an older id
    /// are stale and get dropped.
    pub current_request_id: u64,
    pub ids: IdSource,
}

impl SessionContext {
    pub fn is_turn_outstanding(&self) -> bool {
        self.turn_cancel_token.is_some()
    }
}

pub struct SessionBootstrap {
    pub session: SessionContext,
    pub theme: Theme,
}

/// Resolve server, credentials, and logging into a ready session.
///
/// The server URL comes from the CLI flag first, then the config file. The
/// bearer token is optional; a backend without auth just never sees the
/// header. A broken keyring downgrades to anonymous access instead of
/// refusing to start.
pub fn prepare(
    server: Option<String>,
    log_file: Option<String>,
    config: &mut Config,
) -> Result<SessionBootstrap, Box<dyn std::error::Error>> {
    let base_url = match server.or_else(|| config.server_url.clone()) {
        Some(url) if !url.trim().is_empty() => normalize_base_url(url.trim()),
        _ => {
            return Err(
                "No server configured. Pass --server <url> or run `plausch set server-url <url>`."
                    .into(),
            )
        }
    };

    let token = match TokenStore::new().get_token(&base_url) {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "keyring unavailable, continuing without token");
            None
        }
    };

    let session_id = config.ensure_session_id()?;
    let theme = Theme::from_name(config.theme.as_deref().unwrap_or("dark"));

    let mut logging = LoggingState::new(None);
    if let Some(path) = log_file.or_else(|| config.log_file.clone()) {
        if let Err(e) = logging.set_log_file(path.clone()) {
            eprintln!("Warning: could not enable logging to {path}: {e}");
        }
    }

    let transport: Arc<dyn ChatTransport> =
        Arc::new(HttpChatTransport::new(Client::new(), base_url.clone(), token));

    Ok(SessionBootstrap {
        session: SessionContext {
            transport,
            base_url,
            session_id,
            logging,
            turn_cancel_token: None,
            current_request_id: 0,
            ids: IdSource::default(),
        },
        theme,
    })
}
