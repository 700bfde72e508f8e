//! Shared application state.

use crate::config::ServerConfig;

/// State shared by all handlers. Each relay session only reads from it;
/// per-session mutable state lives inside the session itself.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}
