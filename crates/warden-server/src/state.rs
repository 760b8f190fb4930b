//! Application state shared across handlers.

use std::sync::Arc;

use warden_dispatch::{Dispatcher, ObjectHost};

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The dispatcher every RPC goes through.
    pub dispatcher: Dispatcher,

    /// Business objects addressable by owner type.
    pub objects: Arc<ObjectHost>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(dispatcher: Dispatcher, objects: ObjectHost, config: ServerConfig) -> Self {
        Self {
            dispatcher,
            objects: Arc::new(objects),
            config: Arc::new(config),
        }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
