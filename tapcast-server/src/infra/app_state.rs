use std::{fmt, sync::Arc};

use tapcast_config::Config;
use tapcast_core::ProfileStore;

use crate::infra::websocket::ConnectionManager;

/// Which listener a router instance belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Http,
    Https,
}

impl ListenerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListenerKind::Http => "http",
            ListenerKind::Https => "https",
        }
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-listener state. The profile store is shared; the socket manager is not.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub profiles: Arc<ProfileStore>,
    pub websocket_manager: Arc<ConnectionManager>,
    pub listener: ListenerKind,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("listener", &self.listener)
            .field("profiles", &self.profiles.len())
            .field("websocket_manager", &self.websocket_manager)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        profiles: Arc<ProfileStore>,
        listener: ListenerKind,
    ) -> Self {
        let websocket_manager = Arc::new(ConnectionManager::new(
            listener,
            config.transport.client_queue,
        ));
        Self {
            config,
            profiles,
            websocket_manager,
            listener,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
