use std::{net::SocketAddr, path::Path, sync::Arc};

use tapcast_config::{Config, ConfigLoader, EnvConfig};
use tapcast_server::infra::startup::{ListenerPlan, Wiring, wire};
use tapcast_server::{AppState, ListenerKind};
use tempfile::TempDir;

pub const INDEX_HTML: &str = "<!doctype html><title>tapcast</title>";

// Code is used by test modules, but not in this scope
#[allow(unused)]
#[derive(Debug)]
pub struct TestApp {
    pub config: Arc<Config>,
    pub static_dir: TempDir,
}

#[allow(unused)]
impl TestApp {
    /// Defaults plus `env`, serving a temp static dir that holds `index.html`.
    pub fn new(env: EnvConfig) -> Self {
        let static_dir = tempfile::tempdir().expect("static tempdir");
        std::fs::write(static_dir.path().join("index.html"), INDEX_HTML)
            .expect("write index.html");

        let config = config_for(static_dir.path(), env);
        Self {
            config: Arc::new(config),
            static_dir,
        }
    }

    pub fn state(&self, listener: ListenerKind) -> AppState {
        let profiles = Arc::new(self.config.profile_store());
        AppState::new(Arc::clone(&self.config), profiles, listener)
    }

    /// Both listeners wired to one bridge, without binding any sockets.
    pub fn wiring(&self) -> Wiring {
        let plans = [ListenerKind::Http, ListenerKind::Https]
            .into_iter()
            .map(|kind| ListenerPlan {
                kind,
                addr: SocketAddr::from(([127, 0, 0, 1], 0)),
                tls: None,
            })
            .collect();
        wire(Arc::clone(&self.config), plans)
    }
}

fn config_for(static_dir: &Path, env: EnvConfig) -> Config {
    let env = EnvConfig {
        static_dir: Some(static_dir.to_path_buf()),
        tls_enabled: env.tls_enabled.or(Some(false)),
        ..env
    };
    ConfigLoader::new()
        .load_with_env(env)
        .expect("test config loads")
        .config
}
