use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tapcast_config::{
    Config, ConfigLoad, ConfigLoader, ConfigLoaderOptions, ConfigWarnings,
    ReaderBackendKind,
};
use tapcast_server::{infra::startup, install_crypto_provider, reader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug, Clone)]
#[command(name = "tapcast-server")]
#[command(
    about = "Broadcasts card scans and their profiles to WebSocket clients over HTTP and HTTPS"
)]
struct ServeArgs {
    /// Path to a tapcast.toml configuration file
    #[arg(short, long, env = "TAPCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Plaintext listener port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// TLS listener port (overrides config)
    #[arg(long)]
    https_port: Option<u16>,

    /// Bind address for both listeners (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    key: Option<PathBuf>,

    /// Card reader backend: pcsc, stdin or none
    #[arg(long)]
    reader: Option<ReaderBackendKind>,
}

impl ServeArgs {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.http_port = port;
        }
        if let Some(port) = self.https_port {
            config.server.https_port = port;
        }
        if let Some(host) = self.host.clone() {
            config.server.host = host;
        }
        if let Some(cert) = self.cert.clone() {
            config.tls.cert_path = cert;
        }
        if let Some(key) = self.key.clone() {
            config.tls.key_path = key;
        }
        if let Some(reader) = self.reader {
            config.reader.backend = reader;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServeArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    install_crypto_provider();

    let config = load_runtime_config(&args)?;
    info!(
        http_port = config.server.http_port,
        https_port = config.server.https_port,
        reader = %config.reader.backend,
        static_dir = %config.static_dir().display(),
        "starting tapcast server"
    );

    let backend = reader::build_backend(&config.reader);
    startup::run(Arc::new(config), backend).await
}

fn load_runtime_config(args: &ServeArgs) -> anyhow::Result<Config> {
    let ConfigLoad {
        mut config,
        warnings,
    } = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: args.config.clone(),
        env_file: args.env_file.clone(),
    })
    .load()
    .context("failed to load configuration")?;

    args.apply_overrides(&mut config);

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "loaded configuration file");
    }
    log_warnings(&warnings);

    if config.tls.enabled && config.server.http_port == config.server.https_port {
        anyhow::bail!(
            "HTTP and HTTPS listeners cannot share port {}",
            config.server.http_port
        );
    }

    Ok(config)
}

fn log_warnings(warnings: &ConfigWarnings) {
    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }
}
