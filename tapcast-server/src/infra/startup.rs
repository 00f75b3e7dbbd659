//! Listener planning, reader bridge wiring and serving.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use tapcast_config::Config;
use tapcast_core::{
    BridgeStats, ProfileStore, ReaderBackend, ScanBridge, ScanDispatcher,
    TransportSet,
};
use tokio::{
    sync::watch,
    task::{JoinHandle, JoinSet},
};
use tracing::{error, info, warn};

use crate::{
    infra::{
        app_state::{AppState, ListenerKind},
        tls::{TlsCertConfig, create_tls_acceptor},
    },
    routes::create_app,
};

/// Grace period for in-flight connections on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ListenerPlan {
    pub kind: ListenerKind,
    pub addr: SocketAddr,
    pub tls: Option<TlsCertConfig>,
}

/// Listeners this configuration asks for. HTTPS is left out when TLS is
/// disabled or its PEM files are missing.
pub fn plan_listeners(config: &Config) -> Result<Vec<ListenerPlan>> {
    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("invalid SERVER_HOST `{}`", config.server.host))?;

    let mut plans = vec![ListenerPlan {
        kind: ListenerKind::Http,
        addr: SocketAddr::new(host, config.server.http_port),
        tls: None,
    }];

    if config.tls.enabled && config.tls.material_present() {
        plans.push(ListenerPlan {
            kind: ListenerKind::Https,
            addr: SocketAddr::new(host, config.server.https_port),
            tls: Some(TlsCertConfig::from(&config.tls)),
        });
    }

    Ok(plans)
}

/// One state per listener plus the bridge that fans scans out to all of them.
#[derive(Debug)]
pub struct Wiring {
    pub listeners: Vec<(ListenerPlan, AppState)>,
    pub bridge: ScanBridge,
}

pub fn wire(config: Arc<Config>, plans: Vec<ListenerPlan>) -> Wiring {
    let profiles: Arc<ProfileStore> = Arc::new(config.profile_store());
    info!(profiles = profiles.len(), "profile store loaded");

    let mut transports = TransportSet::new();
    let listeners = plans
        .into_iter()
        .map(|plan| {
            let state =
                AppState::new(Arc::clone(&config), Arc::clone(&profiles), plan.kind);
            transports.push(state.websocket_manager.clone());
            (plan, state)
        })
        .collect();

    let bridge = ScanBridge::new(ScanDispatcher::new(profiles), transports);
    Wiring { listeners, bridge }
}

/// Start `backend` and drive the bridge from it. A backend that fails to
/// start is logged and scanning stays off; the listeners keep running.
pub fn spawn_reader(
    backend: Option<Box<dyn ReaderBackend>>,
    bridge: ScanBridge,
) -> Option<JoinHandle<BridgeStats>> {
    let Some(backend) = backend else {
        info!("card reader disabled");
        return None;
    };

    let name = backend.name();
    match backend.start() {
        Ok(events) => {
            info!(backend = name, "card reader backend started");
            Some(tokio::spawn(async move { bridge.run(events).await }))
        }
        Err(err) => {
            error!(backend = name, error = %err, "card reader backend failed to start; continuing without scanning");
            None
        }
    }
}

/// A planned listener whose socket is already bound.
#[derive(Debug)]
pub struct BoundListener {
    pub plan: ListenerPlan,
    listener: std::net::TcpListener,
}

impl BoundListener {
    /// Address the socket actually bound, with the real port for `:0` plans.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("bound listener has no local address")
    }
}

/// Bind the socket for `plan` without serving yet.
pub fn bind_listener(plan: ListenerPlan) -> Result<BoundListener> {
    let listener = std::net::TcpListener::bind(plan.addr)
        .with_context(|| format!("failed to bind {}", plan.addr))?;
    listener
        .set_nonblocking(true)
        .context("failed to make listener non-blocking")?;
    Ok(BoundListener { plan, listener })
}

/// Serve one bound listener until `shutdown` flips to true.
pub async fn serve_listener(
    bound: BoundListener,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let addr = bound.local_addr()?;
    let BoundListener { plan, listener } = bound;
    let manager = Arc::clone(&state.websocket_manager);
    let router: Router = create_app(state);
    let make_service = router.into_make_service_with_connect_info::<SocketAddr>();

    match plan.tls {
        Some(tls) => {
            info!(cert = %tls.cert_path.display(), key = %tls.key_path.display(), "TLS enabled");
            let rustls_config = create_tls_acceptor(&tls)
                .await
                .context("failed to build TLS acceptor")?;

            let handle = axum_server::Handle::new();
            let signal_handle = handle.clone();
            tokio::spawn(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
                manager.close_all();
                signal_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            info!("HTTPS server running on https://{}", addr);
            axum_server::from_tcp_rustls(listener, rustls_config)
                .context("failed to adopt HTTPS socket")?
                .handle(handle)
                .serve(make_service)
                .await
                .context("HTTPS listener failed")?;
        }
        None => {
            let listener = tokio::net::TcpListener::from_std(listener)
                .context("failed to adopt HTTP socket")?;
            info!("HTTP server running on http://{}", addr);
            axum::serve(listener, make_service)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.wait_for(|stop| *stop).await;
                    manager.close_all();
                })
                .await
                .context("HTTP listener failed")?;
        }
    }

    info!(listener = %plan.kind, "listener stopped");
    Ok(())
}

/// Run every planned listener and the reader bridge until Ctrl-C.
pub async fn run(
    config: Arc<Config>,
    backend: Option<Box<dyn ReaderBackend>>,
) -> Result<()> {
    let plans = plan_listeners(&config)?;
    if !plans.iter().any(|plan| plan.kind == ListenerKind::Https) {
        warn!("HTTPS listener disabled; WebSocket clients on https origins cannot connect");
    }

    let Wiring { listeners, bridge } = wire(Arc::clone(&config), plans);
    // Bind everything up front so a taken port fails before scanning starts.
    let listeners = listeners
        .into_iter()
        .map(|(plan, state)| Ok((bind_listener(plan)?, state)))
        .collect::<Result<Vec<_>>>()?;
    let reader_task = spawn_reader(backend, bridge);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let mut servers = JoinSet::new();
    for (bound, state) in listeners {
        let kind = bound.plan.kind;
        let rx = shutdown_rx.clone();
        servers.spawn(async move { (kind, serve_listener(bound, state, rx).await) });
    }

    let signal_tx = Arc::clone(&shutdown_tx);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(err) => error!(error = %err, "failed to listen for shutdown signal"),
        }
        signal_tx.send_replace(true);
    });

    let mut first_error = None;
    while let Some(joined) = servers.join_next().await {
        match joined {
            Ok((_, Ok(()))) => {}
            Ok((kind, Err(err))) => {
                error!(listener = %kind, error = ?err, "listener exited with error");
                // One listener down takes the others with it.
                shutdown_tx.send_replace(true);
                first_error.get_or_insert(err);
            }
            Err(join_err) => {
                error!(error = %join_err, "listener task panicked");
                shutdown_tx.send_replace(true);
            }
        }
    }

    if let Some(task) = reader_task {
        task.abort();
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
