mod common;

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use common::TestApp;
use serde_json::Value;
use tapcast_config::EnvConfig;
use tapcast_core::routes;
use tapcast_server::{
    ListenerKind,
    infra::{
        startup::{ListenerPlan, bind_listener, serve_listener, wire},
        tls::TlsCertConfig,
    },
    install_crypto_provider,
};
use tokio::sync::watch;

fn write_localhost_cert(dir: &Path) -> (PathBuf, PathBuf) {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .expect("generate certificate");
    let cert_path = dir.join("localhost.pem");
    let key_path = dir.join("localhost-key.pem");
    std::fs::write(&cert_path, cert.serialize_pem().expect("serialize cert"))
        .expect("write cert");
    std::fs::write(&key_path, cert.serialize_private_key_pem()).expect("write key");
    (cert_path, key_path)
}

fn loopback() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

#[tokio::test]
async fn plaintext_and_tls_listeners_both_serve_then_stop() {
    install_crypto_provider();
    let certs = tempfile::tempdir().expect("cert tempdir");
    let (cert_path, key_path) = write_localhost_cert(certs.path());
    let app = TestApp::new(EnvConfig {
        tls_cert_path: Some(cert_path),
        tls_key_path: Some(key_path),
        ..EnvConfig::default()
    });

    let plans = vec![
        ListenerPlan {
            kind: ListenerKind::Http,
            addr: loopback(),
            tls: None,
        },
        ListenerPlan {
            kind: ListenerKind::Https,
            addr: loopback(),
            tls: Some(TlsCertConfig::from(&app.config.tls)),
        },
    ];
    let wiring = wire(Arc::clone(&app.config), plans);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut urls = Vec::new();
    let mut servers = Vec::new();
    for (plan, state) in wiring.listeners {
        let bound = bind_listener(plan).expect("bind listener");
        let port = bound.local_addr().expect("local addr").port();
        let scheme = state.listener.as_str();
        urls.push((
            state.listener,
            format!("{scheme}://127.0.0.1:{port}{}", routes::PING),
        ));
        servers.push(tokio::spawn(serve_listener(
            bound,
            state,
            shutdown_rx.clone(),
        )));
    }

    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .expect("http client");
    for (kind, url) in &urls {
        let response = client.get(url).send().await.expect("listener answers");
        assert!(response.status().is_success(), "{url}: {}", response.status());
        let body: Value = response.json().await.expect("ping json");
        assert_eq!(body["listener"], kind.as_str());
    }
    assert_ne!(urls[0].1, urls[1].1);
    drop(client);

    shutdown_tx.send_replace(true);
    for server in servers {
        tokio::time::timeout(Duration::from_secs(15), server)
            .await
            .expect("listener stops after shutdown")
            .expect("listener task did not panic")
            .expect("listener exits cleanly");
    }
}

#[tokio::test]
async fn taken_port_fails_at_bind() {
    let first = bind_listener(ListenerPlan {
        kind: ListenerKind::Http,
        addr: loopback(),
        tls: None,
    })
    .expect("bind first");
    let taken = first.local_addr().unwrap();

    let err = bind_listener(ListenerPlan {
        kind: ListenerKind::Https,
        addr: taken,
        tls: None,
    })
    .unwrap_err();

    assert!(err.to_string().contains(&taken.to_string()), "{err}");
}
