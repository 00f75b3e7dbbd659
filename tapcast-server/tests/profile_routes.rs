mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::TestApp;
use serde_json::{Value, json};
use tapcast_config::EnvConfig;
use tapcast_core::routes;
use tapcast_server::{ListenerKind, create_app};

fn server(app: &TestApp) -> TestServer {
    TestServer::new(create_app(app.state(ListenerKind::Http))).expect("test server")
}

#[tokio::test]
async fn known_card_returns_profile() {
    let app = TestApp::new(EnvConfig::default());
    let server = server(&app);

    let response = server.get(&routes::profile_path("123456789")).await;

    response.assert_status_ok();
    response.assert_json(&json!({
        "name": "John Doe",
        "image": "/profiles/john.jpg"
    }));
}

#[tokio::test]
async fn colon_separated_uid_is_matched_verbatim() {
    let app = TestApp::new(EnvConfig::default());
    let server = server(&app);

    let response = server.get(&routes::profile_path("c2:7c:f9:cf")).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "Jane Smith");
}

#[tokio::test]
async fn unknown_card_is_not_found() {
    let app = TestApp::new(EnvConfig::default());
    let server = server(&app);

    let response = server.get(&routes::profile_path("deadbeef")).await;

    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_json(&json!({ "message": "Profile not found" }));
}

#[tokio::test]
async fn lookup_is_case_sensitive() {
    let app = TestApp::new(EnvConfig::default());
    let server = server(&app);

    server
        .get(&routes::profile_path("C2:7C:F9:CF"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn builtin_profiles_can_be_switched_off() {
    let app = TestApp::new(EnvConfig {
        builtin_profiles: Some(false),
        ..EnvConfig::default()
    });
    let server = server(&app);

    server
        .get(&routes::profile_path("123456789"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ping_reports_listener_and_clients() {
    let app = TestApp::new(EnvConfig::default());
    let server = TestServer::new(create_app(app.state(ListenerKind::Https)))
        .expect("test server");

    let response = server.get(routes::PING).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["listener"], "https");
    assert_eq!(body["clients"], 0);
}
