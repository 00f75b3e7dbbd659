use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::get,
};
use tapcast_config::CorsConfig;
use tapcast_core::routes;
use tower_http::{
    cors::{AllowMethods, AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    handlers::{get_profile, ping_handler, websocket_handler},
    infra::app_state::AppState,
};

/// Router for one listener: API routes, the socket endpoint and static assets.
pub fn create_app(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.config().cors);
    let static_files = ServeDir::new(state.config().static_dir());

    Router::new()
        .route(routes::PING, get(ping_handler))
        .route(routes::PROFILE, get(get_profile))
        .route(routes::SOCKET, get(websocket_handler))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    let allow_origin = if cors.is_wildcard_included() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();
        if origins.is_empty() {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(origins)
        }
    };

    // Methods are validated during config load.
    let methods: Vec<Method> = cors
        .allowed_methods
        .iter()
        .filter_map(|m| Method::from_bytes(m.as_bytes()).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::list(methods))
        .allow_headers(Any)
}
