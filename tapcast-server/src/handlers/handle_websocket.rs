use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::infra::{
    app_state::AppState,
    websocket::{Connection, messages},
};

/// Handle WebSocket upgrade request
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) =
        mpsc::channel::<String>(state.websocket_manager.client_queue());

    let connection = Arc::new(Connection::new(tx));
    let conn_id = connection.id;

    // Queued before registration so it always precedes broadcast frames.
    match messages::connected_frame(conn_id) {
        Ok(frame) => {
            if let Err(err) = connection.try_send(frame) {
                warn!(connection_id = %conn_id, error = %err, "could not queue connected frame");
            }
        }
        Err(err) => {
            error!(connection_id = %conn_id, error = %err, "failed to encode connected frame");
        }
    }

    state.websocket_manager.add_connection(connection);
    info!(
        listener = %state.listener,
        connection_id = %conn_id,
        clients = state.websocket_manager.connection_count(),
        "client connected"
    );

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender
                .send(messages::frame_to_websocket(frame))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Clients only listen; inbound frames are drained until close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(Message::Text(text)) => {
                    debug!(connection_id = %conn_id, len = text.len(), "ignoring client text frame");
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(connection_id = %conn_id, error = %e, "websocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Clean up on disconnect
    state.websocket_manager.remove_connection(conn_id);
    info!(
        listener = %state.listener,
        connection_id = %conn_id,
        clients = state.websocket_manager.connection_count(),
        "client disconnected"
    );
}
