use axum::extract::ws::Message;
use serde::Serialize;
use tapcast_core::TransportError;
use uuid::Uuid;

/// Sent once to every client right after it is registered.
pub const CONNECTED_EVENT: &str = "connected";

/// Wire envelope: `{"event": "...", "data": ...}`.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub event: &'a str,
    pub data: T,
}

#[derive(Debug, Serialize)]
struct ConnectedData {
    connection_id: Uuid,
}

/// Encode one event into the text frame written to every subscriber.
pub fn encode_frame<T: Serialize>(
    event: &str,
    data: T,
) -> Result<String, TransportError> {
    Ok(serde_json::to_string(&Envelope { event, data })?)
}

pub fn connected_frame(connection_id: Uuid) -> Result<String, TransportError> {
    encode_frame(CONNECTED_EVENT, ConnectedData { connection_id })
}

pub fn frame_to_websocket(frame: String) -> Message {
    Message::Text(frame.into())
}
