use crate::infra::{
    app_state::ListenerKind,
    websocket::{connection::Connection, messages},
};
use dashmap::DashMap;
use std::{fmt, sync::Arc};
use tapcast_core::{
    BroadcastMessage, BroadcastTransport, Delivery, TransportError,
};
use tracing::{debug, error};
use uuid::Uuid;

/// Subscriber registry for one listener's `/socket` endpoint.
#[derive(Clone)]
pub struct ConnectionManager {
    listener: ListenerKind,
    /// Active WebSocket connections mapped by connection ID
    connections: Arc<DashMap<Uuid, Arc<Connection>>>,
    /// Outbound frames buffered per connection
    client_queue: usize,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("listener", &self.listener)
            .field("connection_count", &self.connections.len())
            .field("client_queue", &self.client_queue)
            .finish()
    }
}

impl ConnectionManager {
    pub fn new(listener: ListenerKind, client_queue: usize) -> Self {
        Self {
            listener,
            connections: Arc::new(DashMap::new()),
            client_queue: client_queue.max(1),
        }
    }

    pub fn listener(&self) -> ListenerKind {
        self.listener
    }

    pub fn client_queue(&self) -> usize {
        self.client_queue
    }

    /// Register a new connection
    pub fn add_connection(&self, connection: Arc<Connection>) {
        self.connections.insert(connection.id, connection);
    }

    /// Remove a connection. Unknown ids are ignored.
    pub fn remove_connection(&self, conn_id: Uuid) -> bool {
        self.connections.remove(&conn_id).is_some()
    }

    /// Get a specific connection
    pub fn get_connection(&self, conn_id: &Uuid) -> Option<Arc<Connection>> {
        self.connections.get(conn_id).map(|c| c.clone())
    }

    /// Drop every connection; their socket tasks end once the queue drains.
    pub fn close_all(&self) {
        self.connections.clear();
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Hand an encoded frame to every registered connection.
    pub fn send_frame(&self, frame: &str) -> Delivery {
        let mut delivery = Delivery::default();
        let mut closed = Vec::new();

        for entry in self.connections.iter() {
            match entry.value().try_send(frame.to_owned()) {
                Ok(()) => delivery.delivered += 1,
                Err(TransportError::Closed) => {
                    delivery.dropped += 1;
                    closed.push(*entry.key());
                }
                Err(err) => {
                    debug!(
                        listener = %self.listener,
                        connection_id = %entry.key(),
                        error = %err,
                        "dropping frame for slow subscriber"
                    );
                    delivery.dropped += 1;
                }
            }
        }

        // Iteration holds shard locks; prune afterwards.
        for conn_id in closed {
            self.connections.remove(&conn_id);
        }

        delivery
    }
}

impl BroadcastTransport for ConnectionManager {
    fn name(&self) -> &str {
        self.listener.as_str()
    }

    fn broadcast(&self, event: &str, message: &BroadcastMessage) -> Delivery {
        match messages::encode_frame(event, message) {
            Ok(frame) => self.send_frame(&frame),
            Err(err) => {
                error!(
                    listener = %self.listener,
                    error = %err,
                    "failed to encode broadcast frame"
                );
                Delivery {
                    delivered: 0,
                    dropped: self.connections.len(),
                }
            }
        }
    }
}
