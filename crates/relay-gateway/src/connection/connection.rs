//! Individual WebSocket connection
//!
//! A connection is the write half of a socket as seen by the rest of the
//! gateway: envelopes pushed into its queue are serialized and written by the
//! socket's send task.

use relay_service::Envelope;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique identity of one socket, distinct from the user it belongs to
pub type ConnectionId = Uuid;

/// A single authenticated WebSocket connection
pub struct Connection {
    /// Unique connection ID
    id: ConnectionId,

    /// Authenticated user identity
    user_id: String,

    /// Outbound queue drained by the socket's send task
    sender: mpsc::Sender<Envelope>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(user_id: impl Into<String>, sender: mpsc::Sender<Envelope>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            sender,
            created_at: Instant::now(),
        })
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the user this connection is authenticated as
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Get connection age
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Queue an envelope, waiting for room if the queue is full
    pub async fn send(&self, envelope: Envelope) -> Result<(), mpsc::error::SendError<Envelope>> {
        self.sender.send(envelope).await
    }

    /// Queue an envelope without waiting
    pub fn try_send(&self, envelope: Envelope) -> Result<(), mpsc::error::TrySendError<Envelope>> {
        self.sender.try_send(envelope)
    }

    /// Check if the socket side has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}
