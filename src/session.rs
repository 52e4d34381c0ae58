//! Session record
//!
//! Represents a connected, named client and the channel into its writer task.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::SendError;
use crate::types::ConnectionId;

/// Handle to a connection's writer task
///
/// Every frame sent to a client goes through its outbox, so the writer task
/// is the only code that writes to the socket.
#[derive(Debug, Clone)]
pub struct Outbox {
    id: ConnectionId,
    sender: mpsc::Sender<Bytes>,
}

impl Outbox {
    /// Wrap the sending half of a connection's frame channel
    pub fn new(id: ConnectionId, sender: mpsc::Sender<Bytes>) -> Self {
        Self { id, sender }
    }

    /// Connection this outbox writes to
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue one already-sealed frame
    ///
    /// Returns an error if the writer task has stopped.
    pub async fn send(&self, frame: Bytes) -> Result<(), SendError> {
        self.sender
            .send(frame)
            .await
            .map_err(|_| SendError::OutboxClosed)
    }
}

/// Connected client information
///
/// Created on successful username negotiation, destroyed on teardown.
#[derive(Debug, Clone)]
pub struct Session {
    /// Connection handle
    pub id: ConnectionId,
    /// Current display name (unique while registered)
    pub username: String,
    /// Remote address, fixed at registration
    pub addr: SocketAddr,
    /// Server → client frame channel
    pub outbox: Outbox,
}

impl Session {
    /// Create a session for the given connection
    pub fn new(id: ConnectionId, username: impl Into<String>, addr: SocketAddr, outbox: Outbox) -> Self {
        Self {
            id,
            username: username.into(),
            addr,
            outbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outbox_send() {
        let id = ConnectionId::new();
        let (tx, mut rx) = mpsc::channel(4);
        let outbox = Outbox::new(id, tx);

        assert_eq!(outbox.id(), id);
        outbox.send(Bytes::from_static(b"frame")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"frame"));
    }

    #[tokio::test]
    async fn test_outbox_closed() {
        let (tx, rx) = mpsc::channel(4);
        let outbox = Outbox::new(ConnectionId::new(), tx);
        drop(rx);

        assert_eq!(
            outbox.send(Bytes::from_static(b"frame")).await,
            Err(SendError::OutboxClosed)
        );
    }

    #[tokio::test]
    async fn test_session_creation() {
        let id = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(4);
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let session = Session::new(id, "alice", addr, Outbox::new(id, tx));

        assert_eq!(session.id, id);
        assert_eq!(session.username, "alice");
        assert_eq!(session.addr, addr);
        assert_eq!(session.outbox.id(), id);
    }
}
