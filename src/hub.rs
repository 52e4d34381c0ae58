//! Broadcast hub
//!
//! A bounded FIFO of `Message`s drained by a single consumer task. The
//! consumer resolves targets at dequeue time, formats and seals one copy
//! per target, and hands it to that connection's outbox.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cipher::TransportCipher;
use crate::error::SendError;
use crate::message::Message;
use crate::registry::Registry;
use crate::session::Outbox;

/// Producer side of the broadcast queue
///
/// Cloned into every session. Sending blocks while the queue is full.
#[derive(Debug, Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<Message>,
}

impl HubHandle {
    /// Enqueue a message for fan-out
    pub async fn submit(&self, msg: Message) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::QueueClosed)
    }

    /// Reserve one queue slot
    ///
    /// The returned permit enqueues without awaiting, so it can be used
    /// while a lock is held.
    pub async fn reserve(&self) -> Result<mpsc::Permit<'_, Message>, SendError> {
        self.sender
            .reserve()
            .await
            .map_err(|_| SendError::QueueClosed)
    }
}

/// Create the broadcast queue with the given capacity
pub fn channel(capacity: usize) -> (HubHandle, mpsc::Receiver<Message>) {
    let (sender, receiver) = mpsc::channel(capacity);
    (HubHandle { sender }, receiver)
}

/// The broadcast consumer
pub struct BroadcastHub {
    receiver: mpsc::Receiver<Message>,
    registry: Arc<Registry>,
    cipher: Arc<TransportCipher>,
}

impl BroadcastHub {
    /// Create a hub draining `receiver` into the sessions of `registry`
    pub fn new(
        receiver: mpsc::Receiver<Message>,
        registry: Arc<Registry>,
        cipher: Arc<TransportCipher>,
    ) -> Self {
        Self {
            receiver,
            registry,
            cipher,
        }
    }

    /// Run the fan-out loop
    ///
    /// Continuously receives and delivers messages until all handles are dropped.
    pub async fn run(mut self) {
        info!("BroadcastHub started");

        while let Some(msg) = self.receiver.recv().await {
            self.deliver(msg).await;
        }

        info!("BroadcastHub shutting down");
    }

    /// Deliver one message to every current target
    ///
    /// Returns the number of connections the message was queued to.
    pub async fn deliver(&self, msg: Message) -> usize {
        let formatted = msg.format();

        // Snapshot targets, the lock is released before any send
        let mut targets: Vec<Outbox> = Vec::new();
        self.registry.for_each_other(msg.excluded(), |session| {
            targets.push(session.outbox.clone());
        });

        debug!(
            kind = %msg.kind,
            sender = %msg.sender,
            recipient = ?msg.recipient,
            private = msg.private,
            targets = targets.len(),
            "Broadcasting message"
        );

        let mut delivered = 0;
        for outbox in targets {
            let frame = match self.cipher.seal(formatted.as_bytes()) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Failed to seal broadcast for {}: {}", outbox.id(), e);
                    continue;
                }
            };

            match outbox.send(Bytes::from(frame)).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Broadcast to {} skipped: {}", outbox.id(), e),
            }
        }
        delivered
    }
}
