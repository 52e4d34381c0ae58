//! TCP connection handler
//!
//! Drives one connection through `Connecting` (username negotiation),
//! `Active` (chat loop) and `Closed`. Reads happen on the session task;
//! writes go through the connection's outbox to a dedicated writer task.

use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::io::AsyncWrite;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedWrite, LengthDelimitedCodec};
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::command::{self, Action};
use crate::error::AppError;
use crate::message::{Message, Reply};
use crate::server::ServerState;
use crate::session::{Outbox, Session};
use crate::types::ConnectionId;

/// Handle a new TCP connection
///
/// Sets up framing and the writer task, runs the session to completion,
/// and waits for queued frames to be flushed before returning.
pub async fn handle_connection(stream: TcpStream, state: Arc<ServerState>) -> Result<(), AppError> {
    let peer_addr = stream.peer_addr()?;
    let (mut frames, sink) = codec::split(stream, state.config.max_frame_len);

    // Generate connection ID
    let id = ConnectionId::new();
    debug!("Connection {} from {}", id, peer_addr);

    // Create channel for server -> client frames
    let (frame_tx, frame_rx) = mpsc::channel::<Bytes>(state.config.outbox_capacity);
    let writer = tokio::spawn(write_frames(id, sink, frame_rx));

    let mut session = SessionHandler::new(id, peer_addr, Outbox::new(id, frame_tx), state);
    let result = session.run(&mut frames).await;

    // The writer stops once the last outbox clone is gone
    drop(session);
    if writer.await.is_err() {
        warn!("Write task for {} panicked", id);
    }

    result
}

/// Drain a connection's outbox into the socket
///
/// A frame over the length limit is dropped; any other write error ends
/// the task.
async fn write_frames<W>(
    id: ConnectionId,
    mut sink: FramedWrite<W, LengthDelimitedCodec>,
    mut frames: mpsc::Receiver<Bytes>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        match sink.send(frame).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => {
                warn!("Dropped oversized frame for {}: {}", id, e);
            }
            Err(e) => {
                warn!("Write to {} failed: {}", id, e);
                break;
            }
        }
    }

    let _ = SinkExt::<Bytes>::close(&mut sink).await;
    debug!("Write task ended for {}", id);
}

/// Session lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for an acceptable username
    Connecting,
    /// Registered and chatting
    Active { username: String },
    /// Terminal
    Closed,
}

/// Why a session ended
#[derive(Debug)]
enum CloseReason {
    PeerClosed,
    Quit,
    Transport(std::io::Error),
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::PeerClosed => f.write_str("peer closed"),
            CloseReason::Quit => f.write_str("quit"),
            CloseReason::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

/// Per-connection state machine
pub struct SessionHandler {
    id: ConnectionId,
    peer_addr: SocketAddr,
    outbox: Outbox,
    state: Arc<ServerState>,
    phase: Phase,
    /// Cleared after the first failed direct reply
    replies_open: bool,
}

impl SessionHandler {
    /// Create a handler in the `Connecting` phase
    pub fn new(id: ConnectionId, peer_addr: SocketAddr, outbox: Outbox, state: Arc<ServerState>) -> Self {
        Self {
            id,
            peer_addr,
            outbox,
            state,
            phase: Phase::Connecting,
            replies_open: true,
        }
    }

    #[cfg(test)]
    fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Run the session until the peer leaves or quits
    ///
    /// Always ends in `Closed` with the session unregistered. Only transport
    /// failures are returned as errors.
    pub async fn run<S>(&mut self, frames: &mut S) -> Result<(), AppError>
    where
        S: Stream<Item = std::io::Result<BytesMut>> + Unpin,
    {
        self.reply(Reply::Prompt).await;

        let reason = loop {
            let frame = match frames.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => break CloseReason::Transport(e),
                None => break CloseReason::PeerClosed,
            };

            // Corrupt frames are dropped, the connection stays open
            let Some(text) = self.open(&frame) else {
                continue;
            };

            let flow = match self.phase {
                Phase::Connecting => self.negotiate(text.trim()).await,
                Phase::Active { .. } => self.handle_line(text.trim()).await,
                Phase::Closed => ControlFlow::Break(()),
            };
            if flow.is_break() {
                break CloseReason::Quit;
            }
        };

        self.close(&reason).await;

        match reason {
            CloseReason::Transport(e) => Err(e.into()),
            CloseReason::PeerClosed | CloseReason::Quit => Ok(()),
        }
    }

    /// Treat a line as a proposed username
    async fn negotiate(&mut self, proposed: &str) -> ControlFlow<()> {
        let session = Session::new(self.id, proposed, self.peer_addr, self.outbox.clone());

        match self.state.registry.register(session) {
            Ok(()) => {
                self.phase = Phase::Active {
                    username: proposed.to_string(),
                };
                self.reply(Reply::Welcome {
                    username: proposed.to_string(),
                })
                .await;
                self.broadcast(Message::joined(proposed)).await;
            }
            Err(e) => {
                debug!("Rejected username {:?} from {}: {}", proposed, self.id, e);
                self.reply(Reply::from(e)).await;
            }
        }

        ControlFlow::Continue(())
    }

    /// Route one line of an active session
    async fn handle_line(&mut self, line: &str) -> ControlFlow<()> {
        if line.is_empty() {
            return ControlFlow::Continue(());
        }

        if line.starts_with('/') {
            let outcome = command::process(line, self.id, &self.state.registry, &self.state.hub).await;
            self.reply(outcome.reply).await;

            return match outcome.action {
                Action::Continue => ControlFlow::Continue(()),
                Action::Renamed(username) => {
                    self.phase = Phase::Active { username };
                    ControlFlow::Continue(())
                }
                Action::Quit => ControlFlow::Break(()),
            };
        }

        let limit = codec::max_chat_len(self.state.config.max_frame_len);
        if line.len() > limit {
            debug!("Rejected {} byte line from {}", line.len(), self.id);
            self.reply(Reply::MessageTooLong { limit }).await;
            return ControlFlow::Continue(());
        }

        let Phase::Active { username } = &self.phase else {
            return ControlFlow::Continue(());
        };
        debug!("Message from {}: {}", username, line);

        let msg = Message::chat(username.clone(), line, self.id);
        self.broadcast(msg).await;
        ControlFlow::Continue(())
    }

    /// Unregister and announce the departure
    ///
    /// Safe to call more than once.
    async fn close(&mut self, reason: &CloseReason) {
        let phase = std::mem::replace(&mut self.phase, Phase::Closed);
        if phase == Phase::Closed {
            return;
        }

        match self.state.registry.unregister(self.id) {
            Some(session) => {
                info!("Client {} left ({})", session.username, reason);
                self.broadcast(Message::left(&session.username)).await;
            }
            None => debug!("Connection {} closed before registering ({})", self.id, reason),
        }
    }

    /// Decrypt a frame into text
    fn open(&self, frame: &[u8]) -> Option<String> {
        match self.state.cipher.open(frame) {
            Ok(plaintext) => Some(String::from_utf8_lossy(&plaintext).into_owned()),
            Err(e) => {
                warn!("Failed to decrypt frame from {}: {}", self.id, e);
                None
            }
        }
    }

    /// Send a direct reply to this connection only
    async fn reply(&mut self, reply: Reply) {
        if !self.replies_open {
            return;
        }

        let frame = match self.state.cipher.seal(reply.text().as_bytes()) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to seal reply for {}: {}", self.id, e);
                return;
            }
        };

        if let Err(e) = self.outbox.send(Bytes::from(frame)).await {
            warn!("Reply to {} failed: {}", self.id, e);
            self.replies_open = false;
        }
    }

    /// Enqueue a message on the broadcast hub
    async fn broadcast(&self, msg: Message) {
        if let Err(e) = self.state.hub.submit(msg).await {
            error!("Broadcast from {} dropped: {}", self.id, e);
        }
    }
}
